//! # dxpanel-trace
//!
//! Where sessions live after `run_case` returns, and how they are read.
//!
//! - [`InMemorySessionStore`]: the reference
//!   [`SessionStore`](dxpanel_core::traits::SessionStore), a case-id keyed
//!   registry with optional capacity-based eviction.
//! - [`render_markdown`]: a Markdown case report for one session.

pub mod memory;
pub mod report;

pub use memory::InMemorySessionStore;
pub use report::render_markdown;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use dxpanel_contracts::{
        action::{ActionType, ExecutionMode},
        trace::AgentRole,
    };
    use dxpanel_core::{session::CaseExecutionSession, traits::SessionStore};

    use crate::{render_markdown, InMemorySessionStore};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn session(case_id: &str) -> Arc<CaseExecutionSession> {
        let (session, _writer) = CaseExecutionSession::open(
            Some(case_id.to_string()),
            "45M with chest pain",
            ExecutionMode::Unconstrained,
            5,
            None,
        );
        session
    }

    // ── Registry ──────────────────────────────────────────────────────────────

    #[test]
    fn test_insert_and_get() {
        let store = InMemorySessionStore::new();
        assert!(store.is_empty());

        store.insert(session("case_001"));
        store.insert(session("case_002"));

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("case_001").unwrap().case_id(), "case_001");
        assert!(store.get("case_999").is_none());
    }

    /// Past capacity, the oldest registered session is evicted.
    #[test]
    fn test_capacity_evicts_oldest() {
        let store = InMemorySessionStore::with_capacity(Some(2));
        store.insert(session("a"));
        store.insert(session("b"));
        store.insert(session("c"));

        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_none(), "oldest must be evicted");
        assert_eq!(store.case_ids(), vec!["b".to_string(), "c".to_string()]);
    }

    /// Re-registering an id replaces the session and makes it the newest.
    #[test]
    fn test_reregister_moves_to_back() {
        let store = InMemorySessionStore::with_capacity(Some(2));
        let first = session("a");
        let first_session_id = first.session_id().to_string();
        store.insert(first);
        store.insert(session("b"));
        store.insert(session("a"));
        store.insert(session("c"));

        assert!(store.get("b").is_none());
        let a = store.get("a").unwrap();
        assert_ne!(a.session_id(), first_session_id);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove() {
        let store = InMemorySessionStore::new();
        store.insert(session("a"));
        assert!(store.remove("a").is_some());
        assert!(store.remove("a").is_none());
        assert!(store.case_ids().is_empty());
    }

    #[test]
    fn test_zero_capacity_treated_as_one() {
        let store = InMemorySessionStore::with_capacity(Some(0));
        store.insert(session("a"));
        assert_eq!(store.len(), 1);
        store.insert(session("b"));
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
    }

    /// Concurrent registration of distinct ids loses nothing.
    #[test]
    fn test_concurrent_inserts() {
        let store = Arc::new(InMemorySessionStore::new());
        std::thread::scope(|scope| {
            for t in 0..8 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for i in 0..25 {
                        store.insert(session(&format!("case-{}-{}", t, i)));
                        assert!(store.get(&format!("case-{}-{}", t, i)).is_some());
                    }
                });
            }
        });
        assert_eq!(store.len(), 200);
    }

    // ── Report ────────────────────────────────────────────────────────────────

    #[test]
    fn test_report_sections() {
        let (session, mut writer) = CaseExecutionSession::open(
            Some("case_003".to_string()),
            "28F pleuritic chest pain\nafter a 10h flight",
            ExecutionMode::Budgeted,
            3,
            Some(2000.0),
        );

        writer.next_round();
        session.add_agent_message(
            AgentRole::Hypothesis,
            "{...}",
            Some(json!({
                "hypotheses": [
                    {"condition": "Pneumothorax", "probability": 0.1},
                    {"condition": "Pulmonary embolism", "probability": 0.75, "reasoning": "OCPs and long flight"},
                    {"condition": "Pneumonia", "probability": 0.08},
                    {"condition": "Pericarditis", "probability": 0.05}
                ]
            })),
        );
        session.add_agent_message(AgentRole::Stewardship, "CT angiography is justified", None);
        writer.record_trace(
            ActionType::OrderTests,
            "Consensus Coordinator",
            "Ordered tests: D-Dimer (Total cost: $95.00)",
            json!({}),
            Some(95.0),
        );

        writer.next_round();
        writer.record_trace(
            ActionType::MakeDiagnosis,
            "Consensus Coordinator",
            "Final diagnosis: Pulmonary embolism (confidence: 0.90)",
            json!({"reasoning": "Positive D-dimer with high pretest probability"}),
            None,
        );
        writer.conclude("Pulmonary embolism", 0.9);

        let report = render_markdown(&session);

        assert!(report.starts_with("# Diagnostic Case Report: case_003"));
        assert!(report.contains("| Final Diagnosis | Pulmonary embolism |"));
        assert!(report.contains("| Confidence | 90.0% |"));
        assert!(report.contains("| Budget | $2000.00 |"));
        assert!(report.contains("> after a 10h flight"));
        assert!(report.contains("## Round 1"));
        assert!(report.contains("## Round 2"));
        assert!(report.contains("1. Pulmonary embolism (0.75): OCPs and long flight"));
        assert!(!report.contains("Pericarditis"), "only the top three hypotheses are listed");
        assert!(report.contains("#### Dr. Stewardship (stewardship_review)"));
        assert!(report.contains("Rationale: Positive D-dimer with high pretest probability"));
        assert!(report.contains("| **Total** | **$95.00** |"));
    }

    #[test]
    fn test_report_for_running_case() {
        let s = session("case_running");
        let report = render_markdown(&s);
        assert!(report.contains("| Final Diagnosis | _pending_ |"));
        assert!(report.contains("_No diagnosis has been reached yet._"));
        assert!(!report.contains("## Round"));
    }
}

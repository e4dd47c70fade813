//! # dxpanel-contracts
//!
//! Shared types, schemas, and contracts for the DXPANEL diagnostic
//! deliberation engine.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, a couple of pure derivations and the error
//! type.

pub mod action;
pub mod cost;
pub mod error;
pub mod hypothesis;
pub mod trace;

#[cfg(test)]
mod tests {
    use super::*;
    use action::{ActionType, CaseRequest, ConsensusAction, ConsensusDecision, ExecutionMode};
    use cost::{CostCategory, TestCost};
    use error::DxError;
    use hypothesis::TestRecommendation;
    use trace::{AgentRole, MessageType};

    // ── TestCost invariants ──────────────────────────────────────────────────

    #[test]
    fn test_cost_total_is_sum_of_fees() {
        let cost = TestCost::new("Colonoscopy", vec!["45378".to_string()], 1200.0, 800.0, 400.0);
        assert_eq!(cost.total_cost(), 2400.0);
        assert_eq!(cost.cost_category(), CostCategory::VeryHigh);
    }

    /// Category boundaries are half-open: each threshold belongs to the band above.
    #[test]
    fn cost_category_boundaries() {
        let cases = [
            (0.0, CostCategory::Low),
            (50.0, CostCategory::Low),
            (99.99, CostCategory::Low),
            (100.0, CostCategory::Moderate),
            (499.0, CostCategory::Moderate),
            (500.0, CostCategory::High),
            (1200.0, CostCategory::High),
            (1999.99, CostCategory::High),
            (2000.0, CostCategory::VeryHigh),
            (10_000.0, CostCategory::VeryHigh),
        ];
        for (total, expected) in cases {
            assert_eq!(CostCategory::from_total(total), expected, "total {}", total);
        }
    }

    /// A deserialized TestCost recomputes its total and category and ignores
    /// whatever the input claimed.
    #[test]
    fn test_cost_deserialize_recomputes_derived_fields() {
        let json = serde_json::json!({
            "test_name": "CT Head",
            "base_cost": 700.0,
            "facility_fee": 350.0,
            "total_cost": 1.0,
            "cost_category": "low"
        });
        let cost: TestCost = serde_json::from_value(json).unwrap();
        assert_eq!(cost.total_cost(), 1050.0);
        assert_eq!(cost.cost_category(), CostCategory::High);
        assert!(cost.cpt_codes().is_empty());
        assert_eq!(cost.professional_fee(), 0.0);
    }

    #[test]
    fn cost_category_serializes_snake_case() {
        let json = serde_json::to_string(&CostCategory::VeryHigh).unwrap();
        assert_eq!(json, "\"very_high\"");
    }

    // ── Actions ──────────────────────────────────────────────────────────────

    #[test]
    fn consensus_action_from_raw_known_values() {
        assert_eq!(ConsensusAction::from_raw("ask_questions"), ConsensusAction::AskQuestions);
        assert_eq!(ConsensusAction::from_raw(" order_tests "), ConsensusAction::OrderTests);
        assert_eq!(ConsensusAction::from_raw("make_diagnosis"), ConsensusAction::MakeDiagnosis);
    }

    #[test]
    fn consensus_action_display_matches_wire_names() {
        assert_eq!(ConsensusAction::AskQuestions.to_string(), "ask_questions");
        assert_eq!(ConsensusAction::OrderTests.to_string(), "order_tests");
        assert_eq!(ConsensusAction::MakeDiagnosis.to_string(), "make_diagnosis");
        assert_eq!(
            ConsensusAction::Unrecognized("refer".to_string()).to_string(),
            "unrecognized(refer)"
        );
    }

    #[test]
    fn consensus_action_keeps_unrecognized_text() {
        let action = ConsensusAction::from_raw("refer_to_specialist");
        assert_eq!(action, ConsensusAction::Unrecognized("refer_to_specialist".to_string()));
        assert_eq!(action.action_type(), None);
        assert!(action.to_string().contains("refer_to_specialist"));
    }

    #[test]
    fn decision_constructors_set_action() {
        let d = ConsensusDecision::order(vec!["CBC".to_string()], "need counts");
        assert_eq!(d.action, ConsensusAction::OrderTests);
        assert_eq!(d.tests, vec!["CBC".to_string()]);
        assert!(d.questions.is_empty());

        let d = ConsensusDecision::diagnose("Pneumonia", 0.9, "clear picture");
        assert_eq!(d.action.action_type(), Some(ActionType::MakeDiagnosis));
        assert_eq!(d.diagnosis.as_deref(), Some("Pneumonia"));
        assert_eq!(d.confidence, Some(0.9));
    }

    // ── ExecutionMode ────────────────────────────────────────────────────────

    #[test]
    fn execution_mode_parses_known_names() {
        assert_eq!("instant".parse::<ExecutionMode>().unwrap(), ExecutionMode::Instant);
        assert_eq!("questions_only".parse::<ExecutionMode>().unwrap(), ExecutionMode::QuestionsOnly);
        assert_eq!("Budgeted".parse::<ExecutionMode>().unwrap(), ExecutionMode::Budgeted);
        assert_eq!(ExecutionMode::default(), ExecutionMode::Unconstrained);
    }

    #[test]
    fn execution_mode_rejects_unknown_name() {
        match "turbo".parse::<ExecutionMode>() {
            Err(DxError::InvalidRequest { reason }) => assert!(reason.contains("turbo")),
            other => panic!("expected InvalidRequest, got {:?}", other),
        }
    }

    #[test]
    fn case_request_defaults_from_json() {
        let req: CaseRequest =
            serde_json::from_value(serde_json::json!({ "case_info": "45M chest pain" })).unwrap();
        assert_eq!(req.max_rounds, 10);
        assert_eq!(req.budget_limit, None);
        assert_eq!(req.mode, ExecutionMode::Unconstrained);
        assert!(req.case_id.is_none());
    }

    // ── Roles and messages ───────────────────────────────────────────────────

    #[test]
    fn agent_role_serializes_display_name() {
        let json = serde_json::to_string(&AgentRole::TestChooser).unwrap();
        assert_eq!(json, "\"Dr. Test-Chooser\"");
        assert_eq!(AgentRole::Checklist.message_type(), MessageType::QualityControl);
        assert_eq!(AgentRole::PANEL[0], AgentRole::Hypothesis);
    }

    #[test]
    fn test_recommendation_priority_defaults_to_one() {
        let rec: TestRecommendation =
            serde_json::from_value(serde_json::json!({ "test_name": "Troponin" })).unwrap();
        assert_eq!(rec.priority, 1);
        assert_eq!(rec.estimated_cost, None);
    }

    // ── DxError display messages ─────────────────────────────────────────────

    #[test]
    fn error_config_error_display() {
        let err = DxError::ConfigError {
            reason: "AZURE_OPENAI_KEY is not set".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("configuration error"));
        assert!(msg.contains("AZURE_OPENAI_KEY"));
    }

    #[test]
    fn error_reasoning_display() {
        let err = DxError::Reasoning {
            reason: "HTTP 503".to_string(),
        };
        assert!(err.to_string().contains("reasoning call failed"));
    }

    #[test]
    fn error_invalid_request_display() {
        let err = DxError::InvalidRequest {
            reason: "max_rounds must be at least 1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("invalid case request"));
        assert!(msg.contains("max_rounds"));
    }
}

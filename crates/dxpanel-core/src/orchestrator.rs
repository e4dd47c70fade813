//! The DXPANEL orchestrator: the round-based deliberation state machine.
//!
//! Each round runs:
//!
//!   Round start → Budget check → Panel (5 members) → Consensus → Action
//!
//! and the action is one of ask questions, order tests, or make a diagnosis.
//! The loop ends on a diagnosis. A diagnosis is guaranteed: the final round
//! is forced to diagnose whatever the coordinator says, and an exhausted
//! budget forces one before any panel call is made.
//!
//! All cost flows through `SessionWriter::record_trace`, so the session
//! total is always the sum of the recorded trace costs.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use dxpanel_contracts::{
    action::{ActionType, CaseRequest, ConsensusAction, ConsensusDecision, ExecutionMode, ForcedReason},
    error::{DxError, DxResult},
    hypothesis::{DiagnosticHypothesis, TestRecommendation},
    trace::{AgentMessage, AgentRole, ExecutionTrace, SessionSummary},
};

use crate::{
    extract,
    policy::{self, ForcedDiagnosis},
    session::{CaseExecutionSession, SessionWriter},
    traits::{
        ConsensusSynthesizer, CostModel, Gatekeeper, PanelContext, PanelContributions, PanelMember,
        SessionStore,
    },
};

/// Actor name on traces produced from a coordinator decision.
pub const COORDINATOR_ACTOR: &str = "Consensus Coordinator";
/// Actor name on traces produced by forced conclusions.
pub const PANEL_ACTOR: &str = "Panel Consensus";
/// Actor name on traces produced by fixed, non-agent steps.
pub const SYSTEM_ACTOR: &str = "System";

/// The question asked when the coordinator names an action nobody knows.
pub const UNRECOGNIZED_ACTION_QUESTION: &str = "What additional information would help with diagnosis?";

/// The fixed history questions asked in `questions_only` mode.
pub const HISTORY_QUESTIONS: [&str; 3] = [
    "Can you provide more details about the patient's symptoms?",
    "What is the patient's relevant medical history?",
    "What are the current vital signs and physical exam findings?",
];

/// The five panel members, one per role.
pub struct Panel {
    pub hypothesis: Box<dyn PanelMember>,
    pub test_chooser: Box<dyn PanelMember>,
    pub challenger: Box<dyn PanelMember>,
    pub stewardship: Box<dyn PanelMember>,
    pub checklist: Box<dyn PanelMember>,
}

/// Round-local state carried between iterations of the loop.
#[derive(Default)]
struct CaseState {
    findings: Vec<String>,
    hypotheses: Vec<DiagnosticHypothesis>,
}

/// Drives cases through the deliberation loop.
///
/// One orchestrator serves many cases; each `run_case` call owns its own
/// session and writer, so concurrent cases share nothing but the registry.
pub struct DiagnosticOrchestrator {
    panel: Panel,
    coordinator: Box<dyn ConsensusSynthesizer>,
    cost_model: Box<dyn CostModel>,
    gatekeeper: Box<dyn Gatekeeper>,
    store: Box<dyn SessionStore>,
}

impl DiagnosticOrchestrator {
    /// Create a new orchestrator from its collaborators.
    pub fn new(
        panel: Panel,
        coordinator: Box<dyn ConsensusSynthesizer>,
        cost_model: Box<dyn CostModel>,
        gatekeeper: Box<dyn Gatekeeper>,
        store: Box<dyn SessionStore>,
    ) -> Self {
        Self { panel, coordinator, cost_model, gatekeeper, store }
    }

    /// Run one case to completion and return its session.
    ///
    /// The session is registered before the first round, so it can be
    /// looked up (and observed partially complete) while the case runs.
    ///
    /// # Errors
    ///
    /// Only request validation fails: `max_rounds` of zero, or a negative
    /// or non-finite `budget_limit`. Reasoning failures never surface here.
    pub async fn run_case(&self, request: CaseRequest) -> DxResult<Arc<CaseExecutionSession>> {
        validate(&request)?;

        let (session, mut writer) = CaseExecutionSession::open(
            request.case_id,
            request.case_info,
            request.mode,
            request.max_rounds,
            request.budget_limit,
        );
        self.store.insert(Arc::clone(&session));

        info!(
            case_id = %session.case_id(),
            session_id = %session.session_id(),
            mode = %request.mode,
            max_rounds = request.max_rounds,
            budget_limit = ?request.budget_limit,
            "case started"
        );

        match request.mode {
            ExecutionMode::Instant => self.run_instant(&mut writer).await,
            ExecutionMode::QuestionsOnly => self.run_questions_only(&mut writer).await,
            ExecutionMode::Unconstrained | ExecutionMode::Budgeted => {
                self.run_rounds(&mut writer, request.max_rounds, request.budget_limit).await
            }
        }

        info!(
            case_id = %session.case_id(),
            diagnosis = ?session.final_diagnosis(),
            confidence = ?session.confidence_score(),
            total_cost = session.total_cost(),
            rounds = session.current_round(),
            "case concluded"
        );

        Ok(session)
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn get_session(&self, case_id: &str) -> Option<Arc<CaseExecutionSession>> {
        self.store.get(case_id)
    }

    /// Summary of a case, or `None` if the id is unknown.
    pub fn get_session_summary(&self, case_id: &str) -> Option<SessionSummary> {
        self.store.get(case_id).map(|s| s.summary())
    }

    /// The trace log of a case. Empty for an unknown id.
    pub fn get_session_traces(&self, case_id: &str) -> Vec<ExecutionTrace> {
        self.store.get(case_id).map(|s| s.traces()).unwrap_or_default()
    }

    /// The agent message log of a case. Empty for an unknown id.
    pub fn get_agent_messages(&self, case_id: &str) -> Vec<AgentMessage> {
        self.store.get(case_id).map(|s| s.agent_messages()).unwrap_or_default()
    }

    // ── Full loop ─────────────────────────────────────────────────────────────

    async fn run_rounds(&self, writer: &mut SessionWriter, max_rounds: u32, budget_limit: Option<f64>) {
        let session = Arc::clone(writer.session());
        let mut state = CaseState::default();

        for _ in 0..max_rounds {
            let round = writer.next_round();
            debug!(case_id = %session.case_id(), round, "round starting");

            // ── Budget check ─────────────────────────────────────────────────
            //
            // Before any panel call: a round that starts over budget spends
            // nothing further.
            if let Some(limit) = budget_limit {
                let spent = session.total_cost();
                if spent >= limit {
                    info!(case_id = %session.case_id(), round, spent, limit, "budget exhausted");
                    let forced = policy::forced_diagnosis(&state.hypotheses, ForcedReason::BudgetExhausted);
                    conclude_forced(writer, &forced, PANEL_ACTOR, json!({
                        "confidence": forced.confidence,
                        "reason": "budget_limit",
                        "budget_limit": limit,
                        "total_cost": spent,
                    }));
                    return;
                }
            }

            // ── Panel deliberation ───────────────────────────────────────────
            let (contributions, hypotheses, proposed) = self.deliberate(&session, &state).await;
            state.hypotheses = hypotheses;

            // ── Consensus ────────────────────────────────────────────────────
            let ctx = PanelContext {
                case_info: session.initial_case_info(),
                findings: &state.findings,
                hypotheses: &state.hypotheses,
                proposed_tests: &proposed,
            };
            let decision = self.coordinator.synthesize(&ctx, &contributions, &session, max_rounds).await;
            let decision = policy::enforce_final_round(decision, &state.hypotheses, round, max_rounds);

            debug!(
                case_id = %session.case_id(),
                round,
                action = %decision.action,
                forced = ?decision.forced,
                "consensus reached"
            );

            // ── Action ───────────────────────────────────────────────────────
            if self.execute(writer, &mut state, decision).await {
                return;
            }
        }
    }

    /// Run the five panel members in order and return their contributions,
    /// this round's differential, and the cost-annotated test proposals.
    async fn deliberate(
        &self,
        session: &CaseExecutionSession,
        state: &CaseState,
    ) -> (PanelContributions, Vec<DiagnosticHypothesis>, Vec<TestRecommendation>) {
        let case_info = session.initial_case_info();

        let ctx = PanelContext {
            case_info,
            findings: &state.findings,
            hypotheses: &state.hypotheses,
            proposed_tests: &[],
        };
        let hypothesis = self.panel.hypothesis.contribute(&ctx, session).await;
        let hypotheses = extract::parse_hypotheses(&hypothesis);

        // Everyone after Hypothesis sees the differential it just produced.
        let ctx = PanelContext { hypotheses: &hypotheses, ..ctx };
        let test_chooser = self.panel.test_chooser.contribute(&ctx, session).await;
        let challenger = self.panel.challenger.contribute(&ctx, session).await;

        let proposed = self.price_recommendations(extract::parse_recommendations(&test_chooser));
        let ctx = PanelContext { proposed_tests: &proposed, ..ctx };
        let stewardship = self.panel.stewardship.contribute(&ctx, session).await;
        let checklist = self.panel.checklist.contribute(&ctx, session).await;

        let contributions = PanelContributions {
            hypothesis,
            test_chooser,
            challenger,
            stewardship,
            checklist,
        };
        (contributions, hypotheses, proposed)
    }

    /// Fill in a cost estimate for every recommendation that lacks one.
    fn price_recommendations(&self, mut recommendations: Vec<TestRecommendation>) -> Vec<TestRecommendation> {
        for rec in recommendations.iter_mut().filter(|r| r.estimated_cost.is_none()) {
            rec.estimated_cost = Some(self.cost_model.estimate(&rec.test_name).total_cost());
        }
        recommendations
    }

    /// Execute a decision. Returns true when the case has concluded.
    async fn execute(&self, writer: &mut SessionWriter, state: &mut CaseState, decision: ConsensusDecision) -> bool {
        let structured = serde_json::to_value(&decision).unwrap_or(serde_json::Value::Null);

        match &decision.action {
            ConsensusAction::MakeDiagnosis => {
                let diagnosis = decision
                    .diagnosis
                    .clone()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| "Unknown diagnosis".to_string());
                let confidence = decision.confidence.unwrap_or(0.0).clamp(0.0, 1.0);

                writer.record_trace(
                    ActionType::MakeDiagnosis,
                    COORDINATOR_ACTOR,
                    format!("Final diagnosis: {} (confidence: {:.2})", diagnosis, confidence),
                    structured,
                    None,
                );
                writer.conclude(diagnosis, confidence);
                true
            }

            ConsensusAction::OrderTests => {
                let mut round_cost = 0.0;
                let mut lines = Vec::with_capacity(decision.tests.len());
                for test_name in &decision.tests {
                    let cost = self.cost_model.estimate(test_name);
                    round_cost += cost.total_cost();
                    let finding = self.gatekeeper.test_result(test_name, &cost).await;
                    state.findings.push(finding);
                    lines.push(test_name.as_str());
                }

                info!(
                    case_id = %writer.session().case_id(),
                    tests = decision.tests.len(),
                    cost = round_cost,
                    "tests ordered"
                );
                writer.record_trace(
                    ActionType::OrderTests,
                    COORDINATOR_ACTOR,
                    format!("Ordered tests: {} (Total cost: ${:.2})", lines.join(", "), round_cost),
                    structured,
                    Some(round_cost),
                );
                false
            }

            ConsensusAction::AskQuestions => {
                self.ask(writer, state, &decision.questions, structured).await;
                false
            }

            ConsensusAction::Unrecognized(raw) => {
                warn!(
                    case_id = %writer.session().case_id(),
                    action = %raw,
                    "coordinator returned unrecognized action; asking a clarifying question"
                );
                let questions = vec![UNRECOGNIZED_ACTION_QUESTION.to_string()];
                let structured = json!({
                    "unrecognized_action": raw,
                    "questions": questions,
                    "reasoning": format!("Consensus coordinator returned unrecognized action: {}", raw),
                });
                self.ask(writer, state, &questions, structured).await;
                false
            }
        }
    }

    /// Ask questions, collect the answers as findings, and charge the
    /// physician visit if this session has not been charged yet.
    async fn ask(
        &self,
        writer: &mut SessionWriter,
        state: &mut CaseState,
        questions: &[String],
        structured: serde_json::Value,
    ) {
        for question in questions {
            let answer = self.gatekeeper.answer(question).await;
            state.findings.push(answer);
        }

        let visit_cost = writer.charge_physician_visit(self.cost_model.physician_visit_cost());
        writer.record_trace(
            ActionType::AskQuestions,
            COORDINATOR_ACTOR,
            format!("Asked questions: {}", questions.join("; ")),
            structured,
            (visit_cost > 0.0).then_some(visit_cost),
        );
    }

    // ── Single-pass modes ─────────────────────────────────────────────────────

    async fn run_instant(&self, writer: &mut SessionWriter) {
        let session = Arc::clone(writer.session());
        let hypotheses = self.single_hypothesis_pass(&session, &[]).await;

        let forced = policy::forced_diagnosis(&hypotheses, ForcedReason::SinglePass);
        writer.record_trace(
            ActionType::MakeDiagnosis,
            AgentRole::Hypothesis.display_name(),
            format!("Instant diagnosis: {}", forced.diagnosis),
            json!({
                "mode": "instant",
                "confidence": forced.confidence,
                "hypotheses": hypotheses,
            }),
            None,
        );
        writer.conclude(forced.diagnosis, forced.confidence);
    }

    async fn run_questions_only(&self, writer: &mut SessionWriter) {
        let session = Arc::clone(writer.session());

        let mut findings = Vec::with_capacity(HISTORY_QUESTIONS.len());
        for question in HISTORY_QUESTIONS {
            findings.push(self.gatekeeper.answer(question).await);
        }

        let visit_cost = writer.charge_physician_visit(self.cost_model.physician_visit_cost());
        writer.record_trace(
            ActionType::AskQuestions,
            SYSTEM_ACTOR,
            format!("Asked questions: {}", HISTORY_QUESTIONS.join("; ")),
            json!({ "mode": "questions_only", "questions": HISTORY_QUESTIONS, "answers": findings }),
            (visit_cost > 0.0).then_some(visit_cost),
        );

        let hypotheses = self.single_hypothesis_pass(&session, &findings).await;
        let forced = policy::forced_diagnosis(&hypotheses, ForcedReason::SinglePass);
        conclude_forced(writer, &forced, PANEL_ACTOR, json!({
            "mode": "questions_only",
            "confidence": forced.confidence,
            "hypotheses": hypotheses,
        }));
    }

    async fn single_hypothesis_pass(
        &self,
        session: &CaseExecutionSession,
        findings: &[String],
    ) -> Vec<DiagnosticHypothesis> {
        let ctx = PanelContext {
            case_info: session.initial_case_info(),
            findings,
            hypotheses: &[],
            proposed_tests: &[],
        };
        let response = self.panel.hypothesis.contribute(&ctx, session).await;
        extract::parse_hypotheses(&response)
    }
}

/// Record a forced diagnosis and conclude.
fn conclude_forced(writer: &mut SessionWriter, forced: &ForcedDiagnosis, actor: &str, structured: serde_json::Value) {
    let label = match forced.reason {
        ForcedReason::BudgetExhausted => "Budget limit reached - final diagnosis",
        _ => "Final diagnosis",
    };
    writer.record_trace(
        ActionType::MakeDiagnosis,
        actor,
        format!("{}: {} (confidence: {:.2})", label, forced.diagnosis, forced.confidence),
        structured,
        None,
    );
    writer.conclude(forced.diagnosis.clone(), forced.confidence);
}

fn validate(request: &CaseRequest) -> DxResult<()> {
    if request.max_rounds == 0 {
        return Err(DxError::InvalidRequest {
            reason: "max_rounds must be at least 1".to_string(),
        });
    }
    if let Some(budget) = request.budget_limit {
        if !budget.is_finite() || budget < 0.0 {
            return Err(DxError::InvalidRequest {
                reason: format!("budget_limit must be a non-negative amount, got {}", budget),
            });
        }
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use dxpanel_contracts::{
        action::{ActionType, CaseRequest, ConsensusAction, ConsensusDecision, ExecutionMode},
        cost::TestCost,
        error::DxError,
        trace::AgentRole,
    };

    use crate::session::CaseExecutionSession;
    use crate::traits::{
        ConsensusSynthesizer, CostModel, PanelContext, PanelContributions, PanelMember, SessionStore,
        SimulatedGatekeeper,
    };

    use super::{DiagnosticOrchestrator, Panel, HISTORY_QUESTIONS, UNRECOGNIZED_ACTION_QUESTION};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    /// What a panel member was shown on one call.
    #[derive(Debug, Clone)]
    struct Seen {
        hypotheses: Vec<String>,
        proposed: Vec<(String, Option<f64>)>,
        findings: usize,
    }

    /// A panel member that always returns the same response and records
    /// every context it is shown.
    struct ScriptedMember {
        role: AgentRole,
        response: Value,
        seen: Arc<Mutex<Vec<Seen>>>,
    }

    impl ScriptedMember {
        fn new(role: AgentRole, response: Value) -> Self {
            Self { role, response, seen: Arc::new(Mutex::new(vec![])) }
        }
    }

    #[async_trait]
    impl PanelMember for ScriptedMember {
        fn role(&self) -> AgentRole {
            self.role
        }

        async fn contribute(&self, ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> Value {
            self.seen.lock().unwrap().push(Seen {
                hypotheses: ctx.hypotheses.iter().map(|h| h.condition.clone()).collect(),
                proposed: ctx.proposed_tests.iter().map(|t| (t.test_name.clone(), t.estimated_cost)).collect(),
                findings: ctx.findings.len(),
            });
            session.add_agent_message(self.role, self.response.to_string(), Some(self.response.clone()));
            self.response.clone()
        }
    }

    /// A coordinator that replays a script, repeating the last decision
    /// once the script runs out.
    struct ScriptedCoordinator {
        script: Mutex<VecDeque<ConsensusDecision>>,
        last: Mutex<Option<ConsensusDecision>>,
        calls: Arc<Mutex<u32>>,
    }

    impl ScriptedCoordinator {
        fn new(script: Vec<ConsensusDecision>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                calls: Arc::new(Mutex::new(0)),
            }
        }

        fn always(decision: ConsensusDecision) -> Self {
            Self::new(vec![decision])
        }
    }

    #[async_trait]
    impl ConsensusSynthesizer for ScriptedCoordinator {
        async fn synthesize(
            &self,
            _ctx: &PanelContext<'_>,
            _contributions: &PanelContributions,
            session: &CaseExecutionSession,
            _max_rounds: u32,
        ) -> ConsensusDecision {
            *self.calls.lock().unwrap() += 1;
            session.add_agent_message(AgentRole::Coordinator, "scripted", None);
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(decision) = next {
                *last = Some(decision);
            }
            last.clone().unwrap()
        }
    }

    /// Every test costs the same flat amount.
    struct FlatCost {
        per_test: f64,
    }

    impl CostModel for FlatCost {
        fn estimate(&self, test_name: &str) -> TestCost {
            TestCost::new(test_name, vec![], self.per_test, 0.0, 0.0)
        }

        fn physician_visit_cost(&self) -> f64 {
            300.0
        }
    }

    #[derive(Default)]
    struct MapStore {
        sessions: Mutex<HashMap<String, Arc<CaseExecutionSession>>>,
    }

    impl SessionStore for MapStore {
        fn insert(&self, session: Arc<CaseExecutionSession>) {
            self.sessions.lock().unwrap().insert(session.case_id().to_string(), session);
        }

        fn get(&self, case_id: &str) -> Option<Arc<CaseExecutionSession>> {
            self.sessions.lock().unwrap().get(case_id).cloned()
        }

        fn len(&self) -> usize {
            self.sessions.lock().unwrap().len()
        }
    }

    fn hypothesis_response() -> Value {
        json!({
            "hypotheses": [
                {"condition": "Unstable angina", "probability": 0.25},
                {"condition": "Acute coronary syndrome", "probability": 0.7}
            ],
            "confidence_level": "medium"
        })
    }

    /// Handles onto the mocks that tests inspect after the run.
    struct Probes {
        hypothesis: Arc<Mutex<Vec<Seen>>>,
        challenger: Arc<Mutex<Vec<Seen>>>,
        stewardship: Arc<Mutex<Vec<Seen>>>,
        coordinator_calls: Arc<Mutex<u32>>,
    }

    fn build_with(
        hypothesis: Value,
        tests: Value,
        coordinator: ScriptedCoordinator,
        per_test: f64,
    ) -> (DiagnosticOrchestrator, Probes) {
        let hypothesis = ScriptedMember::new(AgentRole::Hypothesis, hypothesis);
        let challenger = ScriptedMember::new(AgentRole::Challenger, json!({"challenges": []}));
        let stewardship = ScriptedMember::new(AgentRole::Stewardship, json!({"budget_recommendation": "continue"}));

        let probes = Probes {
            hypothesis: hypothesis.seen.clone(),
            challenger: challenger.seen.clone(),
            stewardship: stewardship.seen.clone(),
            coordinator_calls: coordinator.calls.clone(),
        };

        let panel = Panel {
            hypothesis: Box::new(hypothesis),
            test_chooser: Box::new(ScriptedMember::new(AgentRole::TestChooser, tests)),
            challenger: Box::new(challenger),
            stewardship: Box::new(stewardship),
            checklist: Box::new(ScriptedMember::new(AgentRole::Checklist, json!({"quality_score": 6}))),
        };

        let orchestrator = DiagnosticOrchestrator::new(
            panel,
            Box::new(coordinator),
            Box::new(FlatCost { per_test }),
            Box::new(SimulatedGatekeeper),
            Box::new(MapStore::default()),
        );
        (orchestrator, probes)
    }

    fn build(coordinator: ScriptedCoordinator, per_test: f64) -> (DiagnosticOrchestrator, Probes) {
        build_with(hypothesis_response(), json!({"recommended_tests": []}), coordinator, per_test)
    }

    fn order(tests: &[&str]) -> ConsensusDecision {
        ConsensusDecision::order(tests.iter().map(|t| t.to_string()).collect(), "")
    }

    fn ask(questions: &[&str]) -> ConsensusDecision {
        ConsensusDecision::ask(questions.iter().map(|q| q.to_string()).collect(), "")
    }

    fn cost_sum(session: &CaseExecutionSession) -> f64 {
        session.traces().iter().filter_map(|t| t.cost_impact).sum()
    }

    // ── Loop behavior ────────────────────────────────────────────────────────

    /// A diagnosis in round one ends the case with that diagnosis.
    #[tokio::test]
    async fn test_diagnosis_in_first_round() {
        let (orch, probes) = build(
            ScriptedCoordinator::always(ConsensusDecision::diagnose("Acute coronary syndrome", 0.88, "")),
            100.0,
        );

        let session = orch.run_case(CaseRequest::new("45M chest pain")).await.unwrap();

        assert_eq!(session.final_diagnosis().as_deref(), Some("Acute coronary syndrome"));
        assert_eq!(session.confidence_score(), Some(0.88));
        assert_eq!(session.current_round(), 1);
        assert_eq!(*probes.coordinator_calls.lock().unwrap(), 1);
        // Five panel messages plus the coordinator's.
        assert_eq!(session.agent_messages().len(), 6);
        assert_eq!(session.traces().len(), 1);
        assert_eq!(session.traces()[0].action_type, ActionType::MakeDiagnosis);
    }

    /// Even a coordinator that only ever orders tests cannot keep a case
    /// open past max_rounds: the final round is forced to diagnose.
    #[tokio::test]
    async fn test_final_round_forces_diagnosis() {
        let (orch, probes) = build(ScriptedCoordinator::always(order(&["CBC"])), 25.0);

        let session = orch
            .run_case(CaseRequest::new("45M chest pain").with_max_rounds(3))
            .await
            .unwrap();

        assert_eq!(session.current_round(), 3);
        assert_eq!(*probes.coordinator_calls.lock().unwrap(), 3);
        assert_eq!(
            session.final_diagnosis().as_deref(),
            Some("Acute coronary syndrome"),
            "forced diagnosis must be the top hypothesis"
        );
        assert_eq!(session.confidence_score(), Some(0.7));

        let traces = session.traces();
        let last = traces.last().unwrap();
        assert_eq!(last.action_type, ActionType::MakeDiagnosis);
        assert_eq!(last.structured_data["forced"], "final_round");
        // Two rounds of tests at $25, nothing charged for the forced diagnosis.
        assert_eq!(session.total_cost(), 50.0);
    }

    /// With the budget already spent, the next round concludes before any
    /// panel member or the coordinator is called.
    #[tokio::test]
    async fn test_budget_preempts_next_round() {
        let (orch, probes) = build(ScriptedCoordinator::always(order(&["CT Head"])), 150.0);

        let session = orch
            .run_case(CaseRequest::new("72F confusion").with_budget(100.0).with_max_rounds(5))
            .await
            .unwrap();

        assert_eq!(session.current_round(), 2);
        assert_eq!(probes.hypothesis.lock().unwrap().len(), 1, "no panel call in round 2");
        assert_eq!(*probes.coordinator_calls.lock().unwrap(), 1);
        assert_eq!(session.total_cost(), 150.0);

        let traces = session.traces();
        let last = traces.last().unwrap();
        assert_eq!(last.actor, "Panel Consensus");
        assert_eq!(last.round_number, 2);
        assert_eq!(last.structured_data["reason"], "budget_limit");
        assert_eq!(session.final_diagnosis().as_deref(), Some("Acute coronary syndrome"));
    }

    /// A zero budget ends the case in round one with the budget sentinel.
    #[tokio::test]
    async fn test_zero_budget_uses_sentinel() {
        let (orch, probes) = build(ScriptedCoordinator::always(order(&["CBC"])), 25.0);

        let session = orch.run_case(CaseRequest::new("x").with_budget(0.0)).await.unwrap();

        assert!(probes.hypothesis.lock().unwrap().is_empty());
        assert_eq!(session.final_diagnosis().as_deref(), Some("Insufficient data - budget limit reached"));
        assert_eq!(session.confidence_score(), Some(0.3));
    }

    /// Total cost is exactly the sum of trace cost impacts and never
    /// decreases along the trace log.
    #[tokio::test]
    async fn test_cost_is_sum_of_trace_impacts() {
        let script = vec![
            order(&["CBC", "Troponin"]),
            ask(&["Any prior cardiac history?"]),
            order(&["Echocardiogram"]),
            ask(&["Family history?"]),
            ConsensusDecision::diagnose("Acute coronary syndrome", 0.9, ""),
        ];
        let (orch, _probes) = build(ScriptedCoordinator::new(script), 40.0);

        let session = orch.run_case(CaseRequest::new("45M chest pain")).await.unwrap();

        assert_eq!(session.total_cost(), 40.0 * 3.0 + 300.0);
        assert_eq!(cost_sum(&session), session.total_cost());

        let mut running = 0.0;
        for trace in session.traces() {
            let next = running + trace.cost_impact.unwrap_or(0.0);
            assert!(next >= running, "cost must be non-decreasing");
            running = next;
        }
    }

    /// Asking in three separate rounds charges the physician visit once.
    #[tokio::test]
    async fn test_visit_charged_once_across_rounds() {
        let script = vec![
            ask(&["Onset?"]),
            ask(&["Radiation?"]),
            ask(&["Diaphoresis?"]),
            ConsensusDecision::diagnose("Acute coronary syndrome", 0.9, ""),
        ];
        let (orch, _probes) = build(ScriptedCoordinator::new(script), 0.0);

        let session = orch.run_case(CaseRequest::new("45M chest pain")).await.unwrap();

        let charged: Vec<f64> = session
            .traces()
            .iter()
            .filter(|t| t.action_type == ActionType::AskQuestions)
            .filter_map(|t| t.cost_impact)
            .collect();
        assert_eq!(charged, vec![300.0]);
        assert_eq!(session.total_cost(), 300.0);
    }

    /// An unrecognized action becomes one fixed clarifying question.
    #[tokio::test]
    async fn test_unrecognized_action_asks_clarifying_question() {
        let mut odd = ask(&[]);
        odd.action = ConsensusAction::Unrecognized("consult_oracle".to_string());
        let script = vec![odd, ConsensusDecision::diagnose("Sepsis", 0.8, "")];
        let (orch, probes) = build(ScriptedCoordinator::new(script), 0.0);

        let session = orch.run_case(CaseRequest::new("72F fever")).await.unwrap();

        let traces = session.traces();
        assert_eq!(traces[0].action_type, ActionType::AskQuestions);
        assert_eq!(traces[0].structured_data["unrecognized_action"], "consult_oracle");
        assert!(traces[0].content.contains(UNRECOGNIZED_ACTION_QUESTION));

        // The answer is a finding the second round's panel can see.
        let seen = probes.hypothesis.lock().unwrap();
        assert_eq!(seen[1].findings, 1);
    }

    /// Members after Hypothesis see the differential produced in the same
    /// round, and Stewardship sees priced test proposals.
    #[tokio::test]
    async fn test_panel_sees_current_round_state() {
        let tests = json!({
            "recommended_tests": [
                {"test_name": "Troponin", "rationale": "MI", "estimated_cost": 85},
                {"test_name": "EKG", "rationale": "ischemia"}
            ]
        });
        let (orch, probes) = build_with(
            hypothesis_response(),
            tests,
            ScriptedCoordinator::always(ConsensusDecision::diagnose("ACS", 0.9, "")),
            75.0,
        );

        orch.run_case(CaseRequest::new("45M chest pain")).await.unwrap();

        assert!(probes.hypothesis.lock().unwrap()[0].hypotheses.is_empty());
        assert_eq!(
            probes.challenger.lock().unwrap()[0].hypotheses,
            vec!["Acute coronary syndrome", "Unstable angina"],
            "challenger must see this round's sorted differential"
        );
        assert_eq!(
            probes.stewardship.lock().unwrap()[0].proposed,
            vec![("Troponin".to_string(), Some(85.0)), ("EKG".to_string(), Some(75.0))]
        );
    }

    /// Findings from ordered tests accumulate across rounds.
    #[tokio::test]
    async fn test_findings_accumulate() {
        let script = vec![order(&["CBC", "BMP"]), order(&["Chest X-ray"]), ConsensusDecision::diagnose("x", 0.9, "")];
        let (orch, probes) = build(ScriptedCoordinator::new(script), 10.0);

        orch.run_case(CaseRequest::new("case")).await.unwrap();

        let counts: Vec<usize> = probes.hypothesis.lock().unwrap().iter().map(|s| s.findings).collect();
        assert_eq!(counts, vec![0, 2, 3]);
    }

    // ── Modes ────────────────────────────────────────────────────────────────

    /// Instant mode makes one Hypothesis call and concludes on its top entry.
    #[tokio::test]
    async fn test_instant_mode() {
        let (orch, probes) = build(ScriptedCoordinator::always(order(&["CBC"])), 10.0);

        let session = orch
            .run_case(CaseRequest::new("28F dyspnea").with_mode(ExecutionMode::Instant))
            .await
            .unwrap();

        assert_eq!(probes.hypothesis.lock().unwrap().len(), 1);
        assert_eq!(*probes.coordinator_calls.lock().unwrap(), 0);
        assert_eq!(session.final_diagnosis().as_deref(), Some("Acute coronary syndrome"));
        assert_eq!(session.total_cost(), 0.0);

        let traces = session.traces();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0].actor, "Dr. Hypothesis");
        assert!(traces[0].content.starts_with("Instant diagnosis:"));
    }

    /// Instant mode with an empty differential uses the single-pass sentinel.
    #[tokio::test]
    async fn test_instant_mode_sentinel() {
        let (orch, _probes) = build_with(
            json!({"hypotheses": []}),
            json!({}),
            ScriptedCoordinator::always(order(&[])),
            0.0,
        );

        let session = orch
            .run_case(CaseRequest::new("x").with_mode(ExecutionMode::Instant))
            .await
            .unwrap();

        assert_eq!(session.final_diagnosis().as_deref(), Some("Insufficient information for diagnosis"));
        assert_eq!(session.confidence_score(), Some(0.1));
    }

    /// Questions-only mode asks the three history questions, charges one
    /// visit, and diagnoses from the answers.
    #[tokio::test]
    async fn test_questions_only_mode() {
        let (orch, probes) = build(ScriptedCoordinator::always(order(&["CBC"])), 10.0);

        let session = orch
            .run_case(CaseRequest::new("72F confusion").with_mode(ExecutionMode::QuestionsOnly))
            .await
            .unwrap();

        assert_eq!(probes.hypothesis.lock().unwrap()[0].findings, HISTORY_QUESTIONS.len());
        assert_eq!(session.total_cost(), 300.0);

        let traces = session.traces();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].actor, "System");
        assert_eq!(traces[0].cost_impact, Some(300.0));
        assert_eq!(traces[1].action_type, ActionType::MakeDiagnosis);
        assert_eq!(traces[1].actor, "Panel Consensus");
        assert!(session.is_concluded());
    }

    // ── Requests and queries ─────────────────────────────────────────────────

    #[tokio::test]
    async fn test_zero_rounds_rejected() {
        let (orch, _probes) = build(ScriptedCoordinator::always(order(&[])), 0.0);

        let result = orch.run_case(CaseRequest::new("x").with_max_rounds(0).with_case_id("c0")).await;

        assert!(matches!(result, Err(DxError::InvalidRequest { .. })));
        assert!(orch.get_session("c0").is_none(), "rejected requests must not be registered");
    }

    #[tokio::test]
    async fn test_negative_budget_rejected() {
        let (orch, _probes) = build(ScriptedCoordinator::always(order(&[])), 0.0);
        let result = orch.run_case(CaseRequest::new("x").with_budget(-1.0)).await;
        assert!(matches!(result, Err(DxError::InvalidRequest { .. })));
    }

    /// Summary, traces and messages are retrievable by case id; unknown ids
    /// yield nothing.
    #[tokio::test]
    async fn test_queries_by_case_id() {
        let (orch, _probes) = build(
            ScriptedCoordinator::new(vec![order(&["CBC"]), ConsensusDecision::diagnose("ACS", 0.9, "")]),
            25.0,
        );

        orch.run_case(CaseRequest::new("45M chest pain").with_case_id("case_001")).await.unwrap();

        let summary = orch.get_session_summary("case_001").unwrap();
        assert_eq!(summary.rounds_completed, 2);
        assert_eq!(summary.total_cost, 25.0);
        assert_eq!(summary.trace_count, 2);
        assert_eq!(summary.agent_message_count, 12);
        assert_eq!(orch.get_session_traces("case_001").len(), 2);
        assert_eq!(orch.get_agent_messages("case_001").len(), 12);

        assert!(orch.get_session_summary("missing").is_none());
        assert!(orch.get_session_traces("missing").is_empty());
        assert!(orch.get_agent_messages("missing").is_empty());
    }
}

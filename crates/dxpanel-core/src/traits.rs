//! Core trait definitions for the DXPANEL deliberation engine.
//!
//! These traits define every seam the orchestrator calls through:
//!
//! - `ReasoningService`: the language model, untrusted and fallible
//! - `PanelMember`: one role on the diagnostic panel
//! - `ConsensusSynthesizer`: turns five contributions into one action
//! - `CostModel`: prices tests and visits
//! - `Gatekeeper`: answers questions and returns test results
//! - `SessionStore`: registry of sessions by case id
//!
//! The orchestrator owns one of each and drives them in a fixed order every
//! round. Nothing a `ReasoningService` returns can abort a case: panel
//! members and the synthesizer return values, not `Result`s.

use std::sync::Arc;

use async_trait::async_trait;

use dxpanel_contracts::{
    action::ConsensusDecision,
    cost::TestCost,
    error::DxResult,
    hypothesis::{DiagnosticHypothesis, TestRecommendation},
    trace::AgentRole,
};

use crate::session::CaseExecutionSession;

/// A text-in, text-out reasoning backend.
///
/// Implementations are **untrusted**: the returned text may be prose, may
/// contain malformed JSON, or may not arrive at all. Callers in this
/// workspace never propagate the `Err` case out of an agent; they turn it
/// into an error string and carry on.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// Produce one completion for the given system prompt and user message.
    ///
    /// No retry happens at this layer. One call per agent invocation.
    async fn complete(&self, system_prompt: &str, user_message: &str, temperature: f32) -> DxResult<String>;
}

/// The case state a panel member reasons over.
///
/// Borrowed from the orchestrator's round-local state. `hypotheses` is the
/// current differential (for every member but Hypothesis, the one produced
/// earlier in the same round) and is already sorted by probability.
#[derive(Debug, Clone, Copy)]
pub struct PanelContext<'a> {
    pub case_info: &'a str,
    pub findings: &'a [String],
    pub hypotheses: &'a [DiagnosticHypothesis],
    /// Tests proposed this round. Empty until the Test-Chooser has spoken.
    pub proposed_tests: &'a [TestRecommendation],
}

/// One role on the diagnostic panel.
#[async_trait]
pub trait PanelMember: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Contribute this role's view of the case.
    ///
    /// Implementations must append exactly one agent message to `session`
    /// per call, whatever the outcome, and must always return a JSON object:
    /// the parsed model response, or the role's fallback shape.
    async fn contribute(&self, ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> serde_json::Value;
}

/// The five panel outputs from one round, in deliberation order.
#[derive(Debug, Clone, Default)]
pub struct PanelContributions {
    pub hypothesis: serde_json::Value,
    pub test_chooser: serde_json::Value,
    pub challenger: serde_json::Value,
    pub stewardship: serde_json::Value,
    pub checklist: serde_json::Value,
}

impl PanelContributions {
    /// Pair each contribution with the role that produced it.
    pub fn by_role(&self) -> [(AgentRole, &serde_json::Value); 5] {
        [
            (AgentRole::Hypothesis, &self.hypothesis),
            (AgentRole::TestChooser, &self.test_chooser),
            (AgentRole::Challenger, &self.challenger),
            (AgentRole::Stewardship, &self.stewardship),
            (AgentRole::Checklist, &self.checklist),
        ]
    }
}

/// Synthesizes one consensus action from a round of contributions.
#[async_trait]
pub trait ConsensusSynthesizer: Send + Sync {
    /// Decide the round's action.
    ///
    /// `session.current_round()` against `max_rounds` tells the synthesizer
    /// whether this is the final round. The orchestrator enforces the
    /// final-round rule on whatever comes back, so an implementation that
    /// ignores it cannot stall a case.
    async fn synthesize(
        &self,
        ctx: &PanelContext<'_>,
        contributions: &PanelContributions,
        session: &CaseExecutionSession,
        max_rounds: u32,
    ) -> ConsensusDecision;
}

/// Prices diagnostic tests and physician visits.
///
/// Implementations must never fail: an unknown test still gets a price.
pub trait CostModel: Send + Sync {
    fn estimate(&self, test_name: &str) -> TestCost;

    /// Flat charge for a physician visit.
    fn physician_visit_cost(&self) -> f64;
}

/// Produces the information a real clinical encounter would return.
///
/// The reference implementation is `SimulatedGatekeeper`; a deployment
/// would back this with an EHR or a patient simulator.
#[async_trait]
pub trait Gatekeeper: Send + Sync {
    /// The finding recorded for an ordered test.
    async fn test_result(&self, test_name: &str, cost: &TestCost) -> String;

    /// The finding recorded for a question put to the patient.
    async fn answer(&self, question: &str) -> String;
}

/// Placeholder gatekeeper that returns fixed simulated findings.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedGatekeeper;

#[async_trait]
impl Gatekeeper for SimulatedGatekeeper {
    async fn test_result(&self, test_name: &str, cost: &TestCost) -> String {
        format!(
            "{}: [Simulated result - would be actual lab/imaging result] (Cost: ${:.2})",
            test_name,
            cost.total_cost()
        )
    }

    async fn answer(&self, question: &str) -> String {
        format!("Q: {} A: [Simulated patient response]", question)
    }
}

/// Registry of sessions keyed by case id.
///
/// Must tolerate concurrent inserts of distinct keys and concurrent lookups.
pub trait SessionStore: Send + Sync {
    fn insert(&self, session: Arc<CaseExecutionSession>);

    fn get(&self, case_id: &str) -> Option<Arc<CaseExecutionSession>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! The consensus coordinator.
//!
//! Turns one round of panel contributions into a single `ConsensusDecision`.
//! The model is asked for a decision; the mechanical rules below apply to
//! whatever it answers:
//!
//! | Round     | Reply parsed | Result                                         |
//! |-----------|--------------|------------------------------------------------|
//! | not final | yes          | the model's action, as given                    |
//! | not final | no           | `ask_questions` with one generic question       |
//! | final     | diagnosis    | the model's diagnosis                           |
//! | final     | other action | forced diagnosis (`FinalRound`)                 |
//! | final     | no           | forced diagnosis (`FinalRoundUnparsed`)         |

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use dxpanel_contracts::{
    action::{ConsensusAction, ConsensusDecision},
    trace::AgentRole,
};
use dxpanel_core::{
    config::DEFAULT_TEMPERATURE,
    extract, policy,
    session::CaseExecutionSession,
    traits::{ConsensusSynthesizer, PanelContext, PanelContributions, ReasoningService},
};

use crate::prompts;

/// Asked when a non-final reply holds no usable JSON.
pub const UNPARSED_REPLY_QUESTION: &str = "What additional clinical information would be most helpful for diagnosis?";

/// Name used for an ordered test given as an object without `test_name`.
const UNNAMED_TEST: &str = "Unknown test";

pub struct ConsensusCoordinator {
    reasoning: Arc<dyn ReasoningService>,
    temperature: f32,
}

impl ConsensusCoordinator {
    pub fn new(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self {
            reasoning,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ConsensusSynthesizer for ConsensusCoordinator {
    async fn synthesize(
        &self,
        ctx: &PanelContext<'_>,
        contributions: &PanelContributions,
        session: &CaseExecutionSession,
        max_rounds: u32,
    ) -> ConsensusDecision {
        let round = session.current_round();
        let final_round = policy::is_final_round(round, max_rounds);

        let system_prompt = prompts::coordinator_system(final_round);
        let user_message = prompts::coordinator_message(ctx, contributions, session, max_rounds, final_round);

        let raw = match self.reasoning.complete(&system_prompt, &user_message, self.temperature).await {
            Ok(text) => text,
            Err(e) => {
                warn!(case_id = %session.case_id(), round, error = %e, "coordinator reasoning call failed");
                format!("Error in reasoning call: {}", e)
            }
        };

        let parsed = extract::extract_json_object(&raw);
        session.add_agent_message(AgentRole::Coordinator, raw.as_str(), parsed.clone());

        let decision = match parsed {
            Some(value) => parse_decision(&value),
            None if final_round => unparsed(&raw, "Coordinator reply held no JSON; the final round requires a diagnosis."),
            None => {
                debug!(case_id = %session.case_id(), round, "coordinator reply held no JSON; asking for more information");
                ConsensusDecision {
                    confidence_assessment: "Unable to assess".to_string(),
                    ..unparsed(&raw, "Coordinator reply held no JSON; requesting more information.")
                }
            }
        };

        policy::enforce_final_round(decision, ctx.hypotheses, round, max_rounds)
    }
}

/// An `ask_questions` decision marked unparsed. On the final round the
/// policy turns it into a `FinalRoundUnparsed` diagnosis.
fn unparsed(raw: &str, reasoning: &str) -> ConsensusDecision {
    ConsensusDecision {
        panel_synthesis: raw.to_string(),
        parsed: false,
        ..ConsensusDecision::ask(vec![UNPARSED_REPLY_QUESTION.to_string()], reasoning)
    }
}

/// Read a coordinator reply. Every field is optional.
///
/// The action payload is read from `action_content`, falling back to
/// `content` and then to the top level of the reply.
pub fn parse_decision(reply: &Value) -> ConsensusDecision {
    let content = ["action_content", "content"]
        .iter()
        .find_map(|key| reply.get(*key).filter(|v| v.is_object()))
        .unwrap_or(reply);

    let diagnosis = extract::text_at(content, "diagnosis");

    ConsensusDecision {
        action: ConsensusAction::from_raw(&extract::text_at(reply, "consensus_action")),
        questions: extract::string_list(content.get("questions"), "question"),
        tests: test_names(content.get("tests")),
        diagnosis: (!diagnosis.is_empty()).then_some(diagnosis),
        confidence: extract::number_at(content, "confidence").map(extract::normalize_probability),
        reasoning: extract::text_at(reply, "reasoning"),
        panel_synthesis: extract::text_at(reply, "panel_synthesis"),
        confidence_assessment: extract::text_at(reply, "confidence_assessment"),
        parsed: true,
        forced: None,
    }
}

/// Tests may be plain names or objects; an object without a name is still
/// ordered, under a placeholder name.
fn test_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(_) => {
                    let name = extract::text_at(item, "test_name");
                    Some(if name.is_empty() { UNNAMED_TEST.to_string() } else { name })
                }
                _ => None,
            })
            .collect(),
        other => extract::string_list(other, "test_name"),
    }
}

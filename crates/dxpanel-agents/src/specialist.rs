//! The five panel roles.
//!
//! Every role behaves the same way and differs only in its prompt, the case
//! state it is shown, and the shape it falls back to when the model's reply
//! holds no JSON object. `Specialist` composes those three pieces from a
//! static `RoleProfile` rather than repeating the call-parse-fallback logic
//! five times.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use dxpanel_contracts::trace::AgentRole;
use dxpanel_core::{
    config::DEFAULT_TEMPERATURE,
    extract,
    session::CaseExecutionSession,
    traits::{PanelContext, PanelMember, ReasoningService},
};

use crate::prompts;

/// Builds the user message for one role.
type MessageBuilder = fn(&PanelContext<'_>, &CaseExecutionSession) -> String;

/// Builds the fallback object from the raw (unparseable) reply.
type FallbackBuilder = fn(&str) -> Value;

/// The static description of one panel role.
pub struct RoleProfile {
    pub role: AgentRole,
    pub system_prompt: &'static str,
    message: MessageBuilder,
    fallback: FallbackBuilder,
}

impl RoleProfile {
    /// The profile for `role`, or `None` for the coordinator, which is not
    /// a panel member.
    pub fn for_role(role: AgentRole) -> Option<&'static RoleProfile> {
        match role {
            AgentRole::Hypothesis => Some(&HYPOTHESIS),
            AgentRole::TestChooser => Some(&TEST_CHOOSER),
            AgentRole::Challenger => Some(&CHALLENGER),
            AgentRole::Stewardship => Some(&STEWARDSHIP),
            AgentRole::Checklist => Some(&CHECKLIST),
            AgentRole::Coordinator => None,
        }
    }

    pub fn user_message(&self, ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> String {
        (self.message)(ctx, session)
    }

    pub fn fallback(&self, raw: &str) -> Value {
        (self.fallback)(raw)
    }
}

// ── Profiles ──────────────────────────────────────────────────────────────────

static HYPOTHESIS: RoleProfile = RoleProfile {
    role: AgentRole::Hypothesis,
    system_prompt: prompts::HYPOTHESIS_SYSTEM,
    message: prompts::hypothesis_message,
    fallback: hypothesis_fallback,
};

static TEST_CHOOSER: RoleProfile = RoleProfile {
    role: AgentRole::TestChooser,
    system_prompt: prompts::TEST_CHOOSER_SYSTEM,
    message: prompts::test_chooser_message,
    fallback: test_chooser_fallback,
};

static CHALLENGER: RoleProfile = RoleProfile {
    role: AgentRole::Challenger,
    system_prompt: prompts::CHALLENGER_SYSTEM,
    message: prompts::challenger_message,
    fallback: challenger_fallback,
};

static STEWARDSHIP: RoleProfile = RoleProfile {
    role: AgentRole::Stewardship,
    system_prompt: prompts::STEWARDSHIP_SYSTEM,
    message: prompts::stewardship_message,
    fallback: stewardship_fallback,
};

static CHECKLIST: RoleProfile = RoleProfile {
    role: AgentRole::Checklist,
    system_prompt: prompts::CHECKLIST_SYSTEM,
    message: prompts::checklist_message,
    fallback: checklist_fallback,
};

// ── Fallback shapes ───────────────────────────────────────────────────────────

fn hypothesis_fallback(raw: &str) -> Value {
    json!({
        "hypotheses": [],
        "bayesian_updates": raw,
        "confidence_level": "low",
    })
}

fn test_chooser_fallback(raw: &str) -> Value {
    json!({
        "recommended_tests": [],
        "reasoning": raw,
    })
}

fn challenger_fallback(raw: &str) -> Value {
    json!({
        "challenges": [],
        "falsifying_tests": [],
        "overlooked_possibilities": [],
        "cognitive_bias_warnings": raw,
    })
}

fn stewardship_fallback(raw: &str) -> Value {
    json!({
        "cost_analysis": [],
        "budget_recommendation": "continue",
        "stewardship_notes": raw,
    })
}

fn checklist_fallback(raw: &str) -> Value {
    json!({
        "missing_info": [],
        "systematic_gaps": [],
        "validation_results": [],
        "quality_concerns": [],
        "recommended_next_steps": [],
        "completeness_assessment": raw,
        "quality_score": 5,
    })
}

// ── Specialist ────────────────────────────────────────────────────────────────

/// One panel member backed by a reasoning service.
///
/// A call never fails from the orchestrator's point of view. A reasoning
/// error becomes the text `"Error in reasoning call: <err>"`, which is then
/// handled like any other unparseable reply: recorded as the agent message
/// and answered with the role's fallback object.
pub struct Specialist {
    profile: &'static RoleProfile,
    reasoning: Arc<dyn ReasoningService>,
    temperature: f32,
}

impl Specialist {
    fn with_profile(profile: &'static RoleProfile, reasoning: Arc<dyn ReasoningService>) -> Self {
        Self {
            profile,
            reasoning,
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    /// A specialist for any panel role. `None` for `AgentRole::Coordinator`.
    pub fn for_role(role: AgentRole, reasoning: Arc<dyn ReasoningService>) -> Option<Self> {
        RoleProfile::for_role(role).map(|profile| Self::with_profile(profile, reasoning))
    }

    pub fn hypothesis(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self::with_profile(&HYPOTHESIS, reasoning)
    }

    pub fn test_chooser(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self::with_profile(&TEST_CHOOSER, reasoning)
    }

    pub fn challenger(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self::with_profile(&CHALLENGER, reasoning)
    }

    pub fn stewardship(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self::with_profile(&STEWARDSHIP, reasoning)
    }

    pub fn checklist(reasoning: Arc<dyn ReasoningService>) -> Self {
        Self::with_profile(&CHECKLIST, reasoning)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl PanelMember for Specialist {
    fn role(&self) -> AgentRole {
        self.profile.role
    }

    async fn contribute(&self, ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> Value {
        let role = self.profile.role;
        let user_message = self.profile.user_message(ctx, session);

        let raw = match self
            .reasoning
            .complete(self.profile.system_prompt, &user_message, self.temperature)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    case_id = %session.case_id(),
                    round = session.current_round(),
                    role = %role,
                    error = %e,
                    "reasoning call failed"
                );
                format!("Error in reasoning call: {}", e)
            }
        };

        let parsed = extract::extract_json_object(&raw);
        session.add_agent_message(role, raw.as_str(), parsed.clone());

        match parsed {
            Some(value) => value,
            None => {
                debug!(
                    case_id = %session.case_id(),
                    round = session.current_round(),
                    role = %role,
                    "no JSON object in reply; using fallback"
                );
                self.profile.fallback(&raw)
            }
        }
    }
}

//! Agent messages, execution traces, and session summaries.
//!
//! Messages record what each agent said; traces record what the session
//! did. Both are append-only. Only traces carry cost.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::ActionType;

/// The roles that contribute to a deliberation.
///
/// Serialized under their display names ("Dr. Hypothesis", ...), which are
/// also what reports and traces show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentRole {
    #[serde(rename = "Dr. Hypothesis")]
    Hypothesis,
    #[serde(rename = "Dr. Test-Chooser")]
    TestChooser,
    #[serde(rename = "Dr. Challenger")]
    Challenger,
    #[serde(rename = "Dr. Stewardship")]
    Stewardship,
    #[serde(rename = "Dr. Checklist")]
    Checklist,
    #[serde(rename = "Consensus Coordinator")]
    Coordinator,
}

impl AgentRole {
    /// The five panel members in deliberation order.
    pub const PANEL: [AgentRole; 5] = [
        AgentRole::Hypothesis,
        AgentRole::TestChooser,
        AgentRole::Challenger,
        AgentRole::Stewardship,
        AgentRole::Checklist,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            AgentRole::Hypothesis => "Dr. Hypothesis",
            AgentRole::TestChooser => "Dr. Test-Chooser",
            AgentRole::Challenger => "Dr. Challenger",
            AgentRole::Stewardship => "Dr. Stewardship",
            AgentRole::Checklist => "Dr. Checklist",
            AgentRole::Coordinator => "Consensus Coordinator",
        }
    }

    /// The message type this role always emits.
    pub fn message_type(&self) -> MessageType {
        match self {
            AgentRole::Hypothesis => MessageType::HypothesisUpdate,
            AgentRole::TestChooser => MessageType::TestRecommendation,
            AgentRole::Challenger => MessageType::Challenge,
            AgentRole::Stewardship => MessageType::StewardshipReview,
            AgentRole::Checklist => MessageType::QualityControl,
            AgentRole::Coordinator => MessageType::ConsensusDecision,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    HypothesisUpdate,
    TestRecommendation,
    Challenge,
    StewardshipReview,
    QualityControl,
    ConsensusDecision,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::HypothesisUpdate => "hypothesis_update",
            MessageType::TestRecommendation => "test_recommendation",
            MessageType::Challenge => "challenge",
            MessageType::StewardshipReview => "stewardship_review",
            MessageType::QualityControl => "quality_control",
            MessageType::ConsensusDecision => "consensus_decision",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One agent invocation's output, recorded whether or not it parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub agent_role: AgentRole,
    /// The round the message was produced in (0 for none).
    pub round_number: u32,
    pub timestamp: DateTime<Utc>,
    pub message_type: MessageType,
    /// Raw response text, or the reasoning error string.
    pub content: String,
    /// The parsed JSON object, when there was one.
    pub structured_data: Option<serde_json::Value>,
}

/// One action the session executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub case_id: String,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub round_number: u32,
    pub action_type: ActionType,
    /// Who the action is attributed to ("Consensus Coordinator", "System", ...).
    pub actor: String,
    pub content: String,
    pub structured_data: serde_json::Value,
    /// Dollars this action added to the session total.
    pub cost_impact: Option<f64>,
}

/// Point-in-time snapshot of a session, as returned by summary queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub case_id: String,
    pub session_id: String,
    pub final_diagnosis: Option<String>,
    pub confidence_score: Option<f64>,
    pub total_cost: f64,
    pub rounds_completed: u32,
    pub created_at: DateTime<Utc>,
    pub trace_count: usize,
    pub agent_message_count: usize,
}

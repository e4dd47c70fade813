//! Consensus actions, execution modes, and case requests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DxError;

/// The three actions a round can end with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    AskQuestions,
    OrderTests,
    MakeDiagnosis,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::AskQuestions => "ask_questions",
            ActionType::OrderTests => "order_tests",
            ActionType::MakeDiagnosis => "make_diagnosis",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The action named in a coordinator response.
///
/// Model output may name anything at all; values outside the three known
/// actions are kept verbatim in `Unrecognized` so they can be traced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusAction {
    AskQuestions,
    OrderTests,
    MakeDiagnosis,
    Unrecognized(String),
}

impl ConsensusAction {
    /// Interpret a raw `consensus_action` string. Matching is exact after
    /// trimming, mirroring the wire values of `ActionType`.
    pub fn from_raw(raw: &str) -> Self {
        match raw.trim() {
            "ask_questions" => ConsensusAction::AskQuestions,
            "order_tests" => ConsensusAction::OrderTests,
            "make_diagnosis" => ConsensusAction::MakeDiagnosis,
            other => ConsensusAction::Unrecognized(other.to_string()),
        }
    }

    /// The known action, or `None` for unrecognized values.
    pub fn action_type(&self) -> Option<ActionType> {
        match self {
            ConsensusAction::AskQuestions => Some(ActionType::AskQuestions),
            ConsensusAction::OrderTests => Some(ActionType::OrderTests),
            ConsensusAction::MakeDiagnosis => Some(ActionType::MakeDiagnosis),
            ConsensusAction::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for ConsensusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusAction::AskQuestions => f.write_str(ActionType::AskQuestions.as_str()),
            ConsensusAction::OrderTests => f.write_str(ActionType::OrderTests.as_str()),
            ConsensusAction::MakeDiagnosis => f.write_str(ActionType::MakeDiagnosis.as_str()),
            ConsensusAction::Unrecognized(raw) => write!(f, "unrecognized({})", raw),
        }
    }
}

/// Why a diagnosis was produced mechanically instead of by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcedReason {
    /// Final round reached and the coordinator chose something else.
    FinalRound,
    /// Final round reached and the coordinator response could not be parsed.
    FinalRoundUnparsed,
    /// Cumulative cost reached the budget before the round started.
    BudgetExhausted,
    /// `instant` or `questions_only` mode concluded after one hypothesis pass.
    SinglePass,
}

/// The single action synthesized from one round of panel deliberation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusDecision {
    pub action: ConsensusAction,

    /// Questions to put to the patient (`ask_questions`).
    #[serde(default)]
    pub questions: Vec<String>,

    /// Test names to order (`order_tests`).
    #[serde(default)]
    pub tests: Vec<String>,

    /// Diagnosis text (`make_diagnosis`).
    #[serde(default)]
    pub diagnosis: Option<String>,

    /// Confidence attached to the diagnosis.
    #[serde(default)]
    pub confidence: Option<f64>,

    #[serde(default)]
    pub reasoning: String,

    #[serde(default)]
    pub panel_synthesis: String,

    #[serde(default)]
    pub confidence_assessment: String,

    /// False when the coordinator response held no usable JSON object.
    pub parsed: bool,

    /// Set when the decision was forced rather than chosen.
    #[serde(default)]
    pub forced: Option<ForcedReason>,
}

impl ConsensusDecision {
    /// An `ask_questions` decision with the given questions.
    pub fn ask(questions: Vec<String>, reasoning: impl Into<String>) -> Self {
        Self {
            action: ConsensusAction::AskQuestions,
            questions,
            tests: Vec::new(),
            diagnosis: None,
            confidence: None,
            reasoning: reasoning.into(),
            panel_synthesis: String::new(),
            confidence_assessment: String::new(),
            parsed: true,
            forced: None,
        }
    }

    /// An `order_tests` decision for the given test names.
    pub fn order(tests: Vec<String>, reasoning: impl Into<String>) -> Self {
        Self {
            action: ConsensusAction::OrderTests,
            tests,
            questions: Vec::new(),
            ..Self::ask(Vec::new(), reasoning)
        }
    }

    /// A `make_diagnosis` decision.
    pub fn diagnose(diagnosis: impl Into<String>, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            action: ConsensusAction::MakeDiagnosis,
            diagnosis: Some(diagnosis.into()),
            confidence: Some(confidence),
            ..Self::ask(Vec::new(), reasoning)
        }
    }
}

/// How `run_case` drives a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// One hypothesis pass on the initial case, then conclude.
    Instant,
    /// Three fixed history questions, one hypothesis pass, then conclude.
    QuestionsOnly,
    /// The full round loop.
    #[default]
    Unconstrained,
    /// The full round loop, named for callers that always pass a budget.
    Budgeted,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Instant => "instant",
            ExecutionMode::QuestionsOnly => "questions_only",
            ExecutionMode::Unconstrained => "unconstrained",
            ExecutionMode::Budgeted => "budgeted",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionMode {
    type Err = DxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" => Ok(ExecutionMode::Instant),
            "questions_only" | "questions-only" => Ok(ExecutionMode::QuestionsOnly),
            "unconstrained" => Ok(ExecutionMode::Unconstrained),
            "budgeted" => Ok(ExecutionMode::Budgeted),
            other => Err(DxError::InvalidRequest {
                reason: format!("unknown execution mode '{}'", other),
            }),
        }
    }
}

/// Default round ceiling for a case.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Everything a caller supplies to start a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRequest {
    /// Caller-chosen case identifier. A UUID is generated when absent.
    #[serde(default)]
    pub case_id: Option<String>,

    /// Free-text clinical vignette.
    pub case_info: String,

    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default)]
    pub budget_limit: Option<f64>,

    #[serde(default)]
    pub mode: ExecutionMode,
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

impl CaseRequest {
    /// A request with default rounds, no budget, and the full loop.
    pub fn new(case_info: impl Into<String>) -> Self {
        Self {
            case_id: None,
            case_info: case_info.into(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            budget_limit: None,
            mode: ExecutionMode::default(),
        }
    }

    pub fn with_case_id(mut self, case_id: impl Into<String>) -> Self {
        self.case_id = Some(case_id.into());
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_budget(mut self, budget_limit: f64) -> Self {
        self.budget_limit = Some(budget_limit);
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }
}

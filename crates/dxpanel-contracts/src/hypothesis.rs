//! Differential diagnosis and test recommendation types.
//!
//! Both are rebuilt every round from free-text model output, so every field
//! has a serde default. A hypothesis set from round N fully replaces the set
//! from round N-1; nothing here is merged.

use serde::{Deserialize, Serialize};

/// One candidate condition in the working differential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticHypothesis {
    /// The condition being proposed, e.g. "Acute myocardial infarction".
    #[serde(default)]
    pub condition: String,

    /// Posterior probability in `[0.0, 1.0]`.
    #[serde(default)]
    pub probability: f64,

    /// Free-text justification from the Hypothesis agent.
    #[serde(default)]
    pub reasoning: String,

    #[serde(default)]
    pub supporting_evidence: Vec<String>,

    #[serde(default)]
    pub contradictory_evidence: Vec<String>,
}

impl DiagnosticHypothesis {
    /// Build a hypothesis with no evidence lists.
    pub fn new(condition: impl Into<String>, probability: f64, reasoning: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            probability,
            reasoning: reasoning.into(),
            supporting_evidence: Vec::new(),
            contradictory_evidence: Vec::new(),
        }
    }
}

/// A test proposed by the Test-Chooser for the current round.
///
/// Transient: produced and consumed within one round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecommendation {
    pub test_name: String,

    #[serde(default)]
    pub rationale: String,

    /// Dollar estimate, when the model or the cost model supplied one.
    #[serde(default)]
    pub estimated_cost: Option<f64>,

    /// 1 (highest) to 3 (lowest).
    #[serde(default = "default_priority")]
    pub priority: u8,

    #[serde(default)]
    pub discriminative_value: String,
}

fn default_priority() -> u8 {
    1
}

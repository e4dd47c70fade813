//! Forced-diagnosis policy.
//!
//! Every path that concludes a case without the panel choosing
//! `make_diagnosis` goes through `forced_diagnosis`: the final-round rule,
//! an unparseable final-round response, an exhausted budget, and the two
//! single-pass modes. The top hypothesis wins when there is one; otherwise
//! each reason has its own sentinel text and confidence.

use dxpanel_contracts::{
    action::{ConsensusAction, ConsensusDecision, ForcedReason},
    hypothesis::DiagnosticHypothesis,
};

/// A diagnosis produced by policy rather than by the panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ForcedDiagnosis {
    pub diagnosis: String,
    pub confidence: f64,
    pub reason: ForcedReason,
}

/// Sentinel diagnosis text and confidence used when no hypothesis exists.
pub fn sentinel(reason: ForcedReason) -> (&'static str, f64) {
    match reason {
        ForcedReason::FinalRound => (
            "Unable to determine specific diagnosis based on available information",
            0.3,
        ),
        ForcedReason::FinalRoundUnparsed => (
            "Unable to determine specific diagnosis - insufficient information",
            0.2,
        ),
        ForcedReason::BudgetExhausted => ("Insufficient data - budget limit reached", 0.3),
        ForcedReason::SinglePass => ("Insufficient information for diagnosis", 0.1),
    }
}

/// Pick the diagnosis to force.
///
/// `hypotheses` must already be sorted most-probable first; the first entry
/// with a non-empty condition is used.
pub fn forced_diagnosis(hypotheses: &[DiagnosticHypothesis], reason: ForcedReason) -> ForcedDiagnosis {
    match hypotheses.iter().find(|h| !h.condition.trim().is_empty()) {
        Some(top) => ForcedDiagnosis {
            diagnosis: top.condition.clone(),
            confidence: top.probability,
            reason,
        },
        None => {
            let (text, confidence) = sentinel(reason);
            ForcedDiagnosis {
                diagnosis: text.to_string(),
                confidence,
                reason,
            }
        }
    }
}

/// True when `round` is the last one the case may run.
pub fn is_final_round(round: u32, max_rounds: u32) -> bool {
    round >= max_rounds
}

/// Apply the final-round rule to a decision.
///
/// Outside the final round, or when the decision already diagnoses, it is
/// returned untouched. Otherwise it is replaced by a forced diagnosis whose
/// reasoning records what the coordinator had asked for.
pub fn enforce_final_round(
    decision: ConsensusDecision,
    hypotheses: &[DiagnosticHypothesis],
    round: u32,
    max_rounds: u32,
) -> ConsensusDecision {
    if !is_final_round(round, max_rounds) || decision.action == ConsensusAction::MakeDiagnosis {
        return decision;
    }

    let reason = if decision.parsed {
        ForcedReason::FinalRound
    } else {
        ForcedReason::FinalRoundUnparsed
    };
    let forced = forced_diagnosis(hypotheses, reason);

    let reasoning = format!(
        "FINAL ROUND {}/{}: diagnosis forced. Original consensus action was '{}'. {}",
        round, max_rounds, decision.action, decision.reasoning
    );

    ConsensusDecision {
        action: ConsensusAction::MakeDiagnosis,
        questions: Vec::new(),
        tests: Vec::new(),
        diagnosis: Some(forced.diagnosis),
        confidence: Some(forced.confidence),
        reasoning: reasoning.trim_end().to_string(),
        forced: Some(reason),
        ..decision
    }
}

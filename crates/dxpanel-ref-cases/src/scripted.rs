//! Offline reasoning service.
//!
//! `ScriptedReasoning` answers every panel and coordinator prompt from the
//! sample case scripts, so the engine can run end to end without
//! credentials. It is stateless: the stage of a case is read from the
//! findings rendered into the prompt.
//!
//! | Findings in the prompt      | Stage    | Coordinator action |
//! |-----------------------------|----------|--------------------|
//! | none                        | initial  | ask questions      |
//! | patient answers only        | history  | order tests        |
//! | simulated test results      | results  | make diagnosis     |
//!
//! A case info that matches no sample runs a generic script.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use dxpanel_contracts::{error::DxResult, trace::AgentRole};
use dxpanel_core::traits::ReasoningService;

use crate::cases::{SampleCase, ScriptedHypothesis, SAMPLE_CASES};

/// Marker the simulated gatekeeper puts in every patient answer.
const ANSWER_MARKER: &str = "[Simulated patient response]";
/// Marker the simulated gatekeeper puts in every test result.
const RESULT_MARKER: &str = "[Simulated result";

static GENERIC_CASE: SampleCase = SampleCase {
    id: "generic",
    title: "Undifferentiated presentation",
    case_info: "",
    differential: &[
        ScriptedHypothesis {
            condition: "Viral syndrome",
            probabilities: [0.4, 0.55, 0.86],
            reasoning: "Most common cause of a nonspecific acute presentation",
        },
        ScriptedHypothesis {
            condition: "Bacterial infection",
            probabilities: [0.3, 0.25, 0.1],
            reasoning: "Cannot be excluded without laboratory work",
        },
        ScriptedHypothesis {
            condition: "Metabolic derangement",
            probabilities: [0.2, 0.15, 0.04],
            reasoning: "Electrolyte or glucose abnormalities can present nonspecifically",
        },
    ],
    questions: &["When did the symptoms start, and have they changed since?"],
    tests: &["CBC", "CMP", "CRP"],
    challenge: "A generic label may hide a specific diagnosis; keep the differential open.",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Initial,
    History,
    Results,
}

impl Stage {
    fn of(user_message: &str) -> Self {
        if user_message.contains(RESULT_MARKER) {
            Stage::Results
        } else if user_message.contains(ANSWER_MARKER) {
            Stage::History
        } else {
            Stage::Initial
        }
    }

    fn index(self) -> usize {
        match self {
            Stage::Initial => 0,
            Stage::History => 1,
            Stage::Results => 2,
        }
    }
}

/// Deterministic `ReasoningService` driven by the sample case scripts.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptedReasoning;

impl ScriptedReasoning {
    pub fn new() -> Self {
        Self
    }

    fn case_for(user_message: &str) -> &'static SampleCase {
        SAMPLE_CASES
            .iter()
            .find(|c| user_message.contains(c.case_info))
            .unwrap_or(&GENERIC_CASE)
    }

    fn role_for(system_prompt: &str) -> AgentRole {
        AgentRole::PANEL
            .into_iter()
            .find(|role| system_prompt.starts_with(&format!("You are {}", role.display_name())))
            .unwrap_or(AgentRole::Coordinator)
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(&self, system_prompt: &str, user_message: &str, _temperature: f32) -> DxResult<String> {
        let case = Self::case_for(user_message);
        let role = Self::role_for(system_prompt);
        let stage = Stage::of(user_message);
        debug!(case = case.id, role = %role, stage = ?stage, "scripted reply");

        let reply = match role {
            AgentRole::Hypothesis => hypothesis_reply(case, stage),
            AgentRole::TestChooser => test_chooser_reply(case),
            AgentRole::Challenger => challenger_reply(case),
            AgentRole::Stewardship => stewardship_reply(case),
            AgentRole::Checklist => {
                // Checklist answers in prose around a fenced block, as models often do.
                return Ok(format!(
                    "Quality review follows.\n```json\n{}\n```\nEnd of review.",
                    serde_json::to_string_pretty(&checklist_reply(stage)).unwrap_or_default()
                ));
            }
            AgentRole::Coordinator => coordinator_reply(case, stage),
        };
        Ok(reply.to_string())
    }
}

// ── Replies ───────────────────────────────────────────────────────────────────

fn hypothesis_reply(case: &SampleCase, stage: Stage) -> Value {
    let hypotheses: Vec<Value> = case
        .differential
        .iter()
        .map(|h| {
            json!({
                "condition": h.condition,
                "probability": h.probabilities[stage.index()],
                "reasoning": h.reasoning,
            })
        })
        .collect();
    let confidence = match stage {
        Stage::Initial => "low",
        Stage::History => "medium",
        Stage::Results => "high",
    };
    json!({
        "hypotheses": hypotheses,
        "bayesian_updates": format!("Differential revised at the {:?} stage", stage).to_lowercase(),
        "confidence_level": confidence,
    })
}

fn test_chooser_reply(case: &SampleCase) -> Value {
    let tests: Vec<Value> = case
        .tests
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "test_name": name,
                "rationale": format!("Separates {} from the alternatives", case.differential[0].condition),
                "priority": i + 1,
            })
        })
        .collect();
    json!({ "recommended_tests": tests, "reasoning": "Highest-yield tests first" })
}

fn challenger_reply(case: &SampleCase) -> Value {
    let overlooked: Vec<&str> = case.differential.iter().skip(1).map(|h| h.condition).collect();
    json!({
        "challenges": [{
            "target_hypothesis": case.differential[0].condition,
            "challenge_type": "anchoring bias",
            "reasoning": case.challenge,
        }],
        "falsifying_tests": case.tests.first().copied().into_iter().collect::<Vec<_>>(),
        "overlooked_possibilities": overlooked,
        "cognitive_bias_warnings": case.challenge,
    })
}

fn stewardship_reply(case: &SampleCase) -> Value {
    let analysis: Vec<Value> = case
        .tests
        .iter()
        .map(|name| json!({ "test_name": name, "approval_status": "approved" }))
        .collect();
    json!({
        "cost_analysis": analysis,
        "budget_recommendation": "continue",
        "stewardship_notes": "Start with the least expensive discriminating tests.",
    })
}

fn checklist_reply(stage: Stage) -> Value {
    let missing: Vec<&str> = match stage {
        Stage::Initial => vec!["focused history", "examination findings"],
        Stage::History => vec!["laboratory confirmation"],
        Stage::Results => vec![],
    };
    json!({
        "missing_info": missing,
        "systematic_gaps": [],
        "quality_concerns": [],
        "recommended_next_steps": [],
        "completeness_assessment": "Workup is proceeding systematically",
        "quality_score": 7 + stage.index(),
    })
}

fn coordinator_reply(case: &SampleCase, stage: Stage) -> Value {
    match stage {
        Stage::Initial => json!({
            "consensus_action": "ask_questions",
            "action_content": { "questions": case.questions },
            "reasoning": "History will sharpen the differential before any spend on tests",
        }),
        Stage::History => json!({
            "consensus_action": "order_tests",
            "action_content": { "tests": case.tests },
            "reasoning": "These tests discriminate between the leading hypotheses",
        }),
        Stage::Results => {
            let top = &case.differential[0];
            json!({
                "consensus_action": "make_diagnosis",
                "action_content": {
                    "diagnosis": top.condition,
                    "confidence": top.probabilities[2],
                },
                "reasoning": format!("Findings support {}: {}", top.condition, top.reasoning),
                "panel_synthesis": "All panel members concur",
                "confidence_assessment": "High",
            })
        }
    }
}

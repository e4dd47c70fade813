//! Prompt text for every panel role and the coordinator.
//!
//! System prompts state the role and the exact JSON shape expected back.
//! User messages render the case state the role needs, nothing more: the
//! Test-Chooser sees only the top three hypotheses, Stewardship sees the
//! proposed tests with their estimated costs, and so on.

use dxpanel_contracts::hypothesis::{DiagnosticHypothesis, TestRecommendation};
use dxpanel_core::{
    session::CaseExecutionSession,
    traits::{PanelContext, PanelContributions},
};

/// Number of hypotheses shown to roles that only need the leaders.
const LEADING: usize = 3;

// ── System prompts ────────────────────────────────────────────────────────────

pub const HYPOTHESIS_SYSTEM: &str = r#"You are Dr. Hypothesis, the panel member who owns the differential diagnosis.

Responsibilities:
1. Keep a differential of the three most likely conditions, ranked by probability.
2. Revise the probabilities as each new finding arrives, reasoning in a Bayesian way.
3. Explain every revision.
4. Keep rare conditions in view when the presentation supports them.

Reply with a single JSON object:
{
    "hypotheses": [
        {
            "condition": "name of the condition",
            "probability": 0.00,
            "reasoning": "why this probability",
            "supporting_evidence": ["finding"],
            "contradictory_evidence": ["finding"]
        }
    ],
    "bayesian_updates": "what moved and why",
    "confidence_level": "low | medium | high"
}"#;

pub const TEST_CHOOSER_SYSTEM: &str = r#"You are Dr. Test-Chooser, the panel member who selects diagnostic tests.

Responsibilities:
1. Propose at most three tests this round that best separate the leading hypotheses.
2. Prefer tests with the highest diagnostic yield.
3. Weigh sensitivity, specificity and cost.
4. Do not propose redundant or low-yield tests.

Reply with a single JSON object:
{
    "recommended_tests": [
        {
            "test_name": "specific test",
            "rationale": "how it separates the hypotheses",
            "priority": 1,
            "discriminative_value": "which conditions it distinguishes",
            "estimated_cost": 0
        }
    ],
    "reasoning": "overall selection strategy"
}"#;

pub const CHALLENGER_SYSTEM: &str = r#"You are Dr. Challenger, the panel member who argues against the current consensus.

Responsibilities:
1. Look for anchoring on the leading hypothesis.
2. Point out findings the leading diagnoses do not explain.
3. Name diagnoses the panel may be missing.
4. Propose tests that could falsify the leading diagnosis.

Reply with a single JSON object:
{
    "challenges": [
        {
            "target_hypothesis": "hypothesis challenged",
            "challenge_type": "anchoring bias | contradictory evidence | alternative explanation",
            "reasoning": "the challenge",
            "alternative_hypothesis": "alternative, if any"
        }
    ],
    "falsifying_tests": ["test"],
    "overlooked_possibilities": ["diagnosis"],
    "cognitive_bias_warnings": "reasoning errors to watch for"
}"#;

pub const STEWARDSHIP_SYSTEM: &str = r#"You are Dr. Stewardship, the panel member responsible for cost-conscious care.

Responsibilities:
1. Review each proposed test for value against its cost.
2. Offer a cheaper test when it answers the same question.
3. Reject expensive tests with low expected yield.
4. Favor a stepwise workup.

Reply with a single JSON object:
{
    "cost_analysis": [
        {
            "test_name": "test reviewed",
            "approval_status": "approved | conditional | rejected",
            "reasoning": "cost-benefit judgement",
            "cheaper_alternative": "alternative, if any",
            "cost_category": "low | moderate | high | very high"
        }
    ],
    "budget_recommendation": "continue | proceed with caution | stop and reassess",
    "stewardship_notes": "overall guidance"
}"#;

pub const CHECKLIST_SYSTEM: &str = r#"You are Dr. Checklist, the panel member responsible for quality control.

Responsibilities:
1. Judge how complete the workup is so far.
2. List critical information that is still missing.
3. Flag inconsistencies or gaps in the panel's reasoning.
4. Check that test names are specific and valid.

Reply with a single JSON object:
{
    "missing_info": ["item"],
    "systematic_gaps": ["gap"],
    "validation_results": ["check and outcome"],
    "quality_concerns": ["concern"],
    "recommended_next_steps": ["step"],
    "completeness_assessment": "overall assessment",
    "quality_score": 5
}"#;

/// The coordinator's system prompt. The final round adds the must-diagnose
/// instruction.
pub fn coordinator_system(final_round: bool) -> String {
    let mut prompt = String::from(
        r#"You are the Consensus Coordinator. You read the contributions of Dr. Hypothesis, Dr. Test-Chooser, Dr. Challenger, Dr. Stewardship and Dr. Checklist and decide the panel's single next action.

Choose exactly one action:
- make_diagnosis: diagnostic confidence is at least 0.85
- order_tests: tests would meaningfully separate the leading hypotheses
- ask_questions: more history or examination would sharpen the differential
"#,
    );

    if final_round {
        prompt.push_str(
            "\nThis is the FINAL ROUND. You must choose make_diagnosis whatever the confidence. \
             Give the most likely diagnosis and say that the final round forced the decision.\n",
        );
    }

    prompt.push_str(
        r#"
Reply with a single JSON object:
{
    "consensus_action": "ask_questions | order_tests | make_diagnosis",
    "action_content": {
        "questions": ["question"],
        "tests": ["test"],
        "diagnosis": "diagnosis",
        "confidence": 0.00
    },
    "reasoning": "why this action",
    "panel_synthesis": "how the panel inputs were weighed",
    "confidence_assessment": "current diagnostic confidence"
}
Fill only the action_content fields that belong to the chosen action."#,
    );
    prompt
}

// ── User messages ─────────────────────────────────────────────────────────────

pub fn hypothesis_message(ctx: &PanelContext<'_>, _session: &CaseExecutionSession) -> String {
    format!(
        "Initial Case: {}\n\nPrevious Findings:\n{}\n\nCurrent Hypotheses:\n{}\n\n\
         Provide the updated differential with probability estimates.",
        ctx.case_info,
        findings(ctx.findings, "No additional findings yet."),
        with_reasoning(ctx.hypotheses, None, "No current hypotheses."),
    )
}

pub fn test_chooser_message(ctx: &PanelContext<'_>, _session: &CaseExecutionSession) -> String {
    format!(
        "Case: {}\n\nCurrent Top Hypotheses:\n{}\n\nPrevious Findings:\n{}\n\n\
         Select the tests that best discriminate between these hypotheses.",
        ctx.case_info,
        brief(ctx.hypotheses, "No hypotheses available."),
        findings(ctx.findings, "No findings yet."),
    )
}

pub fn challenger_message(ctx: &PanelContext<'_>, _session: &CaseExecutionSession) -> String {
    format!(
        "Case: {}\n\nCurrent Leading Hypotheses:\n{}\n\nAccumulated Findings:\n{}\n\n\
         Challenge these hypotheses. What might the panel be missing?",
        ctx.case_info,
        with_reasoning(ctx.hypotheses, Some(LEADING), "No hypotheses to challenge."),
        findings(ctx.findings, "No findings yet."),
    )
}

pub fn stewardship_message(ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> String {
    format!(
        "Case: {}\n\nCurrent Cumulative Cost: ${:.2}\n\nProposed Tests:\n{}\n\nCurrent Hypotheses:\n{}\n\n\
         Review these tests for cost-effectiveness. Are there cheaper alternatives?",
        ctx.case_info,
        session.total_cost(),
        proposed(ctx.proposed_tests),
        brief(ctx.hypotheses, "No hypotheses yet."),
    )
}

pub fn checklist_message(ctx: &PanelContext<'_>, session: &CaseExecutionSession) -> String {
    format!(
        "Case: {}\n\nCurrent Hypotheses:\n{}\n\nAccumulated Findings:\n{}\n\n\
         Current Round: {}\nTotal Cost So Far: ${:.2}\n\n\
         Assess the quality of the current diagnostic approach and identify gaps or concerns.",
        ctx.case_info,
        with_reasoning(ctx.hypotheses, None, "No hypotheses available."),
        findings(ctx.findings, "No additional findings yet."),
        session.current_round(),
        session.total_cost(),
    )
}

pub fn coordinator_message(
    ctx: &PanelContext<'_>,
    contributions: &PanelContributions,
    session: &CaseExecutionSession,
    max_rounds: u32,
    final_round: bool,
) -> String {
    let mut panel = String::new();
    for (role, value) in contributions.by_role() {
        let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        panel.push_str(&format!("=== {} ===\n{}\n\n", role, rendered));
    }

    let round_note = if final_round { " (FINAL ROUND - MUST DIAGNOSE)" } else { "" };
    let closing = if final_round {
        "FINAL ROUND: diagnose now. Take the most probable condition from Dr. Hypothesis and explain \
         the reasoning that supports it, even if confidence is below the usual threshold."
    } else {
        "Choose the most appropriate action and explain it."
    };

    format!(
        "Case: {}\n\nAccumulated Findings:\n{}\n\nCurrent Round: {} of {}{}\nTotal Cost So Far: ${:.2}\n\n\
         Panel Member Contributions:\n\n{}{}",
        ctx.case_info,
        findings(ctx.findings, "No additional findings yet."),
        session.current_round(),
        max_rounds,
        round_note,
        session.total_cost(),
        panel,
        closing,
    )
}

// ── Rendering helpers ─────────────────────────────────────────────────────────

fn findings(findings: &[String], empty: &str) -> String {
    if findings.is_empty() {
        empty.to_string()
    } else {
        findings.join("\n")
    }
}

fn with_reasoning(hypotheses: &[DiagnosticHypothesis], limit: Option<usize>, empty: &str) -> String {
    let shown = &hypotheses[..limit.unwrap_or(hypotheses.len()).min(hypotheses.len())];
    if shown.is_empty() {
        return empty.to_string();
    }
    shown
        .iter()
        .map(|h| format!("- {} ({:.2}): {}", h.condition, h.probability, h.reasoning))
        .collect::<Vec<_>>()
        .join("\n")
}

fn brief(hypotheses: &[DiagnosticHypothesis], empty: &str) -> String {
    if hypotheses.is_empty() {
        return empty.to_string();
    }
    hypotheses
        .iter()
        .take(LEADING)
        .map(|h| format!("- {} ({:.2})", h.condition, h.probability))
        .collect::<Vec<_>>()
        .join("\n")
}

fn proposed(tests: &[TestRecommendation]) -> String {
    if tests.is_empty() {
        return "No tests proposed yet.".to_string();
    }
    tests
        .iter()
        .map(|t| {
            let cost = t
                .estimated_cost
                .map(|c| format!("${:.2}", c))
                .unwrap_or_else(|| "unknown".to_string());
            format!("- {}: {} (Est. cost: {})", t.test_name, t.rationale, cost)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

//! Markdown rendering of a case session.
//!
//! The report is a readable record of one case: a summary table, the
//! initial vignette, then for each round the action taken, the top of the
//! differential, and every panel message, followed by the final diagnosis
//! and a cost ledger. It can be rendered at any point, including while the
//! case is still running.

use dxpanel_contracts::{
    action::ActionType,
    trace::{AgentMessage, AgentRole, ExecutionTrace},
};
use dxpanel_core::{extract, session::CaseExecutionSession};

/// How many hypotheses each round section lists.
const TOP_HYPOTHESES: usize = 3;

/// Render `session` as a Markdown document.
pub fn render_markdown(session: &CaseExecutionSession) -> String {
    let summary = session.summary();
    let traces = session.traces();
    let messages = session.agent_messages();

    let mut out: Vec<String> = Vec::new();

    out.push(format!("# Diagnostic Case Report: {}", summary.case_id));
    out.push(String::new());
    out.push("| Field | Value |".to_string());
    out.push("|---|---|".to_string());
    out.push(format!("| Case ID | {} |", summary.case_id));
    out.push(format!("| Session ID | {} |", summary.session_id));
    out.push(format!("| Mode | {} |", session.mode()));
    out.push(format!(
        "| Final Diagnosis | {} |",
        summary.final_diagnosis.as_deref().unwrap_or("_pending_")
    ));
    out.push(format!(
        "| Confidence | {} |",
        summary
            .confidence_score
            .map(|c| format!("{:.1}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string())
    ));
    out.push(format!("| Total Cost | ${:.2} |", summary.total_cost));
    if let Some(budget) = session.budget_limit() {
        out.push(format!("| Budget | ${:.2} |", budget));
    }
    out.push(format!("| Rounds | {} / {} |", summary.rounds_completed, session.max_rounds()));
    out.push(format!("| Traces | {} |", summary.trace_count));
    out.push(format!("| Agent Messages | {} |", summary.agent_message_count));
    out.push(format!("| Created | {} |", summary.created_at.to_rfc3339()));
    out.push(String::new());

    out.push("## Initial Case".to_string());
    out.push(String::new());
    for line in session.initial_case_info().trim().lines() {
        out.push(format!("> {}", line.trim()));
    }
    out.push(String::new());

    for round in 0..=summary.rounds_completed {
        let round_traces: Vec<&ExecutionTrace> = traces.iter().filter(|t| t.round_number == round).collect();
        let round_messages: Vec<&AgentMessage> = messages.iter().filter(|m| m.round_number == round).collect();
        if round_traces.is_empty() && round_messages.is_empty() {
            continue;
        }
        render_round(&mut out, round, &round_traces, &round_messages);
    }

    out.push("## Final Diagnosis".to_string());
    out.push(String::new());
    match (&summary.final_diagnosis, summary.confidence_score) {
        (Some(diagnosis), confidence) => {
            out.push(format!(
                "**{}** (confidence {:.1}%)",
                diagnosis,
                confidence.unwrap_or(0.0) * 100.0
            ));
            if let Some(terminal) = traces.iter().rev().find(|t| t.action_type == ActionType::MakeDiagnosis) {
                out.push(String::new());
                out.push(format!("Rationale: {}", rationale(terminal)));
            }
        }
        (None, _) => out.push("_No diagnosis has been reached yet._".to_string()),
    }
    out.push(String::new());

    out.push("## Cost Ledger".to_string());
    out.push(String::new());
    out.push("| Round | Action | Actor | Cost |".to_string());
    out.push("|---|---|---|---|".to_string());
    for trace in &traces {
        out.push(format!(
            "| {} | {} | {} | ${:.2} |",
            trace.round_number,
            trace.action_type,
            trace.actor,
            trace.cost_impact.unwrap_or(0.0)
        ));
    }
    out.push(format!("| | | **Total** | **${:.2}** |", summary.total_cost));

    let mut report = out.join("\n");
    report.push('\n');
    report
}

fn render_round(out: &mut Vec<String>, round: u32, traces: &[&ExecutionTrace], messages: &[&AgentMessage]) {
    if round == 0 {
        out.push("## Single-Pass Evaluation".to_string());
    } else {
        out.push(format!("## Round {}", round));
    }
    out.push(String::new());

    if !traces.is_empty() {
        out.push("### Action".to_string());
        out.push(String::new());
        for trace in traces {
            let cost = trace
                .cost_impact
                .map(|c| format!(" (Cost: ${:.2})", c))
                .unwrap_or_default();
            out.push(format!("- **{}** by {}: {}{}", trace.action_type, trace.actor, trace.content, cost));
        }
        out.push(String::new());
    }

    let differential = messages
        .iter()
        .filter(|m| m.agent_role == AgentRole::Hypothesis)
        .filter_map(|m| m.structured_data.as_ref())
        .map(extract::parse_hypotheses)
        .next_back()
        .unwrap_or_default();
    if !differential.is_empty() {
        out.push("### Top Hypotheses".to_string());
        out.push(String::new());
        for (i, h) in differential.iter().take(TOP_HYPOTHESES).enumerate() {
            if h.reasoning.is_empty() {
                out.push(format!("{}. {} ({:.2})", i + 1, h.condition, h.probability));
            } else {
                out.push(format!("{}. {} ({:.2}): {}", i + 1, h.condition, h.probability, h.reasoning));
            }
        }
        out.push(String::new());
    }

    if !messages.is_empty() {
        out.push("### Panel Messages".to_string());
        out.push(String::new());
        for message in messages {
            out.push(format!("#### {} ({})", message.agent_role, message.message_type));
            out.push(String::new());
            out.push("```text".to_string());
            out.push(message.content.trim().to_string());
            out.push("```".to_string());
            out.push(String::new());
        }
    }
}

fn rationale(trace: &ExecutionTrace) -> String {
    let reasoning = extract::text_at(&trace.structured_data, "reasoning");
    if reasoning.is_empty() {
        trace.content.clone()
    } else {
        reasoning
    }
}

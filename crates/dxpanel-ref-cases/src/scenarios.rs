//! Console walkthroughs of the engine on the sample cases.

use std::sync::Arc;

use dxpanel_contracts::{
    action::{CaseRequest, ExecutionMode},
    error::{DxError, DxResult},
};
use dxpanel_core::{orchestrator::DiagnosticOrchestrator, session::CaseExecutionSession};
use dxpanel_cost::{CostEstimator, DEFAULT_HIGH_COST_THRESHOLD};

use crate::cases::{find_case, SampleCase, SAMPLE_CASES};

/// Budget used by the budget walkthrough; small enough that case_003's
/// imaging exhausts it.
pub const DEMO_BUDGET: f64 = 1000.0;

/// Test names priced by the cost walkthrough.
const COST_DEMO_TESTS: [&str; 8] = [
    "CBC",
    "order CBC test",
    "Troponin",
    "CT Chest with Contrast",
    "MRI Abdomen",
    "blood culture panel",
    "Genetic Testing",
    "Xyzzy Quantum Assay",
];

// ── Case runs ─────────────────────────────────────────────────────────────────

/// Run one sample case and print its trace.
pub async fn run_sample(
    orchestrator: &DiagnosticOrchestrator,
    case: &SampleCase,
    mode: ExecutionMode,
    max_rounds: u32,
    budget_limit: Option<f64>,
) -> DxResult<Arc<CaseExecutionSession>> {
    println!("=== {} ({}) | mode: {} ===", case.title, case.id, mode);
    println!();

    let mut request = CaseRequest::new(case.case_info)
        .with_case_id(format!("{}-{}", case.id, mode))
        .with_mode(mode)
        .with_max_rounds(max_rounds);
    if let Some(limit) = budget_limit {
        request = request.with_budget(limit);
    }

    let session = orchestrator.run_case(request).await?;
    print_session(&session);
    Ok(session)
}

/// Print the trace and outcome of a session.
pub fn print_session(session: &CaseExecutionSession) {
    for trace in session.traces() {
        let cost = trace.cost_impact.map(|c| format!(" [${:.2}]", c)).unwrap_or_default();
        println!("  R{} {:<15} {:<22} {}{}", trace.round_number, trace.action_type, trace.actor, trace.content, cost);
    }
    println!();
    println!("  Final diagnosis:  {}", session.final_diagnosis().as_deref().unwrap_or("(none)"));
    println!(
        "  Confidence:       {}",
        session
            .confidence_score()
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("  Total cost:       ${:.2}", session.total_cost());
    println!("  Rounds:           {}", session.current_round());
    println!("  Agent messages:   {}", session.agent_messages().len());
    println!();
}

/// The chest pain case in each of the four execution modes.
pub async fn run_mode_tour(orchestrator: &DiagnosticOrchestrator, max_rounds: u32) -> DxResult<()> {
    let case = sample("case_001")?;
    for mode in [ExecutionMode::Instant, ExecutionMode::QuestionsOnly, ExecutionMode::Unconstrained] {
        run_sample(orchestrator, case, mode, max_rounds, None).await?;
    }
    run_sample(orchestrator, case, ExecutionMode::Budgeted, max_rounds, Some(DEMO_BUDGET)).await?;
    Ok(())
}

/// The pulmonary embolism case under a budget its workup overruns.
pub async fn run_budget_demo(orchestrator: &DiagnosticOrchestrator, max_rounds: u32) -> DxResult<()> {
    run_sample(orchestrator, sample("case_003")?, ExecutionMode::Budgeted, max_rounds, Some(DEMO_BUDGET)).await?;
    Ok(())
}

/// Every sample case, unconstrained.
pub async fn run_all_cases(orchestrator: &DiagnosticOrchestrator, max_rounds: u32) -> DxResult<()> {
    for case in SAMPLE_CASES.iter() {
        run_sample(orchestrator, case, ExecutionMode::Unconstrained, max_rounds, None).await?;
    }
    Ok(())
}

// ── Cost walkthrough ──────────────────────────────────────────────────────────

/// Price a fixed set of test names and show the alternatives for the
/// expensive ones.
pub fn run_cost_demo(estimator: &CostEstimator) {
    println!("=== Cost estimation ===");
    println!();
    for name in COST_DEMO_TESTS {
        let cost = estimator.estimate_test_cost(name);
        println!(
            "  {:<24} ${:>8.2}  {:<9} CPT {}",
            name,
            cost.total_cost(),
            cost.cost_category(),
            cost.cpt_codes().join(", ")
        );
        if estimator.is_high_cost_test(name, DEFAULT_HIGH_COST_THRESHOLD) {
            for alt in estimator.suggest_cheaper_alternatives(name) {
                println!(
                    "      -> {} (saves ${:.2}): {}",
                    alt.alternative, alt.cost_savings, alt.rationale
                );
            }
        }
    }

    let workup = estimator.estimate_multiple_tests(&["CBC", "CMP", "Chest X-ray"]);
    let summary = estimator.calculate_total_cost(&workup, 1);
    println!();
    println!(
        "  Basic workup with one visit: ${:.2} (tests ${:.2}, visits ${:.2})",
        summary.total_cost,
        summary.test_costs,
        summary.physician_visits
    );
    println!();
}

pub fn sample(id: &str) -> DxResult<&'static SampleCase> {
    find_case(id).ok_or_else(|| DxError::InvalidRequest {
        reason: format!("unknown sample case '{}'", id),
    })
}

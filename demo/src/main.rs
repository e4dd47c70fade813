//! DXPANEL Diagnostic Panel Demo CLI
//!
//! Runs the sample cases through the deliberation engine, offline by default
//! or against a live OpenAI-compatible endpoint with `--live`.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- run-case case_003 --mode budgeted --budget 1000 --report case_003.md
//!   cargo run -p demo -- modes
//!   cargo run -p demo -- cost "order CBC test" "MRI Abdomen"
//!   cargo run -p demo -- alternatives "CT Chest with Contrast"

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dxpanel_agents::OpenAiCompatibleService;
use dxpanel_contracts::{
    action::ExecutionMode,
    error::{DxError, DxResult},
};
use dxpanel_core::{config::RunConfig, orchestrator::DiagnosticOrchestrator};
use dxpanel_ref_cases::{runtime, scenarios};
use dxpanel_trace::render_markdown;

// ── CLI definition ────────────────────────────────────────────────────────────

/// DXPANEL: a cost-aware virtual diagnostic panel.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "DXPANEL diagnostic panel demo",
    long_about = "Runs sample clinical cases through a five-member diagnostic panel with\n\
                  consensus synthesis, cost tracking, and budget enforcement."
)]
struct Cli {
    /// TOML run config (rounds, budget, mode, temperature, pricing overrides).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the live reasoning endpoint from AZURE_OPENAI_* instead of the
    /// offline scripts.
    #[arg(long, global = true)]
    live: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every sample case, unconstrained.
    RunAll,
    /// Run one sample case.
    RunCase {
        /// Sample case id (case_001, case_002, case_003).
        #[arg(default_value = "case_001")]
        case_id: String,
        /// instant, questions_only, unconstrained, or budgeted.
        #[arg(long)]
        mode: Option<ExecutionMode>,
        #[arg(long)]
        max_rounds: Option<u32>,
        /// Budget limit in dollars.
        #[arg(long)]
        budget: Option<f64>,
        /// Write a Markdown case report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run the chest pain case in all four execution modes.
    Modes,
    /// Run the pulmonary embolism case under a budget its workup overruns.
    Budget,
    /// Estimate test costs. With no names, prices a fixed sample set.
    Cost {
        tests: Vec<String>,
    },
    /// Suggest cheaper alternatives for a test.
    Alternatives {
        test: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for per-round detail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    match run(cli).await {
        Ok(()) => {
            println!("Done.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> DxResult<()> {
    let config = match &cli.config {
        Some(path) => RunConfig::from_file(path)?,
        None => RunConfig::default(),
    };

    match cli.command {
        Command::RunAll => {
            let orchestrator = orchestrator(&config, cli.live)?;
            scenarios::run_all_cases(&orchestrator, config.max_rounds).await
        }
        Command::RunCase {
            case_id,
            mode,
            max_rounds,
            budget,
            report,
        } => {
            let orchestrator = orchestrator(&config, cli.live)?;
            let case = scenarios::sample(&case_id)?;
            let session = scenarios::run_sample(
                &orchestrator,
                case,
                mode.unwrap_or(config.mode),
                max_rounds.unwrap_or(config.max_rounds),
                budget.or(config.budget_limit),
            )
            .await?;

            if let Some(path) = report {
                std::fs::write(&path, render_markdown(&session)).map_err(|e| DxError::ConfigError {
                    reason: format!("failed to write report '{}': {}", path.display(), e),
                })?;
                println!("Report written to {}", path.display());
            }
            Ok(())
        }
        Command::Modes => {
            let orchestrator = orchestrator(&config, cli.live)?;
            scenarios::run_mode_tour(&orchestrator, config.max_rounds).await
        }
        Command::Budget => {
            let orchestrator = orchestrator(&config, cli.live)?;
            scenarios::run_budget_demo(&orchestrator, config.max_rounds).await
        }
        Command::Cost { tests } => {
            let estimator = runtime::cost_estimator(&config);
            if tests.is_empty() {
                scenarios::run_cost_demo(&estimator);
            } else {
                for cost in estimator.estimate_multiple_tests(tests.as_slice()) {
                    println!(
                        "  {:<28} ${:>8.2}  {}",
                        cost.test_name(),
                        cost.total_cost(),
                        cost.cost_category()
                    );
                }
            }
            Ok(())
        }
        Command::Alternatives { test } => {
            let estimator = runtime::cost_estimator(&config);
            let alternatives = estimator.suggest_cheaper_alternatives(&test);
            if alternatives.is_empty() {
                println!("  No cheaper alternatives known for '{}'.", test);
            }
            for alt in alternatives {
                println!("  {} (saves ${:.2}): {}", alt.alternative, alt.cost_savings, alt.rationale);
            }
            Ok(())
        }
    }
}

fn orchestrator(config: &RunConfig, live: bool) -> DxResult<DiagnosticOrchestrator> {
    if live {
        let service = OpenAiCompatibleService::from_env()?;
        info!(model = %service.config().model, "using live reasoning service");
        Ok(runtime::build_orchestrator(config, Arc::new(service)))
    } else {
        Ok(runtime::offline_orchestrator(config))
    }
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("DXPANEL: Virtual Diagnostic Panel");
    println!("=================================");
    println!();
    println!("Each round:");
    println!("  [1] Budget check: an exhausted budget forces a diagnosis");
    println!("  [2] Panel: Hypothesis, Test-Chooser, Challenger, Stewardship, Checklist");
    println!("  [3] Consensus: ask questions, order tests, or make a diagnosis");
    println!("  [4] Action executed, costs and findings recorded");
    println!("  [5] Final round: a diagnosis is always made");
    println!();
}

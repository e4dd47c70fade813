//! Wiring: build a complete orchestrator from a run config and a reasoning
//! service.

use std::sync::Arc;

use dxpanel_agents::{ConsensusCoordinator, Specialist};
use dxpanel_core::{
    config::RunConfig,
    orchestrator::{DiagnosticOrchestrator, Panel},
    traits::{ReasoningService, SimulatedGatekeeper},
};
use dxpanel_cost::CostEstimator;
use dxpanel_trace::InMemorySessionStore;

use crate::scripted::ScriptedReasoning;

/// The cost estimator described by `config`: built-in prices, plus the
/// override file when one is configured.
pub fn cost_estimator(config: &RunConfig) -> CostEstimator {
    match &config.pricing_overrides {
        Some(path) => CostEstimator::with_overrides_file(path),
        None => CostEstimator::new(),
    }
}

/// The five specialists, all sharing one reasoning service.
pub fn panel(reasoning: &Arc<dyn ReasoningService>, temperature: f32) -> Panel {
    Panel {
        hypothesis: Box::new(Specialist::hypothesis(Arc::clone(reasoning)).with_temperature(temperature)),
        test_chooser: Box::new(Specialist::test_chooser(Arc::clone(reasoning)).with_temperature(temperature)),
        challenger: Box::new(Specialist::challenger(Arc::clone(reasoning)).with_temperature(temperature)),
        stewardship: Box::new(Specialist::stewardship(Arc::clone(reasoning)).with_temperature(temperature)),
        checklist: Box::new(Specialist::checklist(Arc::clone(reasoning)).with_temperature(temperature)),
    }
}

/// A full orchestrator: specialists and coordinator over `reasoning`, the
/// configured cost estimator, simulated gatekeeper, and an in-memory
/// registry with the configured capacity.
pub fn build_orchestrator(config: &RunConfig, reasoning: Arc<dyn ReasoningService>) -> DiagnosticOrchestrator {
    let coordinator = ConsensusCoordinator::new(Arc::clone(&reasoning)).with_temperature(config.temperature);

    DiagnosticOrchestrator::new(
        panel(&reasoning, config.temperature),
        Box::new(coordinator),
        Box::new(cost_estimator(config)),
        Box::new(SimulatedGatekeeper),
        Box::new(InMemorySessionStore::with_capacity(config.session_capacity)),
    )
}

/// An orchestrator that needs no credentials: every reply comes from the
/// sample case scripts.
pub fn offline_orchestrator(config: &RunConfig) -> DiagnosticOrchestrator {
    build_orchestrator(config, Arc::new(ScriptedReasoning::new()))
}

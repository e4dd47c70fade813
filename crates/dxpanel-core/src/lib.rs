//! # dxpanel-core
//!
//! The deliberation engine: traits for every collaborator, the per-case
//! session accumulator, the forced-diagnosis policy, and the round-based
//! `DiagnosticOrchestrator` that ties them together.
//!
//! The orchestrator never talks to a model directly. Panel members and the
//! consensus synthesizer do, behind traits, and they absorb every reasoning
//! failure; the orchestrator only ever sees JSON values and decisions.

pub mod config;
pub mod extract;
pub mod orchestrator;
pub mod policy;
pub mod session;
pub mod traits;

pub use config::RunConfig;
pub use orchestrator::{DiagnosticOrchestrator, Panel};
pub use session::{CaseExecutionSession, SessionWriter};

//! # dxpanel-agents
//!
//! The model-backed collaborators of the deliberation engine:
//!
//! - [`Specialist`]: the five panel roles, one struct configured per role.
//! - [`ConsensusCoordinator`]: synthesizes the panel into one action.
//! - [`OpenAiCompatibleService`]: HTTP `ReasoningService` configured from
//!   the environment.
//!
//! Nothing in this crate lets a reasoning failure escape. A failed call or
//! an unparseable reply is recorded as an agent message and replaced by a
//! well-formed fallback.

pub mod client;
pub mod coordinator;
pub mod prompts;
pub mod specialist;

pub use client::{OpenAiCompatibleService, ReasoningConfig};
pub use coordinator::ConsensusCoordinator;
pub use specialist::Specialist;

// ── Tests ─────────────────────────────────────────────────────────────────────

//! # dxpanel-ref-cases
//!
//! Reference runtime for the DXPANEL engine.
//!
//! - `cases`: three fictional clinical vignettes with their scripts.
//! - `scripted`: an offline `ReasoningService` that plays those scripts.
//! - `runtime`: builds a complete orchestrator from a `RunConfig`.
//! - `scenarios`: console walkthroughs used by the demo CLI.
//!
//! No external API calls are made unless a live reasoning service is passed
//! to `runtime::build_orchestrator`.

pub mod cases;
pub mod runtime;
pub mod scenarios;
pub mod scripted;

// ── Tests ─────────────────────────────────────────────────────────────────────

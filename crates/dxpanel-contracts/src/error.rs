//! Runtime error types for the DXPANEL deliberation engine.
//!
//! Only a handful of conditions are errors at all. Reasoning failures and
//! unparseable agent output are recovered at the agent boundary and never
//! reach the caller of `run_case`; what remains is configuration and request
//! validation.

use thiserror::Error;

/// The unified error type for the DXPANEL runtime.
#[derive(Debug, Error)]
pub enum DxError {
    /// The reasoning service could not produce a completion.
    ///
    /// Agents absorb this and substitute an error string for the response
    /// text, so it never aborts a case.
    #[error("reasoning call failed: {reason}")]
    Reasoning { reason: String },

    /// A required configuration value is missing or invalid.
    ///
    /// Raised at construction time. Fatal: no case can run without it.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// A `run_case` request was rejected before any round started.
    #[error("invalid case request: {reason}")]
    InvalidRequest { reason: String },

    /// Pricing override data could not be read or parsed.
    ///
    /// The cost estimator logs this and keeps its built-in catalog.
    #[error("pricing data error: {reason}")]
    PricingData { reason: String },
}

/// Convenience alias used throughout the DXPANEL crates.
pub type DxResult<T> = Result<T, DxError>;

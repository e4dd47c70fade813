//! TOML run configuration.
//!
//! Every field has a default, so an empty document is a valid config:
//!
//! ```toml
//! max_rounds = 6
//! budget_limit = 2500.0
//! mode = "budgeted"
//! temperature = 0.7
//! pricing_overrides = "config/diagnostic_pricing.json"
//! session_capacity = 500
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dxpanel_contracts::{
    action::{CaseRequest, ExecutionMode, DEFAULT_MAX_ROUNDS},
    error::{DxError, DxResult},
};

/// Sampling temperature used for every agent call unless configured.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Run-level settings shared by every case an orchestrator executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u32,

    #[serde(default)]
    pub budget_limit: Option<f64>,

    #[serde(default)]
    pub mode: ExecutionMode,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// JSON pricing file merged over the built-in catalog.
    #[serde(default)]
    pub pricing_overrides: Option<PathBuf>,

    /// Maximum sessions kept in the registry. Unbounded when absent.
    #[serde(default)]
    pub session_capacity: Option<usize>,
}

fn default_max_rounds() -> u32 {
    DEFAULT_MAX_ROUNDS
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            budget_limit: None,
            mode: ExecutionMode::default(),
            temperature: DEFAULT_TEMPERATURE,
            pricing_overrides: None,
            session_capacity: None,
        }
    }
}

impl RunConfig {
    /// Parse `s` as TOML and validate it.
    ///
    /// Returns `DxError::ConfigError` if the TOML is malformed, names an
    /// unknown field, or holds an out-of-range value.
    pub fn from_toml_str(s: &str) -> DxResult<Self> {
        let config: RunConfig = toml::from_str(s).map_err(|e| DxError::ConfigError {
            reason: format!("failed to parse run config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as a run config.
    pub fn from_file(path: &Path) -> DxResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| DxError::ConfigError {
            reason: format!("failed to read run config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> DxResult<()> {
        if self.max_rounds == 0 {
            return Err(DxError::ConfigError {
                reason: "max_rounds must be at least 1".to_string(),
            });
        }
        if let Some(budget) = self.budget_limit {
            if !budget.is_finite() || budget < 0.0 {
                return Err(DxError::ConfigError {
                    reason: format!("budget_limit must be a non-negative amount, got {}", budget),
                });
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(DxError::ConfigError {
                reason: format!("temperature must be within 0.0..=2.0, got {}", self.temperature),
            });
        }
        if self.session_capacity == Some(0) {
            return Err(DxError::ConfigError {
                reason: "session_capacity must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }

    /// Build a case request carrying this config's round, budget and mode
    /// settings.
    pub fn case_request(&self, case_info: impl Into<String>) -> CaseRequest {
        CaseRequest {
            case_id: None,
            case_info: case_info.into(),
            max_rounds: self.max_rounds,
            budget_limit: self.budget_limit,
            mode: self.mode,
        }
    }
}

//! OpenAI-compatible chat completion client.
//!
//! Configured from the environment:
//!
//! | Variable                       | Required | Default |
//! |--------------------------------|----------|---------|
//! | `AZURE_OPENAI_ENDPOINT`        | yes      |         |
//! | `AZURE_OPENAI_KEY`             | yes      |         |
//! | `AZURE_OPENAI_DEPLOYMENT_NAME` | no       | `gpt-4` |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use dxpanel_contracts::error::{DxError, DxResult};
use dxpanel_core::traits::ReasoningService;

pub const ENDPOINT_VAR: &str = "AZURE_OPENAI_ENDPOINT";
pub const KEY_VAR: &str = "AZURE_OPENAI_KEY";
pub const DEPLOYMENT_VAR: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const MAX_TOKENS: u32 = 2000;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct ReasoningConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
}

impl ReasoningConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// `ConfigError` when the endpoint or key is missing or blank.
    pub fn from_env() -> DxResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DxResult<Self> {
        let required = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| DxError::ConfigError {
                    reason: format!("{} must be set", name),
                })
        };

        let endpoint = required(ENDPOINT_VAR)?;
        let api_key = required(KEY_VAR)?;
        let model = lookup(DEPLOYMENT_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self {
            base_url: base_url(&endpoint),
            api_key,
            model,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ReasoningConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `https://` is assumed when the endpoint has no scheme.
fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        format!("{}/openai/v1", endpoint)
    } else {
        format!("https://{}/openai/v1", endpoint)
    }
}

// ── Wire types ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// `ReasoningService` over an OpenAI-compatible `/chat/completions` API.
pub struct OpenAiCompatibleService {
    client: Client,
    config: ReasoningConfig,
}

impl OpenAiCompatibleService {
    /// # Errors
    ///
    /// `ConfigError` if the HTTP client cannot be built.
    pub fn new(config: ReasoningConfig) -> DxResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DxError::ConfigError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, config })
    }

    pub fn from_env() -> DxResult<Self> {
        Self::new(ReasoningConfig::from_env()?)
    }

    pub fn config(&self) -> &ReasoningConfig {
        &self.config
    }
}

impl std::fmt::Debug for OpenAiCompatibleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleService")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl ReasoningService for OpenAiCompatibleService {
    async fn complete(&self, system_prompt: &str, user_message: &str, temperature: f32) -> DxResult<String> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: [
                Message { role: "system", content: system_prompt },
                Message { role: "user", content: user_message },
            ],
            temperature,
            max_tokens: MAX_TOKENS,
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        debug!(model = %self.config.model, "sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| DxError::Reasoning {
                reason: format!("HTTP request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ApiError>(&error_text)
                .map(|e| e.error.message)
                .unwrap_or(error_text);
            return Err(DxError::Reasoning {
                reason: format!("HTTP {}: {}", status.as_u16(), message),
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| DxError::Reasoning {
            reason: format!("failed to parse response: {}", e),
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DxError::Reasoning {
                reason: "response contained no message content".to_string(),
            })
    }
}

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LlmError {
    #[error("LLM not configured")]
    NotConfigured,
    #[error("Provider {name} not available. Available: [{}]", .available.join(", "))]
    UnknownProvider { name: String, available: Vec<String> },
    #[error("{provider} rate limit exceeded")]
    RateLimited { provider: String },
    #[error("{provider} API error: {message}")]
    Api { provider: String, message: String },
    #[error("{provider} request failed: {message}")]
    Network { provider: String, message: String },
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },
    #[error("All LLM providers failed: {}", format_failures(.0))]
    AllProvidersFailed(Vec<(String, String)>),
}

fn format_failures(failures: &[(String, String)]) -> String {
    failures
        .iter()
        .map(|(provider, error)| format!("{}: {}", provider, error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. } | LlmError::Network { .. })
    }
}

/// Sampling parameters for a single generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// A text generation backend
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Registry name, e.g. "gemini"
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError>;

    /// Cheap round trip to confirm credentials and reachability
    async fn health_check(&self) -> bool {
        let params = GenerationParams {
            temperature: 0.0,
            max_tokens: 10,
        };
        match self.generate("Say OK", &params).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(provider = self.name(), error = %e, "LLM health check failed");
                false
            }
        }
    }
}

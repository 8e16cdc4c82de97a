//! LLM provider adapters
//!
//! REST clients for Gemini, OpenAI and Anthropic. Each provider sends its
//! requests through the shared retry policy and maps HTTP failures into
//! [`LlmError`](crate::ports::LlmError).

pub mod gemini;
pub mod openai;
pub mod anthropic;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
pub use anthropic::AnthropicProvider;

use std::time::Duration;

use crate::adapters::http::HttpError;
use crate::adapters::retry::RetryPolicy;
use crate::ports::LlmError;

/// Connection settings shared by the provider clients
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
            timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub(crate) fn map_http_error(provider: &str, error: HttpError) -> LlmError {
    match error {
        HttpError::RateLimited => LlmError::RateLimited {
            provider: provider.to_string(),
        },
        HttpError::Transport(message) => LlmError::Network {
            provider: provider.to_string(),
            message,
        },
        HttpError::Timeout => LlmError::Network {
            provider: provider.to_string(),
            message: "request timed out".to_string(),
        },
        other => LlmError::Api {
            provider: provider.to_string(),
            message: other.to_string(),
        },
    }
}

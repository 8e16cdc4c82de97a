//! Anthropic messages provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{map_http_error, ProviderConfig};
use crate::adapters::http;
use crate::ports::{GenerationParams, LlmError, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-latest";
pub const API_VERSION: &str = "2023-06-01";

const NAME: &str = "anthropic";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Anthropic REST client
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    config: ProviderConfig,
    http: Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        let http = http::build_client(config.timeout).map_err(|e| map_http_error(NAME, e))?;
        Ok(Self { config, http })
    }

    pub fn with_api_key(api_key: &str) -> Result<Self, LlmError> {
        Self::new(ProviderConfig::new(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL))
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(self.config.endpoint("/v1/messages"))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response: MessagesResponse = http::send_json(&self.config.retry, "anthropic.messages", request)
            .await
            .map_err(|e| map_http_error(NAME, e))?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: NAME.to_string(),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::retry::RetryPolicy;

    #[tokio::test]
    async fn test_generate_sends_version_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "ak-test")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"Buzz"}],"role":"assistant"}"#)
            .create_async()
            .await;

        let provider = AnthropicProvider::new(
            ProviderConfig::new("ak-test", DEFAULT_MODEL, server.url()).with_retry(RetryPolicy::immediate(1)),
        )
        .unwrap();

        let text = provider.generate("hello", &GenerationParams::default()).await.unwrap();
        assert_eq!(text, "Buzz");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_maps_to_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(500)
            .with_body("overloaded")
            .create_async()
            .await;

        let provider = AnthropicProvider::new(
            ProviderConfig::new("ak-test", DEFAULT_MODEL, server.url()).with_retry(RetryPolicy::immediate(1)),
        )
        .unwrap();

        let err = provider.generate("hello", &GenerationParams::default()).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { ref provider, .. } if provider == "anthropic"));
    }
}

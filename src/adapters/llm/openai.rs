//! OpenAI chat completions provider

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{map_http_error, ProviderConfig};
use crate::adapters::http;
use crate::ports::{GenerationParams, LlmError, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4";

const NAME: &str = "openai";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// OpenAI REST client
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    config: ProviderConfig,
    http: Client,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        let http = http::build_client(config.timeout).map_err(|e| map_http_error(NAME, e))?;
        Ok(Self { config, http })
    }

    pub fn with_api_key(api_key: &str) -> Result<Self, LlmError> {
        Self::new(ProviderConfig::new(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let request = self
            .http
            .post(self.config.endpoint("/v1/chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&body);

        let response: ChatResponse = http::send_json(&self.config.retry, "openai.chat", request)
            .await
            .map_err(|e| map_http_error(NAME, e))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                provider: NAME.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::retry::RetryPolicy;
    use mockito::Matcher;

    fn provider(url: &str) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig::new("sk-test", DEFAULT_MODEL, url).with_retry(RetryPolicy::immediate(3)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_generate_sends_bearer_and_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({"model": "gpt-4", "max_tokens": 10})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"OK"}}]}"#)
            .create_async()
            .await;

        let params = GenerationParams {
            temperature: 0.1,
            max_tokens: 10,
        };
        let text = provider(&server.url()).generate("Say OK", &params).await.unwrap();
        assert_eq!(text, "OK");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_then_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .expect(3)
            .create_async()
            .await;

        let err = provider(&server.url())
            .generate("hi", &GenerationParams::default())
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::RateLimited { provider: "openai".into() });
        mock.assert_async().await;
    }
}

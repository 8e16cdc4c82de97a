//! Google Gemini provider (`generateContent`)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{map_http_error, ProviderConfig};
use crate::adapters::http;
use crate::ports::{GenerationParams, LlmError, LlmProvider};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const NAME: &str = "gemini";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

/// Gemini REST client
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    config: ProviderConfig,
    http: Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, LlmError> {
        let http = http::build_client(config.timeout).map_err(|e| map_http_error(NAME, e))?;
        Ok(Self { config, http })
    }

    /// Client against the public endpoint with the default model
    pub fn with_api_key(api_key: &str) -> Result<Self, LlmError> {
        Self::new(ProviderConfig::new(api_key, DEFAULT_MODEL, DEFAULT_BASE_URL))
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String, LlmError> {
        let url = self
            .config
            .endpoint(&format!("/v1beta/models/{}:generateContent", self.config.model));
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: params.temperature,
                max_output_tokens: params.max_tokens,
            },
        };

        let request = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body);

        let response: GenerateResponse = http::send_json(&self.config.retry, "gemini.generate", request)
            .await
            .map_err(|e| map_http_error(NAME, e))?;

        let text: String = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .concat();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: NAME.to_string(),
            });
        }
        Ok(text)
    }
}

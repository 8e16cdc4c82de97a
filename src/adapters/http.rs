//! Shared HTTP plumbing
//!
//! Sends a `reqwest` request under a [`RetryPolicy`], classifying responses
//! the same way for every JSON API: 429 and 5xx are retryable, other 4xx are
//! returned immediately.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

use super::retry::RetryPolicy;

/// Default request timeout for outbound APIs
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error, Clone, PartialEq)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Rate limit exceeded (429)")]
    RateLimited,
    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response body: {0}")]
    Decode(String),
}

impl HttpError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HttpError::Transport(_) | HttpError::Timeout | HttpError::RateLimited | HttpError::Server { .. }
        )
    }

    /// HTTP status code when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::RateLimited => Some(429),
            HttpError::Server { status, .. } | HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_decode() {
            HttpError::Decode(e.to_string())
        } else {
            HttpError::Transport(e.to_string())
        }
    }
}

/// Build a client with the given timeout
pub fn build_client(timeout: Duration) -> Result<Client, HttpError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| HttpError::Transport(format!("Failed to create HTTP client: {}", e)))
}

async fn send_once(request: &RequestBuilder) -> Result<reqwest::Response, HttpError> {
    let response = request
        .try_clone()
        .ok_or_else(|| HttpError::Transport("Failed to clone request".into()))?
        .send()
        .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::TOO_MANY_REQUESTS {
        Err(HttpError::RateLimited)
    } else if status.is_server_error() {
        Err(HttpError::Server { status: status.as_u16(), body })
    } else {
        Err(HttpError::Status { status: status.as_u16(), body })
    }
}

/// Send `request` with retries and return the successful response
pub async fn send(policy: &RetryPolicy, label: &str, request: RequestBuilder) -> Result<reqwest::Response, HttpError> {
    policy
        .run(label, || send_once(&request), HttpError::is_retryable)
        .await
}

/// Send `request` with retries and decode the JSON body
pub async fn send_json<T: DeserializeOwned>(
    policy: &RetryPolicy,
    label: &str,
    request: RequestBuilder,
) -> Result<T, HttpError> {
    let response = send(policy, label, request).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| HttpError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_retryable_classification() {
        assert!(HttpError::RateLimited.is_retryable());
        assert!(HttpError::Timeout.is_retryable());
        assert!(HttpError::Server { status: 503, body: String::new() }.is_retryable());
        assert!(!HttpError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!HttpError::Decode("x".into()).is_retryable());
        assert_eq!(HttpError::RateLimited.status(), Some(429));
    }

    #[tokio::test]
    async fn test_server_error_surfaces_after_attempts() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", "/data")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let request = client.get(format!("{}/data", server.url()));
        let result: Result<Value, HttpError> = send_json(&RetryPolicy::immediate(2), "data", request).await;
        assert!(matches!(result, Err(HttpError::Server { status: 503, .. })));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_decodes_json_body() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/data")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let request = client.get(format!("{}/data", server.url()));
        let value: Value = send_json(&RetryPolicy::immediate(3), "data", request).await.unwrap();
        assert_eq!(value["ok"], true);
        ok.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/missing")
            .with_status(404)
            .with_body("not found")
            .expect(1)
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let request = client.get(format!("{}/missing", server.url()));
        let err = send(&RetryPolicy::immediate(3), "missing", request).await.unwrap_err();

        assert_eq!(err, HttpError::Status { status: 404, body: "not found".into() });
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_attempts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/limited")
            .with_status(429)
            .expect(2)
            .create_async()
            .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let request = client.post(format!("{}/limited", server.url())).body("{}");
        let err = send(&RetryPolicy::immediate(2), "limited", request).await.unwrap_err();

        assert_eq!(err, HttpError::RateLimited);
        mock.assert_async().await;
    }
}

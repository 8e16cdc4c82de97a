//! Fivetran connector status client

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::adapters::http::{self, HttpError};
use crate::adapters::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.fivetran.com";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FivetranError {
    #[error("Fivetran request failed: {0}")]
    Http(#[from] HttpError),
    #[error("Fivetran API error: {0}")]
    Api(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<ConnectorData>,
}

#[derive(Debug, Deserialize)]
struct ConnectorData {
    id: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    paused: bool,
    #[serde(default)]
    status: Option<ConnectorStatusBody>,
    #[serde(default)]
    succeeded_at: Option<String>,
    #[serde(default)]
    failed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectorStatusBody {
    #[serde(default)]
    sync_state: Option<String>,
    #[serde(default)]
    setup_state: Option<String>,
}

/// Sync state of one connector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectorStatus {
    pub connector_id: String,
    pub service: Option<String>,
    pub paused: bool,
    pub sync_state: Option<String>,
    pub setup_state: Option<String>,
    pub succeeded_at: Option<String>,
    pub failed_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FivetranClient {
    http: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    retry: RetryPolicy,
}

impl FivetranClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        api_secret: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, FivetranError> {
        Ok(Self {
            http: http::build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            api_secret: api_secret.to_string(),
            retry,
        })
    }

    pub async fn connector_status(&self, connector_id: &str) -> Result<ConnectorStatus, FivetranError> {
        let request = self
            .http
            .get(format!("{}/v1/connectors/{}", self.base_url, connector_id))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .header(reqwest::header::ACCEPT, "application/json");

        let envelope: Envelope = http::send_json(&self.retry, "fivetran.connector", request).await?;
        if !envelope.code.eq_ignore_ascii_case("success") {
            return Err(FivetranError::Api(envelope.message.unwrap_or(envelope.code)));
        }
        let data = envelope
            .data
            .ok_or_else(|| FivetranError::Api("response missing connector data".into()))?;

        let (sync_state, setup_state) = match data.status {
            Some(status) => (status.sync_state, status.setup_state),
            None => (None, None),
        };

        Ok(ConnectorStatus {
            connector_id: data.id,
            service: data.service,
            paused: data.paused,
            sync_state,
            setup_state,
            succeeded_at: data.succeeded_at,
            failed_at: data.failed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> FivetranClient {
        FivetranClient::new(url, "key", "secret", Duration::from_secs(5), RetryPolicy::immediate(1)).unwrap()
    }

    #[tokio::test]
    async fn test_connector_status() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/connectors/gcs_conn")
            // base64("key:secret")
            .match_header("authorization", "Basic a2V5OnNlY3JldA==")
            .with_status(200)
            .with_body(
                r#"{"code":"Success","data":{"id":"gcs_conn","service":"gcs","paused":false,
                "status":{"setup_state":"connected","sync_state":"syncing"},
                "succeeded_at":"2024-10-01T12:00:00Z","failed_at":null}}"#,
            )
            .create_async()
            .await;

        let status = client(&server.url()).connector_status("gcs_conn").await.unwrap();
        assert_eq!(status.sync_state.as_deref(), Some("syncing"));
        assert_eq!(status.succeeded_at.as_deref(), Some("2024-10-01T12:00:00Z"));
        assert_eq!(status.failed_at, None);
        assert!(!status.paused);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/connectors/missing")
            .with_status(404)
            .with_body(r#"{"code":"NotFound_Connector","message":"Connector not found"}"#)
            .create_async()
            .await;

        let err = client(&server.url()).connector_status("missing").await.unwrap_err();
        assert!(matches!(err, FivetranError::Http(HttpError::Status { status: 404, .. })));
    }
}

//! Google Cloud Storage uploads through the JSON API
//!
//! Uses the simple media upload endpoint with a bearer token taken from the
//! environment (`GCS_ACCESS_TOKEN`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::http;
use crate::adapters::retry::RetryPolicy;
use crate::ports::{ObjectStore, StorageError};

pub const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";

#[derive(Debug, Deserialize)]
struct ObjectResource {
    name: String,
    #[serde(default)]
    size: Option<String>,
}

#[derive(Debug, Clone)]
pub struct GcsObjectStore {
    http: Client,
    base_url: String,
    bucket: String,
    access_token: String,
    retry: RetryPolicy,
}

impl GcsObjectStore {
    pub fn new(
        base_url: &str,
        bucket: &str,
        access_token: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, StorageError> {
        if bucket.trim().is_empty() {
            return Err(StorageError::InvalidName("empty bucket name".into()));
        }
        let http = http::build_client(timeout).map_err(|e| StorageError::Upload(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            access_token: access_token.to_string(),
            retry,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    fn name(&self) -> &'static str {
        "gcs"
    }

    async fn put(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        if object_name.is_empty() {
            return Err(StorageError::InvalidName(object_name.to_string()));
        }

        let url = format!("{}/upload/storage/v1/b/{}/o", self.base_url, self.bucket);
        let request = self
            .http
            .post(url)
            .query(&[("uploadType", "media"), ("name", object_name)])
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);

        let object: ObjectResource = http::send_json(&self.retry, "gcs.upload", request)
            .await
            .map_err(|e| StorageError::Upload(e.to_string()))?;

        tracing::info!(bucket = %self.bucket, object = %object.name, size = ?object.size, "Uploaded to GCS");
        Ok(format!("gs://{}/{}", self.bucket, object.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn store(url: &str) -> GcsObjectStore {
        GcsObjectStore::new(url, "omk-hive-blockchain-data", "ya29.token", Duration::from_secs(5), RetryPolicy::immediate(2))
            .unwrap()
    }

    #[tokio::test]
    async fn test_media_upload() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/storage/v1/b/omk-hive-blockchain-data/o")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("uploadType".into(), "media".into()),
                Matcher::UrlEncoded("name".into(), "blockchain_data/dex.csv".into()),
            ]))
            .match_header("authorization", "Bearer ya29.token")
            .match_header("content-type", "text/csv")
            .match_body("pool,price\n")
            .with_status(200)
            .with_body(r#"{"name":"blockchain_data/dex.csv","bucket":"omk-hive-blockchain-data","size":"11"}"#)
            .create_async()
            .await;

        let uri = store(&server.url())
            .put("blockchain_data/dex.csv", b"pool,price\n".to_vec(), "text/csv")
            .await
            .unwrap();
        assert_eq!(uri, "gs://omk-hive-blockchain-data/blockchain_data/dex.csv");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_forbidden_is_upload_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/storage/v1/b/omk-hive-blockchain-data/o")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("forbidden")
            .expect(1)
            .create_async()
            .await;

        let err = store(&server.url()).put("x.csv", vec![], "text/csv").await.unwrap_err();
        assert!(matches!(err, StorageError::Upload(ref msg) if msg.contains("403")));
        mock.assert_async().await;
    }

    #[test]
    fn test_empty_bucket_rejected() {
        assert!(GcsObjectStore::new(DEFAULT_BASE_URL, " ", "t", Duration::from_secs(1), RetryPolicy::none()).is_err());
    }
}

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(String),
    #[error("Upload failed: {0}")]
    Upload(String),
    #[error("Invalid object name: {0}")]
    InvalidName(String),
}

/// Destination for pipeline exports
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Store `bytes` under `object_name` and return its URI
    async fn put(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;
}

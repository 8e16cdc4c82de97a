use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// TTL reported for a missing key
pub const TTL_MISSING: i64 = -2;

/// TTL reported for a key without expiry
pub const TTL_PERSISTENT: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),
    #[error("Store command failed: {0}")]
    Command(String),
    #[error("Invalid stored value: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

/// Key-value operations used for locks and sessions
///
/// TTLs follow Redis semantics: `-2` for a missing key, `-1` for a key
/// without expiry, otherwise whole seconds remaining.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Backend name for status output
    fn backend(&self) -> &'static str;

    /// `SET key value NX EX ttl`; true when the key was set
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// `SET key value EX ttl`
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// `SET key value` without expiry
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// True when a key was removed
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically delete `key` only while it still holds `expected`
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    async fn ttl(&self, key: &str) -> Result<i64, StoreError>;

    /// True when the key exists and the expiry was set
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// All keys starting with `prefix`
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

//! Key-value store adapters
//!
//! Redis for shared deployments, and an in-memory store for development and
//! tests.

pub mod memory;
pub mod redis;

pub use memory::MemoryStore;
pub use self::redis::RedisStore;

use std::sync::Arc;
use std::time::Duration;

use crate::ports::KeyValueStore;

/// Connect to Redis when a URL is given, falling back to the in-memory store
///
/// Returns the store and whether it is shared across processes.
pub async fn connect_or_local(redis_url: Option<&str>, timeout: Duration) -> (Arc<dyn KeyValueStore>, bool) {
    match redis_url.filter(|url| !url.trim().is_empty()) {
        Some(url) => match RedisStore::connect(url, timeout).await {
            Ok(store) => (Arc::new(store), true),
            Err(e) => {
                tracing::warn!(error = %e, "Redis unavailable - falling back to in-memory store (single instance only)");
                (Arc::new(MemoryStore::new()), false)
            }
        },
        None => {
            tracing::info!("No Redis URL configured - using in-memory store");
            (Arc::new(MemoryStore::new()), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_url_uses_memory() {
        let (store, shared) = connect_or_local(None, Duration::from_secs(1)).await;
        assert_eq!(store.backend(), "memory");
        assert!(!shared);

        let (store, _) = connect_or_local(Some("  "), Duration::from_secs(1)).await;
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_unreachable_redis_gives_up_within_timeout() {
        // Non-routable address: the connect either hangs or is refused
        let started = std::time::Instant::now();
        let (store, shared) = connect_or_local(Some("redis://10.255.255.1:6379"), Duration::from_millis(300)).await;
        assert_eq!(store.backend(), "memory");
        assert!(!shared);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}

//! Session Manager
//!
//! Session state kept in the shared store so any hive instance can continue a
//! session another one started. Each read refreshes the TTL.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::ports::{KeyValueStore, StoreError};

pub const SESSION_PREFIX: &str = "session:";

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

const CREATED_AT: &str = "_created_at";
const LAST_ACCESSED: &str = "_last_accessed";

pub fn session_key(id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, id)
}

/// JSON object sessions over an optional store
///
/// With no store every call is a no-op: writes report false, reads report
/// nothing.
#[derive(Clone)]
pub struct SessionManager {
    store: Option<Arc<dyn KeyValueStore>>,
    default_ttl: Duration,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("backend", &self.store.as_ref().map(|s| s.backend()))
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

impl SessionManager {
    pub fn new(store: Option<Arc<dyn KeyValueStore>>) -> Self {
        if store.is_none() {
            tracing::warn!("Session manager unavailable - sessions won't persist");
        }
        Self {
            store,
            default_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Store `data` (a JSON object) with creation metadata
    pub async fn create(&self, id: &str, data: Value, ttl: Option<Duration>) -> Result<bool, StoreError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Value::Object(mut session) = data else {
            return Err(StoreError::Serialization(format!(
                "session data for '{}' must be a JSON object",
                id
            )));
        };

        let now = Value::String(Utc::now().to_rfc3339());
        session.insert(CREATED_AT.into(), now.clone());
        session.insert(LAST_ACCESSED.into(), now);

        store
            .set_ex(&session_key(id), &Value::Object(session).to_string(), ttl.unwrap_or(self.default_ttl))
            .await?;
        tracing::debug!(session = id, "Session created");
        Ok(true)
    }

    /// Session data, refreshing `_last_accessed` and the TTL
    pub async fn get(&self, id: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let key = session_key(id);
        let Some(raw) = store.get(&key).await? else {
            return Ok(None);
        };

        let mut session = parse_session(&raw)?;
        session.insert(LAST_ACCESSED.into(), Value::String(Utc::now().to_rfc3339()));
        store
            .set_ex(&key, &Value::Object(session.clone()).to_string(), self.default_ttl)
            .await?;
        tracing::debug!(session = id, "Session retrieved");
        Ok(Some(session))
    }

    /// Merge `updates` into an existing session
    pub async fn update(&self, id: &str, updates: Value) -> Result<bool, StoreError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let Value::Object(updates) = updates else {
            return Err(StoreError::Serialization(format!(
                "session updates for '{}' must be a JSON object",
                id
            )));
        };
        let Some(mut session) = self.get(id).await? else {
            tracing::warn!(session = id, "Session not found for update");
            return Ok(false);
        };

        session.extend(updates);
        session.insert(LAST_ACCESSED.into(), Value::String(Utc::now().to_rfc3339()));
        store
            .set_ex(&session_key(id), &Value::Object(session).to_string(), self.default_ttl)
            .await?;
        tracing::debug!(session = id, "Session updated");
        Ok(true)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let removed = store.delete(&session_key(id)).await?;
        tracing::debug!(session = id, removed, "Session deleted");
        Ok(removed)
    }

    /// Push the expiry out by `additional`
    ///
    /// False when the session is missing or has no expiry.
    pub async fn extend(&self, id: &str, additional: Duration) -> Result<bool, StoreError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let key = session_key(id);
        let current = store.ttl(&key).await?;
        if current < 0 {
            return Ok(false);
        }

        let extended = Duration::from_secs(current as u64) + additional;
        let applied = store.expire(&key, extended).await?;
        tracing::debug!(session = id, extra_secs = additional.as_secs(), "Session extended");
        Ok(applied)
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        match &self.store {
            Some(store) => Ok(store.scan_prefix(SESSION_PREFIX).await?.len()),
            None => Ok(0),
        }
    }

    /// Count scanned sessions that had already expired by the time they were checked
    pub async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let Some(store) = &self.store else {
            return Ok(0);
        };

        let mut cleaned = 0;
        for key in store.scan_prefix(SESSION_PREFIX).await? {
            if store.ttl(&key).await? == crate::ports::TTL_MISSING {
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            tracing::info!(cleaned, "Cleaned up expired sessions");
        }
        Ok(cleaned)
    }
}

fn parse_session(raw: &str) -> Result<Map<String, Value>, StoreError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StoreError::Serialization("stored session is not a JSON object".into())),
        Err(e) => Err(StoreError::Serialization(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::store::MemoryStore;
    use serde_json::json;

    fn sessions() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (SessionManager::new(Some(store.clone())), store)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (sessions, store) = sessions();
        assert!(sessions.create("u1", json!({"wallet": "0xabc"}), None).await.unwrap());
        assert_eq!(store.ttl("session:u1").await.unwrap(), 3600);

        let session = sessions.get("u1").await.unwrap().unwrap();
        assert_eq!(session["wallet"], "0xabc");
        assert!(session.contains_key("_created_at"));
        assert!(session.contains_key("_last_accessed"));

        assert!(sessions.get("missing").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_refreshes_ttl() {
        let (sessions, store) = sessions();
        sessions
            .create("short", json!({}), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(store.ttl("session:short").await.unwrap(), 60);

        sessions.get("short").await.unwrap();
        assert_eq!(store.ttl("session:short").await.unwrap(), 3600);
    }

    #[tokio::test]
    async fn test_update_merges() {
        let (sessions, _store) = sessions();
        sessions.create("u2", json!({"step": 1, "chain": "solana"}), None).await.unwrap();

        assert!(sessions.update("u2", json!({"step": 2})).await.unwrap());
        let session = sessions.get("u2").await.unwrap().unwrap();
        assert_eq!(session["step"], 2);
        assert_eq!(session["chain"], "solana");

        assert!(!sessions.update("nobody", json!({"step": 2})).await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_non_object_data() {
        let (sessions, _store) = sessions();
        assert!(matches!(
            sessions.create("bad", json!([1, 2]), None).await,
            Err(StoreError::Serialization(_))
        ));
        sessions.create("ok", json!({}), None).await.unwrap();
        assert!(sessions.update("ok", json!("text")).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_extend() {
        let (sessions, store) = sessions();
        sessions.create("e", json!({}), Some(Duration::from_secs(100))).await.unwrap();

        assert!(sessions.extend("e", Duration::from_secs(50)).await.unwrap());
        assert_eq!(store.ttl("session:e").await.unwrap(), 150);

        assert!(!sessions.extend("missing", Duration::from_secs(50)).await.unwrap());
        store.set("session:forever", "{}").await.unwrap();
        assert!(!sessions.extend("forever", Duration::from_secs(50)).await.unwrap());
    }

    #[tokio::test]
    async fn test_count_and_delete() {
        let (sessions, store) = sessions();
        sessions.create("a", json!({}), None).await.unwrap();
        sessions.create("b", json!({}), None).await.unwrap();
        store.set("lock:unrelated", "x").await.unwrap();

        assert_eq!(sessions.count().await.unwrap(), 2);
        assert!(sessions.delete("a").await.unwrap());
        assert!(!sessions.delete("a").await.unwrap());
        assert_eq!(sessions.count().await.unwrap(), 1);
        assert_eq!(sessions.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_no_store_is_noop() {
        let sessions = SessionManager::new(None);
        assert!(!sessions.is_enabled());
        assert!(!sessions.create("x", json!({}), None).await.unwrap());
        assert!(sessions.get("x").await.unwrap().is_none());
        assert!(!sessions.update("x", json!({})).await.unwrap());
        assert!(!sessions.delete("x").await.unwrap());
        assert!(!sessions.extend("x", Duration::from_secs(1)).await.unwrap());
        assert_eq!(sessions.count().await.unwrap(), 0);
    }
}

//! Conversation memory shared across LLM providers
//!
//! Keeps the most recent exchanges in memory and mirrors them to a JSON file
//! so a restarted hive resumes with the same context.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_MAX_EXCHANGES: usize = 100;

/// One prompt/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
}

/// Bounded exchange history, optionally persisted
#[derive(Debug, Clone)]
pub struct ConversationMemory {
    exchanges: Arc<Mutex<VecDeque<Exchange>>>,
    max_exchanges: usize,
    path: Option<PathBuf>,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::in_memory(DEFAULT_MAX_EXCHANGES)
    }
}

impl ConversationMemory {
    /// Memory that is never written to disk
    pub fn in_memory(max_exchanges: usize) -> Self {
        Self {
            exchanges: Arc::new(Mutex::new(VecDeque::new())),
            max_exchanges: max_exchanges.max(1),
            path: None,
        }
    }

    /// Load history from `path`, starting empty when the file is missing or unreadable
    pub async fn load(path: impl Into<PathBuf>, max_exchanges: usize) -> Self {
        let path = path.into();
        let mut memory = Self::in_memory(max_exchanges);

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match serde_json::from_str::<Vec<Exchange>>(&contents) {
                Ok(saved) => {
                    let skip = saved.len().saturating_sub(memory.max_exchanges);
                    memory.exchanges.lock().extend(saved.into_iter().skip(skip));
                    tracing::info!(path = %path.display(), exchanges = memory.len(), "Loaded conversation memory");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Conversation memory file is corrupt, starting fresh");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read conversation memory");
            }
        }

        memory.path = Some(path);
        memory
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.exchanges.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record an exchange, evicting the oldest beyond the bound
    pub async fn add_exchange(&self, user: &str, assistant: &str, metadata: Value) {
        let snapshot = {
            let mut exchanges = self.exchanges.lock();
            exchanges.push_back(Exchange {
                user: user.to_string(),
                assistant: assistant.to_string(),
                timestamp: Utc::now(),
                metadata,
            });
            while exchanges.len() > self.max_exchanges {
                exchanges.pop_front();
            }
            self.path.as_ref().map(|_| exchanges.iter().cloned().collect::<Vec<_>>())
        };

        if let Some(snapshot) = snapshot {
            self.persist(&snapshot).await;
        }
    }

    /// Last `limit` exchanges, oldest first
    pub fn get_recent(&self, limit: usize) -> Vec<Exchange> {
        let exchanges = self.exchanges.lock();
        let skip = exchanges.len().saturating_sub(limit);
        exchanges.iter().skip(skip).cloned().collect()
    }

    /// Exchanges mentioning `query` on either side, newest first
    pub fn search(&self, query: &str, limit: usize) -> Vec<Exchange> {
        let needle = query.to_lowercase();
        self.exchanges
            .lock()
            .iter()
            .rev()
            .filter(|e| e.user.to_lowercase().contains(&needle) || e.assistant.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect()
    }

    pub async fn clear(&self) {
        self.exchanges.lock().clear();
        if self.path.is_some() {
            self.persist(&[]).await;
        }
    }

    async fn persist(&self, exchanges: &[Exchange]) {
        let Some(path) = &self.path else {
            return;
        };
        let json = match serde_json::to_string_pretty(exchanges) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize conversation memory");
                return;
            }
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create memory directory");
                return;
            }
        }
        if let Err(e) = tokio::fs::write(path, json).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to persist conversation memory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bounded_history() {
        let memory = ConversationMemory::in_memory(3);
        for i in 0..5 {
            memory.add_exchange(&format!("q{}", i), &format!("a{}", i), Value::Null).await;
        }

        assert_eq!(memory.len(), 3);
        let recent = memory.get_recent(2);
        assert_eq!(recent[0].user, "q3");
        assert_eq!(recent[1].user, "q4");
        assert_eq!(memory.get_recent(10).len(), 3);
    }

    #[tokio::test]
    async fn test_search_newest_first() {
        let memory = ConversationMemory::default();
        memory.add_exchange("What is the OMK price?", "About 0.10", Value::Null).await;
        memory.add_exchange("Pool health?", "Healthy", Value::Null).await;
        memory.add_exchange("omk volume", "High", Value::Null).await;

        let hits = memory.search("OMK", 5);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].user, "omk volume");
        assert_eq!(memory.search("healthy", 5).len(), 1);
        assert_eq!(memory.search("omk", 1).len(), 1);
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory/conversation.json");

        let memory = ConversationMemory::load(&path, 10).await;
        assert!(memory.is_empty());
        memory
            .add_exchange("hello", "hi", json!({"provider": "gemini"}))
            .await;

        let reloaded = ConversationMemory::load(&path, 10).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get_recent(1)[0].metadata["provider"], "gemini");

        reloaded.clear().await;
        assert!(ConversationMemory::load(&path, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conversation.json");
        std::fs::write(&path, "not json").unwrap();

        assert!(ConversationMemory::load(&path, 10).await.is_empty());
    }
}

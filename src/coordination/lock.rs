//! Distributed Lock
//!
//! Mutual exclusion across hive instances using `SET NX EX` on the shared
//! store. Each acquisition writes a fresh UUID token, and release only deletes
//! the key while it still holds that token, so an instance never frees a lock
//! it no longer owns.
//!
//! Without a store the lock degrades to a process-local mutex per name.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::ports::{KeyValueStore, StoreError, TTL_MISSING};

pub const LOCK_PREFIX: &str = "lock:";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LockError {
    #[error("Could not acquire lock '{name}' after {attempts} attempts")]
    Timeout { name: String, attempts: u32 },
    #[error("Lock store error: {0}")]
    Store(#[from] StoreError),
}

impl LockError {
    pub fn is_retryable(&self) -> bool {
        match self {
            LockError::Timeout { .. } => true,
            LockError::Store(e) => e.is_retryable(),
        }
    }
}

/// Acquisition settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LockOptions {
    /// Expiry of the lock key, bounds how long a crashed holder blocks others
    pub ttl: Duration,
    pub retry_delay: Duration,
    pub max_retries: u32,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(30),
            retry_delay: Duration::from_millis(100),
            max_retries: 100,
        }
    }
}

impl LockOptions {
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

/// A lock entry seen in the store
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LockInfo {
    pub name: String,
    pub ttl_seconds: i64,
}

pub fn lock_key(name: &str) -> String {
    format!("{}{}", LOCK_PREFIX, name)
}

/// Lock manager for one hive instance
#[derive(Clone, Default)]
pub struct DistributedLock {
    store: Option<Arc<dyn KeyValueStore>>,
    held: Arc<Mutex<HashSet<String>>>,
    local: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl std::fmt::Debug for DistributedLock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedLock")
            .field("backend", &self.store.as_ref().map(|s| s.backend()))
            .field("held", &self.held_locks())
            .finish()
    }
}

impl DistributedLock {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        tracing::info!(backend = store.backend(), "Distributed locking initialized");
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Process-local locks only (development mode)
    pub fn local() -> Self {
        tracing::warn!("Distributed locking unavailable - using local locks");
        Self::default()
    }

    pub fn is_distributed(&self) -> bool {
        self.store.is_some()
    }

    /// Acquire `name`, polling until it is free or the retries run out
    pub async fn acquire(&self, name: &str, options: LockOptions) -> Result<LockGuard, LockError> {
        let Some(store) = &self.store else {
            return Ok(self.acquire_local(name).await);
        };

        let key = lock_key(name);
        let token = Uuid::new_v4().to_string();
        let attempts = options.max_retries.max(1);

        for attempt in 1..=attempts {
            if store.set_nx_ex(&key, &token, options.ttl).await? {
                self.held.lock().insert(name.to_string());
                tracing::debug!(lock = name, attempt, ttl_secs = options.ttl.as_secs(), "Lock acquired");
                return Ok(LockGuard {
                    inner: GuardInner::Remote(RemoteGuard {
                        store: Arc::clone(store),
                        name: name.to_string(),
                        token,
                        held: Arc::clone(&self.held),
                        released: false,
                    }),
                });
            }
            if attempt < attempts {
                tokio::time::sleep(options.retry_delay).await;
            }
        }

        Err(LockError::Timeout {
            name: name.to_string(),
            attempts,
        })
    }

    async fn acquire_local(&self, name: &str) -> LockGuard {
        let mutex = {
            let mut local = self.local.lock();
            Arc::clone(local.entry(name.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        self.held.lock().insert(name.to_string());
        LockGuard {
            inner: GuardInner::Local {
                name: name.to_string(),
                held: Arc::clone(&self.held),
                _guard: guard,
            },
        }
    }

    /// Run `fut` while holding `name`; the lock is released whatever the outcome
    pub async fn with_lock<F, T>(&self, name: &str, options: LockOptions, fut: F) -> Result<T, LockError>
    where
        F: Future<Output = T>,
    {
        let guard = self.acquire(name, options).await?;
        let output = fut.await;
        guard.release().await;
        Ok(output)
    }

    pub async fn is_locked(&self, name: &str) -> bool {
        match &self.store {
            Some(store) => store.exists(&lock_key(name)).await.unwrap_or(false),
            None => self.held.lock().contains(name),
        }
    }

    /// Delete a lock regardless of owner (deadlock recovery)
    pub async fn force_release(&self, name: &str) -> Result<bool, LockError> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let removed = store.delete(&lock_key(name)).await?;
        self.held.lock().remove(name);
        tracing::warn!(lock = name, removed, "Lock force-released");
        Ok(removed)
    }

    /// Every lock currently in the store with its remaining TTL
    pub async fn list_locks(&self) -> Result<Vec<LockInfo>, LockError> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };

        let mut locks = Vec::new();
        for key in store.scan_prefix(LOCK_PREFIX).await? {
            let ttl_seconds = store.ttl(&key).await?;
            locks.push(LockInfo {
                name: key.trim_start_matches(LOCK_PREFIX).to_string(),
                ttl_seconds,
            });
        }
        Ok(locks)
    }

    /// Names held by this instance
    pub fn held_locks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.held.lock().iter().cloned().collect();
        names.sort();
        names
    }

    /// Log locks without a live expiry and return how many there were
    pub async fn cleanup_expired_locks(&self) -> Result<usize, LockError> {
        let expired: Vec<LockInfo> = self
            .list_locks()
            .await?
            .into_iter()
            .filter(|lock| lock.ttl_seconds < 0)
            .collect();

        for lock in &expired {
            if lock.ttl_seconds == TTL_MISSING {
                tracing::debug!(lock = %lock.name, "Expired lock detected");
            } else {
                tracing::warn!(lock = %lock.name, "Lock has no expiry");
            }
        }
        Ok(expired.len())
    }
}

/// Held lock; release explicitly with [`LockGuard::release`]
///
/// Dropping an unreleased distributed guard spawns a best-effort release on
/// the current runtime.
#[derive(Debug)]
pub struct LockGuard {
    inner: GuardInner,
}

#[derive(Debug)]
enum GuardInner {
    Remote(RemoteGuard),
    Local {
        name: String,
        held: Arc<Mutex<HashSet<String>>>,
        _guard: OwnedMutexGuard<()>,
    },
}

struct RemoteGuard {
    store: Arc<dyn KeyValueStore>,
    name: String,
    token: String,
    held: Arc<Mutex<HashSet<String>>>,
    released: bool,
}

impl std::fmt::Debug for RemoteGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteGuard")
            .field("name", &self.name)
            .field("released", &self.released)
            .finish()
    }
}

impl LockGuard {
    pub fn name(&self) -> &str {
        match &self.inner {
            GuardInner::Remote(remote) => &remote.name,
            GuardInner::Local { name, .. } => name,
        }
    }

    /// Release the lock; false when it had expired or changed owner
    pub async fn release(mut self) -> bool {
        match &mut self.inner {
            GuardInner::Remote(remote) => {
                remote.released = true;
                release_remote(&remote.store, &remote.name, &remote.token, &remote.held).await
            }
            GuardInner::Local { name, held, .. } => {
                held.lock().remove(name.as_str());
                true
            }
        }
    }
}

async fn release_remote(
    store: &Arc<dyn KeyValueStore>,
    name: &str,
    token: &str,
    held: &Mutex<HashSet<String>>,
) -> bool {
    held.lock().remove(name);
    match store.delete_if_equals(&lock_key(name), token).await {
        Ok(true) => {
            tracing::debug!(lock = name, "Lock released");
            true
        }
        Ok(false) => {
            tracing::warn!(lock = name, "Lock already expired or owned by another instance");
            false
        }
        Err(e) => {
            tracing::error!(lock = name, error = %e, "Error releasing lock");
            false
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match &mut self.inner {
            GuardInner::Remote(remote) if !remote.released => {
                remote.released = true;
                let store = Arc::clone(&remote.store);
                let name = remote.name.clone();
                let token = remote.token.clone();
                let held = Arc::clone(&remote.held);
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        handle.spawn(async move {
                            release_remote(&store, &name, &token, &held).await;
                        });
                    }
                    Err(_) => {
                        held.lock().remove(&name);
                        tracing::warn!(lock = %name, "Lock dropped outside a runtime, left to expire");
                    }
                }
            }
            GuardInner::Local { name, held, .. } => {
                held.lock().remove(name.as_str());
            }
            _ => {}
        }
    }
}

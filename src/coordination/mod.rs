//! Multi-instance coordination
//!
//! Distributed locks and sessions on top of the
//! [`KeyValueStore`](crate::ports::KeyValueStore) port.

pub mod lock;
pub mod session;

pub use lock::{DistributedLock, LockError, LockGuard, LockInfo, LockOptions};
pub use session::{SessionManager, DEFAULT_SESSION_TTL};

//! Application layer
//!
//! Hive lifecycle: component wiring, the scheduler loop and status reporting.

pub mod hive;

pub use hive::{HealthReport, Hive, HiveError, HiveStatus, LlmStatus, StoreStatus, TickReport, PIPELINE_LOCK, PIPELINE_SLOT_KEY};

//! Export destinations for the data pipeline
//!
//! - Local directory (development)
//! - Google Cloud Storage (production, read by Fivetran)
//! - Fivetran connector status

pub mod fivetran;
pub mod gcs;
pub mod local;

pub use fivetran::{ConnectorStatus, FivetranClient, FivetranError};
pub use gcs::GcsObjectStore;
pub use local::LocalObjectStore;

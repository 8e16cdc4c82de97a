use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::domain::{AmmError, BridgeError, ChainError, LiquidityError, RebalanceError};
use super::chain::{EthereumError, SolanaClientError};
use super::dex::DexError;
use super::object_store::StorageError;
use super::oracle::OracleError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BeeError {
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),
    #[error("Missing task type")]
    MissingTaskType,
    #[error("Invalid task: {0}")]
    InvalidTask(String),
    #[error("{bee} cannot handle {task} tasks")]
    WrongTask { bee: String, task: String },
    #[error("Bee '{name}' not found. Available: [{}]", .available.join(", "))]
    BeeNotFound { name: String, available: Vec<String> },
    #[error("{0} not connected")]
    NotConnected(&'static str),
    #[error("{0} is paused")]
    Paused(String),
    #[error("{0} client not configured")]
    ChainUnavailable(String),
    #[error("Bridge transaction not found: {0}")]
    BridgeTransferNotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Chain(#[from] ChainError),
    #[error("Ethereum error: {0}")]
    Ethereum(#[from] EthereumError),
    #[error("Solana error: {0}")]
    Solana(#[from] SolanaClientError),
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
    #[error("DEX error: {0}")]
    Dex(#[from] DexError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Liquidity(#[from] LiquidityError),
    #[error("{0}")]
    Bridge(#[from] BridgeError),
    #[error("{0}")]
    Rebalance(#[from] RebalanceError),
    #[error("{0}")]
    Amm(#[from] AmmError),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl BeeError {
    /// The task itself was rejected before reaching any backend
    ///
    /// Rejections (including tasks for a backend this hive was built
    /// without) count as failed tasks but leave the bee's status alone.
    /// Anything else marks the bee as errored.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BeeError::UnknownTaskType(_)
                | BeeError::MissingTaskType
                | BeeError::InvalidTask(_)
                | BeeError::WrongTask { .. }
                | BeeError::BeeNotFound { .. }
                | BeeError::Paused(_)
                | BeeError::NotConnected(_)
                | BeeError::ChainUnavailable(_)
                | BeeError::BridgeTransferNotFound(_)
                | BeeError::Validation(_)
                | BeeError::Chain(_)
                | BeeError::Liquidity(_)
                | BeeError::Bridge(_)
                | BeeError::Rebalance(_)
                | BeeError::Amm(_)
        )
    }
}

/// Task enums expose their wire `type` names
pub trait TaskKind {
    /// The `type` tag of this task
    fn kind(&self) -> &'static str;

    /// Every `type` tag the enum accepts
    fn known_types() -> &'static [&'static str];
}

/// A worker that executes its own typed tasks
#[async_trait]
pub trait Bee: Send + Sync + 'static {
    type Task: DeserializeOwned + TaskKind + Send + 'static;

    fn name(&self) -> &'static str;

    async fn execute(&self, task: Self::Task) -> Result<Value, BeeError>;

    async fn shutdown(&self) {}
}

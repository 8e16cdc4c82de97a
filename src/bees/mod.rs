//! Bees - Task workers of the hive
//!
//! Each bee accepts its own typed task enum and calls adapters through ports.
//! `BeeRunner` adds status and metrics, `BeeManager` routes tasks by bee name.
//!
//! - `blockchain`: balances, transactions, oracle prices, DEX quotes, bridge
//! - `sentinel`: liquidity pool monitoring and rebalancing
//! - `pipeline`: data export to the object store read by Fivetran

pub mod task;
pub mod base;
pub mod manager;
pub mod blockchain;
pub mod sentinel;
pub mod pipeline;

pub use task::{
    parse_task, BlockchainTask, HiveTask, PipelineTask, PoolSpec, SentinelTask, BLOCKCHAIN_BEE, PIPELINE_BEE,
    SENTINEL_BEE,
};
pub use base::{BeeHealth, BeeRunner, BeeStats, BeeStatus, LlmAccess, ManagedBee, TaskOutcome};
pub use manager::{BeeManager, HiveHealth};
pub use blockchain::{BlockchainBee, BlockchainSettings, ChainHealth};
pub use sentinel::{LiquiditySentinelBee, SentinelSettings};
pub use pipeline::{DataPipelineBee, DexPair, OraclePair, PipelineError, PipelineSettings};

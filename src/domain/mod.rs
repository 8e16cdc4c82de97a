//! Domain Layer - Core types and calculations for the OMK hive
//!
//! Pure logic with no network access. Adapters and bees build on these types.
//!
//! - `chain`: chains, priorities and wei/lamport conversions
//! - `amm`: constant-product swap math and Uniswap path routing
//! - `liquidity`: pool health, price deviation, volatility and buyback sizing
//! - `cost`: LLM token cost accounting
//! - `bridge`: ETH <-> SOL bridge ledger and status machine
//! - `rebalance`: portfolio rebalancing analysis

pub mod chain;
pub mod amm;
pub mod liquidity;
pub mod cost;
pub mod bridge;
pub mod rebalance;

pub use chain::{Chain, ChainError, Priority};
pub use amm::AmmError;
pub use liquidity::{
    ActionRecommendation, BuybackPlan, HealthStatus, LiquidityError, PoolHealth, PriceDeviation,
    PriceHistory, Severity, VolatilityLevel, VolatilityPrediction,
};
pub use cost::{CostSnapshot, CostTracker, TokenRates};
pub use bridge::{BridgeDirection, BridgeError, BridgeLedger, BridgeLimits, BridgeStatus, BridgeTransfer};
pub use rebalance::{RebalanceError, RebalancePlan, RebalanceTrade, TradeSide};

//! Typed bee tasks
//!
//! Every task enum is tagged by `type` on the wire, so the JSON shape callers
//! already send (`{"type": "check_balance", "chain": "solana", ...}`) maps
//! straight onto a variant.

use std::collections::BTreeMap;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{BridgeDirection, BridgeStatus, Chain, Priority};
use crate::domain::liquidity::{LiquidityAction, VolatilityLevel};
use crate::ports::{BeeError, TaskKind};

/// Chain names are accepted in any case ("Ethereum", "SOL", ...)
pub(crate) fn chain_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Chain, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

fn default_ratio() -> f64 {
    1.0
}

fn default_interval_minutes() -> u64 {
    15
}

// ---------------------------------------------------------------------------
// BlockchainBee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockchainTask {
    /// Submit a pre-signed Ethereum transaction or send SOL from the hive wallet
    ExecuteTransaction {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        /// 0x-prefixed signed transaction (Ethereum)
        #[serde(default)]
        raw_transaction: Option<String>,
        #[serde(default)]
        to_address: Option<String>,
        /// SOL amount (Solana)
        #[serde(default)]
        amount: Option<Decimal>,
        #[serde(default)]
        priority_fee: Option<u64>,
    },
    EstimateGas {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        from: Option<String>,
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        data: Option<String>,
        /// ETH sent with the call
        #[serde(default)]
        value: Option<Decimal>,
    },
    CheckBalance {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        address: String,
    },
    MonitorTx {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        tx_hash: Option<String>,
        #[serde(default)]
        signature: Option<String>,
    },
    GetPrice {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        pair: String,
    },
    GetMultiplePrices {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        pairs: Vec<String>,
    },
    CalculateValue {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        token_amount: f64,
        token_pair: String,
    },
    SwapTokens {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        token_in: String,
        token_out: String,
        amount_in: Decimal,
        /// Defaults to 18 on Ethereum and 9 on Solana
        #[serde(default)]
        decimals_in: Option<u32>,
        #[serde(default)]
        decimals_out: Option<u32>,
        #[serde(default)]
        priority: Priority,
    },
    AddLiquidity {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        pool: Option<String>,
        token_a: String,
        token_b: String,
        amount_a: Decimal,
        amount_b: Decimal,
    },
    RemoveLiquidity {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        pool: Option<String>,
        lp_tokens: Decimal,
    },
    BridgeTransfer {
        direction: BridgeDirection,
        amount: Decimal,
        #[serde(default)]
        from_address: Option<String>,
        to_address: String,
    },
    CheckBridgeStatus {
        bridge_transaction_id: String,
    },
    /// Relay progress reported back for a bridge transfer
    UpdateBridgeStatus {
        bridge_transaction_id: String,
        status: BridgeStatus,
        #[serde(default)]
        error: Option<String>,
    },
    BridgeStats,
    AutoRebalance {
        #[serde(default)]
        wallet_address: Option<String>,
        target_ratios: BTreeMap<String, f64>,
        /// Current holdings in a common value unit
        #[serde(default)]
        holdings: BTreeMap<String, f64>,
    },
    EmergencyWithdraw {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        to_address: Option<String>,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl TaskKind for BlockchainTask {
    fn kind(&self) -> &'static str {
        match self {
            BlockchainTask::ExecuteTransaction { .. } => "execute_transaction",
            BlockchainTask::EstimateGas { .. } => "estimate_gas",
            BlockchainTask::CheckBalance { .. } => "check_balance",
            BlockchainTask::MonitorTx { .. } => "monitor_tx",
            BlockchainTask::GetPrice { .. } => "get_price",
            BlockchainTask::GetMultiplePrices { .. } => "get_multiple_prices",
            BlockchainTask::CalculateValue { .. } => "calculate_value",
            BlockchainTask::SwapTokens { .. } => "swap_tokens",
            BlockchainTask::AddLiquidity { .. } => "add_liquidity",
            BlockchainTask::RemoveLiquidity { .. } => "remove_liquidity",
            BlockchainTask::BridgeTransfer { .. } => "bridge_transfer",
            BlockchainTask::CheckBridgeStatus { .. } => "check_bridge_status",
            BlockchainTask::UpdateBridgeStatus { .. } => "update_bridge_status",
            BlockchainTask::BridgeStats => "bridge_stats",
            BlockchainTask::AutoRebalance { .. } => "auto_rebalance",
            BlockchainTask::EmergencyWithdraw { .. } => "emergency_withdraw",
        }
    }

    fn known_types() -> &'static [&'static str] {
        &[
            "execute_transaction",
            "estimate_gas",
            "check_balance",
            "monitor_tx",
            "get_price",
            "get_multiple_prices",
            "calculate_value",
            "swap_tokens",
            "add_liquidity",
            "remove_liquidity",
            "bridge_transfer",
            "check_bridge_status",
            "update_bridge_status",
            "bridge_stats",
            "auto_rebalance",
            "emergency_withdraw",
        ]
    }
}

// ---------------------------------------------------------------------------
// LiquiditySentinelBee
// ---------------------------------------------------------------------------

/// A pool watched by the sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSpec {
    #[serde(default, deserialize_with = "chain_field")]
    pub chain: Chain,
    /// Oracle pair used for the pool price, e.g. "ETH/USD"
    pub token_pair: String,
    #[serde(default)]
    pub pool_address: Option<String>,
    #[serde(default)]
    pub token_a: Option<String>,
    #[serde(default)]
    pub token_b: Option<String>,
    #[serde(default)]
    pub token_a_amount: f64,
    #[serde(default)]
    pub token_b_amount: f64,
    #[serde(default = "default_ratio")]
    pub target_ratio: f64,
    #[serde(default)]
    pub volume_24h: f64,
    /// Reference price; the oracle price itself when absent
    #[serde(default)]
    pub expected_price: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthInput {
    #[serde(default = "HealthInput::default_score")]
    pub health_score: f64,
}

impl HealthInput {
    fn default_score() -> f64 {
        100.0
    }
}

impl Default for HealthInput {
    fn default() -> Self {
        Self { health_score: 100.0 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviationInput {
    /// Percent, 10.0 means 10%
    #[serde(default)]
    pub deviation_percent: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VolatilityInput {
    #[serde(default)]
    pub volatility_level: VolatilityLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SentinelTask {
    MonitorPrice {
        current_price: f64,
        expected_price: f64,
        #[serde(default)]
        pool_address: Option<String>,
    },
    CheckPoolHealth {
        token_a_amount: f64,
        token_b_amount: f64,
        #[serde(default = "default_ratio")]
        target_ratio: f64,
        #[serde(default)]
        volume_24h: f64,
    },
    /// Uses `price_history` when given, otherwise the stored history of `pool_id`
    PredictVolatility {
        #[serde(default)]
        price_history: Option<Vec<f64>>,
        #[serde(default)]
        pool_id: Option<String>,
    },
    RecommendAction {
        #[serde(default)]
        pool_health: HealthInput,
        #[serde(default)]
        price_analysis: DeviationInput,
        #[serde(default)]
        volatility_prediction: VolatilityInput,
    },
    CalculateBuyback {
        current_price: f64,
        target_price: f64,
        pool_liquidity: f64,
        treasury_balance: f64,
    },
    GetPoolPrice {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        token_pair: String,
    },
    ExecuteLiquidityAction {
        action: LiquidityAction,
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        #[serde(default)]
        pool_address: Option<String>,
        #[serde(default)]
        token_a: Option<String>,
        #[serde(default)]
        token_b: Option<String>,
        #[serde(default)]
        amount_a: Option<Decimal>,
        #[serde(default)]
        amount_b: Option<Decimal>,
        #[serde(default)]
        lp_tokens: Option<Decimal>,
    },
    ExecuteBuyback {
        #[serde(default, deserialize_with = "chain_field")]
        chain: Chain,
        token_in: String,
        token_out: String,
        amount: Decimal,
    },
    MonitorAllPools {
        #[serde(default)]
        pools: Vec<String>,
        /// Definitions for listed pools that are not registered
        #[serde(default)]
        pool_data: BTreeMap<String, PoolSpec>,
        /// Ask the LLM for a short summary when alerts are raised
        #[serde(default)]
        summarize: bool,
    },
    AutoRebalancePool {
        pool_id: String,
        #[serde(default)]
        pool_data: Option<PoolSpec>,
        #[serde(default)]
        queen_approved: bool,
    },
    RegisterPool {
        pool_id: String,
        pool: PoolSpec,
    },
    UnregisterPool {
        pool_id: String,
    },
}

impl TaskKind for SentinelTask {
    fn kind(&self) -> &'static str {
        match self {
            SentinelTask::MonitorPrice { .. } => "monitor_price",
            SentinelTask::CheckPoolHealth { .. } => "check_pool_health",
            SentinelTask::PredictVolatility { .. } => "predict_volatility",
            SentinelTask::RecommendAction { .. } => "recommend_action",
            SentinelTask::CalculateBuyback { .. } => "calculate_buyback",
            SentinelTask::GetPoolPrice { .. } => "get_pool_price",
            SentinelTask::ExecuteLiquidityAction { .. } => "execute_liquidity_action",
            SentinelTask::ExecuteBuyback { .. } => "execute_buyback",
            SentinelTask::MonitorAllPools { .. } => "monitor_all_pools",
            SentinelTask::AutoRebalancePool { .. } => "auto_rebalance_pool",
            SentinelTask::RegisterPool { .. } => "register_pool",
            SentinelTask::UnregisterPool { .. } => "unregister_pool",
        }
    }

    fn known_types() -> &'static [&'static str] {
        &[
            "monitor_price",
            "check_pool_health",
            "predict_volatility",
            "recommend_action",
            "calculate_buyback",
            "get_pool_price",
            "execute_liquidity_action",
            "execute_buyback",
            "monitor_all_pools",
            "auto_rebalance_pool",
            "register_pool",
            "unregister_pool",
        ]
    }
}

// ---------------------------------------------------------------------------
// DataPipelineBee
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineTask {
    RunPipeline,
    CollectData,
    ConvertToCsv {
        input_file: PathBuf,
    },
    UploadToGcs {
        #[serde(default)]
        files: Vec<PathBuf>,
    },
    CheckFivetran {
        #[serde(default)]
        connector_id: Option<String>,
    },
    GetPipelineStatus,
    SchedulePipeline {
        #[serde(default = "default_interval_minutes")]
        interval_minutes: u64,
    },
}

impl TaskKind for PipelineTask {
    fn kind(&self) -> &'static str {
        match self {
            PipelineTask::RunPipeline => "run_pipeline",
            PipelineTask::CollectData => "collect_data",
            PipelineTask::ConvertToCsv { .. } => "convert_to_csv",
            PipelineTask::UploadToGcs { .. } => "upload_to_gcs",
            PipelineTask::CheckFivetran { .. } => "check_fivetran",
            PipelineTask::GetPipelineStatus => "get_pipeline_status",
            PipelineTask::SchedulePipeline { .. } => "schedule_pipeline",
        }
    }

    fn known_types() -> &'static [&'static str] {
        &[
            "run_pipeline",
            "collect_data",
            "convert_to_csv",
            "upload_to_gcs",
            "check_fivetran",
            "get_pipeline_status",
            "schedule_pipeline",
        ]
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

pub const BLOCKCHAIN_BEE: &str = "blockchain";
pub const SENTINEL_BEE: &str = "liquidity_sentinel";
pub const PIPELINE_BEE: &str = "data_pipeline";

/// A task addressed to a specific bee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "bee", content = "task", rename_all = "snake_case")]
pub enum HiveTask {
    Blockchain(BlockchainTask),
    LiquiditySentinel(SentinelTask),
    DataPipeline(PipelineTask),
}

impl HiveTask {
    pub fn bee_name(&self) -> &'static str {
        match self {
            HiveTask::Blockchain(_) => BLOCKCHAIN_BEE,
            HiveTask::LiquiditySentinel(_) => SENTINEL_BEE,
            HiveTask::DataPipeline(_) => PIPELINE_BEE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HiveTask::Blockchain(task) => task.kind(),
            HiveTask::LiquiditySentinel(task) => task.kind(),
            HiveTask::DataPipeline(task) => task.kind(),
        }
    }

    /// The inner task in its `{"type": ..}` wire form
    pub fn to_json(&self) -> Result<Value, BeeError> {
        let value = match self {
            HiveTask::Blockchain(task) => serde_json::to_value(task),
            HiveTask::LiquiditySentinel(task) => serde_json::to_value(task),
            HiveTask::DataPipeline(task) => serde_json::to_value(task),
        };
        value.map_err(|e| BeeError::InvalidTask(e.to_string()))
    }
}

/// Decode a `{"type": ..}` task for a bee
///
/// The `type` tag is checked first so unknown tasks report
/// "Unknown task type" rather than a serde message.
pub fn parse_task<T: DeserializeOwned + TaskKind>(value: Value) -> Result<T, BeeError> {
    let kind = match value.get("type") {
        None | Some(Value::Null) => return Err(BeeError::MissingTaskType),
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => return Err(BeeError::UnknownTaskType(other.to_string())),
    };
    if !T::known_types().contains(&kind.as_str()) {
        return Err(BeeError::UnknownTaskType(kind));
    }
    serde_json::from_value(value).map_err(|e| BeeError::InvalidTask(format!("{}: {}", kind, e)))
}

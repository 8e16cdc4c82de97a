//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/hive.toml.
//! Secrets are read from the environment (after `.env` is loaded) and take
//! precedence over file values.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::adapters::oracles::FeedNetwork;
use crate::adapters::retry::RetryPolicy;
use crate::bees::{BlockchainSettings, DexPair, OraclePair, PipelineSettings, PoolSpec, SentinelSettings};
use crate::domain::BridgeLimits;
use crate::llm::SelectionStrategy;

/// Provider names accepted by `[llm].default_provider`
pub const LLM_PROVIDERS: [&str; 3] = ["gemini", "openai", "anthropic"];

/// Main configuration structure matching config/hive.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppSection,
    pub redis: RedisSection,
    pub llm: LlmSection,
    pub ethereum: EthereumSection,
    pub solana: SolanaSection,
    pub oracles: OraclesSection,
    pub bees: BeesSection,
    pub sentinel: SentinelSection,
    pub pipeline: PipelineSection,
    pub retry: RetrySection,
    pub logging: LoggingSection,
}

/// Application section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    /// Instance name used in logs
    pub name: String,
    /// "development", "staging" or "production"
    pub environment: String,
    /// Seconds between scheduler ticks of the run loop
    pub tick_interval_secs: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: "omk-hive".to_string(),
            environment: "development".to_string(),
            tick_interval_secs: 5,
        }
    }
}

/// Redis coordination store
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisSection {
    /// Redis URL; empty runs on the in-memory store (single instance only)
    pub url: String,
    /// Default session lifetime
    pub session_ttl_secs: u64,
    /// Default lock lifetime
    pub lock_ttl_secs: u64,
    /// Bound on connecting and on each command
    pub connect_timeout_secs: u64,
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            session_ttl_secs: 3600,
            lock_ttl_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl RedisSection {
    /// Get Redis URL with environment variable override
    /// Checks REDIS_URL env var first, falls back to config value
    pub fn get_url(&self) -> Option<String> {
        env_or("REDIS_URL", &self.url)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs.max(1))
    }
}

/// LLM providers and routing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Provider tried first: "gemini", "openai" or "anthropic"
    pub default_provider: String,
    /// "failover" or "round_robin"
    pub strategy: String,
    /// JSON file for conversation memory; empty keeps memory in-process
    pub memory_path: String,
    pub max_exchanges: usize,
    pub timeout_secs: u64,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_base_url: Option<String>,
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub openai_base_url: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: Option<String>,
    pub anthropic_base_url: Option<String>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            default_provider: "gemini".to_string(),
            strategy: "round_robin".to_string(),
            memory_path: "data/llm_memory.json".to_string(),
            max_exchanges: 100,
            timeout_secs: 60,
            gemini_api_key: None,
            gemini_model: None,
            gemini_base_url: None,
            openai_api_key: None,
            openai_model: None,
            openai_base_url: None,
            anthropic_api_key: None,
            anthropic_model: None,
            anthropic_base_url: None,
        }
    }
}

impl LlmSection {
    /// API key for a provider, GEMINI_API_KEY / OPENAI_API_KEY /
    /// ANTHROPIC_API_KEY first, then the config value
    pub fn get_api_key(&self, provider: &str) -> Option<String> {
        let (var, configured) = match provider {
            "gemini" => ("GEMINI_API_KEY", &self.gemini_api_key),
            "openai" => ("OPENAI_API_KEY", &self.openai_api_key),
            "anthropic" => ("ANTHROPIC_API_KEY", &self.anthropic_api_key),
            _ => return None,
        };
        env_or(var, configured.as_deref().unwrap_or_default())
    }

    pub fn selection_strategy(&self) -> Result<SelectionStrategy, ConfigError> {
        SelectionStrategy::from_str(&self.strategy).map_err(ConfigError::ValidationError)
    }

    pub fn memory_file(&self) -> Option<PathBuf> {
        non_empty(&self.memory_path).map(expand_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Ethereum JSON-RPC section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EthereumSection {
    /// RPC endpoint; empty disables Ethereum support
    pub rpc_url: String,
    pub timeout_secs: u64,
    /// Uniswap V2 router override
    pub uniswap_router: Option<String>,
}

impl Default for EthereumSection {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            timeout_secs: 30,
            uniswap_router: None,
        }
    }
}

impl EthereumSection {
    /// Get RPC URL with environment variable override
    /// Checks ETHEREUM_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> Option<String> {
        env_or("ETHEREUM_RPC_URL", &self.rpc_url)
    }
}

/// Solana RPC section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSection {
    /// RPC endpoint; empty disables Solana support
    pub rpc_url: String,
    /// Wallet keypair path (NEVER commit this file!)
    pub keypair_path: String,
    /// Raydium v3 API
    pub raydium_api_url: String,
    pub timeout_secs: u64,
}

impl Default for SolanaSection {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            keypair_path: String::new(),
            raydium_api_url: crate::adapters::dex::raydium::DEFAULT_API_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> Option<String> {
        env_or("SOLANA_RPC_URL", &self.rpc_url)
    }

    /// Get keypair path with environment variable override, `~` expanded
    /// Checks SOLANA_KEYPAIR_PATH env var first, falls back to config value
    pub fn get_keypair_path(&self) -> Option<PathBuf> {
        env_or("SOLANA_KEYPAIR_PATH", &self.keypair_path).map(|p| expand_path(&p))
    }
}

/// Price oracle section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OraclesSection {
    /// "mainnet" or "testnet" (sepolia / devnet feeds)
    pub network: String,
    pub chainlink_max_staleness_secs: i64,
    pub pyth_cache_ttl_secs: u64,
}

impl Default for OraclesSection {
    fn default() -> Self {
        Self {
            network: "mainnet".to_string(),
            chainlink_max_staleness_secs: crate::adapters::oracles::chainlink::DEFAULT_MAX_STALENESS_SECS,
            pyth_cache_ttl_secs: 5,
        }
    }
}

impl OraclesSection {
    pub fn feed_network(&self) -> Result<FeedNetwork, ConfigError> {
        FeedNetwork::from_str(&self.network).map_err(ConfigError::ValidationError)
    }
}

/// Bee limits and scheduling
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BeesSection {
    /// Seconds between bee health checks in the run loop
    pub health_check_interval_secs: u64,
    /// Slippage tolerance in basis points (1% = 100 bps)
    pub slippage_bps: u16,
    /// Largest single swap on Ethereum, in ETH
    pub max_trade_size_eth: Decimal,
    /// Largest single swap on Solana, in SOL
    pub max_trade_size_sol: Decimal,
    /// Percentile of recent Solana priority fees to pay
    pub priority_fee_percentile: u8,
    /// Priority fee cap in micro-lamports
    pub max_priority_fee: u64,
    pub bridge: BridgeLimits,
}

impl Default for BeesSection {
    fn default() -> Self {
        let defaults = BlockchainSettings::default();
        Self {
            health_check_interval_secs: 60,
            slippage_bps: defaults.slippage_bps,
            max_trade_size_eth: defaults.max_trade_size_eth,
            max_trade_size_sol: defaults.max_trade_size_sol,
            priority_fee_percentile: defaults.priority_fee_percentile,
            max_priority_fee: defaults.max_priority_fee,
            bridge: defaults.bridge,
        }
    }
}

/// Liquidity sentinel section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SentinelSection {
    /// Seconds between `monitor_all_pools` runs
    pub monitor_interval_secs: u64,
    /// Fractional deviation that raises a price warning (0.05 = 5%)
    pub price_deviation_threshold: f64,
    pub volatility_high_threshold: f64,
    /// Ask the LLM to summarize alerts
    pub summarize_alerts: bool,
    /// Pools registered at start-up, keyed by pool id
    pub pools: BTreeMap<String, PoolSpec>,
}

impl Default for SentinelSection {
    fn default() -> Self {
        let defaults = SentinelSettings::default();
        Self {
            monitor_interval_secs: 300,
            price_deviation_threshold: defaults.price_deviation_threshold,
            volatility_high_threshold: defaults.volatility_high_threshold,
            summarize_alerts: false,
            pools: BTreeMap::new(),
        }
    }
}

/// Data pipeline section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub enabled: bool,
    /// Local directory for collected JSON and CSV files
    pub work_dir: String,
    /// Object name prefix for uploads
    pub prefix: String,
    pub interval_minutes: u64,
    /// GCS bucket; empty uploads into `local_store_dir` instead
    pub bucket: String,
    pub gcs_base_url: String,
    /// Directory used as the object store when no bucket is configured
    pub local_store_dir: String,
    pub fivetran_connector_id: Option<String>,
    pub fivetran_base_url: String,
    pub oracle_pairs: Vec<OraclePair>,
    pub dex_pairs: Vec<DexPair>,
}

impl Default for PipelineSection {
    fn default() -> Self {
        let defaults = PipelineSettings::default();
        Self {
            enabled: true,
            work_dir: defaults.work_dir.to_string_lossy().into_owned(),
            prefix: defaults.prefix,
            interval_minutes: defaults.interval_minutes,
            bucket: String::new(),
            gcs_base_url: crate::adapters::storage::gcs::DEFAULT_BASE_URL.to_string(),
            local_store_dir: "data/uploads".to_string(),
            fivetran_connector_id: None,
            fivetran_base_url: crate::adapters::storage::fivetran::DEFAULT_BASE_URL.to_string(),
            oracle_pairs: Vec::new(),
            dex_pairs: Vec::new(),
        }
    }
}

impl PipelineSection {
    /// Get GCS access token from GCS_ACCESS_TOKEN
    pub fn get_gcs_token(&self) -> Option<String> {
        env_or("GCS_ACCESS_TOKEN", "")
    }

    /// Fivetran key and secret from FIVETRAN_API_KEY / FIVETRAN_API_SECRET
    pub fn get_fivetran_credentials(&self) -> Option<(String, String)> {
        Some((env_or("FIVETRAN_API_KEY", "")?, env_or("FIVETRAN_API_SECRET", "")?))
    }
}

/// Shared retry policy for outbound HTTP calls
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_attempts: defaults.max_attempts,
            base_delay_ms: defaults.base_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            multiplier: defaults.multiplier,
            jitter: defaults.jitter,
        }
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingSection {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Expand `~` and environment variables in a configured path
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(path).as_ref()),
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Environment value when set and non-empty, else the configured one
fn env_or(var: &str, configured: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| non_empty(configured).map(str::to_string))
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.tick_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "app.tick_interval_secs must be > 0".to_string(),
            ));
        }

        // Validate LLM section
        if !LLM_PROVIDERS.contains(&self.llm.default_provider.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "llm.default_provider must be one of {:?}, got {}",
                LLM_PROVIDERS, self.llm.default_provider
            )));
        }
        self.llm.selection_strategy()?;
        if self.llm.max_exchanges == 0 {
            return Err(ConfigError::ValidationError(
                "llm.max_exchanges must be > 0".to_string(),
            ));
        }

        self.oracles.feed_network()?;

        // Validate bee limits
        if self.bees.health_check_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "bees.health_check_interval_secs must be > 0".to_string(),
            ));
        }
        if self.bees.slippage_bps > 10_000 {
            return Err(ConfigError::ValidationError(format!(
                "bees.slippage_bps must be 0-10000, got {}",
                self.bees.slippage_bps
            )));
        }
        if self.bees.priority_fee_percentile > 100 {
            return Err(ConfigError::ValidationError(format!(
                "bees.priority_fee_percentile must be 0-100, got {}",
                self.bees.priority_fee_percentile
            )));
        }
        if self.bees.max_trade_size_eth <= Decimal::ZERO || self.bees.max_trade_size_sol <= Decimal::ZERO {
            return Err(ConfigError::ValidationError(
                "bees.max_trade_size_eth and bees.max_trade_size_sol must be > 0".to_string(),
            ));
        }
        let bridge = &self.bees.bridge;
        if bridge.min_amount <= Decimal::ZERO || bridge.min_amount > bridge.max_amount {
            return Err(ConfigError::ValidationError(format!(
                "bees.bridge amounts must satisfy 0 < min <= max, got {} / {}",
                bridge.min_amount, bridge.max_amount
            )));
        }
        if bridge.fee_rate < Decimal::ZERO || bridge.fee_rate >= Decimal::ONE {
            return Err(ConfigError::ValidationError(format!(
                "bees.bridge.fee_rate must be in [0, 1), got {}",
                bridge.fee_rate
            )));
        }

        // Validate sentinel
        if self.sentinel.monitor_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "sentinel.monitor_interval_secs must be > 0".to_string(),
            ));
        }
        if self.sentinel.price_deviation_threshold <= 0.0 || self.sentinel.volatility_high_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(
                "sentinel thresholds must be > 0".to_string(),
            ));
        }
        for (id, pool) in &self.sentinel.pools {
            if pool.token_pair.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "sentinel.pools.{} token_pair cannot be empty",
                    id
                )));
            }
        }

        // Validate pipeline
        if self.pipeline.interval_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.interval_minutes must be >= 1".to_string(),
            ));
        }
        if self.pipeline.work_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "pipeline.work_dir cannot be empty".to_string(),
            ));
        }

        // Validate retry
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.retry.multiplier < 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "retry.multiplier must be >= 1, got {}",
                self.retry.multiplier
            )));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "retry.base_delay_ms cannot exceed retry.max_delay_ms".to_string(),
            ));
        }

        if !matches!(self.logging.format.to_lowercase().as_str(), "pretty" | "json") {
            return Err(ConfigError::ValidationError(format!(
                "logging.format must be \"pretty\" or \"json\", got {}",
                self.logging.format
            )));
        }

        Ok(())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(section: &RetrySection) -> Self {
        RetryPolicy {
            max_attempts: section.max_attempts,
            base_delay: Duration::from_millis(section.base_delay_ms),
            max_delay: Duration::from_millis(section.max_delay_ms),
            multiplier: section.multiplier,
            jitter: section.jitter,
        }
    }
}

impl From<&BeesSection> for BlockchainSettings {
    fn from(section: &BeesSection) -> Self {
        BlockchainSettings {
            slippage_bps: section.slippage_bps,
            max_trade_size_eth: section.max_trade_size_eth,
            max_trade_size_sol: section.max_trade_size_sol,
            priority_fee_percentile: section.priority_fee_percentile,
            max_priority_fee: section.max_priority_fee,
            bridge: section.bridge,
        }
    }
}

impl From<&SentinelSection> for SentinelSettings {
    fn from(section: &SentinelSection) -> Self {
        SentinelSettings {
            price_deviation_threshold: section.price_deviation_threshold,
            volatility_high_threshold: section.volatility_high_threshold,
        }
    }
}

impl From<&PipelineSection> for PipelineSettings {
    fn from(section: &PipelineSection) -> Self {
        PipelineSettings {
            work_dir: expand_path(&section.work_dir),
            prefix: section.prefix.clone(),
            interval_minutes: section.interval_minutes,
            oracle_pairs: section.oracle_pairs.clone(),
            dex_pairs: section.dex_pairs.clone(),
            fivetran_connector_id: section.fivetran_connector_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use rust_decimal_macros::dec;
    use tempfile::NamedTempFile;

    use crate::domain::Chain;

    fn create_valid_config() -> String {
        r#"
[app]
name = "hive-test"
environment = "development"
tick_interval_secs = 5

[redis]
url = ""
session_ttl_secs = 1800

[llm]
default_provider = "openai"
strategy = "failover"
memory_path = ""
max_exchanges = 50

[ethereum]
rpc_url = "https://eth.example.com"

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
keypair_path = "~/.config/solana/id.json"

[oracles]
network = "sepolia"

[bees]
health_check_interval_secs = 30
slippage_bps = 50
max_trade_size_eth = 5
max_trade_size_sol = "250.5"

[bees.bridge]
min_amount = "0.01"
max_amount = 100
fee_rate = "0.001"

[sentinel]
monitor_interval_secs = 120
price_deviation_threshold = 0.05
volatility_high_threshold = 0.1

[sentinel.pools.omk_eth]
chain = "ethereum"
token_pair = "ETH/USD"
token_a_amount = 100000.0
token_b_amount = 50.0

[pipeline]
interval_minutes = 30
work_dir = "/tmp/hive-pipeline"
fivetran_connector_id = "conn_1"

[[pipeline.oracle_pairs]]
chain = "solana"
pair = "SOL/USD"

[[pipeline.dex_pairs]]
chain = "ethereum"
token_in = "WETH"
token_out = "USDC"
amount = 1

[retry]
max_attempts = 4
base_delay_ms = 100
max_delay_ms = 2000
multiplier = 2.0
jitter = false

[logging]
level = "debug"
format = "json"
"#
        .to_string()
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.app.name, "hive-test");
        assert_eq!(config.redis.session_ttl_secs, 1800);
        assert_eq!(config.llm.selection_strategy().unwrap(), SelectionStrategy::Failover);
        assert!(config.llm.memory_file().is_none());
        assert_eq!(config.oracles.feed_network().unwrap(), FeedNetwork::Testnet);
        assert_eq!(config.bees.max_trade_size_sol, dec!(250.5));
        assert_eq!(config.bees.bridge.fee_rate, dec!(0.001));
        assert_eq!(config.sentinel.pools.len(), 1);
        assert_eq!(config.sentinel.pools["omk_eth"].chain, Chain::Ethereum);
        assert_eq!(config.pipeline.oracle_pairs[0].chain, Chain::Solana);
        assert_eq!(config.pipeline.dex_pairs[0].amount, dec!(1));
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.llm.default_provider, "gemini");
        assert_eq!(config.llm.selection_strategy().unwrap(), SelectionStrategy::RoundRobin);
        assert_eq!(config.bees.slippage_bps, 100);
        assert_eq!(config.pipeline.interval_minutes, 15);
        assert_eq!(config.pipeline.prefix, "blockchain_data/");
        assert_eq!(config.redis.lock_ttl_secs, 30);
        assert_eq!(config.redis.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.solana.timeout_secs, 30);
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/hive.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_malformed_toml() {
        let file = write_config("[bees\nslippage_bps = ");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let cases = [
            ("[llm]\ndefault_provider = \"mistral\"", "default_provider"),
            ("[llm]\nstrategy = \"random\"", "Unknown LLM strategy"),
            ("[oracles]\nnetwork = \"goerli\"", "Unknown oracle network"),
            ("[bees]\nslippage_bps = 20000", "slippage_bps"),
            ("[bees]\npriority_fee_percentile = 101", "priority_fee_percentile"),
            ("[bees.bridge]\nmin_amount = 5\nmax_amount = 1\nfee_rate = 0", "bees.bridge"),
            ("[pipeline]\ninterval_minutes = 0", "interval_minutes"),
            ("[retry]\nmax_attempts = 0", "max_attempts"),
            ("[retry]\nmultiplier = 0.5", "multiplier"),
            ("[logging]\nformat = \"xml\"", "logging.format"),
        ];

        for (content, expected) in cases {
            let file = write_config(content);
            match load_config(file.path()) {
                Err(ConfigError::ValidationError(msg)) => {
                    assert!(msg.contains(expected), "{} -> {}", content, msg)
                }
                other => panic!("expected validation error for {}, got {:?}", content, other.map(|_| ())),
            }
        }
    }

    #[test]
    fn test_pool_requires_pair() {
        let file = write_config("[sentinel.pools.bad]\ntoken_pair = \" \"");
        assert!(matches!(load_config(file.path()).unwrap_err(), ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_conversions() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        let retry = RetryPolicy::from(&config.retry);
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.base_delay, Duration::from_millis(100));
        assert!(!retry.jitter);

        let blockchain = BlockchainSettings::from(&config.bees);
        assert_eq!(blockchain.slippage_bps, 50);
        assert_eq!(blockchain.max_trade_size_eth, dec!(5));

        let pipeline = PipelineSettings::from(&config.pipeline);
        assert_eq!(pipeline.work_dir, PathBuf::from("/tmp/hive-pipeline"));
        assert_eq!(pipeline.interval_minutes, 30);
        assert_eq!(pipeline.fivetran_connector_id.as_deref(), Some("conn_1"));

        let sentinel = SentinelSettings::from(&config.sentinel);
        assert_eq!(sentinel.price_deviation_threshold, 0.05);
    }

    #[test]
    fn test_expand_home() {
        assert!(expand_path("~/hive/data").ends_with("hive/data"));
        assert_eq!(expand_path("/abs/path"), PathBuf::from("/abs/path"));
    }
}

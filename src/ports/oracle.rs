use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("Unsupported price pair: {0}")]
    UnsupportedPair(String),
    #[error("Invalid price for {pair}: {value}")]
    InvalidPrice { pair: String, value: String },
    #[error("Stale price for {pair}: {age_secs}s old (max {max_secs}s)")]
    StalePrice { pair: String, age_secs: i64, max_secs: i64 },
    #[error("Price feed for {pair} not trading (status {status})")]
    NotTrading { pair: String, status: u32 },
    #[error("Invalid price account data: {0}")]
    InvalidAccountData(String),
    #[error("Oracle source error: {0}")]
    Source(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Source(_))
    }
}

/// A price observation from an oracle feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub pair: String,
    pub price: f64,
    /// Confidence interval in price units, when the feed reports one
    pub confidence: Option<f64>,
    pub updated_at: DateTime<Utc>,
    pub source: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Feed family, e.g. "chainlink"
    fn source(&self) -> &'static str;

    /// Latest price for a pair such as "ETH/USD"
    async fn get_price(&self, pair: &str) -> Result<PriceQuote, OracleError>;

    fn supported_pairs(&self) -> Vec<String>;
}

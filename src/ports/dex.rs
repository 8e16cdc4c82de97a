use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::amm::AmmError;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DexError {
    #[error("No route from {token_in} to {token_out}")]
    NoRoute { token_in: String, token_out: String },
    #[error("Swap amount must be positive")]
    InvalidAmount,
    #[error("Invalid token address: {0}")]
    InvalidToken(String),
    #[error("DEX source error: {0}")]
    Source(String),
    #[error("AMM error: {0}")]
    Amm(#[from] AmmError),
}

impl DexError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, DexError::Source(_))
    }
}

/// Quote for swapping `amount_in` raw units of `token_in`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub dex: String,
    pub token_in: String,
    pub token_out: String,
    /// Raw units of `token_in`
    pub amount_in: u128,
    /// Raw units of `token_out`
    pub amount_out: u128,
    /// Fraction, 0.01 = 1%
    pub price_impact: f64,
    pub route: Vec<String>,
    pub pool_id: Option<String>,
}

#[async_trait]
pub trait DexRouter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<SwapQuote, DexError>;
}

//! Chains, priority levels and unit conversions
//!
//! Shared vocabulary for the Ethereum and Solana adapters and the bees that
//! drive them. Amounts crossing the boundary are converted with
//! `rust_decimal` so that wei and lamport values never pass through floats.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Wei per ether
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

/// Wei per gwei
pub const WEI_PER_GWEI: u128 = 1_000_000_000;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Solana base fee per signature in lamports
pub const SOLANA_BASE_FEE_LAMPORTS: u64 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("Unsupported chain: {0}")]
    UnsupportedChain(String),
    #[error("Unknown priority: {0}")]
    UnknownPriority(String),
}

/// Supported chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    #[default]
    Ethereum,
    Solana,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Solana => "solana",
        }
    }

    /// Block explorer link for a transaction hash or signature
    pub fn explorer_url(&self, tx: &str) -> String {
        match self {
            Chain::Ethereum => format!("https://etherscan.io/tx/{}", tx),
            Chain::Solana => format!("https://solscan.io/tx/{}", tx),
        }
    }

    /// Native asset symbol
    pub fn native_symbol(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH",
            Chain::Solana => "SOL",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "solana" | "sol" => Ok(Chain::Solana),
            other => Err(ChainError::UnsupportedChain(other.to_string())),
        }
    }
}

/// Transaction priority, mapped to a gas price multiplier on Ethereum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Normal, Priority::High];

    /// Multiplier applied to the node's base gas price
    pub fn gas_multiplier(&self) -> Decimal {
        match self {
            Priority::Low => Decimal::new(8, 1),
            Priority::Normal => Decimal::ONE,
            Priority::High => Decimal::new(13, 1),
        }
    }

    /// Apply the multiplier to a base gas price, truncating to whole wei.
    /// Saturates at `u128::MAX`.
    pub fn apply(&self, base_gas_price_wei: u128) -> u128 {
        match self {
            Priority::Normal => base_gas_price_wei,
            Priority::Low => scale_tenths(base_gas_price_wei, 8),
            Priority::High => scale_tenths(base_gas_price_wei, 13),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

// value * tenths / 10 without the intermediate product
fn scale_tenths(value: u128, tenths: u128) -> u128 {
    (value / 10)
        .saturating_mul(tenths)
        .saturating_add(value % 10 * tenths / 10)
}

impl FromStr for Priority {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" | "medium" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(ChainError::UnknownPriority(other.to_string())),
        }
    }
}

/// Convert wei to ether
pub fn wei_to_eth(wei: u128) -> Decimal {
    wei_decimal(wei) / Decimal::from(WEI_PER_ETH as u64)
}

/// Convert wei to gwei
pub fn wei_to_gwei(wei: u128) -> Decimal {
    wei_decimal(wei) / Decimal::from(WEI_PER_GWEI as u64)
}

// Decimal mantissas are 96 bits; saturate rather than panic on absurd values
fn wei_decimal(wei: u128) -> Decimal {
    i128::try_from(wei)
        .ok()
        .and_then(|wei| Decimal::try_from_i128_with_scale(wei, 0).ok())
        .unwrap_or(Decimal::MAX)
}

/// Convert ether to wei, truncating sub-wei precision
pub fn eth_to_wei(eth: Decimal) -> Option<u128> {
    let wei = (eth * Decimal::from(WEI_PER_ETH as u64)).trunc();
    u128::try_from(wei).ok()
}

/// Convert lamports to SOL
pub fn lamports_to_sol(lamports: u64) -> Decimal {
    Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL)
}

/// Convert SOL to lamports, truncating sub-lamport precision
pub fn sol_to_lamports(sol: Decimal) -> Option<u64> {
    let lamports = (sol * Decimal::from(LAMPORTS_PER_SOL)).trunc();
    u64::try_from(lamports).ok()
}

/// Total Solana fee in lamports for a given priority fee in micro-lamports
pub fn solana_total_fee_lamports(priority_fee_microlamports: u64) -> Decimal {
    Decimal::from(SOLANA_BASE_FEE_LAMPORTS) + Decimal::from(priority_fee_microlamports) / Decimal::from(1000u64)
}

/// Priority fee used when no recent samples are available (micro-lamports)
pub const DEFAULT_PRIORITY_FEE_MICROLAMPORTS: u64 = 1_000;

/// Pick the `percentile` sample from recent priority fees, capped at `max_fee`
///
/// The sample index is `len * percentile / 100`, clamped to the last sample.
pub fn priority_fee_percentile(samples: &[u64], percentile: u8, max_fee: u64) -> u64 {
    if samples.is_empty() {
        return DEFAULT_PRIORITY_FEE_MICROLAMPORTS.min(max_fee);
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let index = (sorted.len() * usize::from(percentile.min(100)) / 100).min(sorted.len() - 1);
    sorted[index].min(max_fee)
}

/// Format a native amount with four decimals and thousands separators
pub fn format_amount(amount: Decimal, symbol: &str) -> String {
    let rounded = amount.round_dp(4);
    let text = format!("{:.4}", rounded);
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "0000"));
    let (sign, digits) = match int_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int_part),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{} {}", sign, grouped, frac_part, symbol)
}

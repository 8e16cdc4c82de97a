//! Price oracle adapters
//!
//! - Chainlink aggregators read over Ethereum `eth_call`
//! - Pyth price accounts read over Solana RPC

pub mod chainlink;
pub mod pyth;

pub use chainlink::ChainlinkOracle;
pub use pyth::PythOracle;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which feed table an oracle reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedNetwork {
    #[default]
    Mainnet,
    /// Sepolia for Chainlink, devnet for Pyth
    Testnet,
}

impl FromStr for FeedNetwork {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" | "mainnet-beta" => Ok(FeedNetwork::Mainnet),
            "testnet" | "sepolia" | "devnet" => Ok(FeedNetwork::Testnet),
            other => Err(format!("Unknown oracle network: {}", other)),
        }
    }
}

impl fmt::Display for FeedNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedNetwork::Mainnet => write!(f, "mainnet"),
            FeedNetwork::Testnet => write!(f, "testnet"),
        }
    }
}

/// Scale an integer by `10^expo`
pub(crate) fn scale(value: f64, expo: i32) -> f64 {
    value * 10f64.powi(expo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_parsing() {
        assert_eq!("sepolia".parse::<FeedNetwork>().unwrap(), FeedNetwork::Testnet);
        assert_eq!("Devnet".parse::<FeedNetwork>().unwrap(), FeedNetwork::Testnet);
        assert_eq!("mainnet".parse::<FeedNetwork>().unwrap(), FeedNetwork::Mainnet);
        assert!("goerli".parse::<FeedNetwork>().is_err());
    }

    #[test]
    fn test_scale() {
        assert!((scale(350_000_000_000.0, -8) - 3500.0).abs() < 1e-9);
    }
}

//! Pyth price account oracle (Solana)
//!
//! Reads legacy Pyth price accounts directly and parses the fields the hive
//! needs. Prices are cached briefly since accounts update every slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::{scale, FeedNetwork};
use crate::ports::{OracleError, PriceOracle, PriceQuote, SolanaRpc};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

const EXPO_OFFSET: usize = 20;
const PRICE_OFFSET: usize = 208;
const CONFIDENCE_OFFSET: usize = 216;
const STATUS_OFFSET: usize = 224;

/// Status value of a feed that is actively trading
pub const STATUS_TRADING: u32 = 1;

const MAINNET_FEEDS: &[(&str, &str)] = &[
    ("SOL/USD", "H6ARHf6YXhGYeQfUzQNGk6rDNnLBQKrenN712K4AQJEG"),
    ("BTC/USD", "GVXRSBjFk6e6J3NbVPXohDJetcTjaeeuykUpbQF8UoMU"),
    ("ETH/USD", "JBu1AL4obBcCMqKBBxhpWCNUt136ijcuMZLFvTP7iWdB"),
    ("USDC/USD", "Gnt27xtC473ZT2Mw5u8wZ68Z3gULkSTb5DuxJy7eJotD"),
    ("USDT/USD", "3vxLXJqLqF3JG5TCbYycbKWRBbCJQLxQmBGCkyqEEefL"),
];

const DEVNET_FEEDS: &[(&str, &str)] = &[
    ("SOL/USD", "J83w4HKfqxwcq3BEMMkPFSppX3gqekLyLJBexebFVkix"),
    ("BTC/USD", "HovQMDrbAgAYPCmHVSrezcSmkMtXSSUsLDFANExrZh2J"),
    ("ETH/USD", "EdVCmQ9FSPcVe5YySXDPCRmc8aDQLKJ9xvYBMZPie1Vw"),
];

/// Fields parsed out of a price account
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PythPrice {
    pub price: f64,
    pub confidence: f64,
    pub status: u32,
}

pub fn status_name(status: u32) -> &'static str {
    match status {
        1 => "trading",
        2 => "halted",
        3 => "auction",
        _ => "unknown",
    }
}

fn read_array<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N], OracleError> {
    data.get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or_else(|| {
            OracleError::InvalidAccountData(format!("account too short: {} bytes, need {}", data.len(), offset + N))
        })
}

/// Parse the little-endian price fields of a Pyth price account
pub fn parse_price_account(data: &[u8]) -> Result<PythPrice, OracleError> {
    let expo = i32::from_le_bytes(read_array(data, EXPO_OFFSET)?);
    let raw_price = i64::from_le_bytes(read_array(data, PRICE_OFFSET)?);
    let raw_conf = u64::from_le_bytes(read_array(data, CONFIDENCE_OFFSET)?);
    let status = u32::from_le_bytes(read_array(data, STATUS_OFFSET)?);

    Ok(PythPrice {
        price: scale(raw_price as f64, expo),
        confidence: scale(raw_conf as f64, expo),
        status,
    })
}

/// Pyth feeds read through a [`SolanaRpc`]
pub struct PythOracle {
    client: Arc<dyn SolanaRpc>,
    network: FeedNetwork,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, (PriceQuote, Instant)>>,
}

impl PythOracle {
    pub fn new(client: Arc<dyn SolanaRpc>, network: FeedNetwork) -> Self {
        Self {
            client,
            network,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn feeds(&self) -> &'static [(&'static str, &'static str)] {
        match self.network {
            FeedNetwork::Mainnet => MAINNET_FEEDS,
            FeedNetwork::Testnet => DEVNET_FEEDS,
        }
    }

    pub fn feed_address(&self, pair: &str) -> Option<&'static str> {
        let pair = pair.to_uppercase();
        self.feeds().iter().find(|(p, _)| *p == pair).map(|(_, addr)| *addr)
    }

    fn cached(&self, pair: &str) -> Option<PriceQuote> {
        let cache = self.cache.lock();
        cache
            .get(pair)
            .filter(|(_, at)| at.elapsed() < self.cache_ttl)
            .map(|(quote, _)| quote.clone())
    }
}

#[async_trait]
impl PriceOracle for PythOracle {
    fn source(&self) -> &'static str {
        "pyth"
    }

    async fn get_price(&self, pair: &str) -> Result<PriceQuote, OracleError> {
        let pair = pair.to_uppercase();
        if let Some(quote) = self.cached(&pair) {
            return Ok(quote);
        }

        let feed = self
            .feed_address(&pair)
            .ok_or_else(|| OracleError::UnsupportedPair(pair.clone()))?;

        let data = self
            .client
            .get_account_data(feed)
            .await
            .map_err(|e| OracleError::Source(e.to_string()))?;
        let parsed = parse_price_account(&data)?;

        if parsed.status != STATUS_TRADING {
            return Err(OracleError::NotTrading {
                pair,
                status: parsed.status,
            });
        }
        if parsed.price <= 0.0 {
            return Err(OracleError::InvalidPrice {
                pair,
                value: parsed.price.to_string(),
            });
        }

        let quote = PriceQuote {
            pair: pair.clone(),
            price: parsed.price,
            confidence: Some(parsed.confidence),
            updated_at: Utc::now(),
            source: self.source().to_string(),
        };
        tracing::debug!(pair = %pair, price = quote.price, confidence = parsed.confidence, "Pyth price");
        self.cache.lock().insert(pair, (quote.clone(), Instant::now()));
        Ok(quote)
    }

    fn supported_pairs(&self) -> Vec<String> {
        self.feeds().iter().map(|(pair, _)| pair.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockSolanaRpc;

    const SOL_USD: &str = "H6ARHf6YXhGYeQfUzQNGk6rDNnLBQKrenN712K4AQJEG";

    fn price_account(price: i64, conf: u64, expo: i32, status: u32) -> Vec<u8> {
        let mut data = vec![0u8; 240];
        data[EXPO_OFFSET..EXPO_OFFSET + 4].copy_from_slice(&expo.to_le_bytes());
        data[PRICE_OFFSET..PRICE_OFFSET + 8].copy_from_slice(&price.to_le_bytes());
        data[CONFIDENCE_OFFSET..CONFIDENCE_OFFSET + 8].copy_from_slice(&conf.to_le_bytes());
        data[STATUS_OFFSET..STATUS_OFFSET + 4].copy_from_slice(&status.to_le_bytes());
        data
    }

    #[test]
    fn test_parse_price_account() {
        let parsed = parse_price_account(&price_account(14_250_000_000, 5_000_000, -8, 1)).unwrap();
        assert!((parsed.price - 142.5).abs() < 1e-9);
        assert!((parsed.confidence - 0.05).abs() < 1e-9);
        assert_eq!(status_name(parsed.status), "trading");
    }

    #[test]
    fn test_short_account_rejected() {
        assert!(matches!(
            parse_price_account(&[0u8; 100]),
            Err(OracleError::InvalidAccountData(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_price_is_cached_briefly() {
        let rpc = MockSolanaRpc::new().with_account_data(SOL_USD, price_account(14_250_000_000, 5_000_000, -8, 1));
        let oracle = PythOracle::new(Arc::new(rpc.clone()), FeedNetwork::Mainnet);

        let first = oracle.get_price("sol/usd").await.unwrap();
        assert_eq!(first.source, "pyth");
        assert!((first.confidence.unwrap() - 0.05).abs() < 1e-9);

        // Served from cache even though the account changed
        let _rpc = rpc.with_account_data(SOL_USD, price_account(15_000_000_000, 0, -8, 1));
        assert!((oracle.get_price("SOL/USD").await.unwrap().price - 142.5).abs() < 1e-9);

        tokio::time::advance(Duration::from_secs(6)).await;
        assert!((oracle.get_price("SOL/USD").await.unwrap().price - 150.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_halted_feed_rejected() {
        let rpc = MockSolanaRpc::new().with_account_data(SOL_USD, price_account(14_250_000_000, 0, -8, 2));
        let oracle = PythOracle::new(Arc::new(rpc), FeedNetwork::Mainnet);
        assert!(matches!(
            oracle.get_price("SOL/USD").await,
            Err(OracleError::NotTrading { status: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_devnet_feed_table() {
        let oracle = PythOracle::new(Arc::new(MockSolanaRpc::new()), FeedNetwork::Testnet);
        assert_eq!(oracle.supported_pairs(), vec!["SOL/USD", "BTC/USD", "ETH/USD"]);
        assert!(matches!(
            oracle.get_price("USDC/USD").await,
            Err(OracleError::UnsupportedPair(_))
        ));
    }
}

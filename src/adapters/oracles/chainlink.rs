//! Chainlink aggregator oracle (Ethereum)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{scale, FeedNetwork};
use crate::adapters::ethereum::abi::{self, to_hex_data, word_at};
use crate::ports::{CallRequest, EthereumError, EvmClient, OracleError, PriceOracle, PriceQuote};

/// Rounds older than this are rejected
pub const DEFAULT_MAX_STALENESS_SECS: i64 = 3600;

const MAINNET_FEEDS: &[(&str, &str)] = &[
    ("ETH/USD", "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419"),
    ("BTC/USD", "0xF4030086522a5bEEa4988F8cA5B36dbC97BeE88c"),
    ("LINK/USD", "0x2c1d072e956AFFC0D435Cb7AC38EF18d24d9127c"),
    ("USDC/USD", "0x8fFfFfd4AfB6115b954Bd326cbe7B4BA576818f6"),
    ("DAI/USD", "0xAed0c38402a5d19df6E4c03F4E2DceD6e29c1ee9"),
    ("USDT/USD", "0x3E7d1eAB13ad0104d2750B8863b489D65364e32D"),
];

const SEPOLIA_FEEDS: &[(&str, &str)] = &[
    ("ETH/USD", "0x694AA1769357215DE4FAC081bf1f309aDC325306"),
    ("BTC/USD", "0x1b44F3514812d835EB1BDB0acB33d3fA3351Ee43"),
    ("LINK/USD", "0xc59E3633BAAC79493d908e63626716e204A45EdF"),
];

/// Decoded `latestRoundData()` return value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundData {
    pub round_id: u128,
    pub answer: i128,
    pub started_at: i64,
    pub updated_at: i64,
}

impl RoundData {
    pub fn decode(data: &[u8]) -> Result<Self, EthereumError> {
        let timestamp = |index| -> Result<i64, EthereumError> {
            i64::try_from(abi::decode_uint(word_at(data, index)?)?)
                .map_err(|_| EthereumError::Abi("timestamp out of range".into()))
        };
        Ok(Self {
            round_id: abi::decode_uint(word_at(data, 0)?)?,
            answer: abi::decode_int(word_at(data, 1)?)?,
            started_at: timestamp(2)?,
            updated_at: timestamp(3)?,
        })
    }
}

fn source_error(e: EthereumError) -> OracleError {
    OracleError::Source(e.to_string())
}

/// Chainlink price feeds read through an [`EvmClient`]
pub struct ChainlinkOracle {
    client: Arc<dyn EvmClient>,
    network: FeedNetwork,
    max_staleness_secs: i64,
    decimals: Mutex<HashMap<String, u32>>,
}

impl ChainlinkOracle {
    pub fn new(client: Arc<dyn EvmClient>, network: FeedNetwork) -> Self {
        Self {
            client,
            network,
            max_staleness_secs: DEFAULT_MAX_STALENESS_SECS,
            decimals: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_max_staleness(mut self, secs: i64) -> Self {
        self.max_staleness_secs = secs;
        self
    }

    fn feeds(&self) -> &'static [(&'static str, &'static str)] {
        match self.network {
            FeedNetwork::Mainnet => MAINNET_FEEDS,
            FeedNetwork::Testnet => SEPOLIA_FEEDS,
        }
    }

    /// Aggregator address for a pair
    pub fn feed_address(&self, pair: &str) -> Option<&'static str> {
        let pair = pair.to_uppercase();
        self.feeds().iter().find(|(p, _)| *p == pair).map(|(_, addr)| *addr)
    }

    async fn read(&self, feed: &str, selector: [u8; 4]) -> Result<Vec<u8>, OracleError> {
        let request = CallRequest {
            to: feed.to_string(),
            data: Some(to_hex_data(&selector)),
            ..Default::default()
        };
        self.client.call(&request).await.map_err(source_error)
    }

    async fn feed_decimals(&self, feed: &str) -> Result<u32, OracleError> {
        if let Some(decimals) = self.decimals.lock().get(feed).copied() {
            return Ok(decimals);
        }
        let data = self.read(feed, abi::DECIMALS).await?;
        let raw = word_at(&data, 0)
            .and_then(abi::decode_uint)
            .map_err(source_error)?;
        let decimals = u32::try_from(raw).map_err(|_| OracleError::Source(format!("bad decimals {}", raw)))?;
        self.decimals.lock().insert(feed.to_string(), decimals);
        Ok(decimals)
    }

    /// Price from a decoded round, checked for sign and freshness at `now`
    pub fn price_from_round(
        &self,
        pair: &str,
        round: &RoundData,
        decimals: u32,
        now: DateTime<Utc>,
    ) -> Result<PriceQuote, OracleError> {
        if round.answer <= 0 {
            return Err(OracleError::InvalidPrice {
                pair: pair.to_string(),
                value: round.answer.to_string(),
            });
        }

        let age_secs = now.timestamp() - round.updated_at;
        if age_secs > self.max_staleness_secs {
            return Err(OracleError::StalePrice {
                pair: pair.to_string(),
                age_secs,
                max_secs: self.max_staleness_secs,
            });
        }

        let updated_at = DateTime::from_timestamp(round.updated_at, 0).unwrap_or(now);
        Ok(PriceQuote {
            pair: pair.to_string(),
            price: scale(round.answer as f64, -(decimals as i32)),
            confidence: None,
            updated_at,
            source: self.source().to_string(),
        })
    }
}

#[async_trait]
impl PriceOracle for ChainlinkOracle {
    fn source(&self) -> &'static str {
        "chainlink"
    }

    async fn get_price(&self, pair: &str) -> Result<PriceQuote, OracleError> {
        let feed = self
            .feed_address(pair)
            .ok_or_else(|| OracleError::UnsupportedPair(pair.to_string()))?;

        let data = self.read(feed, abi::LATEST_ROUND_DATA).await?;
        let round = RoundData::decode(&data).map_err(source_error)?;
        let decimals = self.feed_decimals(feed).await?;

        let quote = self.price_from_round(&pair.to_uppercase(), &round, decimals, Utc::now())?;
        tracing::debug!(pair = %quote.pair, price = quote.price, round_id = round.round_id, "Chainlink price");
        Ok(quote)
    }

    fn supported_pairs(&self) -> Vec<String> {
        self.feeds().iter().map(|(pair, _)| pair.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ethereum::abi::encode_uint;
    use crate::ports::mocks::MockEvmClient;

    const ETH_USD: &str = "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419";

    fn round_data(answer: u128, updated_at: i64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_uint(110_680_464_442_257_320_000));
        data.extend_from_slice(&encode_uint(answer));
        data.extend_from_slice(&encode_uint(updated_at as u128));
        data.extend_from_slice(&encode_uint(updated_at as u128));
        data.extend_from_slice(&encode_uint(110_680_464_442_257_320_000));
        data
    }

    #[tokio::test]
    async fn test_get_price_scales_by_decimals() {
        let now = Utc::now().timestamp();
        let client = MockEvmClient::new()
            .with_call_result(ETH_USD, "feaf968c", round_data(350_012_000_000, now - 60))
            .with_call_result(ETH_USD, "313ce567", encode_uint(8).to_vec());
        let oracle = ChainlinkOracle::new(Arc::new(client.clone()), FeedNetwork::Mainnet);

        let quote = oracle.get_price("eth/usd").await.unwrap();
        assert_eq!(quote.pair, "ETH/USD");
        assert_eq!(quote.source, "chainlink");
        assert!((quote.price - 3500.12).abs() < 1e-6);

        // Decimals are cached per feed
        oracle.get_price("ETH/USD").await.unwrap();
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_unsupported_pair() {
        let oracle = ChainlinkOracle::new(Arc::new(MockEvmClient::new()), FeedNetwork::Testnet);
        assert!(matches!(
            oracle.get_price("DAI/USD").await,
            Err(OracleError::UnsupportedPair(_))
        ));
        assert_eq!(oracle.supported_pairs().len(), 3);
    }

    #[test]
    fn test_stale_and_negative_rounds_rejected() {
        let oracle = ChainlinkOracle::new(Arc::new(MockEvmClient::new()), FeedNetwork::Mainnet);
        let now = Utc::now();

        let stale = RoundData {
            round_id: 1,
            answer: 100,
            started_at: 0,
            updated_at: now.timestamp() - 7200,
        };
        assert!(matches!(
            oracle.price_from_round("ETH/USD", &stale, 8, now),
            Err(OracleError::StalePrice { max_secs: 3600, .. })
        ));

        let negative = RoundData {
            answer: -5,
            updated_at: now.timestamp(),
            ..stale
        };
        assert!(matches!(
            oracle.price_from_round("ETH/USD", &negative, 8, now),
            Err(OracleError::InvalidPrice { .. })
        ));
    }

    #[test]
    fn test_round_decode_too_short() {
        assert!(RoundData::decode(&[0u8; 64]).is_err());
    }
}

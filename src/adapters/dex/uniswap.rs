//! Uniswap V2 router quotes via `getAmountsOut`

use std::sync::Arc;

use async_trait::async_trait;

use crate::adapters::ethereum::abi::{self, to_hex_data};
use crate::domain::amm::{routed_price_impact, uniswap_path};
use crate::ports::{CallRequest, DexError, DexRouter, EvmClient, SwapQuote};

pub const UNISWAP_V2_ROUTER: &str = "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D";

/// Spot rate is sampled with an input this many times smaller than the trade
const SPOT_SAMPLE_DIVISOR: u128 = 1_000;

/// Quotes swaps through a Uniswap V2 router contract
pub struct UniswapRouter {
    client: Arc<dyn EvmClient>,
    router: String,
}

impl UniswapRouter {
    pub fn new(client: Arc<dyn EvmClient>) -> Self {
        Self::with_router(client, UNISWAP_V2_ROUTER)
    }

    pub fn with_router(client: Arc<dyn EvmClient>, router: &str) -> Self {
        Self {
            client,
            router: router.to_string(),
        }
    }

    /// `getAmountsOut(amount_in, path)` on the router
    pub async fn amounts_out(&self, amount_in: u128, path: &[String]) -> Result<Vec<u128>, DexError> {
        let data = abi::encode_get_amounts_out(amount_in, path).map_err(|e| match e {
            crate::ports::EthereumError::InvalidAddress(addr) => DexError::InvalidToken(addr),
            other => DexError::Source(other.to_string()),
        })?;

        let request = CallRequest {
            to: self.router.clone(),
            data: Some(to_hex_data(&data)),
            ..Default::default()
        };
        let output = self
            .client
            .call(&request)
            .await
            .map_err(|e| DexError::Source(e.to_string()))?;

        abi::decode_uint_array(&output).map_err(|e| DexError::Source(e.to_string()))
    }

    /// Output per input unit for a small sample trade
    async fn spot_rate(&self, amount_in: u128, path: &[String]) -> Option<f64> {
        let sample = (amount_in / SPOT_SAMPLE_DIVISOR).max(1);
        match self.amounts_out(sample, path).await {
            Ok(amounts) => spot_from_amounts(&amounts),
            Err(e) => {
                tracing::debug!(error = %e, "Spot sample failed, price impact unavailable");
                None
            }
        }
    }
}

fn spot_from_amounts(amounts: &[u128]) -> Option<f64> {
    match (amounts.first(), amounts.last()) {
        (Some(&first), Some(&last)) if first > 0 && last > 0 => Some(last as f64 / first as f64),
        _ => None,
    }
}

#[async_trait]
impl DexRouter for UniswapRouter {
    fn name(&self) -> &'static str {
        "uniswap"
    }

    async fn get_quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<SwapQuote, DexError> {
        if amount_in == 0 {
            return Err(DexError::InvalidAmount);
        }

        let path = uniswap_path(token_in, token_out);
        let amounts = self.amounts_out(amount_in, &path).await?;
        let amount_out = amounts.last().copied().filter(|out| *out > 0).ok_or_else(|| DexError::NoRoute {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
        })?;

        let spot = self.spot_rate(amount_in, &path).await;
        let price_impact = routed_price_impact(amount_in, amount_out, spot);

        tracing::debug!(token_in, token_out, amount_in = %amount_in, amount_out = %amount_out, price_impact, "Uniswap quote");

        Ok(SwapQuote {
            dex: self.name().to_string(),
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out,
            price_impact,
            route: path,
            pool_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ethereum::abi::encode_uint;
    use crate::domain::amm::WETH_ADDRESS;
    use crate::ports::mocks::MockEvmClient;

    const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

    fn amounts(values: &[u128]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&encode_uint(32));
        data.extend_from_slice(&encode_uint(values.len() as u128));
        for v in values {
            data.extend_from_slice(&encode_uint(*v));
        }
        data
    }

    #[tokio::test]
    async fn test_quote_direct_weth_path() {
        let client = MockEvmClient::new().with_call_result(
            UNISWAP_V2_ROUTER,
            "d06ca61f",
            amounts(&[1_000_000_000_000_000_000, 3_500_000_000]),
        );
        let router = UniswapRouter::new(Arc::new(client.clone()));

        let quote = router.get_quote(WETH_ADDRESS, USDC, 1_000_000_000_000_000_000).await.unwrap();
        assert_eq!(quote.dex, "uniswap");
        assert_eq!(quote.amount_out, 3_500_000_000);
        assert_eq!(quote.route.len(), 2);

        let calls = client.calls();
        assert!(calls[0].data.as_deref().unwrap().starts_with("0xd06ca61f"));
        assert_eq!(calls[0].to, UNISWAP_V2_ROUTER);
    }

    #[tokio::test]
    async fn test_token_to_token_routes_through_weth() {
        let dai = "0x6B175474E89094C44Da98b954EedeAC495271d0F";
        let client = MockEvmClient::new().with_call_result(UNISWAP_V2_ROUTER, "d06ca61f", amounts(&[100, 1, 99]));
        let router = UniswapRouter::new(Arc::new(client));

        let quote = router.get_quote(USDC, dai, 100).await.unwrap();
        assert_eq!(quote.route.len(), 3);
        assert_eq!(quote.route[1], WETH_ADDRESS.to_lowercase());
        assert_eq!(quote.amount_out, 99);
    }

    #[tokio::test]
    async fn test_reverted_call_is_source_error() {
        let router = UniswapRouter::new(Arc::new(MockEvmClient::new()));
        assert!(matches!(
            router.get_quote(WETH_ADDRESS, USDC, 10).await,
            Err(DexError::Source(_))
        ));
        assert_eq!(router.get_quote(WETH_ADDRESS, USDC, 0).await, Err(DexError::InvalidAmount));
        assert!(matches!(
            router.get_quote("0xbad", USDC, 10).await,
            Err(DexError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_spot_from_amounts() {
        assert_eq!(spot_from_amounts(&[1_000, 2_000]), Some(2.0));
        assert_eq!(spot_from_amounts(&[0, 2_000]), None);
        assert_eq!(spot_from_amounts(&[]), None);
    }
}

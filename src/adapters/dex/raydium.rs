//! Raydium quotes from the v3 pool API
//!
//! Pool reserves come from `GET /pools/info/mint`; the quote itself is
//! computed locally with constant-product math against the deepest pool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::adapters::http::{self, HttpError};
use crate::adapters::retry::RetryPolicy;
use crate::domain::amm::{price_impact, swap_output, RAYDIUM_FEE};
use crate::ports::{DexError, DexRouter, SwapQuote};

pub const DEFAULT_API_URL: &str = "https://api-v3.raydium.io";

#[derive(Debug, Deserialize)]
struct PoolListResponse {
    success: bool,
    #[serde(default)]
    data: Option<PoolPage>,
}

#[derive(Debug, Deserialize)]
struct PoolPage {
    #[serde(default)]
    data: Vec<PoolInfo>,
}

/// Subset of the v3 pool record used for quoting
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub id: String,
    pub mint_a: MintInfo,
    pub mint_b: MintInfo,
    /// Reserve of mint A in UI units
    pub mint_amount_a: f64,
    pub mint_amount_b: f64,
    #[serde(default)]
    pub tvl: f64,
    #[serde(default)]
    pub fee_rate: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MintInfo {
    pub address: String,
    pub decimals: u8,
}

impl PoolInfo {
    /// `(reserve_in, reserve_out, decimals_in, decimals_out)` oriented for a swap from `token_in`
    fn oriented(&self, token_in: &str) -> Option<(f64, f64, u8, u8)> {
        if self.mint_a.address == token_in {
            Some((self.mint_amount_a, self.mint_amount_b, self.mint_a.decimals, self.mint_b.decimals))
        } else if self.mint_b.address == token_in {
            Some((self.mint_amount_b, self.mint_amount_a, self.mint_b.decimals, self.mint_a.decimals))
        } else {
            None
        }
    }
}

/// Pool with the highest TVL
pub fn best_pool(pools: &[PoolInfo]) -> Option<&PoolInfo> {
    pools
        .iter()
        .filter(|p| p.mint_amount_a > 0.0 && p.mint_amount_b > 0.0)
        .max_by(|a, b| a.tvl.total_cmp(&b.tvl))
}

/// Quote a swap against a single pool
pub fn quote_pool(pool: &PoolInfo, token_in: &str, token_out: &str, amount_in: u128) -> Result<SwapQuote, DexError> {
    let (reserve_in, reserve_out, decimals_in, decimals_out) =
        pool.oriented(token_in).ok_or_else(|| DexError::NoRoute {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
        })?;

    let ui_in = amount_in as f64 / 10f64.powi(i32::from(decimals_in));
    let fee = pool.fee_rate.unwrap_or(RAYDIUM_FEE);
    let ui_out = swap_output(ui_in, reserve_in, reserve_out, fee)?;
    let impact = price_impact(ui_in, ui_out, reserve_in, reserve_out);

    Ok(SwapQuote {
        dex: "raydium".to_string(),
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
        amount_in,
        amount_out: (ui_out * 10f64.powi(i32::from(decimals_out))).floor() as u128,
        price_impact: impact,
        route: vec![token_in.to_string(), token_out.to_string()],
        pool_id: Some(pool.id.clone()),
    })
}

/// Raydium pool API client
#[derive(Debug, Clone)]
pub struct RaydiumRouter {
    http: Client,
    api_url: String,
    retry: RetryPolicy,
}

impl RaydiumRouter {
    pub fn new(api_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, DexError> {
        let http = http::build_client(timeout).map_err(|e| DexError::Source(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Pools containing both mints, as listed by the API
    pub async fn pools_for(&self, mint_a: &str, mint_b: &str) -> Result<Vec<PoolInfo>, DexError> {
        let request = self.http.get(format!("{}/pools/info/mint", self.api_url)).query(&[
            ("mint1", mint_a),
            ("mint2", mint_b),
            ("poolType", "all"),
            ("poolSortField", "liquidity"),
            ("sortType", "desc"),
            ("pageSize", "20"),
            ("page", "1"),
        ]);

        let response: PoolListResponse = http::send_json(&self.retry, "raydium.pools", request)
            .await
            .map_err(|e: HttpError| DexError::Source(e.to_string()))?;

        if !response.success {
            return Err(DexError::Source("Raydium API reported failure".into()));
        }
        Ok(response.data.map(|page| page.data).unwrap_or_default())
    }
}

#[async_trait]
impl DexRouter for RaydiumRouter {
    fn name(&self) -> &'static str {
        "raydium"
    }

    async fn get_quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<SwapQuote, DexError> {
        if amount_in == 0 {
            return Err(DexError::InvalidAmount);
        }

        let pools = self.pools_for(token_in, token_out).await?;
        let pool = best_pool(&pools).ok_or_else(|| DexError::NoRoute {
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
        })?;

        let quote = quote_pool(pool, token_in, token_out, amount_in)?;
        tracing::debug!(
            pool = %pool.id,
            tvl = pool.tvl,
            amount_out = %quote.amount_out,
            price_impact = quote.price_impact,
            "Raydium quote"
        );
        Ok(quote)
    }
}

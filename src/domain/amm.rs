//! Constant-product AMM math
//!
//! Quote helpers shared by the Uniswap V2 and Raydium routers:
//! swap output under `x * y = k`, execution price impact, slippage floors
//! and WETH path routing.

use thiserror::Error;

/// Raydium AMM v4 swap fee (0.25%)
pub const RAYDIUM_FEE: f64 = 0.0025;

/// Uniswap V2 swap fee (0.3%)
pub const UNISWAP_V2_FEE: f64 = 0.003;

/// Wrapped ether on Ethereum mainnet
pub const WETH_ADDRESS: &str = "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmmError {
    #[error("Pool reserves must be positive (in: {reserve_in}, out: {reserve_out})")]
    EmptyReserves { reserve_in: f64, reserve_out: f64 },
    #[error("Swap amount must be positive, got {0}")]
    InvalidAmount(f64),
    #[error("Fee must be in [0, 1), got {0}")]
    InvalidFee(f64),
}

/// Output amount for a constant-product swap
///
/// `dy = y * dx' / (x + dx')` where `dx' = dx * (1 - fee)`
pub fn swap_output(amount_in: f64, reserve_in: f64, reserve_out: f64, fee: f64) -> Result<f64, AmmError> {
    if reserve_in <= 0.0 || reserve_out <= 0.0 {
        return Err(AmmError::EmptyReserves { reserve_in, reserve_out });
    }
    if amount_in <= 0.0 {
        return Err(AmmError::InvalidAmount(amount_in));
    }
    if !(0.0..1.0).contains(&fee) {
        return Err(AmmError::InvalidFee(fee));
    }

    let amount_in_with_fee = amount_in * (1.0 - fee);
    Ok(reserve_out * amount_in_with_fee / (reserve_in + amount_in_with_fee))
}

/// Price impact as a fraction: `|mid - execution| / mid`
pub fn price_impact(amount_in: f64, amount_out: f64, reserve_in: f64, reserve_out: f64) -> f64 {
    if reserve_in <= 0.0 || amount_in <= 0.0 {
        return 0.0;
    }
    let mid_price = reserve_out / reserve_in;
    if mid_price == 0.0 {
        return 0.0;
    }
    let execution_price = amount_out / amount_in;
    ((mid_price - execution_price) / mid_price).abs()
}

/// Price impact of a routed quote against a known spot rate
///
/// Returns 0 when no spot rate is available.
pub fn routed_price_impact(amount_in: u128, amount_out: u128, spot_rate: Option<f64>) -> f64 {
    match spot_rate {
        Some(spot) if spot > 0.0 && amount_in > 0 => {
            let exec = amount_out as f64 / amount_in as f64;
            (1.0 - exec / spot).max(0.0)
        }
        _ => 0.0,
    }
}

/// Minimum acceptable output after slippage tolerance
pub fn min_amount_out(amount_out: f64, slippage: f64) -> f64 {
    amount_out * (1.0 - slippage.clamp(0.0, 1.0))
}

/// Integer variant of [`min_amount_out`] for raw token units
pub fn min_amount_out_raw(amount_out: u128, slippage_bps: u16) -> u128 {
    let keep = 10_000 - u128::from(slippage_bps.min(10_000));
    // split so the product cannot overflow; the result never exceeds amount_out
    amount_out / 10_000 * keep + amount_out % 10_000 * keep / 10_000
}

/// Swap path through Uniswap V2: direct when either side is WETH,
/// otherwise routed through WETH
pub fn uniswap_path(token_in: &str, token_out: &str) -> Vec<String> {
    let weth = WETH_ADDRESS.to_lowercase();
    let token_in = token_in.to_lowercase();
    let token_out = token_out.to_lowercase();

    if token_in == weth || token_out == weth {
        vec![token_in, token_out]
    } else {
        vec![token_in, weth, token_out]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_swap_output_constant_product() {
        // 1000 in against 1M/2M reserves with 0.25% fee
        let out = swap_output(1_000.0, 1_000_000.0, 2_000_000.0, RAYDIUM_FEE).unwrap();
        let dx = 1_000.0 * 0.9975;
        assert_relative_eq!(out, 2_000_000.0 * dx / (1_000_000.0 + dx), epsilon = 1e-9);
        assert!(out < 2_000.0);
    }

    #[test]
    fn test_swap_output_rejects_bad_input() {
        assert!(matches!(swap_output(1.0, 0.0, 10.0, 0.0), Err(AmmError::EmptyReserves { .. })));
        assert!(matches!(swap_output(0.0, 10.0, 10.0, 0.0), Err(AmmError::InvalidAmount(_))));
        assert!(matches!(swap_output(1.0, 10.0, 10.0, 1.0), Err(AmmError::InvalidFee(_))));
    }

    #[test]
    fn test_price_impact_grows_with_size() {
        let small = swap_output(100.0, 1_000_000.0, 1_000_000.0, 0.0).unwrap();
        let large = swap_output(100_000.0, 1_000_000.0, 1_000_000.0, 0.0).unwrap();

        let small_impact = price_impact(100.0, small, 1_000_000.0, 1_000_000.0);
        let large_impact = price_impact(100_000.0, large, 1_000_000.0, 1_000_000.0);

        assert!(small_impact < 0.001);
        assert!(large_impact > 0.09);
        assert!(large_impact > small_impact);
    }

    #[test]
    fn test_routed_price_impact() {
        assert_eq!(routed_price_impact(100, 95, None), 0.0);
        assert_relative_eq!(routed_price_impact(100, 95, Some(1.0)), 0.05, epsilon = 1e-12);
        // Better than spot clamps to zero
        assert_eq!(routed_price_impact(100, 110, Some(1.0)), 0.0);
    }

    #[test]
    fn test_min_amount_out() {
        assert_relative_eq!(min_amount_out(1000.0, 0.01), 990.0);
        assert_eq!(min_amount_out_raw(1_000_000, 50), 995_000);
        assert_eq!(min_amount_out_raw(1_000_000, 20_000), 0);
    }

    #[test]
    fn test_min_amount_out_raw_large_amounts() {
        assert_eq!(min_amount_out_raw(999, 50), 994);
        assert_eq!(min_amount_out_raw(u128::MAX, 0), u128::MAX);
        assert_eq!(min_amount_out_raw(u128::MAX, 10_000), 0);
        assert_eq!(min_amount_out_raw(u128::MAX, 50), u128::MAX / 10_000 * 9_950 + 1_455 * 9_950 / 10_000);
    }

    #[test]
    fn test_uniswap_path() {
        let usdc = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let dai = "0x6B175474E89094C44Da98b954EedeAC495271d0F";

        let direct = uniswap_path(WETH_ADDRESS, usdc);
        assert_eq!(direct.len(), 2);

        let routed = uniswap_path(usdc, dai);
        assert_eq!(routed.len(), 3);
        assert_eq!(routed[1], WETH_ADDRESS.to_lowercase());
    }
}

//! Portfolio rebalancing analysis
//!
//! Given value-denominated holdings and target weights, computes the buy/sell
//! amounts that bring each asset to its target share. Trades smaller than 1%
//! of the portfolio are dropped as noise.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed distance of the target weights from 1.0
pub const RATIO_SUM_TOLERANCE: f64 = 0.01;

/// Trades below this share of total value are skipped
pub const MIN_TRADE_SHARE: f64 = 0.01;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RebalanceError {
    #[error("Target ratios must sum to 1.0, got {0:.4}")]
    RatiosDoNotSumToOne(f64),
    #[error("Negative target ratio for {0}")]
    NegativeRatio(String),
    #[error("Negative holding for {0}")]
    NegativeHolding(String),
    #[error("No target ratios provided")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// One rebalancing trade, in the same value units as the holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceTrade {
    pub asset: String,
    pub side: TradeSide,
    pub value: f64,
    pub current_ratio: f64,
    pub target_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub total_value: f64,
    pub current_ratios: BTreeMap<String, f64>,
    pub trades_needed: Vec<RebalanceTrade>,
}

/// Plan the trades moving `holdings` to `targets`
///
/// Assets held but absent from `targets` have a target of zero.
pub fn plan_rebalance(
    targets: &BTreeMap<String, f64>,
    holdings: &BTreeMap<String, f64>,
) -> Result<RebalancePlan, RebalanceError> {
    if targets.is_empty() {
        return Err(RebalanceError::Empty);
    }
    if let Some((asset, _)) = targets.iter().find(|(_, r)| **r < 0.0) {
        return Err(RebalanceError::NegativeRatio(asset.clone()));
    }
    if let Some((asset, _)) = holdings.iter().find(|(_, v)| **v < 0.0) {
        return Err(RebalanceError::NegativeHolding(asset.clone()));
    }

    let sum: f64 = targets.values().sum();
    if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
        return Err(RebalanceError::RatiosDoNotSumToOne(sum));
    }

    let total_value: f64 = holdings.values().sum();
    let current_ratio = |asset: &str| {
        if total_value > 0.0 {
            holdings.get(asset).copied().unwrap_or(0.0) / total_value
        } else {
            0.0
        }
    };

    let mut assets: Vec<&String> = targets.keys().chain(holdings.keys()).collect();
    assets.sort();
    assets.dedup();

    let min_trade = total_value * MIN_TRADE_SHARE;
    let mut trades_needed = Vec::new();
    for asset in &assets {
        let target = targets.get(*asset).copied().unwrap_or(0.0);
        let current = holdings.get(*asset).copied().unwrap_or(0.0);
        let delta = target * total_value - current;

        if delta.abs() < min_trade || delta == 0.0 {
            continue;
        }

        trades_needed.push(RebalanceTrade {
            asset: (*asset).clone(),
            side: if delta > 0.0 { TradeSide::Buy } else { TradeSide::Sell },
            value: delta.abs(),
            current_ratio: current_ratio(asset.as_str()),
            target_ratio: target,
        });
    }

    let current_ratios = assets
        .iter()
        .map(|a| ((*a).clone(), current_ratio(a.as_str())))
        .collect();

    Ok(RebalancePlan {
        total_value,
        current_ratios,
        trades_needed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn map(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_rebalance_trades() {
        let targets = map(&[("ETH", 0.5), ("SOL", 0.3), ("OMK", 0.2)]);
        let holdings = map(&[("ETH", 700.0), ("SOL", 200.0), ("OMK", 100.0)]);

        let plan = plan_rebalance(&targets, &holdings).unwrap();
        assert_relative_eq!(plan.total_value, 1000.0);
        assert_eq!(plan.trades_needed.len(), 3);

        let eth = plan.trades_needed.iter().find(|t| t.asset == "ETH").unwrap();
        assert_eq!(eth.side, TradeSide::Sell);
        assert_relative_eq!(eth.value, 200.0);

        let sol = plan.trades_needed.iter().find(|t| t.asset == "SOL").unwrap();
        assert_eq!(sol.side, TradeSide::Buy);
        assert_relative_eq!(sol.value, 100.0);
    }

    #[test]
    fn test_small_trades_dropped() {
        let targets = map(&[("ETH", 0.5), ("SOL", 0.5)]);
        let holdings = map(&[("ETH", 504.0), ("SOL", 496.0)]);

        let plan = plan_rebalance(&targets, &holdings).unwrap();
        assert!(plan.trades_needed.is_empty());
    }

    #[test]
    fn test_ratio_sum_tolerance() {
        let holdings = map(&[("ETH", 1.0)]);
        assert!(plan_rebalance(&map(&[("ETH", 0.995)]), &holdings).is_ok());
        assert!(matches!(
            plan_rebalance(&map(&[("ETH", 0.5), ("SOL", 0.4)]), &holdings),
            Err(RebalanceError::RatiosDoNotSumToOne(_))
        ));
    }

    #[test]
    fn test_untargeted_holding_is_sold() {
        let targets = map(&[("ETH", 1.0)]);
        let holdings = map(&[("ETH", 500.0), ("DOGE", 500.0)]);

        let plan = plan_rebalance(&targets, &holdings).unwrap();
        let doge = plan.trades_needed.iter().find(|t| t.asset == "DOGE").unwrap();
        assert_eq!(doge.side, TradeSide::Sell);
        assert_eq!(doge.target_ratio, 0.0);
        assert_relative_eq!(plan.current_ratios["DOGE"], 0.5);
    }

    #[test]
    fn test_empty_targets_rejected() {
        assert_eq!(
            plan_rebalance(&BTreeMap::new(), &BTreeMap::new()).unwrap_err(),
            RebalanceError::Empty
        );
    }
}

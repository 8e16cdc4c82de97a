//! Liquidity Analytics
//!
//! Pure pool analytics used by the liquidity sentinel: price deviation alerts,
//! pool health scoring, volatility prediction, action recommendations and
//! buyback sizing. Price history per pool is bounded.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

/// Default price deviation threshold (5%)
pub const DEFAULT_PRICE_DEVIATION_THRESHOLD: f64 = 0.05;

/// Default predicted volatility threshold for the high level (15%)
pub const DEFAULT_VOLATILITY_HIGH_THRESHOLD: f64 = 0.15;

/// Health score below which a pool is critical
pub const POOL_HEALTH_CRITICAL: f64 = 30.0;

/// Health score below which a pool is in warning
pub const POOL_HEALTH_WARNING: f64 = 50.0;

/// Minimum samples for a volatility prediction
pub const MIN_VOLATILITY_SAMPLES: usize = 10;

/// Samples kept per pool
pub const MAX_PRICE_HISTORY: usize = 100;

/// Maximum share of treasury spent on a single buyback
pub const MAX_BUYBACK_TREASURY_SHARE: f64 = 0.05;

const DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LiquidityError {
    #[error("Expected price must be positive, got {0}")]
    InvalidExpectedPrice(f64),
    #[error("Target ratio must be positive, got {0}")]
    InvalidTargetRatio(f64),
    #[error("Insufficient price history for volatility prediction: need {needed}, got {got}")]
    InsufficientHistory { needed: usize, got: usize },
    #[error("Current price must be positive, got {0}")]
    InvalidCurrentPrice(f64),
    #[error("Invalid price in history at index {0}")]
    InvalidHistoryPrice(usize),
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Price deviation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityAction {
    AddLiquidity,
    RemoveLiquidity,
}

impl LiquidityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidityAction::AddLiquidity => "add_liquidity",
            LiquidityAction::RemoveLiquidity => "remove_liquidity",
        }
    }
}

/// Alert raised when the pool price drifts from the expected price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub message: String,
    pub recommended_action: LiquidityAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceDeviation {
    pub current_price: f64,
    pub expected_price: f64,
    pub deviation_percent: f64,
    pub severity: Severity,
    pub action_needed: bool,
    pub alert: Option<PriceAlert>,
}

/// Classify the deviation of `current` from `expected`
///
/// Above twice the threshold is critical, above the threshold is a warning.
pub fn price_deviation(
    current: f64,
    expected: f64,
    threshold: f64,
    pool_address: Option<&str>,
) -> Result<PriceDeviation, LiquidityError> {
    if expected <= 0.0 {
        return Err(LiquidityError::InvalidExpectedPrice(expected));
    }

    let deviation = ((current - expected) / expected).abs();
    let deviation_percent = deviation * 100.0;

    let severity = if deviation > threshold * 2.0 {
        Severity::Critical
    } else if deviation > threshold {
        Severity::Warning
    } else {
        Severity::Normal
    };
    let action_needed = severity != Severity::Normal;

    let alert = action_needed.then(|| PriceAlert {
        kind: "price_deviation".to_string(),
        severity,
        message: format!("Price deviation of {:.2}% detected", deviation_percent),
        recommended_action: if current > expected {
            LiquidityAction::AddLiquidity
        } else {
            LiquidityAction::RemoveLiquidity
        },
        pool_address: pool_address.map(str::to_string),
    });

    Ok(PriceDeviation {
        current_price: current,
        expected_price: expected,
        deviation_percent: round_to(deviation_percent, 2),
        severity,
        action_needed,
        alert,
    })
}

// ---------------------------------------------------------------------------
// Pool health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score < POOL_HEALTH_CRITICAL {
            HealthStatus::Critical
        } else if score < POOL_HEALTH_WARNING {
            HealthStatus::Warning
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolHealth {
    pub health_score: f64,
    pub status: HealthStatus,
    pub current_ratio: f64,
    pub target_ratio: f64,
    pub ratio_deviation_percent: f64,
    pub depth_score: f64,
    pub volume_liquidity_ratio: f64,
    pub recommendations: Vec<String>,
}

/// Score a pool from its reserves and 24h volume
///
/// Starts at 100 and loses points for ratio drift (up to 30), shallow depth
/// and a high volume/liquidity ratio (up to 20).
pub fn pool_health(
    token_a_amount: f64,
    token_b_amount: f64,
    target_ratio: f64,
    volume_24h: f64,
) -> Result<PoolHealth, LiquidityError> {
    if target_ratio <= 0.0 {
        return Err(LiquidityError::InvalidTargetRatio(target_ratio));
    }

    let current_ratio = if token_b_amount > 0.0 {
        token_a_amount / token_b_amount
    } else {
        0.0
    };
    let ratio_deviation = (current_ratio - target_ratio).abs() / target_ratio;

    let total_liquidity = token_a_amount + token_b_amount;
    // 10M total liquidity scores 100
    let depth_score = (total_liquidity / 1_000_000.0 * 10.0).min(100.0);
    let vol_liq_ratio = if total_liquidity > 0.0 {
        volume_24h / total_liquidity
    } else {
        0.0
    };

    let mut score = 100.0;
    score -= (ratio_deviation * 100.0).min(30.0);
    if depth_score < 50.0 {
        score -= (50.0 - depth_score) * 0.5;
    }
    if vol_liq_ratio > 0.5 {
        score -= ((vol_liq_ratio - 0.5) * 40.0).min(20.0);
    }
    let score = score.max(0.0);

    let mut recommendations = Vec::new();
    if ratio_deviation > 0.1 {
        recommendations.push("Rebalance pool to target ratio".to_string());
    }
    if depth_score < 50.0 {
        recommendations.push("Add more liquidity to improve depth".to_string());
    }
    if vol_liq_ratio > 0.5 {
        recommendations.push("High volume/liquidity ratio - monitor for slippage".to_string());
    }

    Ok(PoolHealth {
        health_score: round_to(score, 2),
        status: HealthStatus::from_score(score),
        current_ratio: round_to(current_ratio, 4),
        target_ratio,
        ratio_deviation_percent: round_to(ratio_deviation * 100.0, 2),
        depth_score: round_to(depth_score, 2),
        volume_liquidity_ratio: round_to(vol_liq_ratio, 4),
        recommendations,
    })
}

// ---------------------------------------------------------------------------
// Volatility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityLevel {
    #[default]
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityPrediction {
    pub predicted_volatility: f64,
    pub current_volatility: f64,
    pub volatility_level: VolatilityLevel,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
}

/// Predict volatility from a daily price series
///
/// Blends annualized population std-dev of simple returns (70%) with the
/// annualized mean absolute return of the last five samples (30%).
pub fn predict_volatility(prices: &[f64], high_threshold: f64) -> Result<VolatilityPrediction, LiquidityError> {
    if prices.len() < MIN_VOLATILITY_SAMPLES {
        return Err(LiquidityError::InsufficientHistory {
            needed: MIN_VOLATILITY_SAMPLES,
            got: prices.len(),
        });
    }
    if let Some(idx) = prices[..prices.len() - 1].iter().position(|p| *p == 0.0 || !p.is_finite()) {
        return Err(LiquidityError::InvalidHistoryPrice(idx));
    }

    let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();

    let annualization = DAYS_PER_YEAR.sqrt();
    let annualized = returns.iter().population_std_dev() * annualization;

    let recent = &returns[returns.len().saturating_sub(5)..];
    let recent_volatility = recent.iter().map(|r| r.abs()).sum::<f64>() / 5.0 * annualization;

    let predicted = annualized * 0.7 + recent_volatility * 0.3;

    let (level, risk_score) = if predicted > high_threshold {
        (VolatilityLevel::High, (predicted / high_threshold * 60.0).min(100.0))
    } else if predicted > high_threshold / 2.0 {
        (VolatilityLevel::Moderate, 40.0)
    } else {
        (VolatilityLevel::Low, 20.0)
    };

    let recommendations = match level {
        VolatilityLevel::High => vec![
            "Increase liquidity buffer".to_string(),
            "Tighten price monitoring".to_string(),
            "Consider hedging strategies".to_string(),
        ],
        VolatilityLevel::Moderate => vec!["Monitor closely for changes".to_string()],
        VolatilityLevel::Low => Vec::new(),
    };

    Ok(VolatilityPrediction {
        predicted_volatility: round_to(predicted, 4),
        current_volatility: round_to(annualized, 4),
        volatility_level: level,
        risk_score: round_to(risk_score, 2),
        recommendations,
    })
}

// ---------------------------------------------------------------------------
// Action recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedAction {
    pub action: String,
    pub amount: String,
    pub reason: String,
    pub urgency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecommendation {
    pub recommended_actions: Vec<RecommendedAction>,
    pub priority: ActionPriority,
    pub health_score: f64,
    pub requires_queen_approval: bool,
}

/// Pick a single action from health, deviation and volatility, most urgent first
///
/// `price_deviation_percent` is in percent (10.0 means 10%).
pub fn recommend_action(
    health_score: f64,
    price_deviation_percent: f64,
    volatility_level: VolatilityLevel,
) -> ActionRecommendation {
    let action = |action: &str, amount: &str, reason: String, urgency: &str| RecommendedAction {
        action: action.to_string(),
        amount: amount.to_string(),
        reason,
        urgency: urgency.to_string(),
    };

    let (recommended, priority) = if health_score < POOL_HEALTH_CRITICAL {
        (
            action("add_liquidity", "5M OMK (critical)", "Pool health critical".to_string(), "immediate"),
            ActionPriority::Critical,
        )
    } else if price_deviation_percent > 10.0 {
        (
            action(
                "rebalance_pool",
                "2M OMK",
                format!("Price deviation {}%", price_deviation_percent),
                "high",
            ),
            ActionPriority::High,
        )
    } else if volatility_level == VolatilityLevel::High {
        (
            action("increase_buffer", "3M OMK", "High volatility predicted".to_string(), "medium"),
            ActionPriority::Medium,
        )
    } else if health_score < POOL_HEALTH_WARNING {
        (
            action("add_liquidity", "1M OMK (preventive)", "Pool health below optimal".to_string(), "low"),
            ActionPriority::Low,
        )
    } else {
        (
            action("monitor", "0", "Pool healthy".to_string(), "none"),
            ActionPriority::Normal,
        )
    };

    ActionRecommendation {
        recommended_actions: vec![recommended],
        priority,
        health_score,
        requires_queen_approval: matches!(priority, ActionPriority::Critical | ActionPriority::High),
    }
}

// ---------------------------------------------------------------------------
// Buyback
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuybackPlan {
    Needed {
        buyback_needed: bool,
        recommended_amount: f64,
        max_amount: f64,
        estimated_price_impact: f64,
        current_price: f64,
        target_price: f64,
        price_gap_percent: f64,
    },
    NotNeeded {
        buyback_needed: bool,
        reason: String,
    },
}

impl BuybackPlan {
    pub fn is_needed(&self) -> bool {
        matches!(self, BuybackPlan::Needed { .. })
    }

    pub fn recommended_amount(&self) -> f64 {
        match self {
            BuybackPlan::Needed { recommended_amount, .. } => *recommended_amount,
            BuybackPlan::NotNeeded { .. } => 0.0,
        }
    }
}

/// Size a treasury buyback to close the gap to `target_price`
///
/// Half the gap times pool liquidity, capped at 5% of the treasury.
pub fn calculate_buyback(
    current_price: f64,
    target_price: f64,
    pool_liquidity: f64,
    treasury_balance: f64,
) -> Result<BuybackPlan, LiquidityError> {
    if current_price <= 0.0 {
        return Err(LiquidityError::InvalidCurrentPrice(current_price));
    }

    let price_gap = (target_price - current_price) / current_price;
    if price_gap <= 0.0 {
        return Ok(BuybackPlan::NotNeeded {
            buyback_needed: false,
            reason: "Price at or above target".to_string(),
        });
    }

    let estimated = pool_liquidity * price_gap * 0.5;
    let max_amount = treasury_balance * MAX_BUYBACK_TREASURY_SHARE;
    let recommended = estimated.min(max_amount);
    let impact = if pool_liquidity > 0.0 {
        recommended / pool_liquidity * 100.0
    } else {
        0.0
    };

    Ok(BuybackPlan::Needed {
        buyback_needed: true,
        recommended_amount: recommended,
        max_amount,
        estimated_price_impact: round_to(impact, 2),
        current_price,
        target_price,
        price_gap_percent: round_to(price_gap * 100.0, 2),
    })
}

// ---------------------------------------------------------------------------
// Price history
// ---------------------------------------------------------------------------

/// Per-pool price samples, keeping the most recent [`MAX_PRICE_HISTORY`]
#[derive(Debug, Clone, Default)]
pub struct PriceHistory {
    pools: HashMap<String, VecDeque<f64>>,
    capacity: usize,
}

impl PriceHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_PRICE_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pools: HashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Record a sample and return the pool's sample count
    pub fn record(&mut self, pool_id: &str, price: f64) -> usize {
        let samples = self.pools.entry(pool_id.to_string()).or_default();
        samples.push_back(price);
        while samples.len() > self.capacity {
            samples.pop_front();
        }
        samples.len()
    }

    pub fn prices(&self, pool_id: &str) -> Vec<f64> {
        self.pools
            .get(pool_id)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, pool_id: &str) -> usize {
        self.pools.get(pool_id).map_or(0, VecDeque::len)
    }

    pub fn latest(&self, pool_id: &str) -> Option<f64> {
        self.pools.get(pool_id).and_then(|s| s.back().copied())
    }
}

/// History key for a chain and pair, e.g. `ethereum_ETH/USD`
pub fn pool_key(chain: &str, pair: &str) -> String {
    format!("{}_{}", chain, pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_price_deviation_levels() {
        let normal = price_deviation(1.02, 1.0, DEFAULT_PRICE_DEVIATION_THRESHOLD, None).unwrap();
        assert_eq!(normal.severity, Severity::Normal);
        assert!(!normal.action_needed);
        assert!(normal.alert.is_none());

        let warning = price_deviation(0.93, 1.0, DEFAULT_PRICE_DEVIATION_THRESHOLD, None).unwrap();
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.deviation_percent, 7.0);
        let alert = warning.alert.unwrap();
        assert_eq!(alert.recommended_action, LiquidityAction::RemoveLiquidity);
        assert_eq!(alert.message, "Price deviation of 7.00% detected");

        let critical = price_deviation(1.2, 1.0, DEFAULT_PRICE_DEVIATION_THRESHOLD, Some("pool1")).unwrap();
        assert_eq!(critical.severity, Severity::Critical);
        assert_eq!(
            critical.alert.unwrap().recommended_action,
            LiquidityAction::AddLiquidity
        );
    }

    #[test]
    fn test_price_deviation_rejects_zero_expected() {
        let err = price_deviation(1.0, 0.0, 0.05, None).unwrap_err();
        assert_eq!(err, LiquidityError::InvalidExpectedPrice(0.0));
    }

    #[test]
    fn test_pool_health_balanced_deep_pool() {
        // 10M total, perfectly balanced, modest volume
        let health = pool_health(5_000_000.0, 5_000_000.0, 1.0, 1_000_000.0).unwrap();
        assert_eq!(health.health_score, 100.0);
        assert_eq!(health.status, HealthStatus::Healthy);
        assert_eq!(health.depth_score, 100.0);
        assert!(health.recommendations.is_empty());
    }

    #[test]
    fn test_pool_health_penalties() {
        // ratio 2.0 vs 1.0 -> -30, depth 3 -> -23.5, vol/liq 1.0 -> -20
        let health = pool_health(200_000.0, 100_000.0, 1.0, 300_000.0).unwrap();
        assert_relative_eq!(health.health_score, 26.5, epsilon = 1e-9);
        assert_eq!(health.status, HealthStatus::Critical);
        assert_eq!(health.recommendations.len(), 3);
        assert_eq!(health.recommendations[0], "Rebalance pool to target ratio");
    }

    #[test]
    fn test_pool_health_empty_pool() {
        let health = pool_health(0.0, 0.0, 1.0, 0.0).unwrap();
        assert_eq!(health.current_ratio, 0.0);
        assert_eq!(health.volume_liquidity_ratio, 0.0);
        // -30 for ratio, -25 for depth
        assert_eq!(health.health_score, 45.0);
        assert_eq!(health.status, HealthStatus::Warning);
    }

    #[test]
    fn test_volatility_requires_history() {
        let err = predict_volatility(&[1.0; 9], DEFAULT_VOLATILITY_HIGH_THRESHOLD).unwrap_err();
        assert!(matches!(err, LiquidityError::InsufficientHistory { got: 9, .. }));
    }

    #[test]
    fn test_volatility_flat_prices_are_low() {
        let prediction = predict_volatility(&[1.0; 12], DEFAULT_VOLATILITY_HIGH_THRESHOLD).unwrap();
        assert_eq!(prediction.volatility_level, VolatilityLevel::Low);
        assert_eq!(prediction.risk_score, 20.0);
        assert_eq!(prediction.predicted_volatility, 0.0);
        assert!(prediction.recommendations.is_empty());
    }

    #[test]
    fn test_volatility_swinging_prices_are_high() {
        let prices: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { 1.1 }).collect();
        let prediction = predict_volatility(&prices, DEFAULT_VOLATILITY_HIGH_THRESHOLD).unwrap();
        assert_eq!(prediction.volatility_level, VolatilityLevel::High);
        assert_eq!(prediction.risk_score, 100.0);
        assert_eq!(prediction.recommendations.len(), 3);
    }

    #[test]
    fn test_recommend_action_order() {
        let critical = recommend_action(20.0, 50.0, VolatilityLevel::High);
        assert_eq!(critical.priority, ActionPriority::Critical);
        assert_eq!(critical.recommended_actions[0].amount, "5M OMK (critical)");
        assert!(critical.requires_queen_approval);

        let deviation = recommend_action(80.0, 12.5, VolatilityLevel::High);
        assert_eq!(deviation.priority, ActionPriority::High);
        assert_eq!(deviation.recommended_actions[0].action, "rebalance_pool");
        assert_eq!(deviation.recommended_actions[0].reason, "Price deviation 12.5%");
        assert!(deviation.requires_queen_approval);

        let volatile = recommend_action(80.0, 2.0, VolatilityLevel::High);
        assert_eq!(volatile.priority, ActionPriority::Medium);
        assert!(!volatile.requires_queen_approval);

        let preventive = recommend_action(45.0, 2.0, VolatilityLevel::Low);
        assert_eq!(preventive.recommended_actions[0].amount, "1M OMK (preventive)");

        let healthy = recommend_action(90.0, 0.0, VolatilityLevel::Low);
        assert_eq!(healthy.priority, ActionPriority::Normal);
        assert_eq!(healthy.recommended_actions[0].action, "monitor");
    }

    #[test]
    fn test_buyback_capped_by_treasury() {
        let plan = calculate_buyback(0.8, 1.0, 1_000_000.0, 1_000_000.0).unwrap();
        // gap 25% -> estimate 125k, cap 50k
        match plan {
            BuybackPlan::Needed { recommended_amount, max_amount, estimated_price_impact, price_gap_percent, .. } => {
                assert_relative_eq!(recommended_amount, 50_000.0);
                assert_relative_eq!(max_amount, 50_000.0);
                assert_eq!(estimated_price_impact, 5.0);
                assert_eq!(price_gap_percent, 25.0);
            }
            other => panic!("expected buyback, got {:?}", other),
        }
    }

    #[test]
    fn test_buyback_not_needed_above_target() {
        let plan = calculate_buyback(1.2, 1.0, 1_000_000.0, 1_000_000.0).unwrap();
        assert!(!plan.is_needed());
        assert_eq!(plan.recommended_amount(), 0.0);
    }

    #[test]
    fn test_price_history_is_bounded() {
        let mut history = PriceHistory::with_capacity(3);
        for i in 0..5 {
            history.record("ethereum_ETH/USD", i as f64);
        }
        assert_eq!(history.prices("ethereum_ETH/USD"), vec![2.0, 3.0, 4.0]);
        assert_eq!(history.latest("ethereum_ETH/USD"), Some(4.0));
        assert_eq!(history.len("solana_SOL/USD"), 0);
        assert_eq!(pool_key("ethereum", "ETH/USD"), "ethereum_ETH/USD");
    }
}

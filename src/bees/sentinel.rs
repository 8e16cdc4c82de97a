//! LiquiditySentinelBee
//!
//! Watches OMK liquidity pools: price deviation, pool health, volatility and
//! buyback sizing are pure calculations; prices and liquidity actions go
//! through the connected [`BlockchainBee`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::liquidity::{
    calculate_buyback, pool_health, pool_key, predict_volatility, price_deviation, recommend_action,
    LiquidityAction, DEFAULT_PRICE_DEVIATION_THRESHOLD, DEFAULT_VOLATILITY_HIGH_THRESHOLD,
};
use crate::domain::{Chain, HealthStatus, PriceHistory, Priority, VolatilityLevel};
use crate::llm::LlmAbstraction;
use crate::ports::{Bee, BeeError};

use super::base::{LlmAccess, TaskOutcome};
use super::blockchain::BlockchainBee;
use super::task::{BlockchainTask, PoolSpec, SentinelTask, SENTINEL_BEE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SentinelSettings {
    /// Fractional price deviation that raises a warning (critical at twice this)
    pub price_deviation_threshold: f64,
    pub volatility_high_threshold: f64,
}

impl Default for SentinelSettings {
    fn default() -> Self {
        Self {
            price_deviation_threshold: DEFAULT_PRICE_DEVIATION_THRESHOLD,
            volatility_high_threshold: DEFAULT_VOLATILITY_HIGH_THRESHOLD,
        }
    }
}

#[derive(Debug)]
pub struct LiquiditySentinelBee {
    blockchain: Option<Arc<BlockchainBee>>,
    pools: Mutex<BTreeMap<String, PoolSpec>>,
    history: Mutex<PriceHistory>,
    llm: LlmAccess,
    settings: SentinelSettings,
}

impl Default for LiquiditySentinelBee {
    fn default() -> Self {
        Self::new()
    }
}

impl LiquiditySentinelBee {
    pub fn new() -> Self {
        Self {
            blockchain: None,
            pools: Mutex::new(BTreeMap::new()),
            history: Mutex::new(PriceHistory::new()),
            llm: LlmAccess::disabled(SENTINEL_BEE),
            settings: SentinelSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: SentinelSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Route prices and liquidity actions through `blockchain`
    pub fn with_blockchain(mut self, blockchain: Arc<BlockchainBee>) -> Self {
        tracing::info!("LiquiditySentinelBee connected to BlockchainBee");
        self.blockchain = Some(blockchain);
        self
    }

    pub fn with_llm(mut self, llm: Arc<LlmAbstraction>) -> Self {
        self.llm = LlmAccess::new(SENTINEL_BEE, Some(llm));
        self
    }

    pub fn register_pool(&self, pool_id: &str, pool: PoolSpec) -> usize {
        let mut pools = self.pools.lock();
        pools.insert(pool_id.to_string(), pool);
        tracing::info!(pool_id, "Pool registered for monitoring");
        pools.len()
    }

    pub fn unregister_pool(&self, pool_id: &str) -> bool {
        let removed = self.pools.lock().remove(pool_id).is_some();
        if removed {
            tracing::info!(pool_id, "Pool unregistered");
        }
        removed
    }

    pub fn pool_ids(&self) -> Vec<String> {
        self.pools.lock().keys().cloned().collect()
    }

    pub fn price_history(&self, chain: Chain, pair: &str) -> Vec<f64> {
        self.history.lock().prices(&pool_key(chain.as_str(), pair))
    }

    fn blockchain(&self) -> Result<&Arc<BlockchainBee>, BeeError> {
        self.blockchain.as_ref().ok_or(BeeError::NotConnected("BlockchainBee"))
    }

    // -- Analytics ----------------------------------------------------------

    fn monitor_price(&self, current: f64, expected: f64, pool_address: Option<&str>) -> Result<Value, BeeError> {
        let deviation = price_deviation(current, expected, self.settings.price_deviation_threshold, pool_address)?;
        if deviation.action_needed {
            tracing::warn!(
                pool = ?pool_address,
                deviation_percent = deviation.deviation_percent,
                severity = ?deviation.severity,
                "Price deviation detected"
            );
        }
        encode(&deviation)
    }

    fn predict_volatility(&self, prices: Option<Vec<f64>>, pool_id: Option<String>) -> Result<Value, BeeError> {
        let prices = match (prices, pool_id) {
            (Some(prices), _) => prices,
            (None, Some(pool_id)) => self.history.lock().prices(&pool_id),
            (None, None) => {
                return Err(BeeError::Validation("price_history or pool_id required".into()));
            }
        };
        encode(&predict_volatility(&prices, self.settings.volatility_high_threshold)?)
    }

    // -- Oracle and execution -----------------------------------------------

    /// Oracle price for a pair, recorded in the pool's price history
    async fn pool_price(&self, chain: Chain, token_pair: &str) -> Result<Value, BeeError> {
        let quote = self.blockchain()?.price(chain, token_pair).await?;

        let key = pool_key(chain.as_str(), token_pair);
        let count = self.history.lock().record(&key, quote.price);
        tracing::info!(chain = %chain, pair = token_pair, price = quote.price, "Pool price fetched from oracle");

        Ok(json!({
            "chain": chain,
            "token_pair": token_pair,
            "price": quote.price,
            "oracle": quote.source,
            "updated_at": quote.updated_at.to_rfc3339(),
            "price_history_count": count,
        }))
    }

    #[allow(clippy::too_many_arguments)]
    async fn execute_liquidity_action(
        &self,
        action: LiquidityAction,
        chain: Chain,
        pool_address: Option<String>,
        token_a: Option<String>,
        token_b: Option<String>,
        amount_a: Option<Decimal>,
        amount_b: Option<Decimal>,
        lp_tokens: Option<Decimal>,
    ) -> Result<Value, BeeError> {
        let blockchain = self.blockchain()?;
        tracing::info!(action = action.as_str(), chain = %chain, pool = ?pool_address, "Executing liquidity action");

        let task = match action {
            LiquidityAction::AddLiquidity => {
                let missing = || BeeError::Validation("add_liquidity requires token_a, token_b, amount_a and amount_b".into());
                BlockchainTask::AddLiquidity {
                    chain,
                    pool: pool_address,
                    token_a: token_a.ok_or_else(missing)?,
                    token_b: token_b.ok_or_else(missing)?,
                    amount_a: amount_a.ok_or_else(missing)?,
                    amount_b: amount_b.ok_or_else(missing)?,
                }
            }
            LiquidityAction::RemoveLiquidity => BlockchainTask::RemoveLiquidity {
                chain,
                pool: pool_address,
                lp_tokens: lp_tokens.ok_or_else(|| BeeError::Validation("remove_liquidity requires lp_tokens".into()))?,
            },
        };

        let result = blockchain.execute(task).await?;
        tracing::info!(action = action.as_str(), chain = %chain, "Liquidity action executed");
        Ok(result)
    }

    async fn execute_buyback(&self, chain: Chain, token_in: String, token_out: String, amount: Decimal) -> Result<Value, BeeError> {
        let blockchain = self.blockchain()?;
        tracing::info!(chain = %chain, token_in = %token_in, token_out = %token_out, %amount, "Executing buyback");

        // Buybacks go out at high priority
        let result = blockchain
            .execute(BlockchainTask::SwapTokens {
                chain,
                token_in,
                token_out,
                amount_in: amount,
                decimals_in: None,
                decimals_out: None,
                priority: Priority::High,
            })
            .await?;
        tracing::info!(chain = %chain, expected_out = %result["expected_amount_out"], "Buyback quoted");
        Ok(result)
    }

    // -- Pool sweeps ----------------------------------------------------------

    async fn monitor_all_pools(
        &self,
        pools: Vec<String>,
        mut pool_data: BTreeMap<String, PoolSpec>,
        summarize: bool,
    ) -> Result<Value, BeeError> {
        self.blockchain()?;
        let targets: Vec<(String, PoolSpec)> = {
            let registered = self.pools.lock();
            if pools.is_empty() {
                registered.iter().map(|(id, p)| (id.clone(), p.clone())).collect()
            } else {
                pools
                    .into_iter()
                    .filter_map(|id| match registered.get(&id).cloned().or_else(|| pool_data.remove(&id)) {
                        Some(pool) => Some((id, pool)),
                        None => {
                            tracing::warn!(pool_id = %id, "Pool not registered and no definition given, skipping");
                            None
                        }
                    })
                    .collect()
            }
        };

        let mut results = Vec::new();
        let mut alerts: Vec<Value> = Vec::new();

        for (pool_id, pool) in targets {
            let price = match self.pool_price(pool.chain, &pool.token_pair).await {
                Ok(price) => price,
                Err(e) => {
                    tracing::warn!(pool_id = %pool_id, error = %e, "Failed to get price for pool");
                    continue;
                }
            };
            let current = price["price"].as_f64().unwrap_or_default();

            let health = match pool_health(pool.token_a_amount, pool.token_b_amount, pool.target_ratio, pool.volume_24h) {
                Ok(health) => health,
                Err(e) => {
                    tracing::warn!(pool_id = %pool_id, error = %e, "Invalid pool parameters, skipping");
                    continue;
                }
            };
            let expected = pool.expected_price.unwrap_or(current);
            let deviation = match price_deviation(current, expected, self.settings.price_deviation_threshold, Some(&pool_id)) {
                Ok(deviation) => deviation,
                Err(e) => {
                    tracing::warn!(pool_id = %pool_id, error = %e, "Invalid reference price, skipping");
                    continue;
                }
            };

            if let Some(alert) = &deviation.alert {
                let mut alert = encode(alert)?;
                alert["pool_id"] = json!(pool_id);
                alerts.push(alert);
            }
            if matches!(health.status, HealthStatus::Warning | HealthStatus::Critical) {
                alerts.push(json!({
                    "pool_id": pool_id,
                    "type": "pool_health",
                    "severity": health.status,
                    "message": format!("Pool health: {:.1}", health.health_score),
                    "recommendations": health.recommendations,
                }));
            }

            results.push(json!({
                "pool_id": pool_id,
                "price": price,
                "health": health,
                "price_monitoring": deviation,
            }));
        }

        let critical_alerts: Vec<Value> = alerts
            .iter()
            .filter(|a| a["severity"] == "critical")
            .cloned()
            .collect();
        if !critical_alerts.is_empty() {
            tracing::warn!(count = critical_alerts.len(), "Critical liquidity alerts");
        }

        let mut response = json!({
            "monitored_pools": results.len(),
            "results": results,
            "requires_action": !alerts.is_empty(),
            "critical_alerts": critical_alerts,
            "alerts": alerts,
        });

        if summarize && !alerts.is_empty() && self.llm.is_enabled() {
            let prompt = format!(
                "You are monitoring OMK liquidity pools. Summarize these alerts in two sentences \
                 and name the most urgent action:\n{}",
                response["alerts"]
            );
            if let Some(summary) = self.llm.use_llm(&prompt, 0.3).await {
                response["llm_summary"] = json!(summary);
            }
        }
        Ok(response)
    }

    async fn auto_rebalance_pool(&self, pool_id: String, pool_data: Option<PoolSpec>, queen_approved: bool) -> Result<Value, BeeError> {
        let registered = self.pools.lock().get(&pool_id).cloned();
        let pool = registered
            .or(pool_data)
            .ok_or_else(|| BeeError::Validation(format!("Unknown pool: {}", pool_id)))?;

        let health = pool_health(pool.token_a_amount, pool.token_b_amount, pool.target_ratio, pool.volume_24h)?;
        if health.status == HealthStatus::Healthy {
            return Ok(json!({
                "pool_id": pool_id,
                "action_taken": false,
                "reason": "Pool already healthy",
                "health_score": health.health_score,
            }));
        }

        let recommendation = recommend_action(health.health_score, 0.0, VolatilityLevel::Low);

        let mut actions_taken = Vec::new();
        if queen_approved {
            for action in &recommendation.recommended_actions {
                if action.action != "add_liquidity" && action.action != "rebalance_pool" {
                    continue;
                }
                let outcome = match self.rebalance_liquidity(&pool, &action.amount).await {
                    Ok(result) => TaskOutcome::succeeded(result),
                    Err(e) => {
                        tracing::error!(pool_id = %pool_id, action = %action.action, error = %e, "Rebalance action failed");
                        TaskOutcome::failed(e)
                    }
                };
                actions_taken.push(json!({
                    "action": action.action,
                    "result": outcome.to_value(),
                }));
            }
        }

        Ok(json!({
            "pool_id": pool_id,
            "initial_health": health.health_score,
            "recommendations": recommendation,
            "actions_taken": actions_taken,
            "queen_approval_required": !queen_approved,
        }))
    }

    /// Add liquidity sized from a recommendation amount such as "5M OMK"
    async fn rebalance_liquidity(&self, pool: &PoolSpec, amount: &str) -> Result<Value, BeeError> {
        let amount_a = parse_omk_amount(amount)
            .ok_or_else(|| BeeError::Validation(format!("Unrecognized action amount: {}", amount)))?;
        let amount_b = Decimal::try_from(pool.target_ratio)
            .ok()
            .filter(|r| *r > Decimal::ZERO)
            .map(|r| amount_a / r)
            .ok_or_else(|| BeeError::Validation(format!("Invalid target ratio: {}", pool.target_ratio)))?;

        let token_a = pool.token_a.clone().unwrap_or_else(|| "OMK".to_string());
        let token_b = pool.token_b.clone().unwrap_or_else(|| {
            pool.token_pair
                .rsplit('/')
                .next()
                .unwrap_or(pool.token_pair.as_str())
                .to_string()
        });

        self.execute_liquidity_action(
            LiquidityAction::AddLiquidity,
            pool.chain,
            pool.pool_address.clone(),
            Some(token_a),
            Some(token_b),
            Some(amount_a),
            Some(amount_b.round_dp(8)),
            None,
        )
        .await
    }
}

#[async_trait]
impl Bee for LiquiditySentinelBee {
    type Task = SentinelTask;

    fn name(&self) -> &'static str {
        SENTINEL_BEE
    }

    async fn execute(&self, task: SentinelTask) -> Result<Value, BeeError> {
        match task {
            SentinelTask::MonitorPrice {
                current_price,
                expected_price,
                pool_address,
            } => self.monitor_price(current_price, expected_price, pool_address.as_deref()),
            SentinelTask::CheckPoolHealth {
                token_a_amount,
                token_b_amount,
                target_ratio,
                volume_24h,
            } => encode(&pool_health(token_a_amount, token_b_amount, target_ratio, volume_24h)?),
            SentinelTask::PredictVolatility { price_history, pool_id } => self.predict_volatility(price_history, pool_id),
            SentinelTask::RecommendAction {
                pool_health,
                price_analysis,
                volatility_prediction,
            } => encode(&recommend_action(
                pool_health.health_score,
                price_analysis.deviation_percent,
                volatility_prediction.volatility_level,
            )),
            SentinelTask::CalculateBuyback {
                current_price,
                target_price,
                pool_liquidity,
                treasury_balance,
            } => encode(&calculate_buyback(current_price, target_price, pool_liquidity, treasury_balance)?),
            SentinelTask::GetPoolPrice { chain, token_pair } => self.pool_price(chain, &token_pair).await,
            SentinelTask::ExecuteLiquidityAction {
                action,
                chain,
                pool_address,
                token_a,
                token_b,
                amount_a,
                amount_b,
                lp_tokens,
            } => {
                self.execute_liquidity_action(action, chain, pool_address, token_a, token_b, amount_a, amount_b, lp_tokens)
                    .await
            }
            SentinelTask::ExecuteBuyback {
                chain,
                token_in,
                token_out,
                amount,
            } => self.execute_buyback(chain, token_in, token_out, amount).await,
            SentinelTask::MonitorAllPools { pools, pool_data, summarize } => {
                self.monitor_all_pools(pools, pool_data, summarize).await
            }
            SentinelTask::AutoRebalancePool {
                pool_id,
                pool_data,
                queen_approved,
            } => self.auto_rebalance_pool(pool_id, pool_data, queen_approved).await,
            SentinelTask::RegisterPool { pool_id, pool } => {
                let count = self.register_pool(&pool_id, pool);
                Ok(json!({"pool_id": pool_id, "registered": true, "monitored_pools": count}))
            }
            SentinelTask::UnregisterPool { pool_id } => {
                let removed = self.unregister_pool(&pool_id);
                Ok(json!({"pool_id": pool_id, "removed": removed}))
            }
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value, BeeError> {
    serde_json::to_value(value).map_err(|e| BeeError::InvalidTask(e.to_string()))
}

/// Parse amounts like "5M OMK (critical)" or "250K OMK" into token units
pub(crate) fn parse_omk_amount(text: &str) -> Option<Decimal> {
    let token = text.split_whitespace().next()?;
    let (digits, multiplier) = match token.chars().last()?.to_ascii_uppercase() {
        'M' => (&token[..token.len() - 1], Decimal::from(1_000_000)),
        'K' => (&token[..token.len() - 1], Decimal::from(1_000)),
        _ => (token, Decimal::ONE),
    };
    let amount: Decimal = digits.parse().ok()?;
    (amount > Decimal::ZERO).then(|| amount * multiplier)
}

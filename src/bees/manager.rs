//! Bee Manager
//!
//! Routes tasks to registered bees and aggregates their health. Bees are
//! injected by the caller; the manager never constructs them.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::BeeError;

use super::base::{BeeHealth, BeeStats, BeeStatus, ManagedBee, TaskOutcome};
use super::task::HiveTask;

/// Aggregated health of every bee
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveHealth {
    /// Every bee is active
    pub all_healthy: bool,
    /// At least one bee is in the error state
    pub any_critical: bool,
    pub bees: BTreeMap<String, BeeHealth>,
    pub total_bees: usize,
}

#[derive(Default)]
pub struct BeeManager {
    /// Registration order is kept for listing
    bees: Vec<(String, Arc<dyn ManagedBee>)>,
}

impl std::fmt::Debug for BeeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeeManager").field("bees", &self.bee_names()).finish()
    }
}

impl BeeManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bee under its own name, replacing any bee with that name
    pub fn register(&mut self, bee: Arc<dyn ManagedBee>) {
        let name = bee.name().to_string();
        tracing::info!(bee = %name, bee_id = bee.bee_id(), "Bee registered");
        match self.bees.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = bee,
            None => self.bees.push((name, bee)),
        }
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_bee(mut self, bee: Arc<dyn ManagedBee>) -> Self {
        self.register(bee);
        self
    }

    pub fn bee_names(&self) -> Vec<String> {
        self.bees.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn ManagedBee>> {
        self.bees.iter().find(|(n, _)| n == name).map(|(_, bee)| bee)
    }

    pub fn len(&self) -> usize {
        self.bees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bees.is_empty()
    }

    /// Run a `{"type": ..}` task on the named bee
    pub async fn execute_json(&self, bee_name: &str, task: Value) -> TaskOutcome {
        match self.get(bee_name) {
            Some(bee) => bee.process_json(task).await,
            None => {
                let error = BeeError::BeeNotFound {
                    name: bee_name.to_string(),
                    available: self.bee_names(),
                };
                tracing::warn!(bee = bee_name, "Task for unknown bee");
                TaskOutcome::failed(error)
            }
        }
    }

    /// Run a typed task on the bee it addresses
    pub async fn execute_task(&self, task: HiveTask) -> TaskOutcome {
        match task.to_json() {
            Ok(json) => self.execute_json(task.bee_name(), json).await,
            Err(e) => TaskOutcome::failed(e),
        }
    }

    /// Run the same task on each named bee in turn
    pub async fn execute_multi(&self, bee_names: &[&str], task: Value) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::with_capacity(bee_names.len());
        for name in bee_names {
            outcomes.push(self.execute_json(name, task.clone()).await);
        }
        outcomes
    }

    pub fn check_all_health(&self) -> HiveHealth {
        let mut all_healthy = true;
        let mut any_critical = false;
        let mut bees = BTreeMap::new();

        for (name, bee) in &self.bees {
            let health = bee.health();
            match health.status {
                BeeStatus::Active => {}
                BeeStatus::Error => {
                    any_critical = true;
                    all_healthy = false;
                }
                _ => all_healthy = false,
            }
            bees.insert(name.clone(), health);
        }

        HiveHealth {
            all_healthy,
            any_critical,
            bees,
            total_bees: self.bees.len(),
        }
    }

    pub fn stats(&self) -> BTreeMap<String, BeeStats> {
        self.bees
            .iter()
            .map(|(name, bee)| (name.clone(), bee.stats()))
            .collect()
    }

    pub async fn shutdown(&self) {
        tracing::info!(bees = self.bees.len(), "Shutting down bee manager");
        for (_, bee) in &self.bees {
            bee.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bees::base::BeeRunner;
    use crate::bees::blockchain::BlockchainBee;
    use crate::bees::task::{PipelineTask, SentinelTask};
    use crate::bees::sentinel::LiquiditySentinelBee;
    use crate::domain::Chain;
    use crate::ports::mocks::MockPriceOracle;
    use serde_json::json;

    fn manager() -> BeeManager {
        let blockchain = Arc::new(
            BlockchainBee::new().with_oracle(Chain::Ethereum, Arc::new(MockPriceOracle::new("chainlink").with_price("ETH/USD", 3000.0))),
        );
        let sentinel = LiquiditySentinelBee::new().with_blockchain(blockchain.clone());

        BeeManager::new()
            .with_bee(Arc::new(BeeRunner::from_arc(blockchain, 5)))
            .with_bee(Arc::new(BeeRunner::new(sentinel, 9)))
    }

    #[tokio::test]
    async fn test_routes_by_name() {
        let manager = manager();
        let outcome = manager
            .execute_json("blockchain", json!({"type": "get_price", "chain": "ethereum", "pair": "ETH/USD"}))
            .await;

        assert!(outcome.success, "{:?}", outcome.error);
        assert_eq!(outcome.get("price"), Some(&json!(3000.0)));
        assert_eq!(outcome.bee_name.as_deref(), Some("blockchain"));
    }

    #[tokio::test]
    async fn test_unknown_bee() {
        let manager = manager();
        let outcome = manager.execute_json("treasury", json!({"type": "x"})).await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Bee 'treasury' not found. Available: [blockchain, liquidity_sentinel]")
        );
    }

    #[tokio::test]
    async fn test_typed_task_for_unregistered_bee() {
        let manager = manager();
        let outcome = manager.execute_task(HiveTask::DataPipeline(PipelineTask::GetPipelineStatus)).await;
        assert!(outcome.error.unwrap().starts_with("Bee 'data_pipeline' not found"));

        let outcome = manager
            .execute_task(HiveTask::LiquiditySentinel(SentinelTask::CheckPoolHealth {
                token_a_amount: 5_000_000.0,
                token_b_amount: 5_000_000.0,
                target_ratio: 1.0,
                volume_24h: 100_000.0,
            }))
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.get("status"), Some(&json!("healthy")));
    }

    #[tokio::test]
    async fn test_execute_multi_runs_in_order() {
        let manager = manager();
        let outcomes = manager
            .execute_multi(&["liquidity_sentinel", "missing", "blockchain"], json!({"type": "bridge_stats"}))
            .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].error.as_deref(), Some("Unknown task type: bridge_stats"));
        assert!(!outcomes[1].success);
        assert!(outcomes[2].success);
    }

    #[tokio::test]
    async fn test_health_aggregation() {
        let manager = manager();
        let health = manager.check_all_health();
        assert_eq!(health.total_bees, 2);
        assert!(!health.all_healthy);
        assert!(!health.any_critical);

        manager
            .execute_json("blockchain", json!({"type": "bridge_stats"}))
            .await;
        manager
            .execute_json("liquidity_sentinel", json!({"type": "get_pool_price", "token_pair": "BTC/USD"}))
            .await;

        let health = manager.check_all_health();
        assert_eq!(health.bees["blockchain"].status, BeeStatus::Active);
        assert_eq!(health.bees["liquidity_sentinel"].status, BeeStatus::Error);
        assert!(health.any_critical);
        assert!(!health.all_healthy);

        let stats = manager.stats();
        assert_eq!(stats["blockchain"].success_rate, "100.0%");
        assert_eq!(stats["liquidity_sentinel"].success_rate, "0.0%");
    }
}

//! Hive Integration Tests
//!
//! Integration tests that verify the hive components work together:
//! 1. BeeManager -> BlockchainBee dispatch of JSON tasks
//! 2. LiquiditySentinelBee -> BlockchainBee liquidity actions
//! 3. DataPipelineBee -> ObjectStore uploads under a distributed lock
//! 4. DistributedLock / SessionManager sharing one key-value store
//! 5. LlmAbstraction failover and cost tracking
//! 6. Hive build and status with no external services
//!
//! All tests are deterministic (no real network calls) and use mock adapters.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;

use omk_hive::adapters::store::MemoryStore;
use omk_hive::application::{Hive, PIPELINE_LOCK};
use omk_hive::bees::{
    BeeManager, BeeRunner, BeeStatus, BlockchainBee, DataPipelineBee, HiveTask, LiquiditySentinelBee, OraclePair,
    PipelineSettings, PipelineTask,
};
use omk_hive::config::Config;
use omk_hive::coordination::{DistributedLock, LockError, LockOptions, SessionManager};
use omk_hive::domain::Chain;
use omk_hive::llm::{ConversationMemory, GenerateOptions, LlmAbstraction, SelectionStrategy};
use omk_hive::ports::mocks::{MockDexRouter, MockEvmClient, MockLlmProvider, MockObjectStore, MockPriceOracle, MockSolanaRpc};
use omk_hive::ports::{KeyValueStore, LlmProvider};

// ============================================================================
// Test Fixtures
// ============================================================================

const ETH_ADDR: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";
const SOL_ADDR: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

/// Blockchain bee on mock clients for both chains
fn mock_blockchain() -> Arc<BlockchainBee> {
    Arc::new(
        BlockchainBee::new()
            .with_ethereum(Arc::new(MockEvmClient::new().with_balance(ETH_ADDR, 3_000_000_000_000_000_000)))
            .with_solana(Arc::new(MockSolanaRpc::new().with_balance(SOL_ADDR, 1_000_000_000)))
            .with_oracle(Chain::Ethereum, Arc::new(MockPriceOracle::new("chainlink").with_price("ETH/USD", 3000.0)))
            .with_oracle(Chain::Solana, Arc::new(MockPriceOracle::new("pyth").with_price("SOL/USD", 150.0)))
            .with_router(Chain::Ethereum, Arc::new(MockDexRouter::new("uniswap", 2.0)))
            .with_router(Chain::Solana, Arc::new(MockDexRouter::new("raydium", 0.15))),
    )
}

fn mock_manager(blockchain: Arc<BlockchainBee>) -> (BeeManager, Arc<LiquiditySentinelBee>) {
    let sentinel = Arc::new(LiquiditySentinelBee::new().with_blockchain(Arc::clone(&blockchain)));
    let manager = BeeManager::new()
        .with_bee(Arc::new(BeeRunner::from_arc(blockchain, 1)))
        .with_bee(Arc::new(BeeRunner::from_arc(Arc::clone(&sentinel), 2)));
    (manager, sentinel)
}

/// Config that touches nothing outside `dir`
fn offline_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.llm.memory_path = String::new();
    config.solana.keypair_path = String::new();
    config.pipeline.work_dir = dir.path().join("work").to_string_lossy().into_owned();
    config.pipeline.local_store_dir = dir.path().join("store").to_string_lossy().into_owned();
    config
}

// ============================================================================
// BeeManager -> BlockchainBee
// ============================================================================

#[tokio::test]
async fn test_manager_dispatches_json_tasks() {
    let (manager, _) = mock_manager(mock_blockchain());

    let eth = manager
        .execute_json("blockchain", json!({"type": "check_balance", "chain": "ethereum", "address": ETH_ADDR}))
        .await;
    assert!(eth.success, "{:?}", eth.error);
    assert_eq!(eth.get("balance_eth"), Some(&json!(3.0)));
    assert_eq!(eth.bee_name.as_deref(), Some("blockchain"));
    assert!(eth.response_time.is_some());

    let sol = manager
        .execute_json("blockchain", json!({"type": "check_balance", "chain": "solana", "address": SOL_ADDR}))
        .await;
    assert_eq!(sol.get("balance_sol"), Some(&json!(1.0)));

    let unknown = manager.execute_json("blockchain", json!({"type": "mint_tokens"})).await;
    assert!(!unknown.success);
    assert!(unknown.error.unwrap().starts_with("Unknown task type: mint_tokens"));

    // Rejections are counted but do not mark the bee as failing
    let health = manager.check_all_health();
    let blockchain = &health.bees["blockchain"];
    assert_eq!(blockchain.task_count, 3);
    assert_eq!(blockchain.error_count, 1);
    assert_eq!(blockchain.status, BeeStatus::Active);
    assert!(!health.any_critical);
}

#[tokio::test]
async fn test_bridge_round_trip_through_manager() {
    let (manager, _) = mock_manager(mock_blockchain());

    let created = manager
        .execute_json(
            "blockchain",
            json!({"type": "bridge_transfer", "direction": "sol_to_eth", "amount": "5", "to_address": ETH_ADDR}),
        )
        .await;
    assert!(created.success, "{:?}", created.error);
    let id = created.get("bridge_transaction_id").and_then(|v| v.as_str()).unwrap().to_string();

    for status in ["locked", "released"] {
        let updated = manager
            .execute_json(
                "blockchain",
                json!({"type": "update_bridge_status", "bridge_transaction_id": id, "status": status}),
            )
            .await;
        assert!(updated.success, "{:?}", updated.error);
        assert_eq!(updated.get("status"), Some(&json!(status)));
    }

    let stats = manager.execute_json("blockchain", json!({"type": "bridge_stats"})).await;
    assert_eq!(stats.get("completed"), Some(&json!(1)));
    assert_eq!(stats.get("total_volume"), Some(&json!(5.0)));
}

// ============================================================================
// LiquiditySentinelBee -> BlockchainBee
// ============================================================================

#[tokio::test]
async fn test_sentinel_rebalance_executes_through_blockchain_bee() {
    let (manager, sentinel) = mock_manager(mock_blockchain());

    let registered = manager
        .execute_json(
            "liquidity_sentinel",
            json!({
                "type": "register_pool",
                "pool_id": "omk_eth",
                "pool": {
                    "chain": "ethereum",
                    "token_pair": "ETH/USD",
                    "token_a_amount": 100000.0,
                    "token_b_amount": 10000.0,
                    "volume_24h": 500000.0
                }
            }),
        )
        .await;
    assert!(registered.success, "{:?}", registered.error);
    assert_eq!(sentinel.pool_ids(), vec!["omk_eth".to_string()]);

    let monitored = manager
        .execute_json("liquidity_sentinel", json!({"type": "monitor_all_pools"}))
        .await;
    assert!(monitored.success, "{:?}", monitored.error);
    assert_eq!(monitored.get("monitored_pools"), Some(&json!(1)));
    assert_eq!(sentinel.price_history(Chain::Ethereum, "ETH/USD"), vec![3000.0]);

    let pending = manager
        .execute_json("liquidity_sentinel", json!({"type": "auto_rebalance_pool", "pool_id": "omk_eth"}))
        .await;
    assert_eq!(pending.get("queen_approval_required"), Some(&json!(true)));
    assert_eq!(pending.get("actions_taken"), Some(&json!([])));

    let approved = manager
        .execute_json(
            "liquidity_sentinel",
            json!({"type": "auto_rebalance_pool", "pool_id": "omk_eth", "queen_approved": true}),
        )
        .await;
    let taken = approved.get("actions_taken").and_then(|v| v.as_array()).unwrap();
    assert_eq!(taken.len(), 1);
    assert_eq!(taken[0]["action"], "add_liquidity");
    assert_eq!(taken[0]["result"]["success"], true);
    assert_eq!(taken[0]["result"]["chain"], "ethereum");
}

// ============================================================================
// DataPipelineBee -> ObjectStore
// ============================================================================

#[tokio::test]
async fn test_pipeline_run_under_lock_uploads_csv() {
    let dir = TempDir::new().unwrap();
    let store = MockObjectStore::new();
    let settings = PipelineSettings {
        work_dir: dir.path().to_path_buf(),
        oracle_pairs: vec![
            OraclePair { chain: Chain::Ethereum, pair: "ETH/USD".into() },
            OraclePair { chain: Chain::Solana, pair: "SOL/USD".into() },
        ],
        ..PipelineSettings::default()
    };
    let pipeline = DataPipelineBee::new(settings)
        .with_blockchain(mock_blockchain())
        .with_store(Arc::new(store.clone()));
    let manager = BeeManager::new().with_bee(Arc::new(BeeRunner::new(pipeline, 3)));

    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let lock = DistributedLock::new(Arc::clone(&kv));
    let outcome = lock
        .with_lock(
            PIPELINE_LOCK,
            LockOptions::default(),
            manager.execute_task(HiveTask::DataPipeline(PipelineTask::RunPipeline)),
        )
        .await
        .unwrap();

    assert!(outcome.success, "{:?}", outcome.error);
    assert_eq!(outcome.get("pipeline_run"), Some(&json!(1)));
    assert!(!lock.is_locked(PIPELINE_LOCK).await);

    let objects = store.objects();
    // No dex pairs configured, so only the blockchain and oracle sections
    assert_eq!(objects.len(), 2);
    assert!(objects.iter().any(|(name, _, _)| name.ends_with("_blockchain.csv")));
    let (_, oracle_csv, content_type) = objects.iter().find(|(name, _, _)| name.ends_with("_oracle.csv")).unwrap();
    assert_eq!(content_type, "text/csv");
    let text = String::from_utf8(oracle_csv.clone()).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("SOL/USD"));
}

// ============================================================================
// Coordination
// ============================================================================

#[tokio::test]
async fn test_two_instances_share_locks_and_sessions() {
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let first = DistributedLock::new(Arc::clone(&kv));
    let second = DistributedLock::new(Arc::clone(&kv));
    let quick = LockOptions::default().with_retries(2, Duration::from_millis(5));

    let guard = first.acquire("rebalance", quick).await.unwrap();
    assert!(second.is_locked("rebalance").await);
    assert!(matches!(
        second.acquire("rebalance", quick).await,
        Err(LockError::Timeout { attempts: 2, .. })
    ));

    let listed = second.list_locks().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "rebalance");
    assert!(listed[0].ttl_seconds > 0);

    assert!(guard.release().await);
    let guard = second.acquire("rebalance", quick).await.unwrap();
    assert_eq!(second.held_locks(), vec!["rebalance".to_string()]);
    guard.release().await;

    let sessions_a = SessionManager::new(Some(Arc::clone(&kv)));
    let sessions_b = SessionManager::new(Some(Arc::clone(&kv)));
    assert!(sessions_a.create("user-1", json!({"wallet": SOL_ADDR}), None).await.unwrap());
    let seen = sessions_b.get("user-1").await.unwrap().unwrap();
    assert_eq!(seen["wallet"], SOL_ADDR);
    assert_eq!(sessions_b.count().await.unwrap(), 1);
}

// ============================================================================
// LLM abstraction
// ============================================================================

#[tokio::test]
async fn test_llm_failover_records_cost_and_memory() {
    let failing: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::failing("gemini"));
    let backup: Arc<dyn LlmProvider> = Arc::new(MockLlmProvider::new("openai").with_response("Pool is healthy"));
    let llm = LlmAbstraction::new(
        vec![failing, backup],
        Some("gemini"),
        SelectionStrategy::Failover,
        ConversationMemory::in_memory(10),
    );

    let response = llm.generate("How is omk_eth?", &GenerateOptions::default()).await.unwrap();
    assert_eq!(response, "Pool is healthy");

    let costs = llm.get_costs();
    assert!(costs.by_provider.contains_key("openai"));
    assert!(!costs.by_provider.contains_key("gemini"));

    let recent = llm.memory().get_recent(5);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].user, "How is omk_eth?");
}

// ============================================================================
// Hive
// ============================================================================

#[tokio::test]
async fn test_offline_hive_status_and_tasks() {
    let dir = TempDir::new().unwrap();
    let hive = Hive::build(offline_config(&dir)).await.unwrap();

    let health = hive.health().await;
    assert!(health.store.reachable);
    assert!(health.llm_healthy);
    assert_eq!(health.chains.ethereum, None);
    assert_eq!(health.chains.solana, None);
    assert!(health.healthy);

    let registered = hive
        .execute_bee(
            "liquidity_sentinel",
            json!({"type": "register_pool", "pool_id": "omk_sol", "pool": {"chain": "solana", "token_pair": "SOL/USD"}}),
        )
        .await;
    assert!(registered.success, "{:?}", registered.error);

    let status = hive.status().await;
    assert_eq!(status.monitored_pools, vec!["omk_sol".to_string()]);
    assert_eq!(status.bees.total_bees, 3);
    assert_eq!(status.sessions, Some(0));
    assert!(status.next_pipeline_run.is_some());
    assert!(!status.llm.enabled);

    let reply = hive.generate("hello", None).await.unwrap();
    assert_eq!(reply, omk_hive::llm::NOT_CONFIGURED_RESPONSE);

    let outcome = hive.run_pipeline().await.unwrap();
    assert!(outcome.success, "{:?}", outcome.error);
    assert!(hive.list_locks().await.unwrap().is_empty());
}

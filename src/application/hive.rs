//! Hive Lifecycle
//!
//! Builds every component from [`Config`], then runs the scheduler loop:
//! bee health checks, the data pipeline under a distributed lock, and pool
//! monitoring by the liquidity sentinel.
//!
//! A component that fails to initialize is logged and left out; the hive
//! still starts with whatever is available.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tokio::time::{Instant, MissedTickBehavior};

use crate::adapters::dex::{RaydiumRouter, UniswapRouter};
use crate::adapters::ethereum::EthereumClient;
use crate::adapters::llm::{anthropic, gemini, openai, AnthropicProvider, GeminiProvider, OpenAiProvider, ProviderConfig};
use crate::adapters::oracles::{ChainlinkOracle, PythOracle};
use crate::adapters::retry::RetryPolicy;
use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::adapters::storage::{FivetranClient, GcsObjectStore, LocalObjectStore};
use crate::adapters::store;
use crate::bees::{
    BeeManager, BeeRunner, BeeStatus, BlockchainBee, BlockchainSettings, ChainHealth, DataPipelineBee, HiveHealth, HiveTask,
    LiquiditySentinelBee, PipelineSettings, PipelineTask, SentinelSettings, SentinelTask, TaskOutcome,
};
use crate::config::{expand_path, Config, ConfigError, LlmSection};
use crate::coordination::{DistributedLock, LockError, LockInfo, LockOptions, SessionManager};
use crate::domain::{Chain, CostSnapshot};
use crate::llm::{ConversationMemory, GenerateOptions, LlmAbstraction};
use crate::ports::{DexRouter, EvmClient, KeyValueStore, LlmError, LlmProvider, ObjectStore, PriceOracle, SolanaRpc, StoreError};

/// Lock held while the scheduled pipeline runs
pub const PIPELINE_LOCK: &str = "pipeline_run";

/// Marks the pipeline interval claimed by one instance
pub const PIPELINE_SLOT_KEY: &str = "pipeline:slot";

#[derive(Debug, Error)]
pub enum HiveError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),
    #[error("Data pipeline disabled")]
    PipelineDisabled,
}

/// Store backend and reachability
#[derive(Debug, Clone, Serialize)]
pub struct StoreStatus {
    pub backend: &'static str,
    /// Shared across hive instances (Redis)
    pub shared: bool,
    pub reachable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct LlmStatus {
    pub enabled: bool,
    pub providers: Vec<&'static str>,
    pub current: Option<&'static str>,
    pub strategy: String,
    pub healthy: bool,
    pub costs: CostSnapshot,
}

/// Result of [`Hive::health`]
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub store: StoreStatus,
    pub llm_healthy: bool,
    pub chains: ChainHealth,
    pub bees: HiveHealth,
}

/// Snapshot returned by [`Hive::status`]
#[derive(Debug, Clone, Serialize)]
pub struct HiveStatus {
    pub name: String,
    pub environment: String,
    pub running: bool,
    pub healthy: bool,
    pub store: StoreStatus,
    pub llm: LlmStatus,
    pub chains: ChainHealth,
    pub bees: HiveHealth,
    pub held_locks: Vec<String>,
    /// None when the session store could not be read
    pub sessions: Option<usize>,
    pub monitored_pools: Vec<String>,
    pub next_pipeline_run: Option<DateTime<Utc>>,
}

/// What one scheduler tick did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub health_checked: bool,
    pub pipeline_ran: bool,
    pub pools_monitored: bool,
}

#[derive(Debug, Default)]
struct Schedule {
    last_health_check: Option<Instant>,
    last_monitor: Option<Instant>,
}

fn is_due(last: Option<Instant>, every: Duration, now: Instant) -> bool {
    last.map_or(true, |at| now.duration_since(at) >= every)
}

/// The running hive: coordination, LLM routing and bees
pub struct Hive {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    shared_store: bool,
    lock: DistributedLock,
    sessions: SessionManager,
    llm: Arc<LlmAbstraction>,
    manager: BeeManager,
    blockchain: Arc<BlockchainBee>,
    sentinel: Arc<LiquiditySentinelBee>,
    pipeline: Option<Arc<DataPipelineBee>>,
    schedule: Mutex<Schedule>,
    is_running: RwLock<bool>,
    stop_signal: Notify,
}

impl std::fmt::Debug for Hive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hive")
            .field("name", &self.config.app.name)
            .field("store", &self.store.backend())
            .field("bees", &self.manager.bee_names())
            .finish()
    }
}

impl Hive {
    /// Wire every component from `config`
    pub async fn build(config: Config) -> Result<Self, HiveError> {
        config.validate()?;
        let redis_url = config.redis.get_url();
        let (store, shared_store) = store::connect_or_local(redis_url.as_deref(), config.redis.connect_timeout()).await;
        Self::assemble(config, store, shared_store).await
    }

    /// Wire every component around a key-value store shared with other instances
    pub async fn build_shared(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self, HiveError> {
        config.validate()?;
        Self::assemble(config, store, true).await
    }

    async fn assemble(config: Config, store: Arc<dyn KeyValueStore>, shared_store: bool) -> Result<Self, HiveError> {
        tracing::info!(name = %config.app.name, environment = %config.app.environment, "Building hive");

        let retry = RetryPolicy::from(&config.retry);

        // Coordination
        let lock = if shared_store {
            DistributedLock::new(Arc::clone(&store))
        } else {
            DistributedLock::local()
        };
        let sessions = SessionManager::new(Some(Arc::clone(&store)))
            .with_default_ttl(Duration::from_secs(config.redis.session_ttl_secs));

        // LLM
        let providers = build_llm_providers(&config.llm, retry);
        let memory = match config.llm.memory_file() {
            Some(path) => ConversationMemory::load(path, config.llm.max_exchanges).await,
            None => ConversationMemory::in_memory(config.llm.max_exchanges),
        };
        let llm = Arc::new(LlmAbstraction::new(
            providers,
            Some(config.llm.default_provider.as_str()),
            config.llm.selection_strategy()?,
            memory,
        ));

        // Bees
        let blockchain = Arc::new(build_blockchain_bee(&config, retry));

        let sentinel = Arc::new(
            LiquiditySentinelBee::new()
                .with_settings(SentinelSettings::from(&config.sentinel))
                .with_blockchain(Arc::clone(&blockchain))
                .with_llm(Arc::clone(&llm)),
        );
        for (pool_id, pool) in &config.sentinel.pools {
            sentinel.register_pool(pool_id, pool.clone());
        }

        let pipeline = if config.pipeline.enabled {
            Some(Arc::new(build_pipeline_bee(&config, Arc::clone(&blockchain), retry)))
        } else {
            tracing::info!("Data pipeline disabled");
            None
        };

        let mut manager = BeeManager::new()
            .with_bee(Arc::new(BeeRunner::from_arc(Arc::clone(&blockchain), 1)))
            .with_bee(Arc::new(BeeRunner::from_arc(Arc::clone(&sentinel), 2)));
        if let Some(pipeline) = &pipeline {
            manager.register(Arc::new(BeeRunner::from_arc(Arc::clone(pipeline), 3)));
        }

        tracing::info!(
            bees = ?manager.bee_names(),
            store = store.backend(),
            llm = ?llm.available_providers(),
            "Hive ready"
        );

        Ok(Self {
            config,
            store,
            shared_store,
            lock,
            sessions,
            llm,
            manager,
            blockchain,
            sentinel,
            pipeline,
            schedule: Mutex::new(Schedule::default()),
            is_running: RwLock::new(false),
            stop_signal: Notify::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn manager(&self) -> &BeeManager {
        &self.manager
    }

    pub fn llm(&self) -> &Arc<LlmAbstraction> {
        &self.llm
    }

    pub fn lock(&self) -> &DistributedLock {
        &self.lock
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn sentinel(&self) -> &Arc<LiquiditySentinelBee> {
        &self.sentinel
    }

    pub fn pipeline(&self) -> Option<&Arc<DataPipelineBee>> {
        self.pipeline.as_ref()
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Run the scheduler loop until [`stop`](Self::stop) is called
    pub async fn run(&self) -> Result<(), HiveError> {
        *self.is_running.write().await = true;

        let tick_every = Duration::from_secs(self.config.app.tick_interval_secs);
        tracing::info!(
            tick_secs = tick_every.as_secs(),
            health_secs = self.config.bees.health_check_interval_secs,
            monitor_secs = self.config.sentinel.monitor_interval_secs,
            "Hive started"
        );

        let mut interval = tokio::time::interval(tick_every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while *self.is_running.read().await {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.stop_signal.notified() => break,
            }
            if !*self.is_running.read().await {
                break;
            }
            self.tick().await;
        }

        self.shutdown().await;
        tracing::info!("Hive stopped");
        Ok(())
    }

    /// Signal the run loop to exit
    pub async fn stop(&self) {
        tracing::info!("Stopping hive");
        *self.is_running.write().await = false;
        self.stop_signal.notify_one();
    }

    /// One scheduler pass; each job runs only when its interval has elapsed
    pub async fn tick(&self) -> TickReport {
        let now = Instant::now();
        let mut report = TickReport::default();

        let (health_due, monitor_due) = {
            let schedule = self.schedule.lock();
            (
                is_due(
                    schedule.last_health_check,
                    Duration::from_secs(self.config.bees.health_check_interval_secs),
                    now,
                ),
                is_due(
                    schedule.last_monitor,
                    Duration::from_secs(self.config.sentinel.monitor_interval_secs),
                    now,
                ),
            )
        };

        if health_due {
            self.schedule.lock().last_health_check = Some(now);
            self.log_bee_health();
            report.health_checked = true;
        }

        match self.run_scheduled_pipeline().await {
            Ok(Some(outcome)) => {
                report.pipeline_ran = true;
                if !outcome.success {
                    tracing::error!(error = ?outcome.error, "Scheduled pipeline run failed");
                }
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Scheduled pipeline skipped"),
        }

        if monitor_due && !self.sentinel.pool_ids().is_empty() {
            self.schedule.lock().last_monitor = Some(now);
            self.monitor_pools().await;
            report.pools_monitored = true;
        }

        report
    }

    fn log_bee_health(&self) {
        let health = self.manager.check_all_health();
        if health.any_critical {
            let failing: Vec<&String> = health
                .bees
                .iter()
                .filter(|(_, h)| h.status == BeeStatus::Error)
                .map(|(name, _)| name)
                .collect();
            tracing::warn!(bees = ?failing, "Bee health check: critical bees");
        } else {
            tracing::debug!(total = health.total_bees, all_healthy = health.all_healthy, "Bee health check");
        }
    }

    async fn monitor_pools(&self) {
        let task = HiveTask::LiquiditySentinel(SentinelTask::MonitorAllPools {
            pools: Vec::new(),
            pool_data: Default::default(),
            summarize: self.config.sentinel.summarize_alerts,
        });
        let outcome = self.manager.execute_task(task).await;
        if !outcome.success {
            tracing::error!(error = ?outcome.error, "Pool monitoring failed");
            return;
        }
        let critical = outcome
            .get("critical_alerts")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        if critical > 0 {
            tracing::warn!(critical, "Critical pool alerts raised");
        } else {
            tracing::debug!(pools = ?outcome.get("monitored_pools"), "Pools monitored");
        }
    }

    /// Run the pipeline when its schedule says so, holding [`PIPELINE_LOCK`]
    ///
    /// Returns `Ok(None)` when the run is not due yet or another instance
    /// owns this interval. A skipped interval still counts as this
    /// instance's run, so it does not retry once the owner finishes.
    async fn run_scheduled_pipeline(&self) -> Result<Option<TaskOutcome>, HiveError> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(None);
        };
        let now = Utc::now();
        if !pipeline.is_due(now) {
            return Ok(None);
        }

        let interval = self.pipeline_interval();
        if self.shared_store && !self.claim_pipeline_slot(interval).await? {
            tracing::info!("Pipeline interval already claimed by another instance");
            pipeline.mark_skipped(now);
            return Ok(None);
        }

        // One attempt: another instance holding the lock is already running it
        let options = LockOptions::default()
            .with_ttl(interval)
            .with_retries(1, Duration::from_millis(100));
        match self.lock.with_lock(PIPELINE_LOCK, options, self.execute_pipeline()).await {
            Ok(outcome) => Ok(Some(outcome)),
            Err(LockError::Timeout { .. }) => {
                tracing::info!("Pipeline running on another instance");
                pipeline.mark_skipped(now);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn pipeline_interval(&self) -> Duration {
        Duration::from_secs(self.config.pipeline.interval_minutes.saturating_mul(60))
    }

    /// `SET NX EX` on [`PIPELINE_SLOT_KEY`], kept after the run ends
    ///
    /// Expires one tick before the interval so the owner can claim the next one.
    async fn claim_pipeline_slot(&self, interval: Duration) -> Result<bool, HiveError> {
        let tick = Duration::from_secs(self.config.app.tick_interval_secs);
        let ttl = interval.saturating_sub(tick).max(Duration::from_secs(1));
        let owner = format!("{}:{}", self.config.app.name, std::process::id());
        Ok(self.store.set_nx_ex(PIPELINE_SLOT_KEY, &owner, ttl).await?)
    }

    async fn execute_pipeline(&self) -> TaskOutcome {
        self.manager
            .execute_task(HiveTask::DataPipeline(PipelineTask::RunPipeline))
            .await
    }

    /// Run the data pipeline now, under the pipeline lock
    pub async fn run_pipeline(&self) -> Result<TaskOutcome, HiveError> {
        if self.pipeline.is_none() {
            return Err(HiveError::PipelineDisabled);
        }
        let options = LockOptions::default().with_ttl(self.pipeline_interval());
        Ok(self
            .lock
            .with_lock(PIPELINE_LOCK, options, self.execute_pipeline())
            .await?)
    }

    /// Dispatch one JSON task to a bee by name
    pub async fn execute_bee(&self, bee_name: &str, task: Value) -> TaskOutcome {
        self.manager.execute_json(bee_name, task).await
    }

    /// Generate text, optionally pinned to one provider
    pub async fn generate(&self, prompt: &str, provider: Option<&str>) -> Result<String, HiveError> {
        let options = match provider {
            Some(p) => GenerateOptions::default().with_provider(p),
            None => GenerateOptions::default(),
        };
        Ok(self.llm.generate(prompt, &options).await?)
    }

    pub async fn list_locks(&self) -> Result<Vec<LockInfo>, HiveError> {
        Ok(self.lock.list_locks().await?)
    }

    /// Force-release a lock held by any instance
    pub async fn release_lock(&self, name: &str) -> Result<bool, HiveError> {
        Ok(self.lock.force_release(name).await?)
    }

    pub async fn session_count(&self) -> Result<usize, HiveError> {
        Ok(self.sessions.count().await?)
    }

    /// Healthy when the store and configured chain RPCs answer, the LLM is
    /// usable and no bee is critical
    pub async fn health(&self) -> HealthReport {
        let store = StoreStatus {
            backend: self.store.backend(),
            shared: self.shared_store,
            reachable: self.store.ping().await.is_ok(),
        };
        let llm_healthy = self.llm.health_check().await;
        let chains = self.blockchain.chain_health().await;
        let bees = self.manager.check_all_health();
        HealthReport {
            healthy: store.reachable && llm_healthy && chains.all_reachable() && !bees.any_critical,
            store,
            llm_healthy,
            chains,
            bees,
        }
    }

    pub async fn status(&self) -> HiveStatus {
        let HealthReport { healthy, store, llm_healthy, chains, bees } = self.health().await;
        let sessions = match self.sessions.count().await {
            Ok(count) => Some(count),
            Err(e) => {
                tracing::warn!(error = %e, "Session count unavailable");
                None
            }
        };

        HiveStatus {
            name: self.config.app.name.clone(),
            environment: self.config.app.environment.clone(),
            running: self.is_running().await,
            healthy,
            store,
            llm: LlmStatus {
                enabled: self.llm.is_enabled(),
                providers: self.llm.available_providers(),
                current: self.llm.current_provider(),
                strategy: format!("{:?}", self.llm.strategy()),
                healthy: llm_healthy,
                costs: self.llm.get_costs(),
            },
            chains,
            bees,
            held_locks: self.lock.held_locks(),
            sessions,
            monitored_pools: self.sentinel.pool_ids(),
            next_pipeline_run: self.pipeline.as_ref().map(|p| p.next_run()),
        }
    }

    /// Shut down bees and LLM providers
    pub async fn shutdown(&self) {
        *self.is_running.write().await = false;
        self.manager.shutdown().await;
        self.llm.shutdown().await;
    }
}

fn build_llm_providers(section: &LlmSection, retry: RetryPolicy) -> Vec<Arc<dyn LlmProvider>> {
    let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

    for name in crate::config::loader::LLM_PROVIDERS {
        let Some(api_key) = section.get_api_key(name) else {
            tracing::debug!(provider = name, "No API key, provider skipped");
            continue;
        };
        let (model, base_url) = match name {
            "gemini" => (&section.gemini_model, &section.gemini_base_url),
            "openai" => (&section.openai_model, &section.openai_base_url),
            _ => (&section.anthropic_model, &section.anthropic_base_url),
        };
        let provider_config = |default_model: &str, default_url: &str| {
            ProviderConfig::new(
                api_key.clone(),
                model.as_deref().unwrap_or(default_model),
                base_url.as_deref().unwrap_or(default_url),
            )
            .with_retry(retry)
            .with_timeout(section.timeout())
        };

        let built: Result<Arc<dyn LlmProvider>, LlmError> = match name {
            "gemini" => GeminiProvider::new(provider_config(gemini::DEFAULT_MODEL, gemini::DEFAULT_BASE_URL))
                .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            "openai" => OpenAiProvider::new(provider_config(openai::DEFAULT_MODEL, openai::DEFAULT_BASE_URL))
                .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
            _ => AnthropicProvider::new(provider_config(anthropic::DEFAULT_MODEL, anthropic::DEFAULT_BASE_URL))
                .map(|p| Arc::new(p) as Arc<dyn LlmProvider>),
        };
        match built {
            Ok(provider) => providers.push(provider),
            Err(e) => tracing::warn!(provider = name, error = %e, "LLM provider failed to initialize"),
        }
    }
    providers
}

fn build_blockchain_bee(config: &Config, retry: RetryPolicy) -> BlockchainBee {
    let mut bee = BlockchainBee::with_settings(BlockchainSettings::from(&config.bees));
    let network = match config.oracles.feed_network() {
        Ok(network) => network,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid oracle network, using mainnet feeds");
            Default::default()
        }
    };

    if let Some(url) = config.ethereum.get_rpc_url() {
        match EthereumClient::new(&url, Duration::from_secs(config.ethereum.timeout_secs), retry) {
            Ok(client) => {
                let client: Arc<dyn EvmClient> = Arc::new(client);
                let oracle: Arc<dyn PriceOracle> = Arc::new(
                    ChainlinkOracle::new(Arc::clone(&client), network)
                        .with_max_staleness(config.oracles.chainlink_max_staleness_secs),
                );
                let router: Arc<dyn DexRouter> = match &config.ethereum.uniswap_router {
                    Some(address) => Arc::new(UniswapRouter::with_router(Arc::clone(&client), address)),
                    None => Arc::new(UniswapRouter::new(Arc::clone(&client))),
                };
                bee = bee
                    .with_ethereum(client)
                    .with_oracle(Chain::Ethereum, oracle)
                    .with_router(Chain::Ethereum, router);
            }
            Err(e) => tracing::warn!(error = %e, "Ethereum client failed to initialize"),
        }
    } else {
        tracing::info!("No Ethereum RPC configured - Ethereum tasks disabled");
    }

    if let Some(url) = config.solana.get_rpc_url() {
        let keypair_path = config.solana.get_keypair_path();
        let wallet = load_wallet(keypair_path.as_deref(), config.app.environment == "development");
        let client: Arc<dyn SolanaRpc> =
            Arc::new(SolanaClient::new(url, Duration::from_secs(config.solana.timeout_secs), wallet));
        let oracle: Arc<dyn PriceOracle> = Arc::new(
            PythOracle::new(Arc::clone(&client), network)
                .with_cache_ttl(Duration::from_secs(config.oracles.pyth_cache_ttl_secs)),
        );
        bee = bee.with_solana(client).with_oracle(Chain::Solana, oracle);

        match RaydiumRouter::new(
            &config.solana.raydium_api_url,
            Duration::from_secs(config.solana.timeout_secs),
            retry,
        ) {
            Ok(router) => bee = bee.with_router(Chain::Solana, Arc::new(router)),
            Err(e) => tracing::warn!(error = %e, "Raydium router failed to initialize"),
        }
    } else {
        tracing::info!("No Solana RPC configured - Solana tasks disabled");
    }

    bee
}

/// Wallet for SOL transfers; balance and price tasks work without one.
/// Development instances fall back to a throwaway keypair.
fn load_wallet(path: Option<&Path>, development: bool) -> Option<WalletManager> {
    if let Some(path) = path {
        match WalletManager::from_file(path) {
            Ok(wallet) => {
                tracing::info!(pubkey = %wallet.public_key(), "Solana wallet loaded");
                return Some(wallet);
            }
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Solana keypair could not be loaded"),
        }
    }

    if development {
        let wallet = WalletManager::new_random();
        tracing::warn!(pubkey = %wallet.public_key(), "Using a random Solana wallet (development only, unfunded)");
        return Some(wallet);
    }

    tracing::warn!("Solana wallet unavailable - transfers disabled");
    None
}

fn build_pipeline_bee(config: &Config, blockchain: Arc<BlockchainBee>, retry: RetryPolicy) -> DataPipelineBee {
    let section = &config.pipeline;
    let timeout = Duration::from_secs(60);
    let mut bee = DataPipelineBee::new(PipelineSettings::from(section)).with_blockchain(blockchain);

    let gcs = match (section.bucket.trim(), section.get_gcs_token()) {
        ("", _) => None,
        (bucket, Some(token)) => match GcsObjectStore::new(&section.gcs_base_url, bucket, &token, timeout, retry) {
            Ok(store) => Some(store),
            Err(e) => {
                tracing::warn!(bucket, error = %e, "GCS store failed to initialize");
                None
            }
        },
        (bucket, None) => {
            tracing::warn!(bucket, "GCS_ACCESS_TOKEN not set - uploading to the local store");
            None
        }
    };
    let store: Arc<dyn ObjectStore> = match gcs {
        Some(store) => Arc::new(store),
        None => Arc::new(LocalObjectStore::new(expand_path(&section.local_store_dir))),
    };
    bee = bee.with_store(store);

    if let Some((key, secret)) = section.get_fivetran_credentials() {
        match FivetranClient::new(&section.fivetran_base_url, &key, &secret, timeout, retry) {
            Ok(client) => bee = bee.with_fivetran(Arc::new(client)),
            Err(e) => tracing::warn!(error = %e, "Fivetran client failed to initialize"),
        }
    }

    bee
}

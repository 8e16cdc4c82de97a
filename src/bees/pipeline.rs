//! DataPipelineBee
//!
//! Collects on-chain snapshots, converts them to CSV and exports them to the
//! object store that Fivetran syncs from.
//!
//! ```text
//! collect_data -> data_sync_YYYYmmdd_HHMMSS.json
//! convert_to_csv -> data_sync_..._{blockchain,dex,oracle}.csv
//! upload_to_gcs -> {prefix}{file_name}
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::adapters::storage::{FivetranClient, FivetranError};
use crate::domain::chain::wei_to_gwei;
use crate::domain::Chain;
use crate::ports::{Bee, BeeError, ObjectStore, StorageError};

use super::blockchain::{dec_f64, from_raw, to_raw, wei_json, BlockchainBee};
use super::task::{chain_field, PipelineTask, PIPELINE_BEE};

/// Sections of a snapshot, in export order
pub const SECTIONS: [&str; 3] = ["blockchain", "dex", "oracle"];

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Input file not found: {0}")]
    InputNotFound(PathBuf),
    #[error("IO error on {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("{step} step failed: {source}")]
    Step {
        step: &'static str,
        #[source]
        source: Box<BeeError>,
    },
}

impl PipelineError {
    fn io(path: &Path, e: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    }
}

impl From<PipelineError> for BeeError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::InputNotFound(_) => BeeError::Validation(e.to_string()),
            other => BeeError::Pipeline(other.to_string()),
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(e: csv::Error) -> Self {
        PipelineError::Csv(e.to_string())
    }
}

impl From<FivetranError> for BeeError {
    fn from(e: FivetranError) -> Self {
        BeeError::Pipeline(e.to_string())
    }
}

/// Oracle pair sampled on every collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePair {
    #[serde(default, deserialize_with = "chain_field")]
    pub chain: Chain,
    pub pair: String,
}

/// DEX quote sampled on every collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexPair {
    #[serde(default, deserialize_with = "chain_field")]
    pub chain: Chain,
    pub token_in: String,
    pub token_out: String,
    /// Quote size in whole `token_in` units
    pub amount: Decimal,
    #[serde(default)]
    pub decimals_in: Option<u32>,
    #[serde(default)]
    pub decimals_out: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub work_dir: PathBuf,
    /// Prepended to every uploaded object name
    pub prefix: String,
    pub interval_minutes: u64,
    pub oracle_pairs: Vec<OraclePair>,
    pub dex_pairs: Vec<DexPair>,
    pub fivetran_connector_id: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("data/pipeline"),
            prefix: "blockchain_data/".to_string(),
            interval_minutes: 15,
            oracle_pairs: Vec::new(),
            dex_pairs: Vec::new(),
            fivetran_connector_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PipelineState {
    last_run: Option<DateTime<Utc>>,
    last_success: Option<DateTime<Utc>>,
    run_count: u64,
    error_count: u64,
    interval: Duration,
}

impl PipelineState {
    fn next_run(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_run.map_or(now, |last| last + self.interval)
    }
}

/// Result of a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectSummary {
    pub output_file: PathBuf,
    pub total_records: usize,
    pub blockchain_records: usize,
    pub dex_records: usize,
    pub oracle_records: usize,
}

/// An exported object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedFile {
    pub file: String,
    pub uri: String,
    pub size_bytes: usize,
}

pub struct DataPipelineBee {
    blockchain: Option<Arc<BlockchainBee>>,
    store: Option<Arc<dyn ObjectStore>>,
    fivetran: Option<Arc<FivetranClient>>,
    settings: PipelineSettings,
    state: Mutex<PipelineState>,
}

impl std::fmt::Debug for DataPipelineBee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataPipelineBee")
            .field("blockchain", &self.blockchain.is_some())
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .field("fivetran", &self.fivetran.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

impl DataPipelineBee {
    pub fn new(settings: PipelineSettings) -> Self {
        let interval = Duration::minutes(settings.interval_minutes.max(1) as i64);
        Self {
            blockchain: None,
            store: None,
            fivetran: None,
            settings,
            state: Mutex::new(PipelineState {
                last_run: None,
                last_success: None,
                run_count: 0,
                error_count: 0,
                interval,
            }),
        }
    }

    /// Collect from the chain clients, oracles and routers of `blockchain`
    pub fn with_blockchain(mut self, blockchain: Arc<BlockchainBee>) -> Self {
        self.blockchain = Some(blockchain);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        tracing::info!(store = store.name(), "Pipeline export destination configured");
        self.store = Some(store);
        self
    }

    pub fn with_fivetran(mut self, client: Arc<FivetranClient>) -> Self {
        self.fivetran = Some(client);
        self
    }

    /// Whether a scheduled run is due at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let state = self.state.lock();
        state.next_run(now) <= now
    }

    /// Count `at` as this interval's run without running, when another
    /// instance owns it
    pub fn mark_skipped(&self, at: DateTime<Utc>) {
        self.state.lock().last_run = Some(at);
        tracing::debug!(at = %at.to_rfc3339(), "Scheduled pipeline run skipped");
    }

    pub fn next_run(&self) -> DateTime<Utc> {
        self.state.lock().next_run(Utc::now())
    }

    // -- Collect ------------------------------------------------------------

    async fn collect_blockchain(&self, blockchain: &BlockchainBee) -> Vec<Value> {
        let mut records = Vec::new();

        if let Ok(eth) = blockchain.ethereum() {
            let sample = async {
                let block = eth.block_number().await?;
                let gas = eth.gas_price().await?;
                Ok::<_, BeeError>(json!({
                    "chain": Chain::Ethereum,
                    "block_number": block,
                    "gas_price_wei": wei_json(gas),
                    "gas_price_gwei": dec_f64(wei_to_gwei(gas)),
                }))
            };
            match sample.await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(collector = "ethereum", error = %e, "Collector failed, skipping"),
            }
        }

        if let Ok(sol) = blockchain.solana() {
            let settings = blockchain.settings();
            let fee = sol
                .estimate_priority_fee(settings.priority_fee_percentile, settings.max_priority_fee)
                .await;
            records.push(json!({
                "chain": Chain::Solana,
                "priority_fee_microlamports": fee,
            }));
        }
        records
    }

    async fn collect_oracle(&self, blockchain: &BlockchainBee) -> Vec<Value> {
        let mut records = Vec::new();
        for OraclePair { chain, pair } in &self.settings.oracle_pairs {
            match blockchain.price(*chain, pair).await {
                Ok(quote) => records.push(json!({
                    "chain": chain,
                    "oracle": quote.source,
                    "pair": quote.pair,
                    "price": quote.price,
                    "confidence": quote.confidence,
                    "updated_at": quote.updated_at.to_rfc3339(),
                })),
                Err(e) => tracing::warn!(collector = "oracle", chain = %chain, pair = %pair, error = %e, "Collector failed, skipping"),
            }
        }
        records
    }

    async fn collect_dex(&self, blockchain: &BlockchainBee) -> Vec<Value> {
        let mut records = Vec::new();
        for pair in &self.settings.dex_pairs {
            match self.dex_quote(blockchain, pair).await {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    collector = "dex",
                    chain = %pair.chain,
                    token_in = %pair.token_in,
                    token_out = %pair.token_out,
                    error = %e,
                    "Collector failed, skipping"
                ),
            }
        }
        records
    }

    async fn dex_quote(&self, blockchain: &BlockchainBee, pair: &DexPair) -> Result<Value, BeeError> {
        let native = match pair.chain {
            Chain::Ethereum => 18,
            Chain::Solana => 9,
        };
        let router = blockchain.router(pair.chain)?;
        let raw_in = to_raw(pair.amount, pair.decimals_in.unwrap_or(native))?;
        let quote = router.get_quote(&pair.token_in, &pair.token_out, raw_in).await?;
        let amount_out = from_raw(quote.amount_out, pair.decimals_out.unwrap_or(native))?;

        Ok(json!({
            "chain": pair.chain,
            "dex": quote.dex,
            "token_in": quote.token_in,
            "token_out": quote.token_out,
            "amount_in": dec_f64(pair.amount),
            "amount_out": dec_f64(amount_out),
            "price_impact": quote.price_impact,
            "pool_id": quote.pool_id,
        }))
    }

    /// Snapshot every collector into a timestamped JSON file
    pub async fn collect(&self) -> Result<CollectSummary, PipelineError> {
        let now = Utc::now();
        let (blockchain, dex, oracle) = match &self.blockchain {
            Some(bc) => (
                self.collect_blockchain(bc).await,
                self.collect_dex(bc).await,
                self.collect_oracle(bc).await,
            ),
            None => {
                tracing::warn!("No blockchain collectors connected, writing empty snapshot");
                (Vec::new(), Vec::new(), Vec::new())
            }
        };

        let summary_counts = (blockchain.len(), dex.len(), oracle.len());
        let snapshot = json!({
            "metadata": {
                "collected_at": now.to_rfc3339(),
                "collector": "DataPipelineBee",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "blockchain": blockchain,
            "dex": dex,
            "oracle": oracle,
        });

        let dir = &self.settings.work_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PipelineError::io(dir, e))?;
        let output_file = dir.join(format!("data_sync_{}.json", now.format("%Y%m%d_%H%M%S")));
        let body = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(&output_file, body)
            .await
            .map_err(|e| PipelineError::io(&output_file, e))?;

        let summary = CollectSummary {
            output_file,
            total_records: summary_counts.0 + summary_counts.1 + summary_counts.2,
            blockchain_records: summary_counts.0,
            dex_records: summary_counts.1,
            oracle_records: summary_counts.2,
        };
        tracing::info!(records = summary.total_records, file = %summary.output_file.display(), "Data collection complete");
        Ok(summary)
    }

    // -- Convert --------------------------------------------------------------

    /// Write one CSV per non-empty snapshot section next to the input file
    pub async fn convert_to_csv(&self, input_file: &Path) -> Result<Vec<PathBuf>, PipelineError> {
        let raw = match tokio::fs::read(input_file).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::InputNotFound(input_file.to_path_buf()));
            }
            Err(e) => return Err(PipelineError::io(input_file, e)),
        };
        let snapshot: Value = serde_json::from_slice(&raw)?;
        let collected_at = snapshot["metadata"]["collected_at"].as_str().unwrap_or_default().to_string();

        let stem = input_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data_sync".to_string());
        let dir = input_file.parent().unwrap_or_else(|| Path::new("."));

        let mut csv_files = Vec::new();
        for section in SECTIONS {
            let records: Vec<&Map<String, Value>> = snapshot[section]
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_object).collect())
                .unwrap_or_default();
            if records.is_empty() {
                continue;
            }

            let bytes = records_to_csv(&collected_at, &records)?;
            let path = dir.join(format!("{}_{}.csv", stem, section));
            tokio::fs::write(&path, bytes)
                .await
                .map_err(|e| PipelineError::io(&path, e))?;
            tracing::debug!(section, rows = records.len(), file = %path.display(), "CSV written");
            csv_files.push(path);
        }

        tracing::info!(files = csv_files.len(), "CSV conversion complete");
        Ok(csv_files)
    }

    // -- Upload ---------------------------------------------------------------

    pub async fn upload(&self, files: &[PathBuf]) -> Result<Vec<UploadedFile>, BeeError> {
        let store = self.store.as_ref().ok_or(BeeError::NotConnected("Object store"))?;

        let mut uploaded = Vec::with_capacity(files.len());
        for path in files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| StorageError::InvalidName(path.display().to_string()))?;
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| StorageError::Io(format!("{}: {}", path.display(), e)))?;
            let size_bytes = bytes.len();
            let content_type = match path.extension().and_then(|e| e.to_str()) {
                Some("csv") => "text/csv",
                Some("json") => "application/json",
                _ => "application/octet-stream",
            };

            let uri = store
                .put(&format!("{}{}", self.settings.prefix, file), bytes, content_type)
                .await?;
            tracing::info!(file = %file, uri = %uri, size_bytes, "Uploaded");
            uploaded.push(UploadedFile { file, uri, size_bytes });
        }
        Ok(uploaded)
    }

    // -- Tasks --------------------------------------------------------------

    async fn run_pipeline(&self) -> Result<Value, BeeError> {
        let started = Utc::now();
        let run = {
            let mut state = self.state.lock();
            state.run_count += 1;
            state.last_run = Some(started);
            state.run_count
        };
        tracing::info!(run, "Starting data pipeline");

        match self.run_steps().await {
            Ok(mut result) => {
                let finished = Utc::now();
                self.state.lock().last_success = Some(finished);
                let duration = (finished - started).num_milliseconds() as f64 / 1000.0;
                tracing::info!(run, duration_secs = duration, "Pipeline completed");

                result["pipeline_run"] = json!(run);
                result["started_at"] = json!(started.to_rfc3339());
                result["completed_at"] = json!(finished.to_rfc3339());
                result["duration_seconds"] = json!(duration);
                result["message"] = json!(format!("Pipeline completed successfully in {:.1}s", duration));
                Ok(result)
            }
            Err(e) => {
                self.state.lock().error_count += 1;
                tracing::error!(run, error = %e, "Pipeline failed");
                Err(e.into())
            }
        }
    }

    async fn run_steps(&self) -> Result<Value, PipelineError> {
        let step = |step: &'static str| move |e: BeeError| PipelineError::Step { step, source: Box::new(e) };

        let collected = self.collect().await.map_err(|e| step("collect")(e.into()))?;
        let csv_files = self
            .convert_to_csv(&collected.output_file)
            .await
            .map_err(|e| step("convert")(e.into()))?;
        let uploaded = if csv_files.is_empty() {
            Vec::new()
        } else {
            self.upload(&csv_files).await.map_err(step("upload"))?
        };

        Ok(json!({
            "steps": {
                "collect": collected,
                "convert": {"csv_files": csv_files, "count": csv_files.len()},
                "upload": {"uploaded_files": uploaded, "count": uploaded.len()},
            },
            "total_records": collected.total_records,
            "csv_files_uploaded": uploaded.len(),
            "destination": self.store.as_ref().map(|s| s.name()),
        }))
    }

    async fn check_fivetran(&self, connector_id: Option<String>) -> Result<Value, BeeError> {
        let Some(client) = &self.fivetran else {
            return Ok(json!({
                "configured": false,
                "message": "Fivetran not configured",
            }));
        };
        let connector_id = connector_id
            .or_else(|| self.settings.fivetran_connector_id.clone())
            .ok_or_else(|| BeeError::Validation("connector_id required".into()))?;

        let status = client.connector_status(&connector_id).await?;
        tracing::info!(connector = %connector_id, sync_state = ?status.sync_state, "Fivetran status");
        Ok(json!({
            "configured": true,
            "connector": status,
        }))
    }

    fn status(&self) -> Value {
        let state = self.state.lock().clone();
        json!({
            "status": {
                "run_count": state.run_count,
                "error_count": state.error_count,
                "last_run": state.last_run.map(|t| t.to_rfc3339()),
                "last_success": state.last_success.map(|t| t.to_rfc3339()),
                "next_run": state.next_run(Utc::now()).to_rfc3339(),
                "schedule_interval_minutes": state.interval.num_minutes(),
                "destination": self.store.as_ref().map(|s| s.name()),
                "store_available": self.store.is_some(),
                "fivetran_configured": self.fivetran.is_some(),
            }
        })
    }

    fn schedule(&self, interval_minutes: u64) -> Result<Value, BeeError> {
        if interval_minutes == 0 {
            return Err(BeeError::Validation("Interval must be at least 1 minute".into()));
        }
        let minutes = i64::try_from(interval_minutes)
            .map_err(|_| BeeError::Validation(format!("Interval too large: {}", interval_minutes)))?;
        let interval = Duration::try_minutes(minutes)
            .ok_or_else(|| BeeError::Validation(format!("Interval too large: {}", interval_minutes)))?;

        self.state.lock().interval = interval;
        tracing::info!(interval_minutes, "Pipeline schedule updated");
        Ok(json!({
            "interval_minutes": interval_minutes,
            "message": format!("Pipeline scheduled to run every {} minutes", interval_minutes),
            "next_run": (Utc::now() + interval).to_rfc3339(),
        }))
    }
}

#[async_trait]
impl Bee for DataPipelineBee {
    type Task = PipelineTask;

    fn name(&self) -> &'static str {
        PIPELINE_BEE
    }

    async fn execute(&self, task: PipelineTask) -> Result<Value, BeeError> {
        match task {
            PipelineTask::RunPipeline => self.run_pipeline().await,
            PipelineTask::CollectData => {
                let summary = self.collect().await?;
                Ok(json!(summary))
            }
            PipelineTask::ConvertToCsv { input_file } => {
                let csv_files = self.convert_to_csv(&input_file).await?;
                Ok(json!({"csv_files": csv_files, "count": csv_files.len()}))
            }
            PipelineTask::UploadToGcs { files } => {
                if files.is_empty() {
                    return Err(BeeError::Validation("No files to upload".into()));
                }
                let uploaded = self.upload(&files).await?;
                Ok(json!({
                    "uploaded_files": uploaded,
                    "count": uploaded.len(),
                    "destination": self.store.as_ref().map(|s| s.name()),
                }))
            }
            PipelineTask::CheckFivetran { connector_id } => self.check_fivetran(connector_id).await,
            PipelineTask::GetPipelineStatus => Ok(self.status()),
            PipelineTask::SchedulePipeline { interval_minutes } => self.schedule(interval_minutes),
        }
    }
}

/// Rows with a leading `timestamp` column and headers from the sorted key union
fn records_to_csv(collected_at: &str, records: &[&Map<String, Value>]) -> Result<Vec<u8>, PipelineError> {
    let headers: BTreeSet<&str> = records.iter().flat_map(|r| r.keys().map(String::as_str)).collect();

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(std::iter::once("timestamp").chain(headers.iter().copied()))?;
    for record in records {
        let row = std::iter::once(collected_at.to_string()).chain(headers.iter().map(|h| match record.get(*h) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }));
        writer.write_record(row)?;
    }
    writer.into_inner().map_err(|e| PipelineError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::retry::RetryPolicy;
    use crate::bees::task::parse_task;
    use crate::ports::mocks::{MockDexRouter, MockEvmClient, MockObjectStore, MockPriceOracle};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn blockchain() -> Arc<BlockchainBee> {
        Arc::new(
            BlockchainBee::new()
                .with_ethereum(Arc::new(MockEvmClient::new()))
                .with_oracle(Chain::Ethereum, Arc::new(MockPriceOracle::new("chainlink").with_price("ETH/USD", 3000.0)))
                .with_router(Chain::Solana, Arc::new(MockDexRouter::new("raydium", 0.15))),
        )
    }

    fn settings(dir: &TempDir) -> PipelineSettings {
        PipelineSettings {
            work_dir: dir.path().join("exports"),
            prefix: "blockchain_data/".into(),
            interval_minutes: 15,
            oracle_pairs: vec![
                OraclePair { chain: Chain::Ethereum, pair: "ETH/USD".into() },
                OraclePair { chain: Chain::Solana, pair: "SOL/USD".into() },
            ],
            dex_pairs: vec![DexPair {
                chain: Chain::Solana,
                token_in: "SOL".into(),
                token_out: "USDC".into(),
                amount: dec!(1),
                decimals_in: None,
                decimals_out: Some(6),
            }],
            fivetran_connector_id: None,
        }
    }

    async fn run(bee: &DataPipelineBee, task: Value) -> Result<Value, BeeError> {
        bee.execute(parse_task(task)?).await
    }

    #[tokio::test]
    async fn test_collect_skips_failing_collectors() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir)).with_blockchain(blockchain());

        let summary = bee.collect().await.unwrap();
        assert_eq!(summary.blockchain_records, 1);
        assert_eq!(summary.oracle_records, 1);
        assert_eq!(summary.dex_records, 1);
        assert_eq!(summary.total_records, 3);

        let name = summary.output_file.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("data_sync_") && name.ends_with(".json"));

        let snapshot: Value = serde_json::from_slice(&std::fs::read(&summary.output_file).unwrap()).unwrap();
        assert_eq!(snapshot["metadata"]["collector"], "DataPipelineBee");
        assert_eq!(snapshot["blockchain"][0]["block_number"], 19_000_000);
        assert_eq!(snapshot["dex"][0]["amount_out"], json!(150.0));
        assert_eq!(snapshot["oracle"][0]["pair"], "ETH/USD");
    }

    #[tokio::test]
    async fn test_csv_headers_are_key_union() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("data_sync_20241001_120000.json");
        std::fs::write(
            &input,
            serde_json::to_vec(&json!({
                "metadata": {"collected_at": "2024-10-01T12:00:00+00:00"},
                "blockchain": [],
                "oracle": [
                    {"pair": "ETH/USD", "price": 3000.5},
                    {"pair": "SOL/USD", "price": 150.0, "confidence": 0.1}
                ]
            }))
            .unwrap(),
        )
        .unwrap();

        let bee = DataPipelineBee::new(settings(&dir));
        let files = bee.convert_to_csv(&input).await.unwrap();
        assert_eq!(files, vec![dir.path().join("data_sync_20241001_120000_oracle.csv")]);

        let csv = std::fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "timestamp,confidence,pair,price");
        assert_eq!(lines[1], "2024-10-01T12:00:00+00:00,,ETH/USD,3000.5");
        assert_eq!(lines[2], "2024-10-01T12:00:00+00:00,0.1,SOL/USD,150.0");
    }

    #[tokio::test]
    async fn test_convert_missing_input() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir));
        let err = run(&bee, json!({"type": "convert_to_csv", "input_file": dir.path().join("nope.json")}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Input file not found"));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_run_pipeline_uploads_csv() {
        let dir = TempDir::new().unwrap();
        let store = MockObjectStore::new();
        let bee = DataPipelineBee::new(settings(&dir))
            .with_blockchain(blockchain())
            .with_store(Arc::new(store.clone()));

        assert!(bee.is_due(Utc::now()));
        let result = run(&bee, json!({"type": "run_pipeline"})).await.unwrap();

        assert_eq!(result["pipeline_run"], 1);
        assert_eq!(result["total_records"], 3);
        assert_eq!(result["csv_files_uploaded"], 3);

        let objects = store.objects();
        assert_eq!(objects.len(), 3);
        assert!(objects.iter().all(|(name, _, ct)| name.starts_with("blockchain_data/data_sync_") && ct == "text/csv"));
        assert!(objects[0].0.ends_with("_blockchain.csv"));

        assert!(!bee.is_due(Utc::now()));
        assert!(bee.is_due(Utc::now() + Duration::minutes(16)));

        let status = run(&bee, json!({"type": "get_pipeline_status"})).await.unwrap();
        assert_eq!(status["status"]["run_count"], 1);
        assert_eq!(status["status"]["error_count"], 0);
        assert!(status["status"]["last_success"].is_string());
    }

    #[tokio::test]
    async fn test_run_pipeline_stops_on_upload_failure() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir)).with_blockchain(blockchain());

        let err = run(&bee, json!({"type": "run_pipeline"})).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Pipeline error: upload step failed: Object store not connected"
        );

        let status = run(&bee, json!({"type": "get_pipeline_status"})).await.unwrap();
        assert_eq!(status["status"]["run_count"], 1);
        assert_eq!(status["status"]["error_count"], 1);
        assert_eq!(status["status"]["last_success"], Value::Null);
    }

    #[tokio::test]
    async fn test_schedule() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir));

        let result = run(&bee, json!({"type": "schedule_pipeline", "interval_minutes": 60})).await.unwrap();
        assert_eq!(result["message"], "Pipeline scheduled to run every 60 minutes");

        let status = run(&bee, json!({"type": "get_pipeline_status"})).await.unwrap();
        assert_eq!(status["status"]["schedule_interval_minutes"], 60);

        let err = run(&bee, json!({"type": "schedule_pipeline", "interval_minutes": 0})).await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_mark_skipped_defers_next_run() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir));
        let now = Utc::now();
        assert!(bee.is_due(now));

        bee.mark_skipped(now);
        assert!(!bee.is_due(now + Duration::minutes(1)));
        assert!(bee.is_due(now + Duration::minutes(15)));

        let status = run(&bee, json!({"type": "get_pipeline_status"})).await.unwrap();
        assert_eq!(status["status"]["run_count"], 0);
    }

    #[tokio::test]
    async fn test_check_fivetran() {
        let dir = TempDir::new().unwrap();
        let bee = DataPipelineBee::new(settings(&dir));
        let result = run(&bee, json!({"type": "check_fivetran"})).await.unwrap();
        assert_eq!(result["configured"], false);

        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/connectors/gcs_conn")
            .with_status(200)
            .with_body(r#"{"code":"Success","data":{"id":"gcs_conn","paused":false,"status":{"sync_state":"scheduled"}}}"#)
            .create_async()
            .await;
        let client = FivetranClient::new(
            &server.url(),
            "key",
            "secret",
            std::time::Duration::from_secs(5),
            RetryPolicy::immediate(1),
        )
        .unwrap();

        let mut with_connector = settings(&dir);
        with_connector.fivetran_connector_id = Some("gcs_conn".into());
        let bee = DataPipelineBee::new(with_connector).with_fivetran(Arc::new(client));
        let result = run(&bee, json!({"type": "check_fivetran"})).await.unwrap();
        assert_eq!(result["connector"]["sync_state"], "scheduled");
    }
}

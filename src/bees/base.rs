//! Bee runner
//!
//! Wraps a [`Bee`] with the bookkeeping every bee shares: status, task
//! counters, response timing and the `{success, error, ...}` outcome shape
//! callers consume. Tasks run on their own tokio task so a panicking bee
//! marks itself errored instead of taking the hive down.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::liquidity::round_to;
use crate::llm::{GenerateOptions, LlmAbstraction};
use crate::ports::{Bee, BeeError, GenerationParams, TaskKind};

use super::task::parse_task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BeeStatus {
    #[default]
    Initialized,
    Active,
    Paused,
    Error,
}

/// Result of one task as seen by callers
///
/// Bee output fields are flattened next to the bookkeeping fields, so a
/// balance check serializes as `{"success": true, "balance_eth": .., "bee_name": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bee_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bee_name: Option<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl TaskOutcome {
    pub fn succeeded(result: Value) -> Self {
        let data = match result {
            Value::Object(mut map) => {
                map.remove("success");
                map.remove("error");
                map
            }
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("result".into(), other);
                map
            }
        };
        Self {
            success: true,
            error: None,
            data,
            bee_id: None,
            bee_name: None,
            response_time: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            data: Map::new(),
            bee_id: None,
            bee_name: None,
            response_time: None,
            timestamp: Utc::now(),
        }
    }

    fn tagged(mut self, bee_id: u32, bee_name: &str) -> Self {
        self.bee_id = Some(bee_id);
        self.bee_name = Some(bee_name.to_string());
        self
    }

    /// Output field by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| {
            serde_json::json!({"success": self.success, "error": self.error})
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeeHealth {
    pub bee_id: u32,
    pub name: String,
    pub status: BeeStatus,
    pub task_count: u64,
    pub success_count: u64,
    pub error_count: u64,
    pub success_rate: f64,
    pub last_task: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeeStats {
    pub bee_id: u32,
    pub name: String,
    pub status: BeeStatus,
    pub tasks_completed: u64,
    /// "97.5%", or "N/A" before the first task
    pub success_rate: String,
}

#[derive(Debug, Default)]
struct Metrics {
    status: BeeStatus,
    task_count: u64,
    success_count: u64,
    error_count: u64,
    last_task_time: Option<DateTime<Utc>>,
}

/// Bee plus its metrics
pub struct BeeRunner<B: Bee> {
    bee: Arc<B>,
    bee_id: u32,
    metrics: Mutex<Metrics>,
}

impl<B: Bee> std::fmt::Debug for BeeRunner<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeeRunner")
            .field("bee", &self.bee.name())
            .field("bee_id", &self.bee_id)
            .field("status", &self.metrics.lock().status)
            .finish()
    }
}

impl<B: Bee> BeeRunner<B> {
    pub fn new(bee: B, bee_id: u32) -> Self {
        Self::from_arc(Arc::new(bee), bee_id)
    }

    /// Runner over a bee that other components also hold
    pub fn from_arc(bee: Arc<B>, bee_id: u32) -> Self {
        tracing::info!(bee = bee.name(), bee_id, "Bee initialized");
        Self {
            bee,
            bee_id,
            metrics: Mutex::new(Metrics::default()),
        }
    }

    pub fn bee(&self) -> &Arc<B> {
        &self.bee
    }

    pub fn bee_id(&self) -> u32 {
        self.bee_id
    }

    pub fn status(&self) -> BeeStatus {
        self.metrics.lock().status
    }

    /// Run a typed task and record the result
    pub async fn process_task(&self, task: B::Task) -> TaskOutcome {
        let name = self.bee.name();
        if self.status() == BeeStatus::Paused {
            tracing::warn!(bee = name, task = task.kind(), "Task rejected, bee paused");
            return TaskOutcome::failed(BeeError::Paused(name.to_string())).tagged(self.bee_id, name);
        }

        let kind = task.kind();
        tracing::info!(bee = name, bee_id = self.bee_id, task = kind, "Processing task");
        {
            let mut metrics = self.metrics.lock();
            metrics.task_count += 1;
            metrics.last_task_time = Some(Utc::now());
        }

        let started = Instant::now();
        let bee = Arc::clone(&self.bee);
        let joined = tokio::spawn(async move { bee.execute(task).await }).await;
        let response_time = started.elapsed().as_secs_f64();

        let outcome = match joined {
            Ok(Ok(result)) => {
                let mut metrics = self.metrics.lock();
                metrics.success_count += 1;
                metrics.status = BeeStatus::Active;
                tracing::info!(bee = name, task = kind, response_time, "Task complete");
                TaskOutcome::succeeded(result)
            }
            Ok(Err(e)) => {
                let mut metrics = self.metrics.lock();
                metrics.error_count += 1;
                if e.is_rejection() {
                    tracing::warn!(bee = name, task = kind, error = %e, "Task rejected");
                } else {
                    metrics.status = BeeStatus::Error;
                    tracing::error!(bee = name, task = kind, error = %e, "Task failed");
                }
                TaskOutcome::failed(e)
            }
            Err(join_error) => {
                let mut metrics = self.metrics.lock();
                metrics.error_count += 1;
                metrics.status = BeeStatus::Error;
                tracing::error!(bee = name, task = kind, error = %join_error, "Task aborted");
                TaskOutcome::failed(format!("{} task aborted: {}", kind, join_error))
            }
        };

        TaskOutcome {
            response_time: Some(response_time),
            ..outcome.tagged(self.bee_id, name)
        }
    }

    /// Decode a `{"type": ..}` task and run it
    ///
    /// Undecodable tasks still count as failed tasks.
    pub async fn process_json(&self, task: Value) -> TaskOutcome {
        match parse_task::<B::Task>(task) {
            Ok(task) => self.process_task(task).await,
            Err(e) => {
                let name = self.bee.name();
                {
                    let mut metrics = self.metrics.lock();
                    metrics.task_count += 1;
                    metrics.error_count += 1;
                    metrics.last_task_time = Some(Utc::now());
                }
                tracing::warn!(bee = name, error = %e, "Task rejected");
                TaskOutcome::failed(e).tagged(self.bee_id, name)
            }
        }
    }

    pub fn health(&self) -> BeeHealth {
        let metrics = self.metrics.lock();
        let success_rate = if metrics.task_count > 0 {
            metrics.success_count as f64 / metrics.task_count as f64 * 100.0
        } else {
            100.0
        };

        BeeHealth {
            bee_id: self.bee_id,
            name: self.bee.name().to_string(),
            status: metrics.status,
            task_count: metrics.task_count,
            success_count: metrics.success_count,
            error_count: metrics.error_count,
            success_rate: round_to(success_rate, 2),
            last_task: metrics.last_task_time,
        }
    }

    pub fn stats(&self) -> BeeStats {
        let metrics = self.metrics.lock();
        let success_rate = if metrics.task_count > 0 {
            format!("{:.1}%", metrics.success_count as f64 / metrics.task_count as f64 * 100.0)
        } else {
            "N/A".to_string()
        };

        BeeStats {
            bee_id: self.bee_id,
            name: self.bee.name().to_string(),
            status: metrics.status,
            tasks_completed: metrics.task_count,
            success_rate,
        }
    }

    pub fn pause(&self) {
        let mut metrics = self.metrics.lock();
        if metrics.status != BeeStatus::Paused {
            tracing::info!(bee = self.bee.name(), "Bee paused");
            metrics.status = BeeStatus::Paused;
        }
    }

    /// Resume a paused bee; it reports `Initialized` until its next task
    pub fn resume(&self) {
        let mut metrics = self.metrics.lock();
        if metrics.status == BeeStatus::Paused {
            tracing::info!(bee = self.bee.name(), "Bee resumed");
            metrics.status = BeeStatus::Initialized;
        }
    }
}

/// Object-safe view of a [`BeeRunner`] for the manager
#[async_trait]
pub trait ManagedBee: Send + Sync {
    fn name(&self) -> &'static str;

    fn bee_id(&self) -> u32;

    fn known_types(&self) -> &'static [&'static str];

    async fn process_json(&self, task: Value) -> TaskOutcome;

    fn health(&self) -> BeeHealth;

    fn stats(&self) -> BeeStats;

    fn pause(&self);

    fn resume(&self);

    async fn shutdown(&self);
}

#[async_trait]
impl<B: Bee> ManagedBee for BeeRunner<B> {
    fn name(&self) -> &'static str {
        self.bee.name()
    }

    fn bee_id(&self) -> u32 {
        self.bee_id
    }

    fn known_types(&self) -> &'static [&'static str] {
        <B::Task as TaskKind>::known_types()
    }

    async fn process_json(&self, task: Value) -> TaskOutcome {
        BeeRunner::process_json(self, task).await
    }

    fn health(&self) -> BeeHealth {
        BeeRunner::health(self)
    }

    fn stats(&self) -> BeeStats {
        BeeRunner::stats(self)
    }

    fn pause(&self) {
        BeeRunner::pause(self)
    }

    fn resume(&self) {
        BeeRunner::resume(self)
    }

    async fn shutdown(&self) {
        self.bee.shutdown().await;
        tracing::info!(bee = self.bee.name(), "Bee shut down");
    }
}

/// Optional LLM reasoning for a bee
#[derive(Clone)]
pub struct LlmAccess {
    bee: &'static str,
    llm: Option<Arc<LlmAbstraction>>,
}

impl std::fmt::Debug for LlmAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAccess")
            .field("bee", &self.bee)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl LlmAccess {
    pub fn new(bee: &'static str, llm: Option<Arc<LlmAbstraction>>) -> Self {
        if llm.is_some() {
            tracing::info!(bee, "LLM enabled");
        }
        Self { bee, llm }
    }

    pub fn disabled(bee: &'static str) -> Self {
        Self { bee, llm: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.as_ref().is_some_and(|llm| llm.is_enabled())
    }

    /// Ask the LLM, or `None` when it is unavailable or fails
    pub async fn use_llm(&self, prompt: &str, temperature: f32) -> Option<String> {
        let llm = match &self.llm {
            Some(llm) if llm.is_enabled() => llm,
            _ => {
                tracing::warn!(bee = self.bee, "Bee attempted to use LLM but it's not enabled");
                return None;
            }
        };

        let options = GenerateOptions::without_memory().with_params(GenerationParams {
            temperature,
            ..GenerationParams::default()
        });
        match llm.generate(prompt, &options).await {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::error!(bee = self.bee, error = %e, "Bee LLM error");
                None
            }
        }
    }
}

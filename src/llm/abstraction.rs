//! Provider-switching LLM front end
//!
//! Routes each request to one of the registered providers, fails over to the
//! others on error, and keeps shared memory and cost accounting regardless of
//! which provider answered.

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::memory::ConversationMemory;
use crate::domain::{CostSnapshot, CostTracker};
use crate::ports::{GenerationParams, LlmError, LlmProvider};

/// Returned when no provider is configured
pub const NOT_CONFIGURED_RESPONSE: &str = "[LLM NOT CONFIGURED - Would generate response here]";

/// Exchanges replayed into each prompt
pub const MEMORY_WINDOW: usize = 5;

/// Which provider a request starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Always start with the current provider
    Failover,
    /// Rotate the starting provider per request
    #[default]
    RoundRobin,
}

impl FromStr for SelectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failover" => Ok(SelectionStrategy::Failover),
            "round_robin" | "round-robin" | "roundrobin" => Ok(SelectionStrategy::RoundRobin),
            other => Err(format!("Unknown LLM strategy: {}", other)),
        }
    }
}

/// Per-request options
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub params: GenerationParams,
    /// Pin the first attempt to this provider
    pub provider: Option<String>,
    /// Extra `key: value` lines placed before the conversation
    pub context: Option<Map<String, Value>>,
    pub use_memory: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            params: GenerationParams::default(),
            provider: None,
            context: None,
            use_memory: true,
        }
    }
}

impl GenerateOptions {
    pub fn without_memory() -> Self {
        Self {
            use_memory: false,
            ..Self::default()
        }
    }

    pub fn with_provider(mut self, provider: &str) -> Self {
        self.provider = Some(provider.to_string());
        self
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Unified LLM interface over the injected providers
pub struct LlmAbstraction {
    providers: Vec<Arc<dyn LlmProvider>>,
    current: RwLock<usize>,
    strategy: SelectionStrategy,
    rotation: AtomicUsize,
    memory: ConversationMemory,
    costs: Mutex<CostTracker>,
}

impl std::fmt::Debug for LlmAbstraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAbstraction")
            .field("providers", &self.available_providers())
            .field("current", &self.current_provider())
            .field("strategy", &self.strategy)
            .finish()
    }
}

impl LlmAbstraction {
    /// Register providers in priority order
    ///
    /// `default_provider` selects the current provider; an unknown or missing
    /// name falls back to the first registered one.
    pub fn new(
        providers: Vec<Arc<dyn LlmProvider>>,
        default_provider: Option<&str>,
        strategy: SelectionStrategy,
        memory: ConversationMemory,
    ) -> Self {
        let current = match default_provider {
            Some(name) => match providers.iter().position(|p| p.name() == name) {
                Some(index) => index,
                None => {
                    if let Some(first) = providers.first() {
                        tracing::info!(requested = name, using = first.name(), "Defaulting LLM provider");
                    }
                    0
                }
            },
            None => 0,
        };

        if providers.is_empty() {
            tracing::warn!("No LLM providers configured - running in non-LLM mode");
        } else {
            let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
            tracing::info!(providers = ?names, strategy = ?strategy, "LLM providers ready");
        }

        Self {
            providers,
            current: RwLock::new(current),
            strategy,
            rotation: AtomicUsize::new(current),
            memory,
            costs: Mutex::new(CostTracker::new()),
        }
    }

    /// Abstraction with no providers (non-LLM mode)
    pub fn disabled() -> Self {
        Self::new(Vec::new(), None, SelectionStrategy::default(), ConversationMemory::default())
    }

    pub fn is_enabled(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    pub fn available_providers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn current_provider(&self) -> Option<&'static str> {
        self.providers.get(*self.current.read()).map(|p| p.name())
    }

    /// Make `name` the current provider; memory carries over
    pub fn switch_provider(&self, name: &str) -> Result<(), LlmError> {
        let index = self.index_of(name).ok_or_else(|| LlmError::UnknownProvider {
            name: name.to_string(),
            available: self.available_providers().iter().map(|s| s.to_string()).collect(),
        })?;

        let old = self.current_provider();
        *self.current.write() = index;
        tracing::info!(from = ?old, to = name, "Switched LLM provider");
        Ok(())
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.name() == name)
    }

    /// Provider indices in the order they will be tried
    fn attempt_order(&self, pinned: Option<&str>) -> Vec<usize> {
        let n = self.providers.len();
        let pinned_index = pinned.and_then(|name| {
            let found = self.index_of(name);
            if found.is_none() {
                tracing::warn!(provider = name, "Provider not available, using fallback");
            }
            found
        });

        match (pinned, pinned_index) {
            (_, Some(start)) => failover_order(start, n),
            // Unknown pinned provider falls back to the first registered one
            (Some(_), None) => failover_order(0, n),
            (None, None) => match self.strategy {
                SelectionStrategy::Failover => failover_order(*self.current.read(), n),
                SelectionStrategy::RoundRobin => {
                    let start = self.rotation.fetch_add(1, Ordering::Relaxed) % n;
                    (0..n).map(|offset| (start + offset) % n).collect()
                }
            },
        }
    }

    /// Generate a completion, failing over across providers
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String, LlmError> {
        if self.providers.is_empty() {
            tracing::warn!("No LLM providers available, returning placeholder");
            return Ok(NOT_CONFIGURED_RESPONSE.to_string());
        }

        let full_prompt = if options.use_memory {
            build_prompt(prompt, options.context.as_ref(), &self.memory.get_recent(MEMORY_WINDOW))
        } else {
            prompt.to_string()
        };

        let mut failures = Vec::new();
        for (attempt, index) in self.attempt_order(options.provider.as_deref()).into_iter().enumerate() {
            let provider = &self.providers[index];
            if attempt > 0 {
                tracing::info!(provider = provider.name(), "Failing over to next LLM provider");
            }

            match provider.generate(&full_prompt, &options.params).await {
                Ok(response) => {
                    self.record_success(provider.name(), prompt, &full_prompt, &response, options)
                        .await;
                    return Ok(response);
                }
                Err(e) => {
                    tracing::error!(provider = provider.name(), error = %e, "Generation failed");
                    failures.push((provider.name().to_string(), e.to_string()));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(failures))
    }

    async fn record_success(
        &self,
        provider: &'static str,
        prompt: &str,
        full_prompt: &str,
        response: &str,
        options: &GenerateOptions,
    ) {
        if options.use_memory {
            let metadata = json!({
                "provider": provider,
                "temperature": options.params.temperature,
                "context": options.context,
            });
            self.memory.add_exchange(prompt, response, metadata).await;
        }

        let cost = self.costs.lock().record(provider, full_prompt, response);
        tracing::info!(
            provider,
            input_words = full_prompt.split_whitespace().count(),
            output_words = response.split_whitespace().count(),
            cost = %format!("${:.6}", cost),
            "Generated response"
        );
    }

    pub fn get_costs(&self) -> CostSnapshot {
        self.costs.lock().snapshot()
    }

    /// Healthy in non-LLM mode, otherwise the current provider's health
    pub async fn health_check(&self) -> bool {
        let provider = {
            let current = *self.current.read();
            self.providers.get(current).cloned()
        };
        match provider {
            Some(provider) => provider.health_check().await,
            None => true,
        }
    }

    pub async fn shutdown(&self) {
        for provider in &self.providers {
            tracing::info!(provider = provider.name(), "Shutdown LLM provider");
        }
    }
}

fn failover_order(start: usize, n: usize) -> Vec<usize> {
    std::iter::once(start).chain((0..n).filter(|i| *i != start)).collect()
}

fn context_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Prompt with optional context lines and the recent conversation
pub fn build_prompt(prompt: &str, context: Option<&Map<String, Value>>, history: &[super::memory::Exchange]) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(context) = context.filter(|c| !c.is_empty()) {
        let lines: Vec<String> = context
            .iter()
            .map(|(k, v)| format!("{}: {}", k, context_value(v)))
            .collect();
        parts.push(format!("Context:\n{}\n", lines.join("\n")));
    }

    if !history.is_empty() {
        parts.push("Previous conversation:".to_string());
        for exchange in history {
            parts.push(format!("User: {}", exchange.user));
            parts.push(format!("Assistant: {}", exchange.assistant));
        }
        parts.push(String::new());
    }

    parts.push(format!("User: {}", prompt));
    parts.push("Assistant:".to_string());
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockLlmProvider;

    fn abstraction(providers: Vec<MockLlmProvider>, strategy: SelectionStrategy) -> LlmAbstraction {
        let providers: Vec<Arc<dyn LlmProvider>> = providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
            .collect();
        LlmAbstraction::new(providers, Some("gemini"), strategy, ConversationMemory::in_memory(100))
    }

    #[tokio::test]
    async fn test_placeholder_without_providers() {
        let llm = LlmAbstraction::disabled();
        assert!(!llm.is_enabled());
        assert_eq!(
            llm.generate("hello", &GenerateOptions::default()).await.unwrap(),
            NOT_CONFIGURED_RESPONSE
        );
        assert!(llm.health_check().await);
    }

    #[tokio::test]
    async fn test_failover_tries_others_in_order() {
        let gemini = MockLlmProvider::failing("gemini");
        let openai = MockLlmProvider::new("openai").with_response("from openai");
        let llm = abstraction(vec![gemini.clone(), openai.clone()], SelectionStrategy::Failover);

        let text = llm.generate("hi", &GenerateOptions::without_memory()).await.unwrap();
        assert_eq!(text, "from openai");
        assert_eq!(gemini.prompts().len(), 1);
        assert_eq!(openai.prompts(), vec!["hi"]);
        assert!(llm.get_costs().by_provider.contains_key("openai"));
        assert!(!llm.get_costs().by_provider.contains_key("gemini"));
    }

    #[tokio::test]
    async fn test_all_failed_lists_every_provider() {
        let llm = abstraction(
            vec![MockLlmProvider::failing("gemini"), MockLlmProvider::failing("anthropic")],
            SelectionStrategy::Failover,
        );

        match llm.generate("hi", &GenerateOptions::without_memory()).await {
            Err(LlmError::AllProvidersFailed(failures)) => {
                let names: Vec<&str> = failures.iter().map(|(p, _)| p.as_str()).collect();
                assert_eq!(names, vec!["gemini", "anthropic"]);
            }
            other => panic!("expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_round_robin_rotates_start() {
        let gemini = MockLlmProvider::new("gemini");
        let openai = MockLlmProvider::new("openai");
        let llm = abstraction(vec![gemini.clone(), openai.clone()], SelectionStrategy::RoundRobin);

        let opts = GenerateOptions::without_memory();
        assert_eq!(llm.generate("1", &opts).await.unwrap(), "response from gemini");
        assert_eq!(llm.generate("2", &opts).await.unwrap(), "response from openai");
        assert_eq!(llm.generate("3", &opts).await.unwrap(), "response from gemini");
        assert_eq!(gemini.prompts().len(), 2);
        assert_eq!(openai.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_pinned_and_unknown_provider() {
        let gemini = MockLlmProvider::new("gemini");
        let anthropic = MockLlmProvider::new("anthropic");
        let llm = abstraction(vec![gemini.clone(), anthropic.clone()], SelectionStrategy::Failover);

        let pinned = GenerateOptions::without_memory().with_provider("anthropic");
        assert_eq!(llm.generate("x", &pinned).await.unwrap(), "response from anthropic");

        // Unknown names fall back to the first registered provider
        let unknown = GenerateOptions::without_memory().with_provider("grok");
        assert_eq!(llm.generate("y", &unknown).await.unwrap(), "response from gemini");
    }

    #[tokio::test]
    async fn test_switch_provider() {
        let llm = abstraction(
            vec![MockLlmProvider::new("gemini"), MockLlmProvider::new("openai")],
            SelectionStrategy::Failover,
        );
        assert_eq!(llm.current_provider(), Some("gemini"));

        llm.switch_provider("openai").unwrap();
        assert_eq!(llm.current_provider(), Some("openai"));
        assert_eq!(
            llm.generate("q", &GenerateOptions::without_memory()).await.unwrap(),
            "response from openai"
        );

        let err = llm.switch_provider("grok").unwrap_err();
        assert_eq!(err.to_string(), "Provider grok not available. Available: [gemini, openai]");
    }

    #[tokio::test]
    async fn test_memory_prompt_format() {
        let gemini = MockLlmProvider::new("gemini").with_response("Pool is healthy");
        let llm = abstraction(vec![gemini.clone()], SelectionStrategy::Failover);

        let mut context = Map::new();
        context.insert("pool".into(), Value::String("OMK/USDC".into()));
        let opts = GenerateOptions::default().with_context(context);

        llm.generate("How is the pool?", &opts).await.unwrap();
        llm.generate("And volume?", &GenerateOptions::default()).await.unwrap();

        let prompts = gemini.prompts();
        assert_eq!(
            prompts[0],
            "Context:\npool: OMK/USDC\n\nUser: How is the pool?\nAssistant:"
        );
        assert_eq!(
            prompts[1],
            "Previous conversation:\nUser: How is the pool?\nAssistant: Pool is healthy\n\nUser: And volume?\nAssistant:"
        );
        assert_eq!(llm.memory().get_recent(1)[0].metadata["provider"], "gemini");
    }

    #[tokio::test]
    async fn test_health_follows_current_provider() {
        let llm = abstraction(
            vec![MockLlmProvider::failing("gemini"), MockLlmProvider::new("openai")],
            SelectionStrategy::Failover,
        );
        assert!(!llm.health_check().await);
        llm.switch_provider("openai").unwrap();
        assert!(llm.health_check().await);
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("failover".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::Failover);
        assert_eq!("round-robin".parse::<SelectionStrategy>().unwrap(), SelectionStrategy::RoundRobin);
        assert!("random".parse::<SelectionStrategy>().is_err());
    }
}

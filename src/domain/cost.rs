//! LLM Cost Accounting
//!
//! Estimates generation cost from word counts and per-provider token rates,
//! and keeps running totals overall and per provider.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tokens per whitespace-separated word
pub const TOKENS_PER_WORD: f64 = 1.3;

/// USD price per 1M tokens
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenRates {
    pub input: f64,
    pub output: f64,
}

impl TokenRates {
    pub const GEMINI: TokenRates = TokenRates { input: 0.075, output: 0.30 };
    pub const OPENAI: TokenRates = TokenRates { input: 30.0, output: 60.0 };
    pub const ANTHROPIC: TokenRates = TokenRates { input: 3.0, output: 15.0 };
    pub const DEFAULT: TokenRates = TokenRates { input: 1.0, output: 3.0 };

    pub fn for_provider(provider: &str) -> TokenRates {
        match provider {
            "gemini" => Self::GEMINI,
            "openai" => Self::OPENAI,
            "anthropic" => Self::ANTHROPIC,
            _ => Self::DEFAULT,
        }
    }
}

/// Rough token estimate for a piece of text
pub fn estimate_tokens(text: &str) -> f64 {
    text.split_whitespace().count() as f64 * TOKENS_PER_WORD
}

/// Cost of one generation in USD, rounded to 8 decimals
pub fn generation_cost(provider: &str, prompt: &str, response: &str) -> f64 {
    let rates = TokenRates::for_provider(provider);
    let cost = estimate_tokens(prompt) / 1_000_000.0 * rates.input
        + estimate_tokens(response) / 1_000_000.0 * rates.output;
    (cost * 1e8).round() / 1e8
}

/// Snapshot of accumulated cost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSnapshot {
    pub total: f64,
    pub by_provider: BTreeMap<String, f64>,
}

/// Running cost totals
#[derive(Debug, Default)]
pub struct CostTracker {
    totals: CostSnapshot,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generation's cost and return it
    pub fn record(&mut self, provider: &str, prompt: &str, response: &str) -> f64 {
        let cost = generation_cost(provider, prompt, response);
        self.totals.total += cost;
        *self.totals.by_provider.entry(provider.to_string()).or_insert(0.0) += cost;
        cost
    }

    pub fn snapshot(&self) -> CostSnapshot {
        self.totals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_estimate_tokens() {
        assert_relative_eq!(estimate_tokens("one two three four five six seven eight nine ten"), 13.0);
        assert_eq!(estimate_tokens("   "), 0.0);
    }

    #[test]
    fn test_rates_by_provider() {
        assert_eq!(TokenRates::for_provider("gemini"), TokenRates::GEMINI);
        assert_eq!(TokenRates::for_provider("mistral"), TokenRates::DEFAULT);
    }

    #[test]
    fn test_generation_cost() {
        // 10 words in, 10 words out = 13 tokens each
        let prompt = "a b c d e f g h i j";
        let cost = generation_cost("openai", prompt, prompt);
        assert_relative_eq!(cost, 13.0 / 1e6 * 30.0 + 13.0 / 1e6 * 60.0, epsilon = 1e-12);

        let cheap = generation_cost("gemini", prompt, prompt);
        assert!(cheap < cost);
    }

    #[test]
    fn test_tracker_totals() {
        let mut tracker = CostTracker::new();
        let a = tracker.record("openai", "hello world", "hi");
        let b = tracker.record("anthropic", "hello world", "hi");
        let c = tracker.record("openai", "again", "ok");

        let snapshot = tracker.snapshot();
        assert_relative_eq!(snapshot.total, a + b + c, epsilon = 1e-12);
        assert_relative_eq!(snapshot.by_provider["openai"], a + c, epsilon = 1e-12);
        assert_eq!(snapshot.by_provider.len(), 2);
    }
}

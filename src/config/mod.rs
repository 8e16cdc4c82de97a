//! Configuration Module
//!
//! Loads and validates configuration from TOML files.

pub mod loader;

pub use loader::{
    Config, ConfigError, load_config, expand_path,
    AppSection, RedisSection, LlmSection, EthereumSection, SolanaSection, OraclesSection,
    BeesSection, SentinelSection, PipelineSection, RetrySection, LoggingSection,
};

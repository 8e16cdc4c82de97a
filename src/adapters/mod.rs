//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - LLM: Gemini, OpenAI and Anthropic REST clients
//! - Store: Redis and in-memory key-value stores
//! - Ethereum: JSON-RPC client and ABI helpers
//! - Solana: RPC client and wallet management
//! - Oracles: Chainlink and Pyth price feeds
//! - DEX: Uniswap V2 and Raydium quotes
//! - Storage: local and GCS object stores, Fivetran status
//! - CLI: Command-line interface definitions

pub mod http;
pub mod retry;
pub mod llm;
pub mod store;
pub mod ethereum;
pub mod solana;
pub mod oracles;
pub mod dex;
pub mod storage;
pub mod cli;

pub use retry::RetryPolicy;
pub use solana::{SolanaClient, WalletManager};
pub use ethereum::EthereumClient;
pub use cli::CliApp;

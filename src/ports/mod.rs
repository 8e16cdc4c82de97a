//! Ports Layer - Trait definitions for external dependencies
//!
//! Adapters implement these traits; bees, the LLM abstraction and the
//! coordination layer depend only on them:
//! - LLM providers (Gemini, OpenAI, Anthropic)
//! - Key-value store (Redis, in-memory)
//! - Chain clients (Ethereum JSON-RPC, Solana RPC)
//! - Price oracles and DEX routers
//! - Object stores for pipeline exports
//! - Bees

pub mod llm;
pub mod store;
pub mod chain;
pub mod oracle;
pub mod dex;
pub mod object_store;
pub mod bee;
pub mod mocks;

pub use llm::{GenerationParams, LlmError, LlmProvider};
pub use store::{KeyValueStore, StoreError, TTL_MISSING, TTL_PERSISTENT};
pub use chain::{CallRequest, EthereumError, EvmClient, SolanaClientError, SolanaRpc, SolanaTxStatus, TransactionReceipt};
pub use oracle::{OracleError, PriceOracle, PriceQuote};
pub use dex::{DexError, DexRouter, SwapQuote};
pub use object_store::{ObjectStore, StorageError};
pub use bee::{Bee, BeeError, TaskKind};

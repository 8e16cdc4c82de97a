//! OMK Hive - bee task dispatch and coordination library
//!
//! Typed bee tasks over Ethereum and Solana adapters, multi-provider LLM
//! routing with cost tracking, and Redis-backed locks and sessions.
//!
//! # Modules
//!
//! - `domain`: Chains, AMM math, liquidity analytics, bridge ledger, LLM costs
//! - `ports`: Trait abstractions (LlmProvider, KeyValueStore, EvmClient, SolanaRpc, PriceOracle, DexRouter, Bee)
//! - `adapters`: External implementations (LLM APIs, Redis, JSON-RPC, oracles, DEXes, storage, CLI)
//! - `llm`: Provider switching, failover and conversation memory
//! - `coordination`: Distributed locks and sessions
//! - `bees`: Blockchain, liquidity sentinel and data pipeline bees
//! - `config`: Configuration loading and validation
//! - `application`: Hive lifecycle

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod llm;
pub mod coordination;
pub mod bees;
pub mod config;
pub mod application;

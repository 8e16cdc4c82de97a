//! Ethereum adapter
//!
//! JSON-RPC client implementing [`EvmClient`](crate::ports::EvmClient) and the
//! small ABI codec the Chainlink and Uniswap adapters share.

pub mod abi;
pub mod client;

pub use client::{EthereumClient, GasPrices};

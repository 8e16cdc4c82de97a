//! DEX router adapters
//!
//! - Uniswap V2 (Ethereum) quotes through the router contract
//! - Raydium (Solana) quotes from pool reserves

pub mod raydium;
pub mod uniswap;

pub use raydium::RaydiumRouter;
pub use uniswap::UniswapRouter;

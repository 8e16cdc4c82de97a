use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::chain::priority_fee_percentile;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EthereumError {
    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("Ethereum request failed: {0}")]
    Transport(String),
    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("ABI error: {0}")]
    Abi(String),
}

impl EthereumError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EthereumError::Transport(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolanaClientError {
    #[error("RPC request failed: {0}")]
    RpcError(String),
    #[error("Transaction failed: {0}")]
    TransactionError(String),
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("No wallet loaded")]
    WalletUnavailable,
}

/// Parameters for `eth_call` and `eth_estimateGas`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    pub to: String,
    /// 0x-prefixed calldata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Value in wei, hex encoded on the wire
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: u64,
    pub gas_used: u128,
    pub success: bool,
}

/// Ethereum JSON-RPC surface used by the hive
#[async_trait]
pub trait EvmClient: Send + Sync {
    /// Balance in wei
    async fn get_balance(&self, address: &str) -> Result<u128, EthereumError>;

    /// Current gas price in wei
    async fn gas_price(&self) -> Result<u128, EthereumError>;

    async fn block_number(&self) -> Result<u64, EthereumError>;

    /// `None` while the transaction is pending
    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, EthereumError>;

    /// Raw return data of a read-only call
    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EthereumError>;

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, EthereumError>;

    /// Submit a pre-signed transaction and return its hash
    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, EthereumError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolanaTxStatus {
    pub signature: String,
    pub slot: u64,
    pub success: bool,
    pub error: Option<String>,
}

/// Solana RPC surface used by the hive
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    /// Balance in lamports
    async fn get_balance(&self, pubkey: &str) -> Result<u64, SolanaClientError>;

    /// Current slot; answers whether the RPC node is reachable
    async fn get_slot(&self) -> Result<u64, SolanaClientError>;

    /// Recent prioritization fees in micro-lamports per compute unit
    async fn get_recent_prioritization_fees(&self) -> Result<Vec<u64>, SolanaClientError>;

    /// `None` when the signature is not yet known to the cluster
    async fn get_transaction_status(&self, signature: &str) -> Result<Option<SolanaTxStatus>, SolanaClientError>;

    async fn get_account_data(&self, pubkey: &str) -> Result<Vec<u8>, SolanaClientError>;

    /// Transfer lamports from the loaded wallet and return the signature
    async fn transfer_sol(
        &self,
        to: &str,
        lamports: u64,
        priority_fee_microlamports: Option<u64>,
    ) -> Result<String, SolanaClientError>;

    /// Public key of the loaded wallet
    fn wallet_pubkey(&self) -> Option<String>;

    /// Priority fee at `percentile` of recent samples, capped at `max_fee`
    ///
    /// Falls back to the default fee when the RPC call fails.
    async fn estimate_priority_fee(&self, percentile: u8, max_fee: u64) -> u64 {
        match self.get_recent_prioritization_fees().await {
            Ok(samples) => priority_fee_percentile(&samples, percentile, max_fee),
            Err(e) => {
                tracing::warn!(error = %e, "Priority fee lookup failed, using default");
                priority_fee_percentile(&[], percentile, max_fee)
            }
        }
    }
}

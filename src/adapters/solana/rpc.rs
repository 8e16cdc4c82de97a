use async_trait::async_trait;
use solana_client::rpc_client::RpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig, compute_budget::ComputeBudgetInstruction, hash::Hash, pubkey::Pubkey,
    signature::Signature, system_instruction, transaction::Transaction,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::wallet::WalletManager;
use crate::ports::{SolanaRpc, SolanaTxStatus};

pub use crate::ports::SolanaClientError;

fn parse_pubkey(pubkey: &str) -> Result<Pubkey, SolanaClientError> {
    Pubkey::from_str(pubkey).map_err(|e| SolanaClientError::InvalidPublicKey(format!("{}: {}", pubkey, e)))
}

fn parse_signature(signature: &str) -> Result<Signature, SolanaClientError> {
    Signature::from_str(signature).map_err(|e| SolanaClientError::InvalidSignature(e.to_string()))
}

/// Instructions for a SOL transfer, with an optional compute-unit price
pub fn transfer_instructions(
    from: &Pubkey,
    to: &Pubkey,
    lamports: u64,
    priority_fee_microlamports: Option<u64>,
) -> Vec<solana_sdk::instruction::Instruction> {
    let mut instructions = Vec::with_capacity(2);
    if let Some(fee) = priority_fee_microlamports.filter(|fee| *fee > 0) {
        instructions.push(ComputeBudgetInstruction::set_compute_unit_price(fee));
    }
    instructions.push(system_instruction::transfer(from, to, lamports));
    instructions
}

/// Wrapper around Solana RPC client with async-compatible methods
#[derive(Clone)]
pub struct SolanaClient {
    client: Arc<RpcClient>,
    wallet: Option<Arc<WalletManager>>,
}

impl std::fmt::Debug for SolanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolanaClient")
            .field("rpc_url", &self.client.url())
            .field("wallet", &self.wallet_pubkey())
            .finish()
    }
}

impl SolanaClient {
    /// Create a client; without a wallet only read calls are available.
    /// Every RPC request is bounded by `timeout`.
    pub fn new(rpc_url: String, timeout: Duration, wallet: Option<WalletManager>) -> Self {
        let client = Arc::new(RpcClient::new_with_timeout_and_commitment(
            rpc_url,
            timeout,
            CommitmentConfig::confirmed(),
        ));
        Self {
            client,
            wallet: wallet.map(Arc::new),
        }
    }

    pub fn rpc_url(&self) -> String {
        self.client.url()
    }

    /// Recent blockhash (needed for transaction building)
    pub async fn get_latest_blockhash(&self) -> Result<Hash, SolanaClientError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_latest_blockhash()
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    /// Send and confirm a transaction in one call
    pub async fn send_and_confirm_transaction(&self, transaction: &Transaction) -> Result<String, SolanaClientError> {
        let tx = transaction.clone();
        let client = Arc::clone(&self.client);

        tokio::task::spawn_blocking(move || {
            client
                .send_and_confirm_transaction(&tx)
                .map(|sig| sig.to_string())
                .map_err(|e| SolanaClientError::TransactionError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl SolanaRpc for SolanaClient {
    async fn get_balance(&self, pubkey: &str) -> Result<u64, SolanaClientError> {
        let pubkey = parse_pubkey(pubkey)?;

        // Spawn blocking to make sync RPC call async-compatible
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_balance(&pubkey)
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_slot(&self) -> Result<u64, SolanaClientError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || client.get_slot().map_err(|e| SolanaClientError::RpcError(e.to_string())))
            .await
            .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_recent_prioritization_fees(&self) -> Result<Vec<u64>, SolanaClientError> {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client
                .get_recent_prioritization_fees(&[])
                .map(|fees| fees.into_iter().map(|f| f.prioritization_fee).collect())
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_transaction_status(&self, signature: &str) -> Result<Option<SolanaTxStatus>, SolanaClientError> {
        let sig = parse_signature(signature)?;
        let signature = signature.to_string();

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let response = client
                .get_signature_statuses_with_history(&[sig])
                .map_err(|e| SolanaClientError::RpcError(e.to_string()))?;

            Ok(response.value.into_iter().next().flatten().map(|status| SolanaTxStatus {
                signature,
                slot: status.slot,
                success: status.err.is_none(),
                error: status.err.map(|e| e.to_string()),
            }))
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn get_account_data(&self, pubkey: &str) -> Result<Vec<u8>, SolanaClientError> {
        let key = parse_pubkey(pubkey)?;
        let pubkey = pubkey.to_string();

        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            client.get_account_data(&key).map_err(|e| {
                let message = e.to_string();
                if message.contains("AccountNotFound") {
                    SolanaClientError::AccountNotFound(pubkey)
                } else {
                    SolanaClientError::RpcError(message)
                }
            })
        })
        .await
        .map_err(|e| SolanaClientError::RpcError(format!("Task join error: {}", e)))?
    }

    async fn transfer_sol(
        &self,
        to: &str,
        lamports: u64,
        priority_fee_microlamports: Option<u64>,
    ) -> Result<String, SolanaClientError> {
        let wallet = self.wallet.as_ref().ok_or(SolanaClientError::WalletUnavailable)?;
        let to = parse_pubkey(to)?;

        let instructions = transfer_instructions(&wallet.pubkey(), &to, lamports, priority_fee_microlamports);
        let mut tx = Transaction::new_with_payer(&instructions, Some(&wallet.pubkey()));
        tx.message.recent_blockhash = self.get_latest_blockhash().await?;
        wallet
            .sign_transaction(&mut tx)
            .map_err(|e| SolanaClientError::TransactionError(e.to_string()))?;

        let signature = self.send_and_confirm_transaction(&tx).await?;
        tracing::info!(
            signature = %signature,
            to = %to,
            lamports,
            priority_fee = ?priority_fee_microlamports,
            "SOL transfer confirmed"
        );
        Ok(signature)
    }

    fn wallet_pubkey(&self) -> Option<String> {
        self.wallet.as_ref().map(|w| w.public_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_client(wallet: Option<WalletManager>) -> SolanaClient {
        // Nothing listens here; these tests fail before any request is sent
        SolanaClient::new("http://127.0.0.1:1".to_string(), Duration::from_secs(2), wallet)
    }

    #[test]
    fn test_transfer_instructions_with_priority_fee() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();

        let ixs = transfer_instructions(&from, &to, 5_000, Some(1_000));
        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, solana_sdk::compute_budget::id());
        assert_eq!(ixs[1].program_id, solana_sdk::system_program::id());

        assert_eq!(transfer_instructions(&from, &to, 5_000, None).len(), 1);
        assert_eq!(transfer_instructions(&from, &to, 5_000, Some(0)).len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_requires_wallet() {
        let client = offline_client(None);
        assert_eq!(client.wallet_pubkey(), None);

        let err = client
            .transfer_sol(&Pubkey::new_unique().to_string(), 1, None)
            .await
            .unwrap_err();
        assert_eq!(err, SolanaClientError::WalletUnavailable);
    }

    #[tokio::test]
    async fn test_invalid_inputs_rejected_locally() {
        let wallet = WalletManager::new_random();
        let pubkey = wallet.public_key();
        let client = offline_client(Some(wallet));
        assert_eq!(client.wallet_pubkey(), Some(pubkey));

        assert!(matches!(
            client.get_balance("not-a-key").await,
            Err(SolanaClientError::InvalidPublicKey(_))
        ));
        assert!(matches!(
            client.get_transaction_status("bad-sig").await,
            Err(SolanaClientError::InvalidSignature(_))
        ));
        assert!(matches!(
            client.transfer_sol("bad", 1, None).await,
            Err(SolanaClientError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = SolanaClientError::RpcError("test".to_string());
        assert!(err.to_string().contains("RPC request failed"));
        assert_eq!(SolanaClientError::WalletUnavailable.to_string(), "No wallet loaded");
    }
}

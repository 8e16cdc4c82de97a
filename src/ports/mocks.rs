//! Recording mocks for the ports
//!
//! Each mock records its calls and answers from canned responses, so bees and
//! the hive can be exercised without network access.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::chain::{CallRequest, EthereumError, EvmClient, SolanaClientError, SolanaRpc, SolanaTxStatus, TransactionReceipt};
use super::dex::{DexError, DexRouter, SwapQuote};
use super::llm::{GenerationParams, LlmError, LlmProvider};
use super::object_store::{ObjectStore, StorageError};
use super::oracle::{OracleError, PriceOracle, PriceQuote};

/// Mock LLM provider with scripted responses
#[derive(Debug, Clone)]
pub struct MockLlmProvider {
    name: &'static str,
    scripted: Arc<Mutex<VecDeque<Result<String, LlmError>>>>,
    default_response: Arc<Mutex<Result<String, LlmError>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    healthy: bool,
}

impl MockLlmProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            default_response: Arc::new(Mutex::new(Ok(format!("response from {}", name)))),
            prompts: Arc::new(Mutex::new(Vec::new())),
            healthy: true,
        }
    }

    /// Provider that fails every call with an API error
    pub fn failing(name: &'static str) -> Self {
        let mock = Self::new(name);
        *mock.default_response.lock() = Err(LlmError::Api {
            provider: name.to_string(),
            message: "service unavailable".to_string(),
        });
        Self { healthy: false, ..mock }
    }

    /// Builder method to set the response returned once the script runs out
    pub fn with_response(self, response: &str) -> Self {
        *self.default_response.lock() = Ok(response.to_string());
        self
    }

    /// Builder method to queue a one-off result
    pub fn then(self, result: Result<String, LlmError>) -> Self {
        self.scripted.lock().push_back(result);
        self
    }

    /// Get all recorded prompts
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, prompt: &str, _params: &GenerationParams) -> Result<String, LlmError> {
        self.prompts.lock().push(prompt.to_string());
        if let Some(result) = self.scripted.lock().pop_front() {
            return result;
        }
        self.default_response.lock().clone()
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }
}

/// Mock Ethereum client backed by in-memory state
#[derive(Debug, Clone, Default)]
pub struct MockEvmClient {
    balances: Arc<Mutex<HashMap<String, u128>>>,
    receipts: Arc<Mutex<HashMap<String, TransactionReceipt>>>,
    call_results: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    sent: Arc<Mutex<Vec<String>>>,
    calls: Arc<Mutex<Vec<CallRequest>>>,
    gas_price: Arc<Mutex<u128>>,
    block_number: Arc<Mutex<u64>>,
    gas_estimate: Arc<Mutex<u64>>,
}

impl MockEvmClient {
    pub fn new() -> Self {
        let mock = Self::default();
        *mock.gas_price.lock() = 20_000_000_000;
        *mock.block_number.lock() = 19_000_000;
        *mock.gas_estimate.lock() = 21_000;
        mock
    }

    pub fn with_balance(self, address: &str, wei: u128) -> Self {
        self.balances.lock().insert(address.to_lowercase(), wei);
        self
    }

    pub fn with_gas_price(self, wei: u128) -> Self {
        *self.gas_price.lock() = wei;
        self
    }

    pub fn with_block_number(self, block: u64) -> Self {
        *self.block_number.lock() = block;
        self
    }

    pub fn with_receipt(self, receipt: TransactionReceipt) -> Self {
        self.receipts.lock().insert(receipt.transaction_hash.clone(), receipt);
        self
    }

    /// Return `data` for calls to `to` whose calldata starts with `selector`
    pub fn with_call_result(self, to: &str, selector: &str, data: Vec<u8>) -> Self {
        self.call_results.lock().insert(Self::call_key(to, selector), data);
        self
    }

    pub fn sent_transactions(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    pub fn calls(&self) -> Vec<CallRequest> {
        self.calls.lock().clone()
    }

    fn call_key(to: &str, selector: &str) -> String {
        format!("{}:{}", to.to_lowercase(), selector.trim_start_matches("0x").to_lowercase())
    }
}

#[async_trait]
impl EvmClient for MockEvmClient {
    async fn get_balance(&self, address: &str) -> Result<u128, EthereumError> {
        Ok(self.balances.lock().get(&address.to_lowercase()).copied().unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<u128, EthereumError> {
        Ok(*self.gas_price.lock())
    }

    async fn block_number(&self) -> Result<u64, EthereumError> {
        Ok(*self.block_number.lock())
    }

    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, EthereumError> {
        Ok(self.receipts.lock().get(tx_hash).cloned())
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EthereumError> {
        self.calls.lock().push(request.clone());
        let data = request.data.as_deref().unwrap_or("0x");
        let selector: String = data.trim_start_matches("0x").chars().take(8).collect();
        self.call_results
            .lock()
            .get(&Self::call_key(&request.to, &selector))
            .cloned()
            .ok_or_else(|| EthereumError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            })
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, EthereumError> {
        self.calls.lock().push(request.clone());
        Ok(*self.gas_estimate.lock())
    }

    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, EthereumError> {
        let mut sent = self.sent.lock();
        sent.push(raw_tx.to_string());
        Ok(format!("0x{:064x}", sent.len()))
    }
}

/// Mock Solana RPC backed by in-memory state
#[derive(Debug, Clone, Default)]
pub struct MockSolanaRpc {
    balances: Arc<Mutex<HashMap<String, u64>>>,
    fees: Arc<Mutex<Vec<u64>>>,
    statuses: Arc<Mutex<HashMap<String, SolanaTxStatus>>>,
    accounts: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    transfers: Arc<Mutex<Vec<(String, u64, Option<u64>)>>>,
    wallet: Option<String>,
    /// None makes every `get_slot` fail
    slot: Option<u64>,
}

impl MockSolanaRpc {
    pub fn new() -> Self {
        Self {
            wallet: Some("11111111111111111111111111111111".to_string()),
            slot: Some(250_000_000),
            ..Self::default()
        }
    }

    pub fn without_wallet(self) -> Self {
        Self { wallet: None, ..self }
    }

    pub fn unreachable(self) -> Self {
        Self { slot: None, ..self }
    }

    pub fn with_balance(self, pubkey: &str, lamports: u64) -> Self {
        self.balances.lock().insert(pubkey.to_string(), lamports);
        self
    }

    pub fn with_priority_fees(self, fees: Vec<u64>) -> Self {
        *self.fees.lock() = fees;
        self
    }

    pub fn with_status(self, status: SolanaTxStatus) -> Self {
        self.statuses.lock().insert(status.signature.clone(), status);
        self
    }

    pub fn with_account_data(self, pubkey: &str, data: Vec<u8>) -> Self {
        self.accounts.lock().insert(pubkey.to_string(), data);
        self
    }

    /// Recorded `(to, lamports, priority_fee)` transfers
    pub fn transfers(&self) -> Vec<(String, u64, Option<u64>)> {
        self.transfers.lock().clone()
    }
}

#[async_trait]
impl SolanaRpc for MockSolanaRpc {
    async fn get_balance(&self, pubkey: &str) -> Result<u64, SolanaClientError> {
        Ok(self.balances.lock().get(pubkey).copied().unwrap_or(0))
    }

    async fn get_slot(&self) -> Result<u64, SolanaClientError> {
        self.slot
            .ok_or_else(|| SolanaClientError::RpcError("connection refused".to_string()))
    }

    async fn get_recent_prioritization_fees(&self) -> Result<Vec<u64>, SolanaClientError> {
        Ok(self.fees.lock().clone())
    }

    async fn get_transaction_status(&self, signature: &str) -> Result<Option<SolanaTxStatus>, SolanaClientError> {
        Ok(self.statuses.lock().get(signature).cloned())
    }

    async fn get_account_data(&self, pubkey: &str) -> Result<Vec<u8>, SolanaClientError> {
        self.accounts
            .lock()
            .get(pubkey)
            .cloned()
            .ok_or_else(|| SolanaClientError::AccountNotFound(pubkey.to_string()))
    }

    async fn transfer_sol(
        &self,
        to: &str,
        lamports: u64,
        priority_fee_microlamports: Option<u64>,
    ) -> Result<String, SolanaClientError> {
        if self.wallet.is_none() {
            return Err(SolanaClientError::WalletUnavailable);
        }
        let mut transfers = self.transfers.lock();
        transfers.push((to.to_string(), lamports, priority_fee_microlamports));
        Ok(format!("mocksig{}", transfers.len()))
    }

    fn wallet_pubkey(&self) -> Option<String> {
        self.wallet.clone()
    }
}

/// Mock oracle with fixed prices
#[derive(Debug, Clone)]
pub struct MockPriceOracle {
    source: &'static str,
    prices: Arc<Mutex<HashMap<String, f64>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockPriceOracle {
    pub fn new(source: &'static str) -> Self {
        Self {
            source,
            prices: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_price(self, pair: &str, price: f64) -> Self {
        self.prices.lock().insert(pair.to_string(), price);
        self
    }

    /// Change a price after construction
    pub fn set_price(&self, pair: &str, price: f64) {
        self.prices.lock().insert(pair.to_string(), price);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    fn source(&self) -> &'static str {
        self.source
    }

    async fn get_price(&self, pair: &str) -> Result<PriceQuote, OracleError> {
        self.calls.lock().push(pair.to_string());
        let price = self
            .prices
            .lock()
            .get(pair)
            .copied()
            .ok_or_else(|| OracleError::UnsupportedPair(pair.to_string()))?;

        Ok(PriceQuote {
            pair: pair.to_string(),
            price,
            confidence: None,
            updated_at: Utc::now(),
            source: self.source.to_string(),
        })
    }

    fn supported_pairs(&self) -> Vec<String> {
        let mut pairs: Vec<String> = self.prices.lock().keys().cloned().collect();
        pairs.sort();
        pairs
    }
}

/// Mock DEX router quoting at a fixed rate
#[derive(Debug, Clone)]
pub struct MockDexRouter {
    name: &'static str,
    /// Output units per input unit
    rate: f64,
    price_impact: f64,
    quotes: Arc<Mutex<Vec<(String, String, u128)>>>,
}

impl MockDexRouter {
    pub fn new(name: &'static str, rate: f64) -> Self {
        Self {
            name,
            rate,
            price_impact: 0.001,
            quotes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_price_impact(self, price_impact: f64) -> Self {
        Self { price_impact, ..self }
    }

    /// Recorded `(token_in, token_out, amount_in)` requests
    pub fn quotes(&self) -> Vec<(String, String, u128)> {
        self.quotes.lock().clone()
    }
}

#[async_trait]
impl DexRouter for MockDexRouter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn get_quote(&self, token_in: &str, token_out: &str, amount_in: u128) -> Result<SwapQuote, DexError> {
        if amount_in == 0 {
            return Err(DexError::InvalidAmount);
        }
        self.quotes
            .lock()
            .push((token_in.to_string(), token_out.to_string(), amount_in));

        Ok(SwapQuote {
            dex: self.name.to_string(),
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            amount_in,
            amount_out: (amount_in as f64 * self.rate) as u128,
            price_impact: self.price_impact,
            route: vec![token_in.to_string(), token_out.to_string()],
            pool_id: None,
        })
    }
}

/// Mock object store that keeps uploads in memory
#[derive(Debug, Clone, Default)]
pub struct MockObjectStore {
    objects: Arc<Mutex<Vec<(String, Vec<u8>, String)>>>,
}

impl MockObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded `(name, bytes, content_type)` uploads
    pub fn objects(&self) -> Vec<(String, Vec<u8>, String)> {
        self.objects.lock().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn put(&self, object_name: &str, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        self.objects
            .lock()
            .push((object_name.to_string(), bytes, content_type.to_string()));
        Ok(format!("mock://{}", object_name))
    }
}

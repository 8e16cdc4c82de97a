//! BlockchainBee
//!
//! Chain-facing bee: balances, transaction submission and monitoring, gas and
//! priority fee estimates, oracle prices, DEX quotes, liquidity plans, the
//! bridge ledger and rebalancing analysis. Every backend is optional; a task
//! for a missing one is rejected with a "not configured" error.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};

use crate::domain::amm::min_amount_out_raw;
use crate::domain::chain::{
    eth_to_wei, format_amount, lamports_to_sol, sol_to_lamports, solana_total_fee_lamports, wei_to_eth, wei_to_gwei,
    SOLANA_BASE_FEE_LAMPORTS,
};
use crate::domain::rebalance::plan_rebalance;
use crate::domain::{BridgeLedger, BridgeLimits, BridgeStatus, BridgeTransfer, Chain, Priority};
use crate::ports::{
    Bee, BeeError, CallRequest, DexRouter, EvmClient, PriceOracle, PriceQuote, SolanaRpc,
};

use super::task::{BlockchainTask, BLOCKCHAIN_BEE};

/// Whether each configured chain RPC answers; `None` when not configured
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChainHealth {
    pub ethereum: Option<bool>,
    pub solana: Option<bool>,
}

impl ChainHealth {
    pub fn all_reachable(&self) -> bool {
        self.ethereum != Some(false) && self.solana != Some(false)
    }
}

/// Trading limits and fee settings
#[derive(Debug, Clone, PartialEq)]
pub struct BlockchainSettings {
    /// Slippage applied to quotes and liquidity plans, in basis points
    pub slippage_bps: u16,
    pub max_trade_size_eth: Decimal,
    pub max_trade_size_sol: Decimal,
    pub priority_fee_percentile: u8,
    /// Cap on the Solana priority fee (micro-lamports)
    pub max_priority_fee: u64,
    pub bridge: BridgeLimits,
}

impl Default for BlockchainSettings {
    fn default() -> Self {
        Self {
            slippage_bps: 100,
            max_trade_size_eth: Decimal::from(10),
            max_trade_size_sol: Decimal::from(100),
            priority_fee_percentile: 50,
            max_priority_fee: 1_000_000,
            bridge: BridgeLimits::default(),
        }
    }
}

impl BlockchainSettings {
    pub fn slippage_tolerance(&self) -> Decimal {
        Decimal::new(i64::from(self.slippage_bps), 4)
    }

    fn max_trade_size(&self, chain: Chain) -> Decimal {
        match chain {
            Chain::Ethereum => self.max_trade_size_eth,
            Chain::Solana => self.max_trade_size_sol,
        }
    }
}

pub struct BlockchainBee {
    ethereum: Option<Arc<dyn EvmClient>>,
    solana: Option<Arc<dyn SolanaRpc>>,
    oracles: HashMap<Chain, Arc<dyn PriceOracle>>,
    routers: HashMap<Chain, Arc<dyn DexRouter>>,
    bridge: Mutex<BridgeLedger>,
    settings: BlockchainSettings,
}

impl std::fmt::Debug for BlockchainBee {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockchainBee")
            .field("ethereum", &self.ethereum.is_some())
            .field("solana", &self.solana.is_some())
            .field("oracles", &self.oracles.values().map(|o| o.source()).collect::<Vec<_>>())
            .field("routers", &self.routers.values().map(|r| r.name()).collect::<Vec<_>>())
            .field("settings", &self.settings)
            .finish()
    }
}

impl Default for BlockchainBee {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockchainBee {
    pub fn new() -> Self {
        Self::with_settings(BlockchainSettings::default())
    }

    pub fn with_settings(settings: BlockchainSettings) -> Self {
        Self {
            ethereum: None,
            solana: None,
            oracles: HashMap::new(),
            routers: HashMap::new(),
            bridge: Mutex::new(BridgeLedger::new(settings.bridge)),
            settings,
        }
    }

    pub fn with_ethereum(mut self, client: Arc<dyn EvmClient>) -> Self {
        self.ethereum = Some(client);
        self
    }

    pub fn with_solana(mut self, client: Arc<dyn SolanaRpc>) -> Self {
        self.solana = Some(client);
        self
    }

    /// Price source for a chain (Chainlink on Ethereum, Pyth on Solana)
    pub fn with_oracle(mut self, chain: Chain, oracle: Arc<dyn PriceOracle>) -> Self {
        tracing::info!(chain = %chain, oracle = oracle.source(), "Oracle connected");
        self.oracles.insert(chain, oracle);
        self
    }

    /// Quote source for a chain (Uniswap on Ethereum, Raydium on Solana)
    pub fn with_router(mut self, chain: Chain, router: Arc<dyn DexRouter>) -> Self {
        tracing::info!(chain = %chain, dex = router.name(), "DEX router connected");
        self.routers.insert(chain, router);
        self
    }

    pub fn settings(&self) -> &BlockchainSettings {
        &self.settings
    }

    pub fn ethereum(&self) -> Result<&Arc<dyn EvmClient>, BeeError> {
        self.ethereum
            .as_ref()
            .ok_or_else(|| BeeError::ChainUnavailable("Ethereum".into()))
    }

    pub fn solana(&self) -> Result<&Arc<dyn SolanaRpc>, BeeError> {
        self.solana
            .as_ref()
            .ok_or_else(|| BeeError::ChainUnavailable("Solana".into()))
    }

    pub fn oracle(&self, chain: Chain) -> Result<&Arc<dyn PriceOracle>, BeeError> {
        self.oracles.get(&chain).ok_or(BeeError::NotConnected(match chain {
            Chain::Ethereum => "Chainlink oracle",
            Chain::Solana => "Pyth oracle",
        }))
    }

    pub fn router(&self, chain: Chain) -> Result<&Arc<dyn DexRouter>, BeeError> {
        self.routers.get(&chain).ok_or(BeeError::NotConnected(match chain {
            Chain::Ethereum => "Uniswap router",
            Chain::Solana => "Raydium router",
        }))
    }

    /// Chains with a configured oracle, in a stable order
    pub fn oracle_chains(&self) -> Vec<Chain> {
        let mut chains: Vec<Chain> = self.oracles.keys().copied().collect();
        chains.sort_by_key(|c| c.as_str());
        chains
    }

    /// Oracle price for `pair` on `chain`
    pub async fn price(&self, chain: Chain, pair: &str) -> Result<PriceQuote, BeeError> {
        let quote = self.oracle(chain)?.get_price(pair).await?;
        tracing::debug!(chain = %chain, pair, price = quote.price, source = %quote.source, "Oracle price");
        Ok(quote)
    }

    /// Latest block on Ethereum and current slot on Solana
    pub async fn chain_health(&self) -> ChainHealth {
        let ethereum = match &self.ethereum {
            Some(eth) => Some(match eth.block_number().await {
                Ok(block) => {
                    tracing::debug!(block, "Ethereum RPC reachable");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Ethereum RPC unreachable");
                    false
                }
            }),
            None => None,
        };
        let solana = match &self.solana {
            Some(sol) => Some(match sol.get_slot().await {
                Ok(slot) => {
                    tracing::debug!(slot, "Solana RPC reachable");
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Solana RPC unreachable");
                    false
                }
            }),
            None => None,
        };
        ChainHealth { ethereum, solana }
    }

    pub fn bridge_transfer(&self, id: &str) -> Option<BridgeTransfer> {
        self.bridge.lock().get(id).cloned()
    }

    // -- Core operations --------------------------------------------------

    async fn execute_transaction(
        &self,
        chain: Chain,
        raw_transaction: Option<String>,
        to_address: Option<String>,
        amount: Option<Decimal>,
        priority_fee: Option<u64>,
    ) -> Result<Value, BeeError> {
        match chain {
            Chain::Ethereum => {
                let raw = raw_transaction
                    .ok_or_else(|| BeeError::Validation("raw_transaction required for Ethereum".into()))?;
                let tx_hash = self.ethereum()?.send_raw_transaction(&raw).await?;
                tracing::info!(tx_hash = %tx_hash, to = ?to_address, "Ethereum transaction submitted");

                Ok(json!({
                    "chain": chain,
                    "tx_hash": tx_hash,
                    "to": to_address,
                    "status": "pending",
                    "explorer_url": chain.explorer_url(&tx_hash),
                }))
            }
            Chain::Solana => {
                let to = to_address.ok_or_else(|| BeeError::Validation("to_address required".into()))?;
                let amount = amount.ok_or_else(|| BeeError::Validation("amount required".into()))?;
                if amount <= Decimal::ZERO {
                    return Err(BeeError::Validation("Amount must be positive".into()));
                }
                let lamports = sol_to_lamports(amount)
                    .ok_or_else(|| BeeError::Validation(format!("Amount out of range: {}", amount)))?;

                let signature = self.solana()?.transfer_sol(&to, lamports, priority_fee).await?;
                tracing::info!(signature = %signature, to = %to, lamports, "Solana transaction submitted");

                Ok(json!({
                    "chain": chain,
                    "signature": signature,
                    "to": to,
                    "amount": dec_f64(amount),
                    "lamports": lamports,
                    "status": "pending",
                    "explorer_url": chain.explorer_url(&signature),
                }))
            }
        }
    }

    async fn estimate_gas(
        &self,
        chain: Chain,
        from: Option<String>,
        to: Option<String>,
        data: Option<String>,
        value: Option<Decimal>,
    ) -> Result<Value, BeeError> {
        match chain {
            Chain::Ethereum => {
                let client = self.ethereum()?;
                let to = to.ok_or_else(|| BeeError::Validation("to address required for gas estimation".into()))?;
                let value = match value {
                    Some(eth) => Some(format!(
                        "0x{:x}",
                        eth_to_wei(eth).ok_or_else(|| BeeError::Validation(format!("Invalid value: {}", eth)))?
                    )),
                    None => None,
                };
                let request = CallRequest { from, to, data, value };

                let estimated_gas = client.estimate_gas(&request).await?;
                let base = client.gas_price().await?;

                let mut gas_prices = serde_json::Map::new();
                for priority in Priority::ALL {
                    let price = priority.apply(base);
                    let total = price.saturating_mul(u128::from(estimated_gas));
                    gas_prices.insert(
                        priority.as_str().to_string(),
                        json!({
                            "gwei": dec_f64(wei_to_gwei(price)),
                            "wei": wei_json(price),
                            "total_cost_eth": dec_f64(wei_to_eth(total)),
                        }),
                    );
                }

                Ok(json!({
                    "chain": chain,
                    "estimated_gas": estimated_gas,
                    "gas_prices": gas_prices,
                }))
            }
            Chain::Solana => {
                let fee = self
                    .solana()?
                    .estimate_priority_fee(self.settings.priority_fee_percentile, self.settings.max_priority_fee)
                    .await;

                Ok(json!({
                    "chain": chain,
                    "priority_fee_microlamports": fee,
                    "priority_fee_sol": fee as f64 / 1e9,
                    "base_fee": SOLANA_BASE_FEE_LAMPORTS,
                    "total_fee_lamports": dec_f64(solana_total_fee_lamports(fee)),
                }))
            }
        }
    }

    async fn check_balance(&self, chain: Chain, address: String) -> Result<Value, BeeError> {
        match chain {
            Chain::Ethereum => {
                let wei = self.ethereum()?.get_balance(&address).await?;
                let eth = wei_to_eth(wei);
                Ok(json!({
                    "chain": chain,
                    "address": address,
                    "balance_wei": wei_json(wei),
                    "balance_eth": dec_f64(eth),
                    "balance_formatted": format_amount(eth, "ETH"),
                }))
            }
            Chain::Solana => {
                let lamports = self.solana()?.get_balance(&address).await?;
                let sol = lamports_to_sol(lamports);
                Ok(json!({
                    "chain": chain,
                    "address": address,
                    "balance_lamports": lamports,
                    "balance_sol": dec_f64(sol),
                    "balance_formatted": format_amount(sol, "SOL"),
                }))
            }
        }
    }

    async fn monitor_tx(&self, chain: Chain, tx_hash: Option<String>, signature: Option<String>) -> Result<Value, BeeError> {
        match chain {
            Chain::Ethereum => {
                let client = self.ethereum()?;
                let tx_hash = tx_hash.ok_or_else(|| BeeError::Validation("tx_hash required".into()))?;
                let Some(receipt) = client.get_transaction_receipt(&tx_hash).await? else {
                    return Ok(json!({
                        "chain": chain,
                        "tx_hash": tx_hash,
                        "status": "pending",
                        "confirmations": 0,
                    }));
                };

                let current_block = client.block_number().await?;
                Ok(json!({
                    "chain": chain,
                    "tx_hash": tx_hash,
                    "status": if receipt.success { "confirmed" } else { "failed" },
                    "confirmations": current_block.saturating_sub(receipt.block_number),
                    "block_number": receipt.block_number,
                    "gas_used": wei_json(receipt.gas_used),
                    "explorer_url": chain.explorer_url(&tx_hash),
                }))
            }
            Chain::Solana => {
                let client = self.solana()?;
                let signature = signature
                    .or(tx_hash)
                    .ok_or_else(|| BeeError::Validation("signature required".into()))?;
                let Some(status) = client.get_transaction_status(&signature).await? else {
                    return Ok(json!({
                        "chain": chain,
                        "signature": signature,
                        "status": "pending",
                    }));
                };

                Ok(json!({
                    "chain": chain,
                    "signature": signature,
                    "status": if status.success { "confirmed" } else { "failed" },
                    "slot": status.slot,
                    "error": status.error,
                    "explorer_url": chain.explorer_url(&signature),
                }))
            }
        }
    }

    // -- Oracle operations ------------------------------------------------

    async fn get_price(&self, chain: Chain, pair: String) -> Result<Value, BeeError> {
        let quote = self.price(chain, &pair).await?;
        Ok(json!({
            "chain": chain,
            "oracle": quote.source,
            "pair": quote.pair,
            "price": quote.price,
            "confidence": quote.confidence,
            "updated_at": quote.updated_at.to_rfc3339(),
        }))
    }

    async fn get_multiple_prices(&self, chain: Chain, pairs: Vec<String>) -> Result<Value, BeeError> {
        if pairs.is_empty() {
            return Err(BeeError::Validation("No pairs specified".into()));
        }
        let oracle = self.oracle(chain)?;

        let mut prices = BTreeMap::new();
        let mut failed = Vec::new();
        for pair in pairs {
            match oracle.get_price(&pair).await {
                Ok(quote) => {
                    prices.insert(pair, quote.price);
                }
                Err(e) => {
                    tracing::warn!(chain = %chain, pair = %pair, error = %e, "Price lookup failed");
                    failed.push(pair);
                }
            }
        }

        Ok(json!({
            "chain": chain,
            "oracle": oracle.source(),
            "prices": prices,
            "failed": failed,
        }))
    }

    async fn calculate_value(&self, chain: Chain, token_amount: f64, token_pair: String) -> Result<Value, BeeError> {
        let quote = self.price(chain, &token_pair).await?;
        Ok(json!({
            "chain": chain,
            "oracle": quote.source,
            "token_pair": token_pair,
            "token_amount": token_amount,
            "price": quote.price,
            "usd_value": token_amount * quote.price,
        }))
    }

    // -- Trading operations -----------------------------------------------

    #[allow(clippy::too_many_arguments)]
    async fn swap_tokens(
        &self,
        chain: Chain,
        token_in: String,
        token_out: String,
        amount_in: Decimal,
        decimals_in: Option<u32>,
        decimals_out: Option<u32>,
        priority: Priority,
    ) -> Result<Value, BeeError> {
        if amount_in <= Decimal::ZERO {
            return Err(BeeError::Validation("Swap amount must be positive".into()));
        }
        let max = self.settings.max_trade_size(chain);
        if amount_in > max {
            return Err(BeeError::Validation(format!(
                "Trade size exceeds maximum: {} {}",
                max,
                chain.native_symbol()
            )));
        }

        let router = self.router(chain)?;
        let default_decimals = native_decimals(chain);
        let decimals_in = decimals_in.unwrap_or(default_decimals);
        let decimals_out = decimals_out.unwrap_or(default_decimals);

        let raw_in = to_raw(amount_in, decimals_in)?;
        let quote = router.get_quote(&token_in, &token_out, raw_in).await?;
        let min_out = min_amount_out_raw(quote.amount_out, self.settings.slippage_bps);

        tracing::info!(
            chain = %chain,
            dex = %quote.dex,
            token_in = %token_in,
            token_out = %token_out,
            amount_in = %amount_in,
            amount_out = quote.amount_out,
            min_out,
            price_impact = quote.price_impact,
            "Swap quoted"
        );

        let mut result = json!({
            "chain": chain,
            "dex": quote.dex,
            "token_in": token_in,
            "token_out": token_out,
            "amount_in": dec_f64(amount_in),
            "amount_in_raw": wei_json(raw_in),
            "expected_amount_out": dec_f64(from_raw(quote.amount_out, decimals_out)?),
            "expected_amount_out_raw": wei_json(quote.amount_out),
            "min_amount_out": dec_f64(from_raw(min_out, decimals_out)?),
            "min_amount_out_raw": wei_json(min_out),
            "slippage_tolerance": dec_f64(self.settings.slippage_tolerance()),
            "price_impact": quote.price_impact,
            "route": quote.route,
            "pool_id": quote.pool_id,
            "priority": priority.as_str(),
            "status": "quoted",
        });

        if chain == Chain::Ethereum {
            if let Some(client) = &self.ethereum {
                match client.gas_price().await {
                    Ok(base) => {
                        result["gas_price_gwei"] = json!(dec_f64(wei_to_gwei(priority.apply(base))));
                    }
                    Err(e) => tracing::warn!(error = %e, "Gas price lookup failed"),
                }
            }
        }
        Ok(result)
    }

    fn add_liquidity(
        &self,
        chain: Chain,
        pool: Option<String>,
        token_a: String,
        token_b: String,
        amount_a: Decimal,
        amount_b: Decimal,
    ) -> Result<Value, BeeError> {
        if amount_a <= Decimal::ZERO || amount_b <= Decimal::ZERO {
            return Err(BeeError::Validation("Liquidity amounts must be positive".into()));
        }
        let keep = Decimal::ONE - self.settings.slippage_tolerance();
        tracing::info!(chain = %chain, pool = ?pool, token_a = %token_a, token_b = %token_b, %amount_a, %amount_b, "Adding liquidity");

        Ok(json!({
            "chain": chain,
            "pool": pool,
            "token_a": token_a,
            "token_b": token_b,
            "amount_a": dec_f64(amount_a),
            "amount_b": dec_f64(amount_b),
            "min_amount_a": dec_f64(amount_a * keep),
            "min_amount_b": dec_f64(amount_b * keep),
            "slippage_tolerance": dec_f64(self.settings.slippage_tolerance()),
            "status": "pending",
            "message": "Liquidity addition planned",
        }))
    }

    fn remove_liquidity(&self, chain: Chain, pool: Option<String>, lp_tokens: Decimal) -> Result<Value, BeeError> {
        if lp_tokens <= Decimal::ZERO {
            return Err(BeeError::Validation("LP token amount must be positive".into()));
        }
        tracing::info!(chain = %chain, pool = ?pool, %lp_tokens, "Removing liquidity");

        Ok(json!({
            "chain": chain,
            "pool": pool,
            "lp_tokens_burned": dec_f64(lp_tokens),
            "status": "pending",
            "message": "Liquidity removal planned",
        }))
    }

    // -- Bridge -------------------------------------------------------------

    fn bridge_transfer_task(
        &self,
        direction: crate::domain::BridgeDirection,
        amount: Decimal,
        from_address: Option<String>,
        to_address: String,
    ) -> Result<Value, BeeError> {
        let transfer = self.bridge.lock().create(direction, amount, &to_address)?;
        tracing::info!(
            id = %transfer.id,
            direction = direction.as_str(),
            %amount,
            net = %transfer.net_amount,
            "Bridge transfer initiated"
        );

        Ok(json!({
            "bridge_transaction_id": transfer.id,
            "direction": direction,
            "amount": dec_f64(transfer.amount),
            "fee": dec_f64(transfer.fee),
            "net_amount": dec_f64(transfer.net_amount),
            "from_address": from_address,
            "to_address": to_address,
            "status": transfer.status,
            "estimated_completion": transfer.estimated_completion().to_rfc3339(),
            "message": "Bridge transfer initiated",
        }))
    }

    fn check_bridge_status(&self, id: &str) -> Result<Value, BeeError> {
        let transfer = self
            .bridge_transfer(id)
            .ok_or_else(|| BeeError::BridgeTransferNotFound(id.to_string()))?;
        Ok(transfer_json(&transfer))
    }

    fn update_bridge_status(&self, id: &str, status: BridgeStatus, error: Option<String>) -> Result<Value, BeeError> {
        let mut ledger = self.bridge.lock();
        if ledger.get(id).is_none() {
            return Err(BeeError::BridgeTransferNotFound(id.to_string()));
        }
        let transfer = match status {
            BridgeStatus::Failed => ledger.fail(id, error.as_deref().unwrap_or("Bridge relay failed"))?,
            next => ledger.transition(id, next)?,
        };
        tracing::info!(id, status = ?transfer.status, "Bridge transfer updated");
        Ok(transfer_json(transfer))
    }

    fn bridge_stats(&self) -> Value {
        let stats = self.bridge.lock().stats();
        json!({
            "total_transfers": stats.total_transfers,
            "pending": stats.pending,
            "completed": stats.completed,
            "failed": stats.failed,
            "cancelled": stats.cancelled,
            "total_volume": dec_f64(stats.total_volume),
            "fee_percent": dec_f64(stats.fee_percent),
        })
    }

    // -- Queen triggers -----------------------------------------------------

    fn auto_rebalance(
        &self,
        wallet_address: Option<String>,
        target_ratios: BTreeMap<String, f64>,
        holdings: BTreeMap<String, f64>,
    ) -> Result<Value, BeeError> {
        tracing::info!(wallet = ?wallet_address, targets = ?target_ratios, "Auto-rebalancing analysis");
        let plan = plan_rebalance(&target_ratios, &holdings)?;

        Ok(json!({
            "wallet": wallet_address,
            "target_ratios": target_ratios,
            "total_value": plan.total_value,
            "current_ratios": plan.current_ratios,
            "trades_needed": plan.trades_needed,
            "status": "analysis_complete",
            "message": "Rebalancing analysis complete - execution pending",
        }))
    }

    fn emergency_withdraw(&self, chain: Chain, to_address: Option<String>, reason: Option<String>) -> Value {
        let reason = reason.unwrap_or_else(|| "Emergency withdrawal triggered".to_string());
        tracing::error!(chain = %chain, to_address = ?to_address, reason = %reason, "EMERGENCY WITHDRAWAL INITIATED");

        json!({
            "chain": chain,
            "to_address": to_address,
            "reason": reason,
            "status": "initiated",
            "message": "Emergency withdrawal initiated - all positions being closed",
        })
    }
}

#[async_trait]
impl Bee for BlockchainBee {
    type Task = BlockchainTask;

    fn name(&self) -> &'static str {
        BLOCKCHAIN_BEE
    }

    async fn execute(&self, task: BlockchainTask) -> Result<Value, BeeError> {
        match task {
            BlockchainTask::ExecuteTransaction {
                chain,
                raw_transaction,
                to_address,
                amount,
                priority_fee,
            } => {
                self.execute_transaction(chain, raw_transaction, to_address, amount, priority_fee)
                    .await
            }
            BlockchainTask::EstimateGas { chain, from, to, data, value } => {
                self.estimate_gas(chain, from, to, data, value).await
            }
            BlockchainTask::CheckBalance { chain, address } => self.check_balance(chain, address).await,
            BlockchainTask::MonitorTx { chain, tx_hash, signature } => self.monitor_tx(chain, tx_hash, signature).await,
            BlockchainTask::GetPrice { chain, pair } => self.get_price(chain, pair).await,
            BlockchainTask::GetMultiplePrices { chain, pairs } => self.get_multiple_prices(chain, pairs).await,
            BlockchainTask::CalculateValue {
                chain,
                token_amount,
                token_pair,
            } => self.calculate_value(chain, token_amount, token_pair).await,
            BlockchainTask::SwapTokens {
                chain,
                token_in,
                token_out,
                amount_in,
                decimals_in,
                decimals_out,
                priority,
            } => {
                self.swap_tokens(chain, token_in, token_out, amount_in, decimals_in, decimals_out, priority)
                    .await
            }
            BlockchainTask::AddLiquidity {
                chain,
                pool,
                token_a,
                token_b,
                amount_a,
                amount_b,
            } => self.add_liquidity(chain, pool, token_a, token_b, amount_a, amount_b),
            BlockchainTask::RemoveLiquidity { chain, pool, lp_tokens } => self.remove_liquidity(chain, pool, lp_tokens),
            BlockchainTask::BridgeTransfer {
                direction,
                amount,
                from_address,
                to_address,
            } => self.bridge_transfer_task(direction, amount, from_address, to_address),
            BlockchainTask::CheckBridgeStatus { bridge_transaction_id } => {
                self.check_bridge_status(&bridge_transaction_id)
            }
            BlockchainTask::UpdateBridgeStatus {
                bridge_transaction_id,
                status,
                error,
            } => self.update_bridge_status(&bridge_transaction_id, status, error),
            BlockchainTask::BridgeStats => Ok(self.bridge_stats()),
            BlockchainTask::AutoRebalance {
                wallet_address,
                target_ratios,
                holdings,
            } => self.auto_rebalance(wallet_address, target_ratios, holdings),
            BlockchainTask::EmergencyWithdraw {
                chain,
                to_address,
                reason,
            } => Ok(self.emergency_withdraw(chain, to_address, reason)),
        }
    }

    async fn shutdown(&self) {
        let stats = self.bridge.lock().stats();
        if stats.pending > 0 {
            tracing::warn!(pending = stats.pending, "Shutting down with bridge transfers in flight");
        }
    }
}

fn transfer_json(transfer: &BridgeTransfer) -> Value {
    json!({
        "bridge_transaction_id": transfer.id,
        "status": transfer.status,
        "direction": transfer.direction,
        "amount": dec_f64(transfer.amount),
        "net_amount": dec_f64(transfer.net_amount),
        "recipient": transfer.recipient,
        "source_tx_hash": transfer.source_tx,
        "dest_tx_hash": transfer.destination_tx,
        "created_at": transfer.created_at.to_rfc3339(),
        "completed_at": transfer.completed_at.map(|t| t.to_rfc3339()),
        "time_remaining_minutes": transfer.time_remaining_minutes(),
        "retry_count": transfer.retry_count,
        "error": transfer.error,
    })
}

fn native_decimals(chain: Chain) -> u32 {
    match chain {
        Chain::Ethereum => 18,
        Chain::Solana => 9,
    }
}

pub(crate) fn dec_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// JSON number when the value fits in a u64, decimal string otherwise
pub(crate) fn wei_json(value: u128) -> Value {
    match u64::try_from(value) {
        Ok(small) => json!(small),
        Err(_) => json!(value.to_string()),
    }
}

/// Largest token precision a `Decimal` can carry
pub(crate) const MAX_TOKEN_DECIMALS: u32 = 28;

fn check_decimals(decimals: u32) -> Result<(), BeeError> {
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(BeeError::Validation(format!(
            "Token decimals {} exceed the supported maximum of {}",
            decimals, MAX_TOKEN_DECIMALS
        )));
    }
    Ok(())
}

/// Token amount to base units, truncating extra precision
pub(crate) fn to_raw(amount: Decimal, decimals: u32) -> Result<u128, BeeError> {
    check_decimals(decimals)?;
    let scale = Decimal::from_i128_with_scale(10i128.pow(decimals), 0);
    amount
        .checked_mul(scale)
        .and_then(|raw| u128::try_from(raw.trunc()).ok())
        .ok_or_else(|| BeeError::Validation(format!("Amount out of range: {}", amount)))
}

/// Base units to a token amount
pub(crate) fn from_raw(raw: u128, decimals: u32) -> Result<Decimal, BeeError> {
    check_decimals(decimals)?;
    i128::try_from(raw)
        .ok()
        .and_then(|raw| Decimal::try_from_i128_with_scale(raw, decimals).ok())
        .map(|d| d.normalize())
        .ok_or_else(|| BeeError::Validation(format!("Amount out of range: {} base units", raw)))
}

//! Bridge Ledger
//!
//! Records ETH <-> SOL bridge transfers, validates amounts and fees, and
//! enforces the transfer status machine:
//!
//! ```text
//! Pending -> Locked | Failed | Cancelled
//! Locked  -> Minted | Released | Failed
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Estimated time for a transfer to settle
pub const ESTIMATED_COMPLETION_MINUTES: i64 = 15;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error("Amount below minimum: {min}")]
    BelowMinimum { min: Decimal },
    #[error("Amount exceeds maximum: {max}")]
    AboveMaximum { max: Decimal },
    #[error("Bridge transaction not found: {0}")]
    NotFound(String),
    #[error("Invalid status transition for {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: BridgeStatus,
        to: BridgeStatus,
    },
    #[error("Invalid recipient address")]
    InvalidRecipient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeDirection {
    EthToSol,
    SolToEth,
}

impl BridgeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            BridgeDirection::EthToSol => "eth_to_sol",
            BridgeDirection::SolToEth => "sol_to_eth",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    Pending,
    Locked,
    Minted,
    Released,
    Failed,
    Cancelled,
}

impl BridgeStatus {
    /// Whether `self -> next` is an allowed transition
    pub fn can_transition_to(&self, next: BridgeStatus) -> bool {
        use BridgeStatus::*;
        matches!(
            (*self, next),
            (Pending, Locked) | (Pending, Failed) | (Pending, Cancelled)
                | (Locked, Minted) | (Locked, Released) | (Locked, Failed)
        )
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, BridgeStatus::Minted | BridgeStatus::Released)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BridgeStatus::Minted | BridgeStatus::Released | BridgeStatus::Failed | BridgeStatus::Cancelled
        )
    }
}

/// Amount limits and fee for the bridge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BridgeLimits {
    pub min_amount: Decimal,
    pub max_amount: Decimal,
    /// Fee as a fraction of the amount (0.001 = 0.1%)
    pub fee_rate: Decimal,
}

impl Default for BridgeLimits {
    fn default() -> Self {
        Self {
            min_amount: Decimal::new(1, 2),
            max_amount: Decimal::from(100),
            fee_rate: Decimal::new(1, 3),
        }
    }
}

/// A single bridge transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeTransfer {
    pub id: String,
    pub direction: BridgeDirection,
    pub amount: Decimal,
    pub fee: Decimal,
    pub net_amount: Decimal,
    pub recipient: String,
    pub status: BridgeStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub source_tx: Option<String>,
    pub destination_tx: Option<String>,
    pub retry_count: u32,
    pub error: Option<String>,
}

impl BridgeTransfer {
    pub fn estimated_completion(&self) -> DateTime<Utc> {
        self.created_at + Duration::minutes(ESTIMATED_COMPLETION_MINUTES)
    }

    /// Minutes left in the estimated completion window at `now`, floored at 0
    pub fn time_remaining_minutes_at(&self, now: DateTime<Utc>) -> i64 {
        if self.status.is_terminal() {
            return 0;
        }
        let elapsed = (now - self.created_at).num_minutes();
        (ESTIMATED_COMPLETION_MINUTES - elapsed).max(0)
    }

    pub fn time_remaining_minutes(&self) -> i64 {
        self.time_remaining_minutes_at(Utc::now())
    }
}

/// Aggregate ledger counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeStats {
    pub total_transfers: usize,
    pub pending: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub total_volume: Decimal,
    pub fee_percent: Decimal,
}

/// In-process bridge ledger
#[derive(Debug, Default)]
pub struct BridgeLedger {
    limits: BridgeLimits,
    transfers: HashMap<String, BridgeTransfer>,
}

impl BridgeLedger {
    pub fn new(limits: BridgeLimits) -> Self {
        Self {
            limits,
            transfers: HashMap::new(),
        }
    }

    pub fn limits(&self) -> &BridgeLimits {
        &self.limits
    }

    /// Validate an amount and return `(fee, net_amount)`
    pub fn quote(&self, amount: Decimal) -> Result<(Decimal, Decimal), BridgeError> {
        if amount < self.limits.min_amount {
            return Err(BridgeError::BelowMinimum { min: self.limits.min_amount });
        }
        if amount > self.limits.max_amount {
            return Err(BridgeError::AboveMaximum { max: self.limits.max_amount });
        }
        let fee = amount * self.limits.fee_rate;
        Ok((fee, amount - fee))
    }

    /// Record a new pending transfer
    pub fn create(
        &mut self,
        direction: BridgeDirection,
        amount: Decimal,
        recipient: &str,
    ) -> Result<BridgeTransfer, BridgeError> {
        if recipient.trim().is_empty() {
            return Err(BridgeError::InvalidRecipient);
        }
        let (fee, net_amount) = self.quote(amount)?;

        let transfer = BridgeTransfer {
            id: Uuid::new_v4().to_string(),
            direction,
            amount,
            fee,
            net_amount,
            recipient: recipient.to_string(),
            status: BridgeStatus::Pending,
            created_at: Utc::now(),
            completed_at: None,
            source_tx: None,
            destination_tx: None,
            retry_count: 0,
            error: None,
        };

        self.transfers.insert(transfer.id.clone(), transfer.clone());
        Ok(transfer)
    }

    pub fn get(&self, id: &str) -> Option<&BridgeTransfer> {
        self.transfers.get(id)
    }

    /// Move a transfer to `next`, rejecting transitions outside the status machine
    pub fn transition(&mut self, id: &str, next: BridgeStatus) -> Result<&BridgeTransfer, BridgeError> {
        let transfer = self
            .transfers
            .get_mut(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;

        if !transfer.status.can_transition_to(next) {
            return Err(BridgeError::InvalidTransition {
                id: id.to_string(),
                from: transfer.status,
                to: next,
            });
        }

        transfer.status = next;
        if next.is_completed() {
            transfer.completed_at = Some(Utc::now());
        }
        Ok(transfer)
    }

    /// Mark a failed transfer with its reason
    pub fn fail(&mut self, id: &str, reason: &str) -> Result<&BridgeTransfer, BridgeError> {
        self.transition(id, BridgeStatus::Failed)?;
        let transfer = self
            .transfers
            .get_mut(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        transfer.error = Some(reason.to_string());
        Ok(transfer)
    }

    pub fn record_retry(&mut self, id: &str) -> Result<u32, BridgeError> {
        let transfer = self
            .transfers
            .get_mut(id)
            .ok_or_else(|| BridgeError::NotFound(id.to_string()))?;
        transfer.retry_count += 1;
        Ok(transfer.retry_count)
    }

    pub fn stats(&self) -> BridgeStats {
        let mut stats = BridgeStats {
            total_transfers: self.transfers.len(),
            fee_percent: self.limits.fee_rate * Decimal::from(100),
            ..Default::default()
        };

        for transfer in self.transfers.values() {
            match transfer.status {
                BridgeStatus::Pending | BridgeStatus::Locked => stats.pending += 1,
                BridgeStatus::Minted | BridgeStatus::Released => {
                    stats.completed += 1;
                    stats.total_volume += transfer.amount;
                }
                BridgeStatus::Failed => stats.failed += 1,
                BridgeStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

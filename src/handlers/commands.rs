//! Command definitions
//!
//! Commands represent intentions to move money through the ledger.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{AccountId, TransactionId};

// =========================================================================
// CashInCommand
// =========================================================================

/// Command to credit external money to an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashInCommand {
    pub account_id: AccountId,
    /// Unvalidated amount; checked before the store is touched
    pub amount: Decimal,
}

impl CashInCommand {
    pub fn new(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, amount }
    }
}

// =========================================================================
// TransferCommand
// =========================================================================

/// Command to move money between two accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferCommand {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
}

impl TransferCommand {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Decimal) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }
}

/// Result of a committed cash-in
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CashInResult {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub balance: Decimal,
    pub transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

/// Result of a committed transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
    /// Sender balance after the debit
    pub from_balance: Decimal,
    pub debit_transaction_id: TransactionId,
    pub credit_transaction_id: TransactionId,
    pub created_at: DateTime<Utc>,
}

//! Ledger Error Types
//!
//! Errors produced by the balance, cash-in, transfer and history operations,
//! and the numeric result codes transfers report to callers.

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use crate::domain::{AccountId, AmountError, TransactionId};
use crate::store::StoreError;

/// Result code of a transfer.
///
/// The numeric values are part of the external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransferCode {
    Success = 0,
    InsufficientFunds = 1,
    InvalidUser = 2,
    SameUser = 3,
    StoreError = 4,
    InvalidAmount = 5,
}

impl TransferCode {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Short message suitable for end users.
    pub fn message(self) -> &'static str {
        match self {
            Self::Success => "Transfer completed",
            Self::InsufficientFunds => "Insufficient balance for transfer",
            Self::InvalidUser => "One or both users do not exist",
            Self::SameUser => "Cannot transfer to yourself",
            Self::StoreError => "Transfer failed, please try again later",
            Self::InvalidAmount => "Invalid transfer amount",
        }
    }
}

impl fmt::Display for TransferCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for TransferCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Amount is zero, negative or malformed
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Account id is not a positive integer
    #[error("Invalid account id: {0}")]
    InvalidAccountId(AccountId),

    /// Sender and recipient are the same account
    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },

    /// The store failed; the unit of work was rolled back
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The unit of work did not finish before the operation deadline
    #[error("Operation timed out")]
    Timeout,
}

impl LedgerError {
    pub fn insufficient_funds(required: Decimal, available: Decimal) -> Self {
        Self::InsufficientFunds { required, available }
    }

    /// Map this error onto the transfer result code contract.
    pub fn code(&self) -> TransferCode {
        match self {
            Self::InvalidAmount(_) => TransferCode::InvalidAmount,
            Self::InvalidAccountId(_) | Self::AccountNotFound(_) => TransferCode::InvalidUser,
            Self::SameAccount => TransferCode::SameUser,
            Self::InsufficientFunds { .. } => TransferCode::InsufficientFunds,
            Self::TransactionNotFound(_) | Self::Store(_) | Self::Timeout => TransferCode::StoreError,
        }
    }

    /// Rejected before the store was touched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidAmount(_) | Self::InvalidAccountId(_) | Self::SameAccount
        )
    }

    /// The store could not complete the operation.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Timeout)
    }
}

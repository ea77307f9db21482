//! Domain module
//!
//! Core domain types: amounts, ledger records and operation errors.

pub mod amount;
pub mod error;
pub mod records;

pub use amount::{Amount, AmountError};
pub use error::{LedgerError, TransferCode};
pub use records::{
    transfer_in_label, transfer_out_label, AccountId, Balance, BalanceDrift, NewAccount, NewTransaction,
    Transaction, TransactionId, TransactionKind, CASH_IN_LABEL,
};

//! Ledger records
//!
//! Balance rows and append-only transaction records, plus the labels the
//! ledger writes for each kind of money movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a registered account.
pub type AccountId = i64;

/// Store-assigned identifier of a transaction record.
pub type TransactionId = i64;

/// Label written on every cash-in record.
pub const CASH_IN_LABEL: &str = "Cash In";

const TRANSFER_OUT_PREFIX: &str = "Transfer to";
const TRANSFER_IN_PREFIX: &str = "Transfer from";

/// Label of the sender's record for a transfer.
pub fn transfer_out_label(to: AccountId) -> String {
    format!("{TRANSFER_OUT_PREFIX} User #{to}")
}

/// Label of the recipient's record for a transfer.
pub fn transfer_in_label(from: AccountId) -> String {
    format!("{TRANSFER_IN_PREFIX} User #{from}")
}

/// The single balance row owned by an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub id: i64,
    pub account_id: AccountId,
    pub amount: Decimal,
}

/// An immutable ledger entry.
///
/// Positive amounts are credits, negative amounts are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub amount: Decimal,
    pub label: String,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub transfer_to_id: Option<AccountId>,
    pub transfer_from_id: Option<AccountId>,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        TransactionKind::from_label(&self.label)
    }

    /// Whether this record is one half of a transfer.
    pub fn is_transfer(&self) -> bool {
        self.transfer_to_id.is_some() && self.transfer_from_id.is_some()
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount >= Decimal::ZERO { '+' } else { '-' };
        write!(
            f,
            "[{}] ID: {} | {} | ₱{}{:.2} | {}",
            self.created_at.format("%Y-%m-%dT%H:%M:%S"),
            self.id,
            self.kind(),
            sign,
            self.amount.abs(),
            self.label
        )
    }
}

/// Classification of a record, derived from its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    CashIn,
    TransferOut,
    TransferIn,
    Other,
}

impl TransactionKind {
    pub fn from_label(label: &str) -> Self {
        if label.starts_with(CASH_IN_LABEL) {
            Self::CashIn
        } else if label.starts_with(TRANSFER_OUT_PREFIX) {
            Self::TransferOut
        } else if label.starts_with(TRANSFER_IN_PREFIX) {
            Self::TransferIn
        } else {
            Self::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashIn => "CASH IN",
            Self::TransferOut => "TRANSFER OUT",
            Self::TransferIn => "TRANSFER IN",
            Self::Other => "TRANSACTION",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transaction record before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub label: String,
    pub account_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub transfer_to_id: Option<AccountId>,
    pub transfer_from_id: Option<AccountId>,
}

impl NewTransaction {
    /// Record for external money entering an account.
    pub fn cash_in(account_id: AccountId, amount: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            amount,
            label: CASH_IN_LABEL.to_string(),
            account_id,
            created_at: at,
            transfer_to_id: None,
            transfer_from_id: None,
        }
    }

    /// The debit/credit pair for a transfer. Both records share the
    /// timestamp and the participant ids; their amounts cancel out.
    pub fn transfer_pair(
        from: AccountId,
        to: AccountId,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> (Self, Self) {
        let debit = Self {
            amount: -amount,
            label: transfer_out_label(to),
            account_id: from,
            created_at: at,
            transfer_to_id: Some(to),
            transfer_from_id: Some(from),
        };
        let credit = Self {
            amount,
            label: transfer_in_label(from),
            account_id: to,
            created_at: at,
            transfer_to_id: Some(to),
            transfer_from_id: Some(from),
        };
        (debit, credit)
    }

    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            amount: self.amount,
            label: self.label,
            account_id: self.account_id,
            created_at: self.created_at,
            transfer_to_id: self.transfer_to_id,
            transfer_from_id: self.transfer_from_id,
        }
    }
}

/// Registration data for a new account, with the PIN already hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub number: String,
    pub pin_hash: String,
}

/// A balance row that disagrees with the sum of its account's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    pub account_id: AccountId,
    pub balance: Decimal,
    pub history_total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[test]
    fn test_transfer_pair_is_balanced() {
        let at = Utc::now();
        let (debit, credit) = NewTransaction::transfer_pair(1, 2, dec!(50), at);

        assert_eq!(debit.amount + credit.amount, Decimal::ZERO);
        assert_eq!(debit.label, "Transfer to User #2");
        assert_eq!(credit.label, "Transfer from User #1");
        assert_eq!(debit.account_id, 1);
        assert_eq!(credit.account_id, 2);
        assert_eq!(debit.created_at, credit.created_at);
        assert_eq!(
            (debit.transfer_to_id, debit.transfer_from_id),
            (credit.transfer_to_id, credit.transfer_from_id)
        );
    }

    #[test]
    fn test_cash_in_record() {
        let record = NewTransaction::cash_in(7, dec!(200), Utc::now()).into_transaction(3);
        assert_eq!(record.id, 3);
        assert_eq!(record.label, CASH_IN_LABEL);
        assert_eq!(record.kind(), TransactionKind::CashIn);
        assert!(!record.is_transfer());
    }

    #[test]
    fn test_kind_from_label() {
        assert_eq!(TransactionKind::from_label("Cash In"), TransactionKind::CashIn);
        assert_eq!(TransactionKind::from_label("Transfer to User #4"), TransactionKind::TransferOut);
        assert_eq!(TransactionKind::from_label("Transfer from User #4"), TransactionKind::TransferIn);
        assert_eq!(TransactionKind::from_label("Adjustment"), TransactionKind::Other);
    }

    #[test]
    fn test_transaction_display() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let (debit, _) = NewTransaction::transfer_pair(1, 2, dec!(200), at);
        let record = debit.into_transaction(102);

        assert_eq!(
            record.to_string(),
            "[2024-03-01T09:30:00] ID: 102 | TRANSFER OUT | ₱-200.00 | Transfer to User #2"
        );
    }
}

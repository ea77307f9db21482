//! Ledger Store
//!
//! The transactional persistence seam. Ledger operations only ever talk to
//! the store through these traits: reads go through [`LedgerStore`], every
//! mutation goes through a [`UnitOfWork`] that commits or rolls back as one.

mod memory;
mod postgres;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::sync::Arc;

use crate::domain::{AccountId, Balance, BalanceDrift, NewAccount, NewTransaction, Transaction, TransactionId};

pub use memory::{FaultPoint, MemoryLedgerStore};
pub use postgres::PgLedgerStore;

/// Store handle shared by every ledger service.
pub type SharedStore = Arc<dyn LedgerStore>;

/// Errors raised by store implementations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique constraint rejected the write
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A statement affected an unexpected number of rows
    #[error("Store invariant violated: {0}")]
    Invariant(String),
}

/// Read access and unit-of-work factory.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Open a new unit of work. Dropping it without commit rolls it back.
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError>;

    async fn find_balance(&self, account_id: AccountId) -> Result<Option<Balance>, StoreError>;

    /// Transactions newest-first, optionally restricted to one owner.
    /// A `limit` of `None` returns every matching record.
    async fn list_transactions(
        &self,
        account_id: Option<AccountId>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Transaction>, StoreError>;

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Accounts whose balance row differs from the sum of their records.
    async fn find_balance_drift(&self) -> Result<Vec<BalanceDrift>, StoreError>;

    /// Insert into the account directory, returning the new id.
    async fn register_account(&self, account: &NewAccount) -> Result<AccountId, StoreError>;

    /// Resolve an email or phone number plus PIN hash to an account.
    async fn find_account_by_credentials(
        &self,
        identifier: &str,
        pin_hash: &str,
    ) -> Result<Option<AccountId>, StoreError>;

    /// Replace the PIN hash if `old_pin_hash` matches. Returns whether a row changed.
    async fn update_pin(
        &self,
        account_id: AccountId,
        old_pin_hash: &str,
        new_pin_hash: &str,
    ) -> Result<bool, StoreError>;
}

/// One atomic unit of work.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, StoreError>;

    /// Read the balance row, holding it for the rest of the unit.
    async fn find_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>, StoreError>;

    /// Create a zero balance row. Returns the existing row if one appeared concurrently.
    async fn create_balance(&mut self, account_id: AccountId) -> Result<Balance, StoreError>;

    /// `amount = amount + delta`. Returns the number of rows touched.
    async fn adjust_balance(&mut self, account_id: AccountId, delta: Decimal) -> Result<u64, StoreError>;

    async fn append_transaction(&mut self, record: &NewTransaction) -> Result<TransactionId, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;

    /// Fetch the balance row, creating it on first use.
    async fn ensure_balance(&mut self, account_id: AccountId) -> Result<Balance, StoreError> {
        match self.find_balance(account_id).await? {
            Some(balance) => Ok(balance),
            None => self.create_balance(account_id).await,
        }
    }

    /// Additive update that must hit exactly the account's balance row.
    async fn apply_delta(&mut self, account_id: AccountId, delta: Decimal) -> Result<(), StoreError> {
        let rows = self.adjust_balance(account_id, delta).await?;
        if rows != 1 {
            return Err(StoreError::Invariant(format!(
                "balance update for account {account_id} touched {rows} rows"
            )));
        }
        Ok(())
    }
}

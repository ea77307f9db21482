//! Transaction History Reader
//!
//! Newest-first listing of ledger records, for one account or for the whole
//! ledger, plus single-record lookup. Listings are either paged (HTTP) or
//! complete.

use serde::Deserialize;

use crate::domain::{AccountId, LedgerError, Transaction, TransactionId};
use crate::store::SharedStore;

pub const DEFAULT_PAGE_SIZE: i64 = 100;
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Paging parameters for history listings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl HistoryQuery {
    pub fn page(limit: i64, offset: i64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
        }
    }

    /// Limit clamped to `1..=MAX_PAGE_SIZE`.
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Reads the append-only transaction history
#[derive(Clone)]
pub struct HistoryReader {
    store: SharedStore,
}

impl HistoryReader {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Every record in the ledger.
    pub async fn list_all(&self, query: &HistoryQuery) -> Result<Vec<Transaction>, LedgerError> {
        self.list(None, query).await
    }

    /// Records owned by one account. Non-positive ids yield nothing.
    pub async fn list_by_account(
        &self,
        account_id: AccountId,
        query: &HistoryQuery,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if account_id <= 0 {
            return Ok(Vec::new());
        }
        self.list(Some(account_id), query).await
    }

    /// The full newest-first history, unpaged. Non-positive ids yield nothing.
    pub async fn list_complete(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if account_id.is_some_and(|id| id <= 0) {
            return Ok(Vec::new());
        }
        self.fetch(account_id, None, 0).await
    }

    pub async fn get(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        if id <= 0 {
            return Ok(None);
        }

        self.store.find_transaction(id).await.map_err(|err| {
            tracing::error!(transaction_id = id, error = %err, "Transaction lookup failed");
            LedgerError::from(err)
        })
    }

    async fn list(
        &self,
        account_id: Option<AccountId>,
        query: &HistoryQuery,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.fetch(account_id, Some(query.limit()), query.offset()).await
    }

    async fn fetch(
        &self,
        account_id: Option<AccountId>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.store
            .list_transactions(account_id, limit, offset)
            .await
            .map_err(|err| {
                tracing::error!(?account_id, error = %err, "History listing failed");
                LedgerError::from(err)
            })
    }
}

//! Balance Reader

use crate::domain::{AccountId, Balance, LedgerError};
use crate::store::SharedStore;

/// Reads the single balance row of an account
#[derive(Clone)]
pub struct BalanceReader {
    store: SharedStore,
}

impl BalanceReader {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the id is not positive or the account has no row yet.
    pub async fn get(&self, account_id: AccountId) -> Result<Option<Balance>, LedgerError> {
        if account_id <= 0 {
            return Ok(None);
        }

        self.store.find_balance(account_id).await.map_err(|err| {
            tracing::error!(account_id, error = %err, "Balance lookup failed");
            LedgerError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FaultPoint, MemoryLedgerStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_non_positive_id_skips_store() {
        let store = MemoryLedgerStore::new();
        // Would fail if the store were consulted
        store.fail_at(FaultPoint::Read, 0);
        let reader = BalanceReader::new(Arc::new(store));

        assert!(reader.get(0).await.unwrap().is_none());
        assert!(reader.get(-7).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_row_is_not_found() {
        let store = MemoryLedgerStore::new();
        let account = store.add_account("alice").await;
        let reader = BalanceReader::new(Arc::new(store));

        assert!(reader.get(account).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_store_failure_is_surfaced() {
        let store = MemoryLedgerStore::new();
        let account = store.add_account("alice").await;
        store.fail_at(FaultPoint::Read, 0);
        let reader = BalanceReader::new(Arc::new(store));

        let err = reader.get(account).await.unwrap_err();
        assert!(err.is_store_failure());
    }
}

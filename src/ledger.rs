//! Ledger facade
//!
//! The interface offered to the presentation layer. Built once from a store
//! handle and passed around explicitly; it holds no state of its own.

use rust_decimal::Decimal;
use std::time::Duration;

use crate::domain::{AccountId, Balance, LedgerError, Transaction, TransactionId, TransferCode};
use crate::handlers::{
    CashInCommand, CashInHandler, TransferCommand, TransferHandler, DEFAULT_OPERATION_TIMEOUT,
};
use crate::queries::{BalanceReader, HistoryReader};
use crate::store::SharedStore;

#[derive(Clone)]
pub struct Ledger {
    store: SharedStore,
    cash_in: CashInHandler,
    transfer: TransferHandler,
    balances: BalanceReader,
    history: HistoryReader,
}

impl Ledger {
    pub fn new(store: SharedStore) -> Self {
        Self::with_timeout(store, DEFAULT_OPERATION_TIMEOUT)
    }

    /// Build with a deadline applied to every unit of work.
    pub fn with_timeout(store: SharedStore, timeout: Duration) -> Self {
        Self {
            cash_in: CashInHandler::with_timeout(store.clone(), timeout),
            transfer: TransferHandler::with_timeout(store.clone(), timeout),
            balances: BalanceReader::new(store.clone()),
            history: HistoryReader::new(store.clone()),
            store,
        }
    }

    /// Credit `amount` to `account_id`. Any failure leaves no trace.
    pub async fn cash_in(&self, amount: Decimal, account_id: AccountId) -> bool {
        self.cash_in
            .execute(CashInCommand::new(account_id, amount))
            .await
            .is_ok()
    }

    pub async fn transfer(&self, amount: Decimal, from: AccountId, to: AccountId) -> TransferCode {
        self.transfer
            .execute_code(TransferCommand::new(from, to, amount))
            .await
    }

    pub async fn get_balance(&self, account_id: AccountId) -> Result<Option<Balance>, LedgerError> {
        self.balances.get(account_id).await
    }

    /// Complete newest-first history, for one account or the whole ledger.
    pub async fn list_transactions(
        &self,
        account_id: Option<AccountId>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        self.history.list_complete(account_id).await
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        self.history.get(id).await
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn cash_in_handler(&self) -> &CashInHandler {
        &self.cash_in
    }

    pub fn transfer_handler(&self) -> &TransferHandler {
        &self.transfer
    }

    pub fn balance_reader(&self) -> &BalanceReader {
        &self.balances
    }

    pub fn history_reader(&self) -> &HistoryReader {
        &self.history
    }
}

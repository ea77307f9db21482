//! In-memory Ledger Store
//!
//! Same unit-of-work semantics as the PostgreSQL store, kept in process.
//! A unit of work holds the store lock for its whole lifetime. Writes are
//! staged on the unit (touched balance rows and new records only); commit
//! merges them into the shared state, drop discards them.
//! Faults can be injected at named points to exercise rollback paths.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{AccountId, Balance, BalanceDrift, NewAccount, NewTransaction, Transaction, TransactionId};

use super::{LedgerStore, StoreError, UnitOfWork};

/// Where an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    Begin,
    AccountLookup,
    BalanceWrite,
    TransactionAppend,
    Commit,
    /// Reads outside a unit of work
    Read,
}

#[derive(Debug)]
struct Fault {
    point: FaultPoint,
    skip: usize,
}

/// Pending one-shot faults, shared between the store and its units of work.
#[derive(Debug, Clone, Default)]
struct Faults {
    pending: Arc<StdMutex<Vec<Fault>>>,
    commit_latency: Arc<StdMutex<Option<Duration>>>,
}

impl Faults {
    fn trip(&self, point: FaultPoint) -> Result<(), StoreError> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(index) = pending.iter().position(|f| f.point == point) else {
            return Ok(());
        };

        if pending[index].skip > 0 {
            pending[index].skip -= 1;
            return Ok(());
        }

        pending.remove(index);
        Err(StoreError::Unavailable(format!("injected fault at {point:?}")))
    }

    fn commit_latency(&self) -> Option<Duration> {
        *self.commit_latency.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
struct AccountRow {
    email: String,
    number: String,
    pin_hash: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: BTreeMap<AccountId, AccountRow>,
    /// Keyed by owner: one balance row per account
    balances: BTreeMap<AccountId, Balance>,
    transactions: Vec<Transaction>,
    last_account_id: i64,
    last_balance_id: i64,
    last_transaction_id: i64,
}

impl MemoryState {
    fn newest_first(&self) -> Vec<&Transaction> {
        let mut records: Vec<&Transaction> = self.transactions.iter().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        records
    }
}

/// Ledger store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Faults,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a directory entry with placeholder credentials.
    pub async fn add_account(&self, name: &str) -> AccountId {
        let mut state = self.state.lock().await;
        state.last_account_id += 1;
        let id = state.last_account_id;
        state.accounts.insert(
            id,
            AccountRow {
                email: format!("{}-{id}@example.test", name.to_lowercase()),
                number: format!("0917{id:07}"),
                pin_hash: String::new(),
            },
        );
        id
    }

    /// Fail the next time `point` is reached after skipping `skip` hits.
    pub fn fail_at(&self, point: FaultPoint, skip: usize) {
        self.faults
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Fault { point, skip });
    }

    /// Delay every commit by `latency`.
    pub fn set_commit_latency(&self, latency: Option<Duration>) {
        *self
            .faults
            .commit_latency
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = latency;
    }

    pub async fn balance_row_count(&self) -> usize {
        self.state.lock().await.balances.len()
    }

    pub async fn transaction_count(&self) -> usize {
        self.state.lock().await.transactions.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        self.faults.trip(FaultPoint::Begin)?;
        let guard = self.state.clone().lock_owned().await;
        let staged = Staged {
            balances: BTreeMap::new(),
            transactions: Vec::new(),
            last_balance_id: guard.last_balance_id,
            last_transaction_id: guard.last_transaction_id,
        };
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            staged,
            faults: self.faults.clone(),
        }))
    }

    async fn find_balance(&self, account_id: AccountId) -> Result<Option<Balance>, StoreError> {
        self.faults.trip(FaultPoint::Read)?;
        Ok(self.state.lock().await.balances.get(&account_id).cloned())
    }

    async fn list_transactions(
        &self,
        account_id: Option<AccountId>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        self.faults.trip(FaultPoint::Read)?;
        let state = self.state.lock().await;
        let records = state
            .newest_first()
            .into_iter()
            .filter(|record| account_id.map_or(true, |id| record.account_id == id))
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(limit.map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(0)))
            .cloned()
            .collect();
        Ok(records)
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        self.faults.trip(FaultPoint::Read)?;
        let state = self.state.lock().await;
        Ok(state.transactions.iter().find(|record| record.id == id).cloned())
    }

    async fn find_balance_drift(&self) -> Result<Vec<BalanceDrift>, StoreError> {
        self.faults.trip(FaultPoint::Read)?;
        let state = self.state.lock().await;
        let drifts = state
            .balances
            .values()
            .filter_map(|balance| {
                let history_total: Decimal = state
                    .transactions
                    .iter()
                    .filter(|record| record.account_id == balance.account_id)
                    .map(|record| record.amount)
                    .sum();
                (history_total != balance.amount).then(|| BalanceDrift {
                    account_id: balance.account_id,
                    balance: balance.amount,
                    history_total,
                })
            })
            .collect();
        Ok(drifts)
    }

    async fn register_account(&self, account: &NewAccount) -> Result<AccountId, StoreError> {
        let mut state = self.state.lock().await;
        let taken = state
            .accounts
            .values()
            .any(|row| row.email == account.email || row.number == account.number);
        if taken {
            return Err(StoreError::Duplicate("email or number already registered".to_string()));
        }

        state.last_account_id += 1;
        let id = state.last_account_id;
        state.accounts.insert(
            id,
            AccountRow {
                email: account.email.clone(),
                number: account.number.clone(),
                pin_hash: account.pin_hash.clone(),
            },
        );
        Ok(id)
    }

    async fn find_account_by_credentials(
        &self,
        identifier: &str,
        pin_hash: &str,
    ) -> Result<Option<AccountId>, StoreError> {
        self.faults.trip(FaultPoint::Read)?;
        let state = self.state.lock().await;
        let id = state
            .accounts
            .iter()
            .find(|(_, row)| {
                (row.email == identifier || row.number == identifier) && row.pin_hash == pin_hash
            })
            .map(|(id, _)| *id);
        Ok(id)
    }

    async fn update_pin(
        &self,
        account_id: AccountId,
        old_pin_hash: &str,
        new_pin_hash: &str,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.accounts.get_mut(&account_id) {
            Some(row) if row.pin_hash == old_pin_hash => {
                row.pin_hash = new_pin_hash.to_string();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// Writes made by a unit of work that is not yet committed
#[derive(Debug, Default)]
struct Staged {
    /// Balance rows created or changed by this unit, keyed by owner
    balances: BTreeMap<AccountId, Balance>,
    transactions: Vec<Transaction>,
    last_balance_id: i64,
    last_transaction_id: i64,
}

/// Unit of work holding the store lock and its staged writes
struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    staged: Staged,
    faults: Faults,
}

impl MemoryUnitOfWork {
    fn current_balance(&self, account_id: AccountId) -> Option<&Balance> {
        self.staged
            .balances
            .get(&account_id)
            .or_else(|| self.guard.balances.get(&account_id))
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, StoreError> {
        self.faults.trip(FaultPoint::AccountLookup)?;
        Ok(self.guard.accounts.contains_key(&account_id))
    }

    async fn find_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>, StoreError> {
        Ok(self.current_balance(account_id).cloned())
    }

    async fn create_balance(&mut self, account_id: AccountId) -> Result<Balance, StoreError> {
        self.faults.trip(FaultPoint::BalanceWrite)?;
        if let Some(existing) = self.current_balance(account_id) {
            return Ok(existing.clone());
        }

        self.staged.last_balance_id += 1;
        let balance = Balance {
            id: self.staged.last_balance_id,
            account_id,
            amount: Decimal::ZERO,
        };
        self.staged.balances.insert(account_id, balance.clone());
        Ok(balance)
    }

    async fn adjust_balance(&mut self, account_id: AccountId, delta: Decimal) -> Result<u64, StoreError> {
        self.faults.trip(FaultPoint::BalanceWrite)?;
        let Some(mut balance) = self.current_balance(account_id).cloned() else {
            return Ok(0);
        };

        balance.amount += delta;
        self.staged.balances.insert(account_id, balance);
        Ok(1)
    }

    async fn append_transaction(&mut self, record: &NewTransaction) -> Result<TransactionId, StoreError> {
        self.faults.trip(FaultPoint::TransactionAppend)?;
        self.staged.last_transaction_id += 1;
        let id = self.staged.last_transaction_id;
        self.staged.transactions.push(record.clone().into_transaction(id));
        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryUnitOfWork {
            mut guard,
            staged,
            faults,
        } = *self;

        if let Some(latency) = faults.commit_latency() {
            tokio::time::sleep(latency).await;
        }
        faults.trip(FaultPoint::Commit)?;

        guard.balances.extend(staged.balances);
        guard.transactions.extend(staged.transactions);
        guard.last_balance_id = staged.last_balance_id;
        guard.last_transaction_id = staged.last_transaction_id;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

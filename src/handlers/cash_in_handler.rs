//! Cash-In Handler
//!
//! Credits external money to an account, creating its balance row on first use.

use chrono::Utc;
use std::time::Duration;

use crate::domain::{AccountId, Amount, LedgerError, NewTransaction};
use crate::store::{SharedStore, UnitOfWork};

use super::{finish, with_deadline, CashInCommand, CashInResult, DEFAULT_OPERATION_TIMEOUT};

/// Handler for cash-in
#[derive(Clone)]
pub struct CashInHandler {
    store: SharedStore,
    timeout: Duration,
}

impl CashInHandler {
    pub fn new(store: SharedStore) -> Self {
        Self::with_timeout(store, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn with_timeout(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Execute the cash-in command
    pub async fn execute(&self, command: CashInCommand) -> Result<CashInResult, LedgerError> {
        let amount = Amount::new(command.amount)?;
        if command.account_id <= 0 {
            return Err(LedgerError::InvalidAccountId(command.account_id));
        }

        let outcome = with_deadline(self.timeout, self.run(command.account_id, amount)).await;

        match &outcome {
            Ok(result) => tracing::info!(
                account_id = result.account_id,
                amount = %amount,
                transaction_id = result.transaction_id,
                "Cash-in committed"
            ),
            Err(err) if err.is_store_failure() => tracing::error!(
                account_id = command.account_id,
                amount = %amount,
                error = %err,
                "Cash-in rolled back"
            ),
            Err(err) => tracing::warn!(
                account_id = command.account_id,
                amount = %amount,
                error = %err,
                "Cash-in rejected"
            ),
        }

        outcome
    }

    async fn run(&self, account_id: AccountId, amount: Amount) -> Result<CashInResult, LedgerError> {
        let mut uow = self.store.begin().await?;
        let outcome = Self::apply(uow.as_mut(), account_id, amount).await;
        finish(uow, outcome).await
    }

    async fn apply(
        uow: &mut dyn UnitOfWork,
        account_id: AccountId,
        amount: Amount,
    ) -> Result<CashInResult, LedgerError> {
        if !uow.account_exists(account_id).await? {
            return Err(LedgerError::AccountNotFound(account_id));
        }

        let balance = uow.ensure_balance(account_id).await?;
        uow.apply_delta(account_id, amount.value()).await?;

        let created_at = Utc::now();
        let transaction_id = uow
            .append_transaction(&NewTransaction::cash_in(account_id, amount.value(), created_at))
            .await?;

        Ok(CashInResult {
            account_id,
            amount: amount.value(),
            balance: balance.amount + amount.value(),
            transaction_id,
            created_at,
        })
    }
}

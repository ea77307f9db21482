//! Transfer Handler
//!
//! Moves money between two accounts as one atomic unit: both balance updates
//! and both ledger records commit together or not at all.

use chrono::Utc;
use rust_decimal::Decimal;
use std::time::Duration;

use crate::domain::{AccountId, Amount, LedgerError, NewTransaction, TransferCode};
use crate::store::{SharedStore, UnitOfWork};

use super::{finish, with_deadline, TransferCommand, TransferResult, DEFAULT_OPERATION_TIMEOUT};

/// Handler for account-to-account transfers
#[derive(Clone)]
pub struct TransferHandler {
    store: SharedStore,
    timeout: Duration,
}

impl TransferHandler {
    pub fn new(store: SharedStore) -> Self {
        Self::with_timeout(store, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn with_timeout(store: SharedStore, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Execute the transfer command
    pub async fn execute(&self, command: TransferCommand) -> Result<TransferResult, LedgerError> {
        let TransferCommand {
            from_account_id: from,
            to_account_id: to,
            amount,
        } = command;

        // Shape checks, in contract order, before any store access
        let amount = Amount::new(amount)?;
        if from <= 0 {
            return Err(LedgerError::InvalidAccountId(from));
        }
        if to <= 0 {
            return Err(LedgerError::InvalidAccountId(to));
        }
        if from == to {
            return Err(LedgerError::SameAccount);
        }

        let outcome = with_deadline(self.timeout, self.run(from, to, amount)).await;

        match &outcome {
            Ok(_) => tracing::info!(from, to, amount = %amount, "Transfer committed"),
            Err(err) if err.is_store_failure() => {
                tracing::error!(from, to, amount = %amount, error = %err, "Transfer rolled back")
            }
            Err(err) => tracing::warn!(
                from,
                to,
                amount = %amount,
                code = err.code().as_u8(),
                error = %err,
                "Transfer rejected"
            ),
        }

        outcome
    }

    /// Execute and collapse the outcome into a result code.
    pub async fn execute_code(&self, command: TransferCommand) -> TransferCode {
        match self.execute(command).await {
            Ok(_) => TransferCode::Success,
            Err(err) => err.code(),
        }
    }

    async fn run(
        &self,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<TransferResult, LedgerError> {
        let mut uow = self.store.begin().await?;
        let outcome = Self::apply(uow.as_mut(), from, to, amount).await;
        finish(uow, outcome).await
    }

    async fn apply(
        uow: &mut dyn UnitOfWork,
        from: AccountId,
        to: AccountId,
        amount: Amount,
    ) -> Result<TransferResult, LedgerError> {
        for id in [from, to] {
            if !uow.account_exists(id).await? {
                return Err(LedgerError::AccountNotFound(id));
            }
        }

        // Lock existing rows in id order so opposing transfers cannot deadlock
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_row = uow.find_balance(first).await?;
        let second_row = uow.find_balance(second).await?;
        let (sender_row, recipient_row) = if first == from {
            (first_row, second_row)
        } else {
            (second_row, first_row)
        };

        let available = sender_row
            .as_ref()
            .map(|balance| balance.amount)
            .unwrap_or(Decimal::ZERO);
        if !amount.is_covered_by(available) {
            return Err(LedgerError::insufficient_funds(amount.value(), available));
        }

        uow.apply_delta(from, amount.debit()).await?;

        if recipient_row.is_none() {
            uow.create_balance(to).await?;
        }
        uow.apply_delta(to, amount.value()).await?;

        let created_at = Utc::now();
        let (debit, credit) = NewTransaction::transfer_pair(from, to, amount.value(), created_at);
        let debit_transaction_id = uow.append_transaction(&debit).await?;
        let credit_transaction_id = uow.append_transaction(&credit).await?;

        Ok(TransferResult {
            from_account_id: from,
            to_account_id: to,
            amount: amount.value(),
            from_balance: available - amount.value(),
            debit_transaction_id,
            credit_transaction_id,
            created_at,
        })
    }
}

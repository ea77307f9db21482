//! PostgreSQL Ledger Store
//!
//! `sqlx` implementation over the `accounts`, `balance` and `transaction`
//! tables. Each unit of work owns one pooled connection inside a database
//! transaction; dropping it without commit rolls back and returns the
//! connection to the pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction as PgTransaction};

use crate::domain::{AccountId, Balance, BalanceDrift, NewAccount, NewTransaction, Transaction, TransactionId};

use super::{LedgerStore, StoreError, UnitOfWork};

type BalanceRow = (i64, Decimal, i64);
type TransactionRow = (i64, Decimal, String, i64, DateTime<Utc>, Option<i64>, Option<i64>);

fn balance_from_row((id, amount, account_id): BalanceRow) -> Balance {
    Balance { id, amount, account_id }
}

fn transaction_from_row(
    (id, amount, label, account_id, created_at, transfer_to_id, transfer_from_id): TransactionRow,
) -> Transaction {
    Transaction {
        id,
        amount,
        label,
        account_id,
        created_at,
        transfer_to_id,
        transfer_from_id,
    }
}

/// Translate unique violations into `StoreError::Duplicate`
fn map_write_error(error: sqlx::Error) -> StoreError {
    let duplicate = error
        .as_database_error()
        .filter(|db_err| db_err.is_unique_violation())
        .map(|db_err| db_err.message().to_string());

    match duplicate {
        Some(message) => StoreError::Duplicate(message),
        None => StoreError::Database(error),
    }
}

/// Ledger store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }

    async fn find_balance(&self, account_id: AccountId) -> Result<Option<Balance>, StoreError> {
        let row: Option<BalanceRow> =
            sqlx::query_as("SELECT id, amount, user_id FROM balance WHERE user_id = $1")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(balance_from_row))
    }

    async fn list_transactions(
        &self,
        account_id: Option<AccountId>,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        // LIMIT NULL is LIMIT ALL
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, amount, name, account_id, date, transfer_to_id, transfer_from_id
            FROM "transaction"
            WHERE ($1::BIGINT IS NULL OR account_id = $1)
            ORDER BY date DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(account_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(transaction_from_row).collect())
    }

    async fn find_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        let row: Option<TransactionRow> = sqlx::query_as(
            r#"
            SELECT id, amount, name, account_id, date, transfer_to_id, transfer_from_id
            FROM "transaction"
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(transaction_from_row))
    }

    async fn find_balance_drift(&self) -> Result<Vec<BalanceDrift>, StoreError> {
        let rows: Vec<(AccountId, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT b.user_id, b.amount, COALESCE(SUM(t.amount), 0)
            FROM balance b
            LEFT JOIN "transaction" t ON t.account_id = b.user_id
            GROUP BY b.user_id, b.amount
            HAVING b.amount <> COALESCE(SUM(t.amount), 0)
            ORDER BY b.user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(account_id, balance, history_total)| BalanceDrift {
                account_id,
                balance,
                history_total,
            })
            .collect())
    }

    async fn register_account(&self, account: &NewAccount) -> Result<AccountId, StoreError> {
        sqlx::query_scalar::<_, AccountId>(
            r#"
            INSERT INTO accounts (name, email, number, pin_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.number)
        .bind(&account.pin_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_account_by_credentials(
        &self,
        identifier: &str,
        pin_hash: &str,
    ) -> Result<Option<AccountId>, StoreError> {
        let id: Option<AccountId> = sqlx::query_scalar(
            "SELECT id FROM accounts WHERE (email = $1 OR number = $1) AND pin_hash = $2",
        )
        .bind(identifier)
        .bind(pin_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    async fn update_pin(
        &self,
        account_id: AccountId,
        old_pin_hash: &str,
        new_pin_hash: &str,
    ) -> Result<bool, StoreError> {
        let rows = sqlx::query("UPDATE accounts SET pin_hash = $3 WHERE id = $1 AND pin_hash = $2")
            .bind(account_id)
            .bind(old_pin_hash)
            .bind(new_pin_hash)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(rows > 0)
    }
}

/// Unit of work over one PostgreSQL transaction
struct PgUnitOfWork {
    tx: PgTransaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM accounts WHERE id = $1)")
            .bind(account_id)
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(exists)
    }

    async fn find_balance(&mut self, account_id: AccountId) -> Result<Option<Balance>, StoreError> {
        // Row lock serializes concurrent units touching the same account
        let row: Option<BalanceRow> = sqlx::query_as(
            "SELECT id, amount, user_id FROM balance WHERE user_id = $1 FOR UPDATE",
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(balance_from_row))
    }

    async fn create_balance(&mut self, account_id: AccountId) -> Result<Balance, StoreError> {
        let inserted: Option<BalanceRow> = sqlx::query_as(
            r#"
            INSERT INTO balance (amount, user_id)
            VALUES (0, $1)
            ON CONFLICT (user_id) DO NOTHING
            RETURNING id, amount, user_id
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(row) = inserted {
            return Ok(balance_from_row(row));
        }

        // Another unit created the row first
        self.find_balance(account_id).await?.ok_or_else(|| {
            StoreError::Invariant(format!("balance row for account {account_id} vanished"))
        })
    }

    async fn adjust_balance(&mut self, account_id: AccountId, delta: Decimal) -> Result<u64, StoreError> {
        let rows = sqlx::query("UPDATE balance SET amount = amount + $1 WHERE user_id = $2")
            .bind(delta)
            .bind(account_id)
            .execute(&mut *self.tx)
            .await?
            .rows_affected();

        Ok(rows)
    }

    async fn append_transaction(&mut self, record: &NewTransaction) -> Result<TransactionId, StoreError> {
        let id: TransactionId = sqlx::query_scalar(
            r#"
            INSERT INTO "transaction" (amount, name, account_id, date, transfer_to_id, transfer_from_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(record.amount)
        .bind(&record.label)
        .bind(record.account_id)
        .bind(record.created_at)
        .bind(record.transfer_to_id)
        .bind(record.transfer_from_id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(id)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let this = *self;
        this.tx.rollback().await?;
        Ok(())
    }
}

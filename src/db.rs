//! Database module
//!
//! Database connection and schema verification utilities.

use sqlx::PgPool;

/// Tables the ledger cannot run without
pub const REQUIRED_TABLES: &[&str] = &["accounts", "balance", "transaction"];

/// Verify database connectivity
/// Schema changes live as raw SQL files in migrations/
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;

    Ok(())
}

/// Check if required tables exist
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    if !check_append_only_guard(pool).await? {
        tracing::warn!("Append-only trigger on \"transaction\" is missing; history can be rewritten");
    }

    Ok(true)
}

/// Whether the trigger that rejects UPDATE/DELETE on `transaction` is installed
async fn check_append_only_guard(pool: &PgPool) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM information_schema.triggers
            WHERE event_object_table = 'transaction'
              AND trigger_name = 'transaction_append_only'
        )
        "#,
    )
    .fetch_one(pool)
    .await
}

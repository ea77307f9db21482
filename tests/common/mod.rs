//! Common test utilities
#![allow(dead_code)]

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tokio::sync::OnceCell;

use wallet_ledger::api::AppState;
use wallet_ledger::auth::{Registration, SessionManager};
use wallet_ledger::store::{MemoryLedgerStore, SharedStore};
use wallet_ledger::Ledger;

/// Ledger over a fresh in-memory store, plus the store for inspection
pub fn memory_ledger() -> (Ledger, MemoryLedgerStore) {
    let store = MemoryLedgerStore::new();
    let shared: SharedStore = Arc::new(store.clone());
    (Ledger::new(shared), store)
}

/// API state over a fresh in-memory store
pub fn memory_state() -> (AppState, MemoryLedgerStore) {
    let (ledger, store) = memory_ledger();
    let state = AppState::new(ledger, Arc::new(SessionManager::default()));
    (state, store)
}

/// Registration with an email and number no other test uses
pub fn unique_registration(name: &str) -> Registration {
    let tag = uuid::Uuid::new_v4().simple().to_string();
    let number = format!("{:015}", u64::from(rand::random::<u32>()) * 100_000 + u64::from(rand::random::<u16>()));

    Registration {
        name: name.to_string(),
        email: format!("{}-{}@example.test", name.to_lowercase(), tag),
        number,
        pin: "1234".to_string(),
    }
}

static SCHEMA_APPLIED: OnceCell<()> = OnceCell::const_new();

/// Connect to the test database and apply the schema.
///
/// Returns `None` when DATABASE_URL is not set, so callers can skip.
/// Tests share the database, so each one works on its own fresh accounts.
pub async fn setup_test_db() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping PostgreSQL test");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("Failed to connect to DB");

    // Apply once per test binary; concurrent DDL on the same tables races
    SCHEMA_APPLIED
        .get_or_init(|| async {
            pool.execute(include_str!("../../migrations/0001_init.sql"))
                .await
                .expect("Failed to apply schema");
        })
        .await;

    Some(pool)
}

//! wallet_ledger - Wallet Ledger Backend API
//!
//! Serves balances, cash-in, atomic transfers and the append-only
//! transaction history over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::api::{self, AppState};
use wallet_ledger::auth::SessionManager;
use wallet_ledger::config::StoreBackend;
use wallet_ledger::db;
use wallet_ledger::jobs::{JobScheduler, JobSchedulerConfig};
use wallet_ledger::store::{MemoryLedgerStore, PgLedgerStore, SharedStore};
use wallet_ledger::{Config, Ledger};

/// Initialize tracing/logging
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "wallet_ledger=debug,tower_http=debug".into());
    let json = std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Connect to PostgreSQL and confirm the schema is in place
async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres store"))?;

    tracing::info!("Connecting to database...");

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(database_url)
        .await?;

    db::verify_connection(&pool).await?;
    if !db::check_schema(&pool).await? {
        tracing::error!("Database schema is not complete. Please run migrations.");
        return Err(anyhow::anyhow!("Database schema incomplete"));
    }

    tracing::info!("Database connected successfully");
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    init_tracing();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(store = ?config.store, environment = %config.environment, "Starting wallet_ledger server");
    if config.store == StoreBackend::Memory && config.is_production() {
        tracing::warn!("In-memory store selected in production; all data is lost on restart");
    }

    let (store, pool): (SharedStore, Option<PgPool>) = match config.store {
        StoreBackend::Postgres => {
            let pool = connect(&config).await?;
            (Arc::new(PgLedgerStore::new(pool.clone())), Some(pool))
        }
        StoreBackend::Memory => (Arc::new(MemoryLedgerStore::new()), None),
    };

    let sessions = Arc::new(SessionManager::new(config.session_timeout));
    let ledger = Ledger::with_timeout(store.clone(), config.operation_timeout);

    // Background maintenance
    let scheduler = JobScheduler::with_config(
        store,
        sessions.clone(),
        JobSchedulerConfig {
            session_sweep_interval: config.session_sweep_interval,
            reconciliation_interval: config.reconciliation_interval,
        },
    )
    .start();

    let app = api::build_router(AppState::new(ledger, sessions));

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Cleanup
    tracing::info!("Server shutting down...");
    scheduler.abort();
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed");
    }
    tracing::info!("Goodbye!");

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Which ledger store the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// In-process store; state is lost on restart
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::InvalidValue("STORE")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL (absent only with the memory store)
    pub database_url: Option<String>,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    pub store: StoreBackend,

    /// Idle time after which a session expires
    pub session_timeout: chrono::Duration,

    pub session_sweep_interval: Duration,

    /// How often balances are checked against their history
    pub reconciliation_interval: Duration,

    /// Deadline for a single unit of work
    pub operation_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse = |key: &'static str, default: &str| -> Result<u64, ConfigError> {
            lookup(key)
                .unwrap_or_else(|| default.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key))
        };

        let store: StoreBackend = lookup("STORE")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = lookup("DATABASE_URL");
        if store == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL"));
        }

        let database_max_connections = u32::try_from(parse("DATABASE_MAX_CONNECTIONS", "10")?)
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());

        let port = u16::try_from(parse("PORT", "3000")?)
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string());

        let session_minutes = i64::try_from(parse("SESSION_TIMEOUT_MINUTES", "30")?)
            .map_err(|_| ConfigError::InvalidValue("SESSION_TIMEOUT_MINUTES"))?;

        let sweep_secs = parse("SESSION_SWEEP_INTERVAL_SECS", "60")?;
        let reconciliation_secs = parse("RECONCILIATION_INTERVAL_SECS", "3600")?;
        let operation_secs = parse("OPERATION_TIMEOUT_SECS", "10")?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue("SESSION_SWEEP_INTERVAL_SECS"));
        }
        if reconciliation_secs == 0 {
            return Err(ConfigError::InvalidValue("RECONCILIATION_INTERVAL_SECS"));
        }
        if operation_secs == 0 {
            return Err(ConfigError::InvalidValue("OPERATION_TIMEOUT_SECS"));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            store,
            session_timeout: chrono::Duration::minutes(session_minutes),
            session_sweep_interval: Duration::from_secs(sweep_secs),
            reconciliation_interval: Duration::from_secs(reconciliation_secs),
            operation_timeout: Duration::from_secs(operation_secs),
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

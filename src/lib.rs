//! wallet_ledger Library
//!
//! Re-exports modules for integration testing and the server binary.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
mod error;
pub mod handlers;
pub mod jobs;
pub mod ledger;
pub mod queries;
pub mod store;

pub use config::Config;
pub use domain::{Amount, AmountError, Balance, LedgerError, Transaction, TransferCode};
pub use error::{AppError, AppResult};
pub use ledger::Ledger;

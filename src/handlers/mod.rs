//! Command Handlers module
//!
//! Handlers that move money. Each one validates its command, then runs the
//! mutation inside a single unit of work under the operation deadline.

mod cash_in_handler;
mod commands;
mod transfer_handler;

#[cfg(test)]
mod tests;

use std::future::Future;
use std::time::Duration;

use crate::domain::LedgerError;
use crate::store::UnitOfWork;

pub use cash_in_handler::CashInHandler;
pub use commands::*;
pub use transfer_handler::TransferHandler;

/// Deadline applied to a unit of work when none is configured.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Commit on success, roll back on failure.
///
/// A failed rollback is only logged; the original error is what the caller
/// needs to see.
pub(crate) async fn finish<T>(
    uow: Box<dyn UnitOfWork>,
    outcome: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    match outcome {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Run `work` under `timeout`. On expiry the future is dropped, which drops
/// any open unit of work and rolls it back.
pub(crate) async fn with_deadline<T, F>(timeout: Duration, work: F) -> Result<T, LedgerError>
where
    F: Future<Output = Result<T, LedgerError>>,
{
    match tokio::time::timeout(timeout, work).await {
        Ok(outcome) => outcome,
        Err(_) => Err(LedgerError::Timeout),
    }
}

//! Scheduled Jobs
//!
//! Background maintenance: expired session sweep and a balance reconciliation
//! check that compares each balance row with the sum of its account's history.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::auth::SessionManager;
use crate::domain::BalanceDrift;
use crate::store::{SharedStore, StoreError};

// =========================================================================
// Session Sweep Job
// =========================================================================

/// Remove idle sessions that nobody has touched since they expired
pub fn sweep_expired_sessions(sessions: &SessionManager) -> usize {
    let removed = sessions.purge_expired();

    if removed > 0 {
        tracing::info!(
            sessions_removed = removed,
            active = sessions.active_count(),
            "Swept expired sessions"
        );
    }

    removed
}

// =========================================================================
// Balance Reconciliation Job
// =========================================================================

/// Report accounts whose balance row disagrees with their transaction history
pub async fn reconcile_balances(store: &SharedStore) -> Result<Vec<BalanceDrift>, JobError> {
    let drifts = store.find_balance_drift().await?;

    for drift in &drifts {
        tracing::error!(
            account_id = drift.account_id,
            balance = %drift.balance,
            history_total = %drift.history_total,
            "Balance does not match transaction history"
        );
    }

    Ok(drifts)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the session sweep (default: 1 minute)
    pub session_sweep_interval: Duration,
    /// Interval for balance reconciliation (default: 1 hour)
    pub reconciliation_interval: Duration,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            session_sweep_interval: Duration::from_secs(60),
            reconciliation_interval: Duration::from_secs(3600),
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    store: SharedStore,
    sessions: Arc<SessionManager>,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    pub fn new(store: SharedStore, sessions: Arc<SessionManager>) -> Self {
        Self::with_config(store, sessions, JobSchedulerConfig::default())
    }

    pub fn with_config(
        store: SharedStore,
        sessions: Arc<SessionManager>,
        config: JobSchedulerConfig,
    ) -> Self {
        Self {
            store,
            sessions,
            config,
        }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        tracing::info!("Job scheduler started");

        let mut session_interval = interval(self.config.session_sweep_interval);
        let mut reconciliation_interval = interval(self.config.reconciliation_interval);

        loop {
            tokio::select! {
                _ = session_interval.tick() => {
                    sweep_expired_sessions(&self.sessions);
                }
                _ = reconciliation_interval.tick() => {
                    if let Err(e) = reconcile_balances(&self.store).await {
                        tracing::error!(error = %e, "Balance reconciliation failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport {
            sessions_removed: sweep_expired_sessions(&self.sessions),
            ..Default::default()
        };

        match reconcile_balances(&self.store).await {
            Ok(drifts) => report.drifted_accounts = drifts.iter().map(|d| d.account_id).collect(),
            Err(e) => report.errors.push(format!("Balance reconciliation: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub sessions_removed: usize,
    pub drifted_accounts: Vec<i64>,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

//! Periodic sweep for executions that outlived the global timeout.
//!
//! Event-driven finalize handles the normal path; the reaper is the bound
//! that guarantees every execution still reaches a terminal state when a
//! trigger is lost or items sit parked forever behind a saturated tenant.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use pixora_db::repositories::ExecutionRepo;

use crate::coordinator::ExecutionCoordinator;

/// Run the timeout reaper loop until `cancel` is triggered.
pub async fn run(
    pool: PgPool,
    coordinator: Arc<ExecutionCoordinator>,
    execution_timeout: Duration,
    sweep_interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        execution_timeout_secs = execution_timeout.as_secs(),
        sweep_interval_secs = sweep_interval.as_secs(),
        "Timeout reaper started",
    );

    let mut interval = tokio::time::interval(sweep_interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Timeout reaper stopping");
                break;
            }
            _ = interval.tick() => {
                sweep(&pool, &coordinator, execution_timeout).await;
            }
        }
    }
}

/// One sweep: time out every execution older than the timeout.
async fn sweep(pool: &PgPool, coordinator: &ExecutionCoordinator, execution_timeout: Duration) {
    let cutoff = Utc::now()
        - chrono::Duration::from_std(execution_timeout).unwrap_or(chrono::Duration::minutes(30));

    let overdue = match ExecutionRepo::find_timed_out(pool, cutoff).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!(error = %e, "Reaper query failed");
            return;
        }
    };

    if overdue.is_empty() {
        tracing::debug!("Reaper sweep: nothing overdue");
        return;
    }

    tracing::warn!(count = overdue.len(), "Reaper sweep found overdue executions");
    for execution_id in overdue {
        if let Err(e) = coordinator.reap(execution_id).await {
            tracing::error!(execution_id, error = %e, "Failed to reap execution");
        }
    }
}

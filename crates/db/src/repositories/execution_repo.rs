//! Repository for the `executions` table.
//!
//! Uses `ExecutionStatus` from `models::status` for all transitions.
//! Every status write is a guarded UPDATE, so the monotonic lifecycle
//! holds even when the reaper, a finalizing worker, and a cancel request
//! race each other.

use sqlx::PgPool;

use pixora_core::types::{DbId, Timestamp};
use pixora_core::workflow::WorkItemSpec;

use crate::models::execution::{Execution, ExecutionFinancials, ItemStatusCounts};
use crate::models::status::{ExecutionStatus, ItemStatus};

/// Column list for `executions` queries.
const COLUMNS: &str = "\
    id, workflow_id, client_id, status_id, input_spec, output_summary, \
    error_message, triggered_by, retry_count, \
    started_at, completed_at, duration_secs, created_at, updated_at";

/// Provides lifecycle operations for executions.
pub struct ExecutionRepo;

impl ExecutionRepo {
    /// Create an execution and all of its items in one transaction.
    ///
    /// The item set is fixed here and never grows afterwards. Returns the
    /// execution row plus the generated item ids in index order.
    pub async fn create_with_items(
        pool: &PgPool,
        client_id: DbId,
        workflow_id: DbId,
        triggered_by: Option<DbId>,
        input_spec: &serde_json::Value,
        items: &[WorkItemSpec],
    ) -> Result<(Execution, Vec<DbId>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO executions (workflow_id, client_id, status_id, input_spec, triggered_by) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        let execution = sqlx::query_as::<_, Execution>(&query)
            .bind(workflow_id)
            .bind(client_id)
            .bind(ExecutionStatus::Pending.id())
            .bind(input_spec)
            .bind(triggered_by)
            .fetch_one(&mut *tx)
            .await?;

        let mut item_ids = Vec::with_capacity(items.len());
        for (index, spec) in items.iter().enumerate() {
            let spec_json =
                serde_json::to_value(spec).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
            let item_id: DbId = sqlx::query_scalar(
                "INSERT INTO execution_items (execution_id, item_index, status_id, spec) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id",
            )
            .bind(execution.id)
            .bind(index as i32)
            .bind(ItemStatus::Pending.id())
            .bind(&spec_json)
            .fetch_one(&mut *tx)
            .await?;
            item_ids.push(item_id);
        }

        tx.commit().await?;
        Ok((execution, item_ids))
    }

    /// Find an execution by id, scoped to a tenant.
    ///
    /// Another tenant's execution is indistinguishable from a missing one.
    pub async fn find_for_client(
        pool: &PgPool,
        execution_id: DbId,
        client_id: DbId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM executions WHERE id = $1 AND client_id = $2");
        sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(client_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an execution by id without tenant scoping (engine internal).
    pub async fn find_by_id(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM executions WHERE id = $1");
        sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .fetch_optional(pool)
            .await
    }

    /// Flip a pending execution to processing when its first item starts.
    ///
    /// Guarded on the pending status, so concurrent item starts race
    /// harmlessly. Returns `true` for the one caller that won.
    pub async fn mark_processing(pool: &PgPool, execution_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE executions \
             SET status_id = $2, started_at = NOW() \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(execution_id)
        .bind(ExecutionStatus::Processing.id())
        .bind(ExecutionStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the terminal state of an execution.
    ///
    /// Guarded on non-terminal status: when several finalizers race (last
    /// two items settling together, or the reaper), exactly one UPDATE
    /// wins. Returns `true` for the winner so events fire exactly once.
    ///
    /// `duration_secs` is computed from `started_at`; an execution whose
    /// items were all cancelled before any started has no duration.
    pub async fn finalize(
        pool: &PgPool,
        execution_id: DbId,
        status: ExecutionStatus,
        output_summary: &serde_json::Value,
        error_message: Option<&str>,
        retry_count: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE executions \
             SET status_id = $2, output_summary = $3, error_message = $4, \
                 retry_count = $5, completed_at = NOW(), \
                 duration_secs = EXTRACT(EPOCH FROM NOW() - started_at)::INTEGER \
             WHERE id = $1 AND status_id IN ($6, $7)",
        )
        .bind(execution_id)
        .bind(status.id())
        .bind(output_summary)
        .bind(error_message)
        .bind(retry_count as i32)
        .bind(ExecutionStatus::Pending.id())
        .bind(ExecutionStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Tally this execution's items by status.
    pub async fn item_status_counts(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<ItemStatusCounts, sqlx::Error> {
        sqlx::query_as::<_, ItemStatusCounts>(
            "SELECT \
                 COUNT(*) FILTER (WHERE status_id = $2) AS pending, \
                 COUNT(*) FILTER (WHERE status_id = $3) AS processing, \
                 COUNT(*) FILTER (WHERE status_id = $4) AS completed, \
                 COUNT(*) FILTER (WHERE status_id = $5) AS failed \
             FROM execution_items WHERE execution_id = $1",
        )
        .bind(execution_id)
        .bind(ItemStatus::Pending.id())
        .bind(ItemStatus::Processing.id())
        .bind(ItemStatus::Completed.id())
        .bind(ItemStatus::Failed.id())
        .fetch_one(pool)
        .await
    }

    /// Sum cost, revenue, and retries over this execution's items.
    pub async fn financials(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<ExecutionFinancials, sqlx::Error> {
        sqlx::query_as::<_, ExecutionFinancials>(
            "SELECT \
                 COALESCE(SUM(cost_cents), 0)::BIGINT AS total_cost_cents, \
                 COALESCE(SUM(revenue_cents), 0)::BIGINT AS total_revenue_cents, \
                 COALESCE(SUM(retry_count), 0)::BIGINT AS total_retries \
             FROM execution_items WHERE execution_id = $1",
        )
        .bind(execution_id)
        .fetch_one(pool)
        .await
    }

    /// Ids of non-terminal executions created before `cutoff`.
    ///
    /// Used by the timeout reaper: these runs have exceeded the global
    /// execution timeout and must be driven to a terminal state.
    pub async fn find_timed_out(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM executions \
             WHERE status_id IN ($1, $2) AND created_at < $3 \
             ORDER BY created_at ASC",
        )
        .bind(ExecutionStatus::Pending.id())
        .bind(ExecutionStatus::Processing.id())
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }

    /// Ids of all non-terminal executions (startup recovery).
    pub async fn find_incomplete(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT id FROM executions WHERE status_id IN ($1, $2) ORDER BY created_at ASC",
        )
        .bind(ExecutionStatus::Pending.id())
        .bind(ExecutionStatus::Processing.id())
        .fetch_all(pool)
        .await
    }
}

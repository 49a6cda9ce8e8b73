//! Repository for the `execution_items` table.
//!
//! The claim/complete/fail transitions are all compare-and-swap UPDATEs
//! keyed on the current status. A worker that loses the claim race, or is
//! handed an already-terminal item after a crash-recovery requeue, observes
//! zero affected rows and treats the delivery as a no-op. This is what
//! makes re-delivery idempotent (no duplicate uploads, no duplicate cost).

use sqlx::PgPool;

use pixora_core::types::DbId;

use crate::models::item::ExecutionItem;
use crate::models::status::ItemStatus;

/// Column list for `execution_items` queries.
const COLUMNS: &str = "\
    id, execution_id, item_index, status_id, spec, result_reference, \
    error_message, cost_cents, revenue_cents, retry_count, \
    claimed_at, completed_at, created_at, updated_at";

/// Provides claim and outcome operations for execution items.
pub struct ItemRepo;

impl ItemRepo {
    /// Atomically claim a pending item for processing.
    ///
    /// Returns `None` when the item is already claimed or terminal; the
    /// caller must then drop the delivery without side effects.
    pub async fn claim(pool: &PgPool, item_id: DbId) -> Result<Option<ExecutionItem>, sqlx::Error> {
        let query = format!(
            "UPDATE execution_items \
             SET status_id = $2, claimed_at = NOW() \
             WHERE id = $1 AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ExecutionItem>(&query)
            .bind(item_id)
            .bind(ItemStatus::Processing.id())
            .bind(ItemStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Record a successful item: artifact reference, price, retry count.
    ///
    /// Only valid from `processing`; a terminal row is never overwritten.
    pub async fn complete(
        pool: &PgPool,
        item_id: DbId,
        result_reference: &str,
        cost_cents: i64,
        revenue_cents: i64,
        retry_count: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE execution_items \
             SET status_id = $2, result_reference = $3, cost_cents = $4, \
                 revenue_cents = $5, retry_count = $6, completed_at = NOW() \
             WHERE id = $1 AND status_id = $7",
        )
        .bind(item_id)
        .bind(ItemStatus::Completed.id())
        .bind(result_reference)
        .bind(cost_cents)
        .bind(revenue_cents)
        .bind(retry_count)
        .bind(ItemStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record a failed item with its error message preserved verbatim.
    ///
    /// `cost_cents` is non-zero when the provider call succeeded but the
    /// artifact could not be stored and the deployment charges for that.
    pub async fn fail(
        pool: &PgPool,
        item_id: DbId,
        error_message: &str,
        cost_cents: i64,
        retry_count: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE execution_items \
             SET status_id = $2, error_message = $3, cost_cents = $4, \
                 retry_count = $5, completed_at = NOW() \
             WHERE id = $1 AND status_id IN ($6, $7)",
        )
        .bind(item_id)
        .bind(ItemStatus::Failed.id())
        .bind(error_message)
        .bind(cost_cents)
        .bind(retry_count)
        .bind(ItemStatus::Pending.id())
        .bind(ItemStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Return a processing item to pending with its retry count bumped.
    ///
    /// SystemFault recovery path: the worker holding the item crashed or
    /// errored before reaching a terminal write.
    pub async fn release(pool: &PgPool, item_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE execution_items \
             SET status_id = $2, claimed_at = NULL, retry_count = retry_count + 1 \
             WHERE id = $1 AND status_id = $3",
        )
        .bind(item_id)
        .bind(ItemStatus::Pending.id())
        .bind(ItemStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fail every still-pending item of an execution with the given reason.
    ///
    /// In-flight (processing) items are untouched and run to completion.
    /// Returns how many items were cancelled.
    pub async fn cancel_pending(
        pool: &PgPool,
        execution_id: DbId,
        reason: &str,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE execution_items \
             SET status_id = $2, error_message = $3, completed_at = NOW() \
             WHERE execution_id = $1 AND status_id = $4",
        )
        .bind(execution_id)
        .bind(ItemStatus::Failed.id())
        .bind(reason)
        .bind(ItemStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Reset processing items orphaned by a crash back to pending.
    ///
    /// Startup-only: while the process is running, every processing item is
    /// held by a live worker. Returns the affected item ids.
    pub async fn reset_orphaned(pool: &PgPool) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE execution_items \
             SET status_id = $1, claimed_at = NULL, retry_count = retry_count + 1 \
             WHERE status_id = $2 \
             RETURNING id",
        )
        .bind(ItemStatus::Pending.id())
        .bind(ItemStatus::Processing.id())
        .fetch_all(pool)
        .await
    }

    /// Find an item by id.
    pub async fn find_by_id(
        pool: &PgPool,
        item_id: DbId,
    ) -> Result<Option<ExecutionItem>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM execution_items WHERE id = $1");
        sqlx::query_as::<_, ExecutionItem>(&query)
            .bind(item_id)
            .fetch_optional(pool)
            .await
    }

    /// All items of an execution in index order.
    pub async fn list_for_execution(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<Vec<ExecutionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM execution_items \
             WHERE execution_id = $1 ORDER BY item_index ASC"
        );
        sqlx::query_as::<_, ExecutionItem>(&query)
            .bind(execution_id)
            .fetch_all(pool)
            .await
    }

    /// Pending items of an execution in index order (startup recovery).
    pub async fn list_pending_for_execution(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<Vec<ExecutionItem>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM execution_items \
             WHERE execution_id = $1 AND status_id = $2 ORDER BY item_index ASC"
        );
        sqlx::query_as::<_, ExecutionItem>(&query)
            .bind(execution_id)
            .bind(ItemStatus::Pending.id())
            .fetch_all(pool)
            .await
    }
}

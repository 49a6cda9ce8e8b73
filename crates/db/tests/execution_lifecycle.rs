//! Integration tests for the execution and item repositories.
//!
//! Exercises the guarded UPDATE paths against a real database:
//! - Atomic item claim and redelivery no-ops
//! - Terminal writes never overwriting terminal rows
//! - Exactly-one-winner finalize under repeated calls
//! - Cancellation scoped to pending items
//! - Crash-recovery resets

use sqlx::PgPool;

use pixora_core::workflow::{AspectRatio, OutputFormat, Resolution, WorkItemSpec};
use pixora_db::models::status::{ExecutionStatus, ItemStatus};
use pixora_db::repositories::{ExecutionRepo, ItemRepo};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_client(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO clients (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn seed_workflow(pool: &PgPool) -> i64 {
    let config = serde_json::json!({
        "kind": "nano_banana",
        "tier": "pro",
        "pricing": {
            "cost": { "schedule": "flat", "cost_cents": 12 },
            "revenue_cents": 50,
        },
        "limits": { "max_items": 50, "max_reference_images": 4 },
    });
    sqlx::query_scalar("INSERT INTO workflows (name, kind, config) VALUES ($1, $2, $3) RETURNING id")
        .bind("Banana Batch")
        .bind("nano_banana")
        .bind(config)
        .fetch_one(pool)
        .await
        .unwrap()
}

fn spec(prompt: &str) -> WorkItemSpec {
    WorkItemSpec {
        prompt: Some(prompt.to_string()),
        source_image: None,
        reference_images: vec![],
        resolution: Resolution::R1k,
        aspect_ratio: AspectRatio::Square,
        output_format: OutputFormat::Png,
    }
}

/// Create an execution with `n` items, returning (execution_id, item_ids).
async fn seed_execution(pool: &PgPool, client_id: i64, n: usize) -> (i64, Vec<i64>) {
    let workflow_id = seed_workflow(pool).await;
    let items: Vec<WorkItemSpec> = (0..n).map(|i| spec(&format!("item {i}"))).collect();
    let input_spec = serde_json::json!({ "items": items });
    let (execution, item_ids) =
        ExecutionRepo::create_with_items(pool, client_id, workflow_id, None, &input_spec, &items)
            .await
            .unwrap();
    (execution.id, item_ids)
}

// ---------------------------------------------------------------------------
// Test: Claim is atomic, second delivery misses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_claim_wins_once(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (_, item_ids) = seed_execution(&pool, client_id, 1).await;
    let item_id = item_ids[0];

    let claimed = ItemRepo::claim(&pool, item_id).await.unwrap();
    let item = claimed.expect("first claim should win");
    assert_eq!(item.status_id, ItemStatus::Processing.id());
    assert!(item.claimed_at.is_some());

    // A duplicate delivery loses the claim and must see None.
    let second = ItemRepo::claim(&pool, item_id).await.unwrap();
    assert!(second.is_none(), "second claim on a processing item must miss");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_claim_misses_on_terminal_item(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (_, item_ids) = seed_execution(&pool, client_id, 1).await;
    let item_id = item_ids[0];

    ItemRepo::claim(&pool, item_id).await.unwrap().unwrap();
    assert!(ItemRepo::complete(&pool, item_id, "artifacts/1.png", 12, 50, 0)
        .await
        .unwrap());

    // Redelivery after completion is a no-op: no claim, no rewrite.
    assert!(ItemRepo::claim(&pool, item_id).await.unwrap().is_none());

    let item = ItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.status_id, ItemStatus::Completed.id());
    assert_eq!(item.cost_cents, 12);
    assert_eq!(item.revenue_cents, 50);
}

// ---------------------------------------------------------------------------
// Test: Terminal item rows are never overwritten
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_complete_requires_processing_status(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (_, item_ids) = seed_execution(&pool, client_id, 1).await;
    let item_id = item_ids[0];

    // Still pending: complete must not apply.
    assert!(!ItemRepo::complete(&pool, item_id, "ref", 1, 2, 0).await.unwrap());

    ItemRepo::claim(&pool, item_id).await.unwrap().unwrap();
    assert!(ItemRepo::fail(&pool, item_id, "boom", 0, 1).await.unwrap());

    // Failed is terminal: neither write applies afterwards.
    assert!(!ItemRepo::complete(&pool, item_id, "ref", 1, 2, 0).await.unwrap());
    assert!(!ItemRepo::fail(&pool, item_id, "again", 0, 2).await.unwrap());

    let item = ItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.error_message.as_deref(), Some("boom"));
    assert_eq!(item.retry_count, 1);
}

// ---------------------------------------------------------------------------
// Test: Finalize picks exactly one winner
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_finalize_wins_exactly_once(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (execution_id, item_ids) = seed_execution(&pool, client_id, 1).await;

    assert!(ExecutionRepo::mark_processing(&pool, execution_id).await.unwrap());
    // Second start notification races harmlessly.
    assert!(!ExecutionRepo::mark_processing(&pool, execution_id).await.unwrap());

    ItemRepo::claim(&pool, item_ids[0]).await.unwrap().unwrap();
    ItemRepo::complete(&pool, item_ids[0], "artifacts/0.png", 12, 50, 0)
        .await
        .unwrap();

    let summary = serde_json::json!({ "total_items": 1, "completed_items": 1 });
    let first = ExecutionRepo::finalize(
        &pool,
        execution_id,
        ExecutionStatus::Completed,
        &summary,
        None,
        0,
    )
    .await
    .unwrap();
    assert!(first, "first finalize must win");

    // A racing finalizer (or the reaper) loses and must not rewrite the row.
    let second = ExecutionRepo::finalize(
        &pool,
        execution_id,
        ExecutionStatus::Failed,
        &summary,
        Some("late loser"),
        9,
    )
    .await
    .unwrap();
    assert!(!second, "second finalize must lose");

    let execution = ExecutionRepo::find_by_id(&pool, execution_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(execution.status_id, ExecutionStatus::Completed.id());
    assert!(execution.error_message.is_none());
    assert!(execution.completed_at.is_some());
}

// ---------------------------------------------------------------------------
// Test: Status counts and financial aggregation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_counts_and_financials_aggregate_items(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (execution_id, item_ids) = seed_execution(&pool, client_id, 3).await;

    ItemRepo::claim(&pool, item_ids[0]).await.unwrap().unwrap();
    ItemRepo::complete(&pool, item_ids[0], "artifacts/0.png", 12, 50, 2)
        .await
        .unwrap();
    ItemRepo::claim(&pool, item_ids[1]).await.unwrap().unwrap();
    ItemRepo::fail(&pool, item_ids[1], "provider said no", 0, 1)
        .await
        .unwrap();

    let counts = ExecutionRepo::item_status_counts(&pool, execution_id)
        .await
        .unwrap();
    assert_eq!(counts.pending, 1);
    assert_eq!(counts.completed, 1);
    assert_eq!(counts.failed, 1);
    assert_eq!(counts.total(), 3);
    assert!(!counts.all_terminal());

    let financials = ExecutionRepo::financials(&pool, execution_id).await.unwrap();
    assert_eq!(financials.total_cost_cents, 12);
    assert_eq!(financials.total_revenue_cents, 50);
    assert_eq!(financials.total_retries, 3);
}

// ---------------------------------------------------------------------------
// Test: cancel_pending leaves in-flight items alone
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_cancel_pending_skips_processing_items(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (execution_id, item_ids) = seed_execution(&pool, client_id, 3).await;

    ItemRepo::claim(&pool, item_ids[0]).await.unwrap().unwrap();

    let cancelled = ItemRepo::cancel_pending(&pool, execution_id, "cancelled")
        .await
        .unwrap();
    assert_eq!(cancelled, 2, "only the two pending items cancel");

    let in_flight = ItemRepo::find_by_id(&pool, item_ids[0]).await.unwrap().unwrap();
    assert_eq!(in_flight.status_id, ItemStatus::Processing.id());

    let cancelled_item = ItemRepo::find_by_id(&pool, item_ids[1]).await.unwrap().unwrap();
    assert_eq!(cancelled_item.status_id, ItemStatus::Failed.id());
    assert_eq!(cancelled_item.error_message.as_deref(), Some("cancelled"));
}

// ---------------------------------------------------------------------------
// Test: Release and orphan reset bump the retry counter
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_release_returns_item_to_pending(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (_, item_ids) = seed_execution(&pool, client_id, 1).await;
    let item_id = item_ids[0];

    ItemRepo::claim(&pool, item_id).await.unwrap().unwrap();
    assert!(ItemRepo::release(&pool, item_id).await.unwrap());

    let item = ItemRepo::find_by_id(&pool, item_id).await.unwrap().unwrap();
    assert_eq!(item.status_id, ItemStatus::Pending.id());
    assert!(item.claimed_at.is_none());
    assert_eq!(item.retry_count, 1);

    // The released item is claimable again.
    assert!(ItemRepo::claim(&pool, item_id).await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_reset_orphaned_recovers_processing_items(pool: PgPool) {
    let client_id = seed_client(&pool, "acme").await;
    let (_, item_ids) = seed_execution(&pool, client_id, 2).await;

    ItemRepo::claim(&pool, item_ids[0]).await.unwrap().unwrap();

    let reset = ItemRepo::reset_orphaned(&pool).await.unwrap();
    assert_eq!(reset, vec![item_ids[0]]);

    let item = ItemRepo::find_by_id(&pool, item_ids[0]).await.unwrap().unwrap();
    assert_eq!(item.status_id, ItemStatus::Pending.id());
    assert_eq!(item.retry_count, 1);
}

// ---------------------------------------------------------------------------
// Test: Tenant scoping on reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn test_find_for_client_hides_other_tenants(pool: PgPool) {
    let owner = seed_client(&pool, "owner").await;
    let other = seed_client(&pool, "other").await;
    let (execution_id, _) = seed_execution(&pool, owner, 1).await;

    assert!(ExecutionRepo::find_for_client(&pool, execution_id, owner)
        .await
        .unwrap()
        .is_some());
    assert!(ExecutionRepo::find_for_client(&pool, execution_id, other)
        .await
        .unwrap()
        .is_none());
}

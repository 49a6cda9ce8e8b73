//! Handlers for execution submission, polling, results, and cancellation.
//!
//! Every read is scoped by the caller's tenant; an execution owned by a
//! different tenant is reported as not found, never as forbidden, so
//! existence does not leak across tenants.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use pixora_core::error::CoreError;
use pixora_core::types::{DbId, Timestamp};
use pixora_db::models::execution::{Execution, SubmitExecution};
use pixora_db::models::status::{ExecutionStatus, ItemStatus};
use pixora_db::repositories::{ExecutionRepo, ItemRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::tenant::ClientContext;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub execution_id: DbId,
}

/// Polling document for one execution.
#[derive(Debug, Serialize)]
pub struct ExecutionStatusDoc {
    pub execution_id: DbId,
    pub workflow_id: DbId,
    pub status: &'static str,
    pub items: ItemCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_summary: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub duration_secs: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ItemCounts {
    pub total: i64,
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

/// One item in the batch-results view. Pricing is deliberately absent:
/// billing figures are an internal concern, not a delivery artifact.
#[derive(Debug, Serialize)]
pub struct ItemResult {
    pub item_index: i32,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BatchResults {
    pub execution_id: DbId,
    pub results: Vec<ItemResult>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch an execution scoped to the caller's tenant, or 404.
async fn find_owned(
    pool: &sqlx::PgPool,
    execution_id: DbId,
    client: &ClientContext,
) -> AppResult<Execution> {
    ExecutionRepo::find_for_client(pool, execution_id, client.client_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "execution",
            id: execution_id,
        }))
}

fn status_name(status_id: i16) -> &'static str {
    ExecutionStatus::from_id(status_id).map_or("unknown", |s| s.name())
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// POST /api/v1/workflows/{workflow_id}/execute
///
/// Accept an execution request of 1..N items. Returns 202 immediately with
/// the execution id; the caller polls for progress.
pub async fn submit_execution(
    client: ClientContext,
    State(state): State<AppState>,
    Path(workflow_id): Path<DbId>,
    Json(input): Json<SubmitExecution>,
) -> AppResult<impl IntoResponse> {
    let execution = state
        .coordinator
        .submit(client.client_id, workflow_id, client.user_id, input.items)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(DataResponse {
            data: SubmitResponse {
                execution_id: execution.id,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Poll
// ---------------------------------------------------------------------------

/// GET /api/v1/executions/{execution_id}
///
/// Idempotent status poll. Safe to call at any frequency; it reads, never
/// advances, the execution.
pub async fn get_execution(
    client: ClientContext,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let execution = find_owned(&state.pool, execution_id, &client).await?;
    let counts = ExecutionRepo::item_status_counts(&state.pool, execution_id).await?;

    let doc = ExecutionStatusDoc {
        execution_id: execution.id,
        workflow_id: execution.workflow_id,
        status: status_name(execution.status_id),
        items: ItemCounts {
            total: counts.total(),
            pending: counts.pending,
            processing: counts.processing,
            completed: counts.completed,
            failed: counts.failed,
        },
        output_summary: execution.output_summary,
        error_message: execution.error_message,
        retry_count: execution.retry_count,
        created_at: execution.created_at,
        started_at: execution.started_at,
        completed_at: execution.completed_at,
        duration_secs: execution.duration_secs,
    };

    Ok(Json(DataResponse { data: doc }))
}

// ---------------------------------------------------------------------------
// Batch results
// ---------------------------------------------------------------------------

/// GET /api/v1/workflows/executions/{execution_id}/batch-results
///
/// Per-item outcomes in item order: status, artifact reference, error.
pub async fn batch_results(
    client: ClientContext,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let execution = find_owned(&state.pool, execution_id, &client).await?;
    let items = ItemRepo::list_for_execution(&state.pool, execution.id).await?;

    let results = items
        .into_iter()
        .map(|item| ItemResult {
            item_index: item.item_index,
            status: ItemStatus::from_id(item.status_id).map_or("unknown", |s| s.name()),
            result_reference: item.result_reference,
            error_message: item.error_message,
        })
        .collect();

    Ok(Json(DataResponse {
        data: BatchResults {
            execution_id: execution.id,
            results,
        },
    }))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// POST /api/v1/executions/{execution_id}/cancel
///
/// Cancel a non-terminal execution. Pending items fail with reason
/// `cancelled`; in-flight items run to completion. 409 when already
/// terminal.
pub async fn cancel_execution(
    client: ClientContext,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    state
        .coordinator
        .cancel(execution_id, client.client_id)
        .await?;

    tracing::info!(execution_id, client_id = client.client_id, "Execution cancelled");
    Ok(StatusCode::NO_CONTENT)
}

//! Execution item entity model.

use serde::Serialize;
use sqlx::FromRow;

use pixora_core::types::{DbId, Timestamp};

use super::status::StatusId;

/// A row from the `execution_items` table: one unit of work inside an
/// execution.
///
/// The item set of an execution is fixed at creation time; rows are only
/// ever mutated by the worker that claimed them and never after reaching a
/// terminal status.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ExecutionItem {
    pub id: DbId,
    pub execution_id: DbId,
    /// Position within the execution, 0-based. Dispatch follows this order.
    pub item_index: i32,
    pub status_id: StatusId,
    /// The `WorkItemSpec` for this item, verbatim from the submission.
    pub spec: serde_json::Value,
    /// Storage reference of the generated artifact, set on completion.
    pub result_reference: Option<String>,
    /// Last provider/storage error, preserved verbatim for diagnosis.
    pub error_message: Option<String>,
    pub cost_cents: i64,
    pub revenue_cents: i64,
    pub retry_count: i32,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

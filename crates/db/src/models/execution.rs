//! Execution entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use pixora_core::types::{DbId, Timestamp};
use pixora_core::workflow::WorkItemSpec;

use super::status::StatusId;

/// A row from the `executions` table: one client-initiated workflow run.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Execution {
    pub id: DbId,
    pub workflow_id: DbId,
    pub client_id: DbId,
    pub status_id: StatusId,
    /// The submitted request payload, verbatim.
    pub input_spec: serde_json::Value,
    /// Aggregate counts and financials, written once at finalize.
    pub output_summary: Option<serde_json::Value>,
    pub error_message: Option<String>,
    /// User within the client organization that triggered the run.
    pub triggered_by: Option<DbId>,
    /// Sum of item retry counts, written at finalize.
    pub retry_count: i32,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub duration_secs: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Body of `POST /workflows/{workflow_id}/execute`.
#[derive(Debug, Deserialize)]
pub struct SubmitExecution {
    pub items: Vec<WorkItemSpec>,
}

/// Per-status item tallies for one execution.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct ItemStatusCounts {
    pub pending: i64,
    pub processing: i64,
    pub completed: i64,
    pub failed: i64,
}

impl ItemStatusCounts {
    /// True once no item can still change state.
    pub fn all_terminal(&self) -> bool {
        self.pending == 0 && self.processing == 0
    }

    pub fn total(&self) -> i64 {
        self.pending + self.processing + self.completed + self.failed
    }
}

/// Aggregate financials over one execution's items.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct ExecutionFinancials {
    pub total_cost_cents: i64,
    pub total_revenue_cents: i64,
    pub total_retries: i64,
}

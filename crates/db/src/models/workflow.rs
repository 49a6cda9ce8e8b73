//! Workflow template entity model.

use serde::Serialize;
use sqlx::FromRow;

use pixora_core::types::{DbId, Timestamp};

/// A row from the `workflows` table: tenant-agnostic template configuration.
///
/// Owned by the administrative subsystem; the engine only ever reads these
/// rows. `config` is parsed into `pixora_core::workflow::WorkflowConfig`
/// once per submission.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Workflow {
    pub id: DbId,
    pub name: String,
    /// Workflow kind: `nano_banana`, `room_redesign`, `smart_resize`.
    pub kind: String,
    pub config: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

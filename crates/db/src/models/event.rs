//! Event entity model for the durable activity feed.

use serde::Serialize;
use sqlx::FromRow;

use pixora_core::types::{DbId, Timestamp};

/// A row from the `events` table: one observed state transition.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Event {
    pub id: DbId,
    /// Dot-separated event name, e.g. `"execution.completed"`.
    pub event_type: String,
    pub source_entity_type: Option<String>,
    pub source_entity_id: Option<DbId>,
    /// Tenant the event belongs to.
    pub client_id: Option<DbId>,
    pub triggered_by: Option<DbId>,
    pub payload: serde_json::Value,
    pub created_at: Timestamp,
}

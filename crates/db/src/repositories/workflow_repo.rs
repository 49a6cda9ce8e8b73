//! Repository for the `workflows` table.
//!
//! Workflow templates are owned by the administrative subsystem; the
//! engine only reads them.

use sqlx::PgPool;

use pixora_core::types::DbId;

use crate::models::workflow::Workflow;

/// Column list for `workflows` queries.
const COLUMNS: &str = "id, name, kind, config, created_at, updated_at";

/// Read-only access to workflow templates.
pub struct WorkflowRepo;

impl WorkflowRepo {
    /// Find a workflow template by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Workflow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM workflows WHERE id = $1");
        sqlx::query_as::<_, Workflow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

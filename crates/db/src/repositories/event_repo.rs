//! Repository for the `events` table.

use sqlx::PgPool;

use pixora_core::types::DbId;

use crate::models::event::Event;

/// Column list for `events` queries.
const COLUMNS: &str = "\
    id, event_type, source_entity_type, source_entity_id, client_id, \
    triggered_by, payload, created_at";

/// Append-only access to the durable event feed.
pub struct EventRepo;

impl EventRepo {
    /// Insert a new event row, returning the generated id.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &PgPool,
        event_type: &str,
        source_entity_type: Option<&str>,
        source_entity_id: Option<DbId>,
        client_id: Option<DbId>,
        triggered_by: Option<DbId>,
        payload: &serde_json::Value,
    ) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO events \
                 (event_type, source_entity_type, source_entity_id, client_id, triggered_by, payload) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id",
        )
        .bind(event_type)
        .bind(source_entity_type)
        .bind(source_entity_id)
        .bind(client_id)
        .bind(triggered_by)
        .bind(payload)
        .fetch_one(pool)
        .await
    }

    /// List recent events for a tenant, newest first.
    pub async fn list_for_client(
        pool: &PgPool,
        client_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM events \
             WHERE client_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Event>(&query)
            .bind(client_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}

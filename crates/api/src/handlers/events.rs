//! Handler for the tenant activity feed.
//!
//! The feed is the read side of the durable event log: every submission,
//! item outcome, and terminal transition lands here via the persistence
//! task, scoped to the requesting tenant.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use pixora_db::repositories::EventRepo;

use crate::error::AppResult;
use crate::middleware::tenant::ClientContext;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

/// Query parameters for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    /// Page size, capped server-side.
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/events
///
/// Recent events for the caller's tenant, newest first.
pub async fn list_events(
    client: ClientContext,
    State(state): State<AppState>,
    Query(params): Query<FeedQuery>,
) -> AppResult<impl IntoResponse> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let events = EventRepo::list_for_client(&state.pool, client.client_id, limit, offset).await?;
    Ok(Json(DataResponse { data: events }))
}

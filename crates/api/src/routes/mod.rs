pub mod events;
pub mod executions;
pub mod health;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /workflows/{workflow_id}/execute                 submit execution (POST, 202)
/// /workflows/executions/{execution_id}/batch-results  per-item results (GET)
///
/// /executions/{execution_id}                       poll status (GET)
/// /executions/{execution_id}/cancel                cancel (POST, 204)
///
/// /events                                          tenant activity feed (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/workflows", workflows::router())
        .nest("/executions", executions::router())
        .nest("/events", events::router())
}

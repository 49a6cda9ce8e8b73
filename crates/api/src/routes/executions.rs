use axum::routing::{get, post};
use axum::Router;

use crate::handlers::executions;
use crate::state::AppState;

/// Routes mounted under `/api/v1/executions`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{execution_id}", get(executions::get_execution))
        .route("/{execution_id}/cancel", post(executions::cancel_execution))
}

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::executions;
use crate::state::AppState;

/// Routes mounted under `/api/v1/workflows`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{workflow_id}/execute", post(executions::submit_execution))
        .route(
            "/executions/{execution_id}/batch-results",
            get(executions::batch_results),
        )
}

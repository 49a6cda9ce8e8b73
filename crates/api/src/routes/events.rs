use axum::routing::get;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted under `/api/v1/events`.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(events::list_events))
}

use std::sync::Arc;

use pixora_engine::ExecutionCoordinator;
use pixora_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pixora_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Execution lifecycle coordinator (submission, cancellation).
    pub coordinator: Arc<ExecutionCoordinator>,
    /// Centralized event bus for publishing platform events.
    pub event_bus: EventBus,
}

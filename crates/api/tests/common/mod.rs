//! Shared fixtures for API integration tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;
use pixora_engine::{ExecutionCoordinator, WorkQueue};
use pixora_events::EventBus;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
    }
}

/// Build the full application router with all middleware layers.
///
/// Mirrors the construction in `main.rs` so tests exercise the same stack
/// production uses. No worker pool runs, so submitted items stay queued
/// and executions remain pending unless a test settles them directly.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let queue = Arc::new(WorkQueue::new(4));
    let event_bus = EventBus::default();
    let coordinator = Arc::new(ExecutionCoordinator::new(
        pool.clone(),
        queue,
        event_bus.clone(),
        3,
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        coordinator,
        event_bus,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// GET `uri` as the given tenant.
pub async fn get_as(app: Router, client_id: i64, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .header("x-client-id", client_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST `uri` with an empty body as the given tenant.
pub async fn post_as(app: Router, client_id: i64, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-client-id", client_id.to_string())
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a JSON body to `uri` as the given tenant.
pub async fn post_json_as(
    app: Router,
    client_id: i64,
    uri: &str,
    body: &serde_json::Value,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("x-client-id", client_id.to_string())
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Seed data
// ---------------------------------------------------------------------------

pub async fn seed_client(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("INSERT INTO clients (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn seed_workflow(pool: &PgPool) -> i64 {
    let config = serde_json::json!({
        "kind": "nano_banana",
        "tier": "pro",
        "pricing": {
            "cost": { "schedule": "flat", "cost_cents": 12 },
            "revenue_cents": 50,
        },
        "limits": { "max_items": 50, "max_reference_images": 4 },
    });
    sqlx::query_scalar("INSERT INTO workflows (name, kind, config) VALUES ($1, $2, $3) RETURNING id")
        .bind("Banana Batch")
        .bind("nano_banana")
        .bind(config)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// A submission body with `n` valid items.
pub fn submit_body(n: usize) -> serde_json::Value {
    let items: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "prompt": format!("banana {i}"),
                "resolution": "1k",
                "aspect_ratio": "square",
            })
        })
        .collect();
    serde_json::json!({ "items": items })
}

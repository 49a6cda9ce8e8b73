use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pixora_api::config::ServerConfig;
use pixora_api::router::build_app_router;
use pixora_api::state::AppState;
use pixora_engine::{
    reaper, EngineConfig, ExecutionCoordinator, FsArtifactStore, ItemProcessor, WorkQueue,
    WorkerPool,
};
use pixora_provider::HttpProvider;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pixora_api=debug,pixora_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let engine_config = EngineConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");
    tracing::info!(
        worker_count = engine_config.worker_count,
        per_tenant_ceiling = engine_config.per_tenant_ceiling,
        "Loaded engine configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = pixora_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    pixora_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    pixora_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = pixora_events::EventBus::default();

    // Spawn event persistence (writes all events to the database).
    let persistence_handle = tokio::spawn(pixora_events::EventPersistence::run(
        pool.clone(),
        event_bus.subscribe(),
    ));
    tracing::info!("Event bus and persistence started");

    // --- Engine ---
    let cancel = tokio_util::sync::CancellationToken::new();

    let queue = Arc::new(WorkQueue::new(engine_config.per_tenant_ceiling));
    let provider = Arc::new(HttpProvider::new(
        engine_config.provider_base_url.clone(),
        engine_config.provider_api_key.clone(),
    ));
    let store = Arc::new(FsArtifactStore::new(engine_config.artifact_root.clone()));

    let coordinator = Arc::new(ExecutionCoordinator::new(
        pool.clone(),
        Arc::clone(&queue),
        event_bus.clone(),
        engine_config.retry.max_retries,
    ));
    let processor = Arc::new(ItemProcessor::new(
        pool.clone(),
        provider,
        store,
        engine_config.retry.clone(),
        engine_config.charge_on_storage_failure,
    ));

    let worker_handles = WorkerPool::new(
        Arc::clone(&queue),
        processor,
        Arc::clone(&coordinator),
        engine_config.worker_count,
    )
    .spawn(cancel.clone());

    let reaper_handle = tokio::spawn(reaper::run(
        pool.clone(),
        Arc::clone(&coordinator),
        engine_config.execution_timeout,
        engine_config.reaper_interval,
        cancel.clone(),
    ));

    // Rebuild the queue from rows left over by the previous run.
    match coordinator.resume_incomplete().await {
        Ok(requeued) => tracing::info!(requeued, "Startup recovery complete"),
        Err(e) => tracing::error!(error = %e, "Startup recovery failed"),
    }

    // --- App state and router ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        coordinator: Arc::clone(&coordinator),
        event_bus: event_bus.clone(),
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Stop workers and the reaper; in-flight items finish first.
    cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    for handle in worker_handles {
        let _ = tokio::time::timeout(drain, handle).await;
    }
    let _ = tokio::time::timeout(Duration::from_secs(5), reaper_handle).await;
    tracing::info!("Engine stopped");

    // Drop the event bus sender to close the broadcast channel.
    // This signals the persistence task to shut down.
    drop(event_bus);
    drop(coordinator);
    let _ = tokio::time::timeout(Duration::from_secs(5), persistence_handle).await;
    tracing::info!("Event persistence shut down");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker, Kubernetes).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

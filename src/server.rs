use anyhow::{Context, Result};
use axum::{routing::{any, get}, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    audit::{AuditStore, AuditWriter},
    config::Config,
    handlers::{self, parse::AppState},
    metrics,
    signals::setup_signal_handlers,
};

/// Start the delog server
///
/// This function:
/// 1. Initializes metrics (if enabled)
/// 2. Sets up signal handlers for graceful shutdown
/// 3. Connects the audit store and ensures its schema
/// 4. Binds to the configured address and serves requests
/// 5. On shutdown, waits for in-flight audit inserts and closes the pool
pub async fn start_server(config: Config) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    // Setup signal handlers (SIGTERM, SIGINT for shutdown)
    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    info!(
        backend = config.database.backend_name(),
        "Connecting to audit database..."
    );
    let store = Arc::new(AuditStore::connect(&config.database).await?);
    let audit = AuditWriter::new(store.clone(), config.database.insert_timeout());

    let app_state = AppState {
        audit: audit.clone(),
        max_body_bytes: config.server.max_body_bytes,
    };
    let app = create_router(&config, app_state, metrics_handle);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .with_context(|| format!("Invalid server.host '{}'", config.server.host))?,
        config.server.port,
    ));

    info!("Starting delog on {}", addr);
    info!(
        "Submit endpoint: POST {} (max body {} bytes)",
        config.server.submit_path, config.server.max_body_bytes
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    // Serve with graceful shutdown; ConnectInfo supplies the remote address
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = shutdown_rx.recv().await;
        info!("Shutdown signal received, draining connections...");
    })
    .await?;

    signal_handle.await?;

    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    if !audit.shutdown(grace).await {
        warn!("Some audit records were not persisted before shutdown");
    }
    store.close().await;

    info!("Server stopped gracefully");
    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(
    config: &Config,
    app_state: AppState,
    metrics_handle: Option<Arc<PrometheusHandle>>,
) -> Router {
    // Any method is routed to the handler so rejections are audited
    let mut router = Router::new()
        .route(&config.server.submit_path, any(handlers::parse::handle_parse))
        .with_state(app_state)
        .route("/health", get(handlers::health::health_check));

    if let Some(handle) = metrics_handle {
        router = router.merge(
            Router::new()
                .route(&config.metrics.endpoint, get(handlers::metrics_handler::metrics))
                .with_state(handle),
        );
    }

    router.layer(TraceLayer::new_for_http())
}

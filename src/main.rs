use std::net::SocketAddr;

use axum::{Router, response::Html, routing::get};
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_scalar::Scalar;

use illuminance_plus::api_docs::ApiDoc;
use illuminance_plus::config::Config;
use illuminance_plus::routes::illuminance_routes::illuminance_routes;
use illuminance_plus::services::mqtt_service;
use illuminance_plus::shared_state::{AppState, PointRuntime, run_scheduler};

const DEFAULT_LOG_LEVEL: &str = if cfg!(feature = "verbose_log") { "debug" } else { "info" };

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    // 1. Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.json".to_string());
    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load {}: {}", config_path, e);
            return;
        }
    };
    info!("Configuration loaded: {} points", config.points.len());

    // 2. Initialize shared state
    let state = AppState::new(config.points.iter().map(PointRuntime::new).collect());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // 3. Start one scheduler per point
    let mut tasks = Vec::new();
    for point in state.points.iter() {
        info!(
            "Point {} ({:.4}, {:.4}) every {}s",
            point.id,
            point.latitude,
            point.longitude,
            point.config().scan_period_seconds
        );
        tasks.push(tokio::spawn(run_scheduler(point.clone(), shutdown_rx.clone())));
    }

    // 4. MQTT publisher
    tasks.push(tokio::spawn(mqtt_service::run_publisher(
        config.mqtt.clone(),
        state.clone(),
        shutdown_rx.clone(),
    )));

    // 5. Start Axum HTTP server
    let app = Router::new()
        .nest("/api", illuminance_routes(state.clone()))
        .route("/scalar", get(|| async { Html(Scalar::new(ApiDoc::openapi()).to_html()) }))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("API Server listening on http://{}", addr);
    info!("Scalar UI: http://{}/scalar", addr);

    let server = axum_server::bind(addr).serve(app.into_make_service());
    tokio::select! {
        result = server => {
            if let Err(e) = result {
                error!("HTTP server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }
    let _ = shutdown_tx.send(true);

    // Running refreshes finish; pending sleeps are cancelled
    for task in tasks {
        let _ = task.await;
    }
    info!("Stopped");
}

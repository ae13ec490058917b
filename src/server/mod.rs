//! HTTP facade: routing, CORS and the server lifecycle

pub mod api;
pub mod error;
pub mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Settings;
use crate::storage::{Janitor, JanitorHandle, TempStore};

pub use api::{ConversionResponse, HealthResponse};
pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

/// Room for multipart boundaries and the non-file form fields.
const FORM_OVERHEAD: usize = 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    let prefix = state.settings.api_prefix.clone();
    let body_limit = usize::try_from(state.settings.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);
    let cors = cors_layer(&state.settings);

    Router::new()
        .route("/", get(api::root))
        .route("/api/health", get(api::health_check))
        .route(&format!("{}/convert", prefix), post(api::convert_image))
        .route(&format!("{}/download/:filename", prefix), get(api::download_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if settings.allows_any_origin() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(origins))
}

/// Serves until SIGINT/SIGTERM, then stops the janitor.
pub async fn run(settings: Settings) -> Result<()> {
    let settings = Arc::new(settings);
    let store = TempStore::open(&settings.temp_dir)
        .with_context(|| format!("Failed to prepare temp directory {}", settings.temp_dir.display()))?;

    let janitor = JanitorHandle::start(Janitor::from_settings(store.clone(), &settings));
    let app = create_router(AppState::new(settings.clone(), store));

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    log::info!("{} listening on http://{}", settings.project_name, address);
    log::info!(
        "Temp directory: {} (retention {} min, cleanup {})",
        settings.temp_dir.display(),
        settings.file_retention_minutes,
        if settings.auto_cleanup { "on" } else { "off" }
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error");

    janitor.shutdown().await;
    log::info!("Server shut down");

    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("Shutdown signal received, finishing in-flight requests");
}

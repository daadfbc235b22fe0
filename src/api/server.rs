use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer, decompression::RequestDecompressionLayer, services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::{
    services::{
        full_token, health, list_folder, list_models, model_status, model_thumbnail,
        object_detail, upload_base64, upload_model, upload_to_folder, viewer_token,
    },
    state::AppState,
};
use crate::aps::{ApsClient, InMemoryPlatform};
use crate::config::Config;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Build the HTTP router for a wired application state
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;
    let static_dir = state.config.server.static_dir.clone();

    let api = Router::new()
        .route("/api/auth/token", get(viewer_token))
        .route("/api/auth/full_token", get(full_token))
        .route(
            "/api/files/{folder}",
            get(list_folder).post(upload_to_folder),
        )
        .route("/api/files/urn/{urn}/detail", get(object_detail))
        .route("/api/models", get(list_models).post(upload_model))
        .route("/api/models/upload-base64", post(upload_base64))
        .route("/api/models/{urn}/status", get(model_status))
        .route("/api/models/{urn}/detail", get(object_detail))
        .route("/api/models/{urn}/thumbnail", get(model_thumbnail))
        .route("/health", get(health))
        .with_state(state);

    let app = if static_dir.is_dir() {
        api.fallback_service(ServeDir::new(static_dir))
    } else {
        warn!(path = %static_dir.display(), "Static directory missing, serving API only");
        api
    };

    app.layer(DefaultBodyLimit::max(max_upload_bytes))
        // Automatically decompress gzip request bodies
        .layer(RequestDecompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Serve the gateway until a shutdown signal arrives.
///
/// `offline` swaps the live platform client for the in-memory one, which
/// needs no credentials.
pub async fn run(config: Config, address: SocketAddr, offline: bool) -> Result<(), AnyError> {
    let state = if offline {
        info!("Using in-memory platform");
        AppState::new(config, Arc::new(InMemoryPlatform::new()))
    } else {
        let settings = config
            .client_settings()
            .map_err(|e| format!("Failed to configure platform client: {}", e))?;
        info!(base_url = %settings.base_url, "Using live platform");
        let client = ApsClient::new(settings)?;
        AppState::new(config, Arc::new(client))
    };

    info!(bucket = %state.gateway.bucket(), "Gateway ready");
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "apsgate listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}

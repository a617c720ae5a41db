use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use detection_application::DetectDeepfakeUseCase;

pub mod error;
pub mod handlers;

pub use error::{error_mapper, HttpError};
pub use handlers::*;

#[derive(Clone)]
pub struct AppState {
    pub usecase: Arc<dyn DetectDeepfakeUseCase>,
}

impl AppState {
    pub fn new(usecase: Arc<dyn DetectDeepfakeUseCase>) -> Self {
        Self { usecase }
    }
}

pub fn create_app_routes(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/detect-deepfake", post(detect_deepfake))
        .route("/detect-deepfake-audio", post(detect_deepfake_audio))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn serve(router: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(address = %listener.local_addr()?, "detection http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    tracing::info!("shutdown signal received");
}

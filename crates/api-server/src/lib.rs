//! REST API Server for Video Object Tracking
//!
//! Exposes the tracking pipeline over HTTP:
//! - `POST /track`: multipart upload + initial box, returns the annotated
//!   video
//! - `POST /track-url`: JSON with a video URL, returns the video base64
//!   encoded
//! - `GET /health`: model/GPU status
//! - `GET /info`: capability and usage description

mod download;
mod handlers;
mod types;

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use visiotrack_tracker::TrackerService;
use visiotrack_transcode::FfmpegEncoder;

pub use handlers::*;
pub use types::*;

/// Uploads beyond this size are rejected by the extractor
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

/// API server state shared across handlers
#[derive(Clone)]
pub struct ApiState {
    /// Shared tracker model service
    pub tracker: Arc<TrackerService>,
    /// Final-pass encoder
    pub encoder: Arc<FfmpegEncoder>,
    /// Directory for request-scoped temp files
    pub scratch_dir: PathBuf,
}

impl ApiState {
    /// Create new API state
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            tracker: Arc::new(TrackerService::new(model_path)),
            encoder: Arc::new(FfmpegEncoder),
            scratch_dir: scratch_dir.into(),
        }
    }
}

/// Build the API router with all endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Tracking endpoints
        .route("/track", post(track_video))
        .route("/track-url", post(track_video_url))
        // Usage description
        .route("/info", get(service_info))
        // Middleware
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server
pub async fn start_server(addr: &str, state: ApiState) -> Result<(), std::io::Error> {
    tracing::info!("Starting API server on {}", addr);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_state_creation() {
        let state = ApiState::new("models/tracker.onnx", "/tmp");
        assert!(!state.tracker.is_loaded());
        assert_eq!(state.scratch_dir, PathBuf::from("/tmp"));
    }
}

//! API Server Binary Entry Point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use visiotrack_api_server::{start_server, ApiState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visiotrack_api_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration from environment
    let addr = std::env::var("VISIOTRACK_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let model_path =
        std::env::var("VISIOTRACK_MODEL_PATH").unwrap_or_else(|_| "models/tracker.onnx".to_string());
    let scratch_dir = std::env::var("VISIOTRACK_SCRATCH_DIR")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir());

    std::fs::create_dir_all(&scratch_dir)?;

    // Create API state
    let state = ApiState::new(model_path, scratch_dir);

    // Warm the model so the first request does not pay the load cost;
    // failure is logged and retried on first use
    if let Err(e) = state.tracker.preload() {
        tracing::error!("Failed to load tracker model: {}", e);
    }

    // Start server
    tracing::info!("Starting VisioTrack API Server");
    start_server(&addr, state).await?;

    Ok(())
}

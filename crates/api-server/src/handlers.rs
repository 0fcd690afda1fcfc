//! HTTP request handlers for API endpoints

use std::io::Write;
use std::path::PathBuf;

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use tracing::{error, info};
use visiotrack_common::{BoundingBox, PipelineError};

use crate::{
    download::download_from_url,
    types::{ErrorResponse, HealthResponse, TrackUrlRequest, TrackUrlResponse},
    ApiState,
};
use visiotrack_pipeline::{process_video, PipelineOptions, PipelineOutput};

/// Rejection tuple returned by the tracking handlers
type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn internal_error(message: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a pipeline failure to its HTTP class
fn pipeline_error(err: &PipelineError) -> ApiError {
    error!("Tracking error: {}", err);
    if err.is_input_error() {
        bad_request(err.to_string())
    } else {
        internal_error(err.to_string())
    }
}

/// Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: state.tracker.is_loaded(),
        gpu_available: state.tracker.gpu_available(),
        device: state.tracker.device().to_string(),
    })
}

/// Service capability and usage description
pub async fn service_info() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "VisioTrack API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Single-object video tracking service",
        "endpoints": {
            "/health": "Health check",
            "/track": "Track object in video (POST with multipart/form-data)",
            "/track-url": "Track object in video fetched from a URL (POST with JSON)",
            "/info": "API information",
        },
        "usage": {
            "method": "POST",
            "endpoint": "/track",
            "content_type": "multipart/form-data",
            "parameters": {
                "video": "Video file",
                "bbox_x": "X coordinate (int)",
                "bbox_y": "Y coordinate (int)",
                "bbox_w": "Width (int)",
                "bbox_h": "Height (int)",
            },
        },
        "example_curl": "curl -X POST http://localhost:8080/track \
-F video=@video.mp4 -F bbox_x=100 -F bbox_y=100 -F bbox_w=200 -F bbox_h=200 \
-o tracked_video.mp4",
    }))
}

/// Main tracking endpoint
///
/// Accepts a multipart form with a video file and the initial bounding
/// box, runs the tracking pipeline and returns the annotated video.
pub async fn track_video(
    State(state): State<ApiState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut video_bytes: Option<axum::body::Bytes> = None;
    let mut bbox_x: Option<i32> = None;
    let mut bbox_y: Option<i32> = None;
    let mut bbox_w: Option<i32> = None;
    let mut bbox_h: Option<i32> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(format!("Malformed multipart form: {e}")))?
    {
        let name = field.name().map(std::string::ToString::to_string);
        match name.as_deref() {
            Some("video") => {
                let is_video = field
                    .content_type()
                    .is_some_and(|ct| ct.starts_with("video/"));
                if !is_video {
                    return Err(bad_request("File must be a video"));
                }
                video_bytes = Some(field.bytes().await.map_err(|e| {
                    bad_request(format!("Failed to read video upload: {e}"))
                })?);
            }
            Some("bbox_x") => bbox_x = Some(int_field(field).await?),
            Some("bbox_y") => bbox_y = Some(int_field(field).await?),
            Some("bbox_w") => bbox_w = Some(int_field(field).await?),
            Some("bbox_h") => bbox_h = Some(int_field(field).await?),
            _ => {}
        }
    }

    let video_bytes = video_bytes.ok_or_else(|| bad_request("No video file provided"))?;
    let bbox = BoundingBox::new(
        bbox_x.ok_or_else(|| bad_request("Missing field bbox_x"))?,
        bbox_y.ok_or_else(|| bad_request("Missing field bbox_y"))?,
        bbox_w.ok_or_else(|| bad_request("Missing field bbox_w"))?,
        bbox_h.ok_or_else(|| bad_request("Missing field bbox_h"))?,
    );

    info!(
        "Tracking request: {} byte upload, bounding box ({}, {}, {}, {})",
        video_bytes.len(),
        bbox.x,
        bbox.y,
        bbox.w,
        bbox.h
    );

    let tracker = state.tracker.clone();
    let encoder = state.encoder.clone();
    let scratch = state.scratch_dir.clone();

    let output = tokio::task::spawn_blocking(move || {
        // The upload lives only as long as this run
        let mut upload = tempfile::Builder::new()
            .suffix(".mp4")
            .tempfile_in(&scratch)
            .map_err(PipelineError::Io)?;
        upload.write_all(&video_bytes).map_err(PipelineError::Io)?;
        upload.flush().map_err(PipelineError::Io)?;

        let mut handle = tracker.acquire()?;
        let options = PipelineOptions::new(scratch.clone(), tracker.device());
        process_video(upload.path(), bbox, &mut handle, encoder.as_ref(), &options)
    })
    .await
    .map_err(|e| internal_error(format!("Tracking task failed: {e}")))?
    .map_err(|e| pipeline_error(&e))?;

    let video = read_and_reclaim(&output).await?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"tracked_video.mp4\"",
        )
        .header("X-Frames-Processed", output.frames_processed.to_string())
        .header("X-Resolution", output.resolution.clone())
        .header("X-FPS", output.fps.to_string())
        .body(Body::from(video))
        .map_err(|e| internal_error(format!("Failed to build response: {e}")))
}

/// URL-based tracking endpoint
///
/// Downloads the video, runs the same pipeline and returns the annotated
/// video base64 encoded.
pub async fn track_video_url(
    State(state): State<ApiState>,
    Json(request): Json<TrackUrlRequest>,
) -> Result<Json<TrackUrlResponse>, ApiError> {
    info!(
        "URL tracking request: {}, bounding box ({}, {}, {}, {})",
        request.video_url, request.bbox.x, request.bbox.y, request.bbox.w, request.bbox.h
    );

    let downloaded = download_from_url(&request.video_url)
        .await
        .map_err(|e| pipeline_error(&e))?;
    let input: PathBuf = downloaded.path().to_path_buf();

    let tracker = state.tracker.clone();
    let encoder = state.encoder.clone();
    let scratch = state.scratch_dir.clone();
    let bbox = request.bbox;

    let output = tokio::task::spawn_blocking(move || {
        // Keep the download alive for the duration of processing
        let _downloaded_guard = downloaded;

        let mut handle = tracker.acquire()?;
        let options = PipelineOptions::new(scratch.clone(), tracker.device());
        process_video(&input, bbox, &mut handle, encoder.as_ref(), &options)
    })
    .await
    .map_err(|e| internal_error(format!("Tracking task failed: {e}")))?
    .map_err(|e| pipeline_error(&e))?;

    let video = read_and_reclaim(&output).await?;

    Ok(Json(TrackUrlResponse {
        success: true,
        message: output.message.clone(),
        video_base64: BASE64.encode(video),
        frames_processed: output.frames_processed,
        resolution: output.resolution.clone(),
        fps: output.fps,
    }))
}

/// Read the final artifact into memory and reclaim the file.
async fn read_and_reclaim(output: &PipelineOutput) -> Result<Vec<u8>, ApiError> {
    let video = tokio::fs::read(&output.video_path)
        .await
        .map_err(|e| internal_error(format!("Failed to read output video: {e}")))?;
    if let Err(e) = tokio::fs::remove_file(&output.video_path).await {
        error!(
            "Failed to remove delivered artifact {}: {}",
            output.video_path.display(),
            e
        );
    }
    Ok(video)
}

async fn int_field(field: Field<'_>) -> Result<i32, ApiError> {
    let name = field.name().unwrap_or("field").to_string();
    let text = field
        .text()
        .await
        .map_err(|e| bad_request(format!("Failed to read {name}: {e}")))?;
    text.trim()
        .parse::<i32>()
        .map_err(|_| bad_request(format!("Invalid integer value for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_map_to_400() {
        let (status, _) =
            pipeline_error(&PipelineError::InvalidBoundingBox("invalid dimensions".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = pipeline_error(&PipelineError::SourceRead("bad file".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_service_errors_map_to_500() {
        let (status, _) = pipeline_error(&PipelineError::ModelMissing("model.onnx".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = pipeline_error(&PipelineError::Ffmpeg("boom".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_body_carries_message() {
        let (_, Json(body)) = bad_request("No video file provided");
        assert_eq!(body.error, "No video file provided");
    }
}

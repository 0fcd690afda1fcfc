//! API request and response types

use serde::{Deserialize, Serialize};
use visiotrack_common::BoundingBox;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Whether the tracker model has been loaded
    pub model_loaded: bool,
    /// Whether accelerated compute is available
    pub gpu_available: bool,
    /// Compute device the tracker runs on
    pub device: String,
}

/// Structured error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// URL-based tracking request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUrlRequest {
    /// HTTP(S) URL of the video to process
    pub video_url: String,
    /// Initial bounding box on the first frame
    pub bbox: BoundingBox,
}

/// URL-based tracking response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUrlResponse {
    pub success: bool,
    /// Human-readable status
    pub message: String,
    /// Annotated video, base64 encoded
    pub video_base64: String,
    /// Frames read and written
    pub frames_processed: u64,
    /// Source resolution, "WxH"
    pub resolution: String,
    /// Source frame rate
    pub fps: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_url_request_deserialization() {
        let json = r#"{
            "video_url": "https://example.com/clip.mp4",
            "bbox": {"x": 100, "y": 100, "w": 50, "h": 50}
        }"#;

        let request: TrackUrlRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.video_url, "https://example.com/clip.mp4");
        assert_eq!(request.bbox, BoundingBox::new(100, 100, 50, 50));
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            model_loaded: true,
            gpu_available: false,
            device: "cpu".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"model_loaded\":true"));
        assert!(json.contains("\"gpu_available\":false"));
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_string(&ErrorResponse {
            error: "Invalid bounding box".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"error":"Invalid bounding box"}"#);
    }
}

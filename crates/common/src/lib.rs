/// Common types and utilities for the tracking pipeline
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frame rate used when the container does not report one
pub const FALLBACK_FPS: u32 = 30;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Model file not found: {0}")]
    ModelMissing(String),

    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("Unsupported upload: {0}")]
    UnsupportedUpload(String),

    #[error("Could not read video source: {0}")]
    SourceRead(String),

    #[error("Could not create video writer: {0}")]
    SinkOpen(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Tracker error: {0}")]
    Tracker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether this error was caused by the caller's input (HTTP 400 class)
    /// rather than a failure inside the service (HTTP 500 class).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidBoundingBox(_)
                | PipelineError::UnsupportedUpload(_)
                | PipelineError::SourceRead(_)
        )
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Axis-aligned bounding box in pixel coordinates, top-left origin.
///
/// Coordinates are signed: a tracker is free to predict a box partially
/// outside the frame, and the frame loop clamps it before drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    #[must_use]
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Center of the box
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }

    /// Validate an initial bounding box against the frame it annotates.
    ///
    /// Runs exactly once per pipeline run, before tracker initialization.
    /// Dimensions are checked first, then containment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBoundingBox` with a reason naming the failed check.
    pub fn validate(&self, frame_width: u32, frame_height: u32) -> Result<()> {
        if self.w <= 0 || self.h <= 0 {
            return Err(PipelineError::InvalidBoundingBox(format!(
                "invalid dimensions: {}x{}",
                self.w, self.h
            )));
        }

        let width = frame_width as i32;
        let height = frame_height as i32;
        if self.x < 0 || self.y < 0 || self.x + self.w > width || self.y + self.h > height {
            return Err(PipelineError::InvalidBoundingBox(format!(
                "box ({}, {}, {}x{}) out of bounds (frame: {}x{})",
                self.x, self.y, self.w, self.h, frame_width, frame_height
            )));
        }

        Ok(())
    }

    /// Clamp the box so it stays drawable within the frame.
    ///
    /// The result always satisfies `0 <= x`, `0 <= y`, `x + w <= width`,
    /// `y + h <= height`, `w >= 1`, `h >= 1`.
    #[must_use]
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> BoundingBox {
        let width = frame_width as i32;
        let height = frame_height as i32;
        let x = self.x.clamp(0, width - 1);
        let y = self.y.clamp(0, height - 1);
        let w = self.w.clamp(1, width - x);
        let h = self.h.clamp(1, height - y);
        BoundingBox { x, y, w, h }
    }
}

/// Geometry of a video source, read once at pipeline start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Total frame count as reported by the container; 0 when unknown.
    pub total_frames: u64,
}

impl FrameGeometry {
    /// Resolution string in "WxH" form
    #[must_use]
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

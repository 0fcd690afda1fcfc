//! Request-scoped pipeline coordination

use std::path::{Path, PathBuf};

use tracing::info;
use uuid::Uuid;
use visiotrack_common::{BoundingBox, Result};
use visiotrack_tracker::Tracker;
use visiotrack_transcode::{transcode_to_final, Encoder};
use visiotrack_video_io::{FrameSink, FrameSource, VideoSink, VideoSource};

use crate::frame_loop::run_frame_loop;
use crate::scratch::ScratchArtifact;

/// Per-process pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory for intermediate and final artifacts
    pub scratch_dir: PathBuf,
    /// Compute device name, reported in result metadata
    pub device: String,
}

impl PipelineOptions {
    #[must_use]
    pub fn new(scratch_dir: impl Into<PathBuf>, device: impl Into<String>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            device: device.into(),
        }
    }
}

/// Result of one tracking run
#[derive(Debug)]
pub struct PipelineOutput {
    /// Final artifact; the caller owns the file and its cleanup
    pub video_path: PathBuf,
    /// Frames read from the source and written to the output
    pub frames_processed: u64,
    /// Source resolution, "WxH"
    pub resolution: String,
    /// Source frame rate
    pub fps: u32,
    /// Compute device the tracker ran on
    pub device: String,
    /// Whether the final artifact is in the web profile (false: raw
    /// intermediate fallback)
    pub transcoded: bool,
    /// Human-readable status
    pub message: String,
}

/// Run the whole tracking pipeline for one request.
///
/// Stages: open the source, run the frame loop (validation and tracker
/// init happen inside), finalize the intermediate, transcode with raw
/// fallback. Scratch artifacts are uniquely named per request and removed
/// on every failure path; on success, ownership of the final artifact
/// passes to the caller.
///
/// # Errors
///
/// Any [`visiotrack_common::PipelineError`] raised by a stage; transcode
/// failure is not an error (the raw intermediate is promoted instead).
pub fn process_video(
    input: &Path,
    bbox: BoundingBox,
    tracker: &mut dyn Tracker,
    encoder: &dyn Encoder,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    info!(
        "Processing video {} with bounding box ({}, {}, {}, {})",
        input.display(),
        bbox.x,
        bbox.y,
        bbox.w,
        bbox.h
    );

    let run_id = Uuid::new_v4().simple().to_string();
    let intermediate = ScratchArtifact::new(options.scratch_dir.join(format!("{run_id}_temp.mp4")));
    let final_artifact =
        ScratchArtifact::new(options.scratch_dir.join(format!("tracked_{run_id}.mp4")));

    let mut source = VideoSource::open(input)?;
    let geometry = source.geometry();

    let sink_path = intermediate.path().to_path_buf();
    let (sink, frames_processed) = run_frame_loop(&mut source, tracker, bbox, move |geom| {
        VideoSink::create(&sink_path, geom.width, geom.height, geom.fps)
    })?;
    sink.finish()?;
    drop(source);

    let outcome = transcode_to_final(encoder, intermediate.path(), final_artifact.path())?;

    let message = format!("Successfully tracked {frames_processed} frames");
    info!("{}", message);

    Ok(PipelineOutput {
        video_path: final_artifact.release(),
        frames_processed,
        resolution: geometry.resolution(),
        fps: geometry.fps,
        device: options.device.clone(),
        transcoded: !outcome.is_fallback(),
        message,
    })
}

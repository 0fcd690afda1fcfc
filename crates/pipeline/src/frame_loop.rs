//! Per-frame tracking loop

use tracing::info;
use visiotrack_common::{BoundingBox, FrameGeometry, PipelineError, Result};
use visiotrack_overlay::annotate_frame;
use visiotrack_tracker::Tracker;
use visiotrack_video_io::{FrameSink, FrameSource};

/// Drive the tracker over every frame of `source`, writing annotated
/// frames into the sink produced by `open_sink`.
///
/// The sequence per run: read the first frame, validate the initial box,
/// initialize the tracker, open the sink, then for each remaining frame
/// update the tracker, clamp its prediction to the frame, annotate and
/// write. End of stream is the normal termination condition. Frames handed
/// to the tracker are never annotated; drawing happens after the update
/// call, on a buffer the tracker will not see again.
///
/// Returns the finished-but-unflushed sink and the number of frames
/// written, including the first.
///
/// # Errors
///
/// `SourceRead` when the first frame cannot be read, `InvalidBoundingBox`
/// when validation rejects the initial box, `SinkOpen` when the sink
/// cannot be created, plus whatever the tracker or the sink raise mid-run.
pub fn run_frame_loop<S, F>(
    source: &mut dyn FrameSource,
    tracker: &mut dyn Tracker,
    bbox: BoundingBox,
    open_sink: F,
) -> Result<(S, u64)>
where
    S: FrameSink,
    F: FnOnce(&FrameGeometry) -> Result<S>,
{
    let geometry = source.geometry();
    info!(
        "Video: {}x{} @ {}fps, {} frames",
        geometry.width, geometry.height, geometry.fps, geometry.total_frames
    );

    let mut first = source
        .read_frame()?
        .ok_or_else(|| PipelineError::SourceRead("Could not read first frame".to_string()))?;

    bbox.validate(geometry.width, geometry.height)?;

    tracker.init(&first, bbox)?;

    let mut sink = open_sink(&geometry)?;

    let mut frames_processed: u64 = 1;
    annotate_frame(&mut first, &bbox, frames_processed);
    sink.write_frame(&first)?;

    while let Some(mut frame) = source.read_frame()? {
        frames_processed += 1;

        let predicted = tracker.update(&frame)?;
        let clamped = predicted.clamp_to(geometry.width, geometry.height);

        annotate_frame(&mut frame, &clamped, frames_processed);
        sink.write_frame(&frame)?;

        if frames_processed % 30 == 0 {
            info!(
                "Processed {}/{} frames",
                frames_processed, geometry.total_frames
            );
        }
    }

    Ok((sink, frames_processed))
}

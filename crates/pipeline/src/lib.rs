//! Video tracking pipeline
//!
//! Sequences one tracking request end to end: geometry validation, tracker
//! initialization, the per-frame annotate-and-encode loop, and the final
//! browser-compatibility transcode.
//!
//! # Example
//! ```no_run
//! use std::path::Path;
//! use visiotrack_common::BoundingBox;
//! use visiotrack_pipeline::{process_video, PipelineOptions};
//! use visiotrack_tracker::{Tracker, TrackerService};
//! use visiotrack_transcode::FfmpegEncoder;
//!
//! # fn main() -> visiotrack_common::Result<()> {
//! let service = TrackerService::new("models/tracker.onnx");
//! let mut tracker = service.acquire()?;
//! let options = PipelineOptions::new(std::env::temp_dir(), service.device());
//!
//! let output = process_video(
//!     Path::new("clip.mp4"),
//!     BoundingBox::new(100, 100, 50, 50),
//!     &mut tracker,
//!     &FfmpegEncoder,
//!     &options,
//! )?;
//! println!("{}: {} frames", output.message, output.frames_processed);
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod frame_loop;
mod scratch;

pub use coordinator::{process_video, PipelineOptions, PipelineOutput};
pub use frame_loop::run_frame_loop;

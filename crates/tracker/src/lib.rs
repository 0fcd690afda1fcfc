//! Single-object visual tracking via ONNX Runtime
//!
//! This crate wraps a pretrained template/search siamese tracking network
//! behind a small capability surface:
//! - [`Tracker`]: the `init`/`update` contract the frame loop drives.
//! - [`TrackerService`]: process-wide model singleton. The ONNX session is
//!   loaded lazily on first use and shared across requests; each request
//!   acquires a [`TrackerHandle`] that holds the session for its whole run
//!   and owns that run's tracking state.
//!
//! # Example
//! ```no_run
//! use visiotrack_tracker::{Tracker, TrackerService};
//!
//! # fn main() -> visiotrack_common::Result<()> {
//! let service = TrackerService::new("models/tracker.onnx");
//! let mut handle = service.acquire()?;
//!
//! // For each decoded frame:
//! // handle.init(&first_frame, initial_box)?;
//! // let predicted = handle.update(&next_frame)?;
//! # let _ = &mut handle as &mut dyn Tracker;
//! # Ok(())
//! # }
//! ```

mod service;
mod siam;

pub use service::{TrackerHandle, TrackerService};
pub use siam::SiamTrackerConfig;

use image::RgbImage;
use visiotrack_common::{BoundingBox, Result};

/// Capability surface of a stateful single-object tracker.
///
/// `init` must be called exactly once per run, on the first frame;
/// `update` exactly once per subsequent frame, in strict frame order.
/// Returned boxes are raw predictions: the caller is responsible for
/// clamping them to frame bounds.
pub trait Tracker {
    /// Establish tracking state from the first frame and its bounding box.
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()>;

    /// Advance the state by one frame, returning the predicted box.
    fn update(&mut self, frame: &RgbImage) -> Result<BoundingBox>;
}

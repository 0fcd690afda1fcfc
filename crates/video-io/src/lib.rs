//! Video decode and encode built on `FFmpeg`
//!
//! This crate provides the two halves of the tracking pipeline's video IO:
//! - [`VideoSource`]: demuxes a container, decodes the best video stream and
//!   hands out frames one at a time as RGB images, in decode order.
//! - [`VideoSink`]: encodes RGB frames into the intermediate artifact the
//!   transcode stage consumes.
//!
//! Both sides run multi-threaded software codecs via `ffmpeg-next`; the
//! [`FrameSource`] and [`FrameSink`] traits are the seams the frame loop is
//! written against.

mod sink;
mod source;

pub use sink::VideoSink;
pub use source::VideoSource;

use image::RgbImage;
use visiotrack_common::{FrameGeometry, Result};

/// Initialize `FFmpeg` library
pub(crate) fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg_next::init().expect("Failed to initialize FFmpeg");
    });
}

/// An ordered stream of decoded frames with fixed geometry.
pub trait FrameSource {
    /// Geometry of the stream, read once at open time.
    fn geometry(&self) -> FrameGeometry;

    /// Read the next frame. `Ok(None)` signals normal end of stream.
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// A destination for annotated frames.
pub trait FrameSink {
    /// Append one frame. Frames must match the geometry the sink was
    /// created with and arrive in presentation order.
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush buffered frames and finalize the container.
    fn finish(self) -> Result<()>
    where
        Self: Sized;
}

//! Streaming video decoder

use std::path::Path;

use ffmpeg_next as ffmpeg;
use image::RgbImage;
use tracing::debug;
use visiotrack_common::{FrameGeometry, PipelineError, Result, FALLBACK_FPS};

use crate::FrameSource;

/// Decodes the best video stream of a container one frame at a time.
///
/// Frames are converted to RGB24 with a software scaler. End of stream is
/// reported as `Ok(None)` after the decoder has been drained.
pub struct VideoSource {
    ictx: ffmpeg::format::context::Input,
    decoder: ffmpeg::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    geometry: FrameGeometry,
    decoded: ffmpeg::util::frame::video::Video,
    converted: ffmpeg::util::frame::video::Video,
    draining: bool,
}

impl VideoSource {
    /// Open a video file for sequential decoding.
    ///
    /// # Errors
    ///
    /// Returns `SourceRead` if the file cannot be opened or holds no usable
    /// video stream, `Ffmpeg` if the decoder cannot be created.
    pub fn open(path: &Path) -> Result<Self> {
        crate::init_ffmpeg();

        let ictx = ffmpeg::format::input(&path).map_err(|e| {
            PipelineError::SourceRead(format!("Could not open video file {}: {e}", path.display()))
        })?;

        let (stream_index, fps, total_frames, parameters) = {
            let stream = ictx
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| PipelineError::SourceRead("No video stream found".to_string()))?;

            let rate = stream.avg_frame_rate();
            (
                stream.index(),
                fps_from_rate(rate.0, rate.1),
                stream.frames().max(0) as u64,
                stream.parameters(),
            )
        };

        let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create context: {e}")))?
            .decoder()
            .video()
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create decoder: {e}")))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(PipelineError::SourceRead(
                "Video stream reports zero dimensions".to_string(),
            ));
        }

        let scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| PipelineError::Ffmpeg(format!("Failed to create scaler: {e}")))?;

        let geometry = FrameGeometry {
            width,
            height,
            fps,
            total_frames,
        };

        debug!(
            "Opened video source {}: {}x{} @ {}fps, {} frames",
            path.display(),
            width,
            height,
            fps,
            total_frames
        );

        Ok(Self {
            ictx,
            decoder,
            scaler,
            stream_index,
            geometry,
            decoded: ffmpeg::util::frame::video::Video::empty(),
            converted: ffmpeg::util::frame::video::Video::empty(),
            draining: false,
        })
    }

    fn convert_current(&mut self) -> Result<RgbImage> {
        self.scaler
            .run(&self.decoded, &mut self.converted)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to convert frame: {e}")))?;

        let width = self.geometry.width as usize;
        let height = self.geometry.height as usize;
        let stride = self.converted.stride(0);
        let data = self.converted.data(0);
        let row_len = width * 3;

        // Rows carry alignment padding, so copy them one at a time
        let mut buffer = Vec::with_capacity(row_len * height);
        for y in 0..height {
            let start = y * stride;
            buffer.extend_from_slice(&data[start..start + row_len]);
        }

        RgbImage::from_raw(self.geometry.width, self.geometry.height, buffer).ok_or_else(|| {
            PipelineError::Ffmpeg("Decoded frame buffer has unexpected size".to_string())
        })
    }
}

impl FrameSource for VideoSource {
    fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                return self.convert_current().map(Some);
            }

            if self.draining {
                return Ok(None);
            }

            match self.ictx.packets().next() {
                Some((stream, packet)) => {
                    if stream.index() == self.stream_index {
                        // Corrupt packets are skipped rather than aborting the run
                        let _ = self.decoder.send_packet(&packet);
                    }
                }
                None => {
                    let _ = self.decoder.send_eof();
                    self.draining = true;
                }
            }
        }
    }
}

/// Integral frame rate from a stream's average rate, with a fixed fallback
/// when the container reports none.
fn fps_from_rate(num: i32, den: i32) -> u32 {
    if num > 0 && den > 0 {
        let fps = (f64::from(num) / f64::from(den)).round() as u32;
        if fps > 0 {
            return fps;
        }
    }
    FALLBACK_FPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_from_rate() {
        assert_eq!(fps_from_rate(30, 1), 30);
        assert_eq!(fps_from_rate(30000, 1001), 30); // NTSC
        assert_eq!(fps_from_rate(25, 1), 25);
    }

    #[test]
    fn test_fps_fallback_when_unreported() {
        assert_eq!(fps_from_rate(0, 1), FALLBACK_FPS);
        assert_eq!(fps_from_rate(0, 0), FALLBACK_FPS);
        assert_eq!(fps_from_rate(30, 0), FALLBACK_FPS);
    }

    #[test]
    fn test_open_missing_file_is_source_read_error() {
        let err = VideoSource::open(Path::new("/nonexistent/clip.mp4")).err().unwrap();
        assert!(matches!(err, PipelineError::SourceRead(_)));
    }
}

//! Intermediate video encoder
//!
//! Writes annotated frames into an MPEG-4 intermediate file. The final
//! H.264 pass happens in the transcode stage; this encoder only has to be
//! universally available and fast.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use image::RgbImage;
use tracing::debug;
use visiotrack_common::{PipelineError, Result};

use crate::FrameSink;

pub struct VideoSink {
    octx: ffmpeg::format::context::Output,
    encoder: ffmpeg::codec::encoder::video::Encoder,
    scaler: ffmpeg::software::scaling::Context,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    rgb_frame: ffmpeg::util::frame::video::Video,
    yuv_frame: ffmpeg::util::frame::video::Video,
    next_pts: i64,
    width: u32,
    height: u32,
}

impl VideoSink {
    /// Create an encoder writing to `path` at the given geometry.
    ///
    /// # Errors
    ///
    /// Returns `SinkOpen` if the output container or encoder cannot be
    /// created.
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        crate::init_ffmpeg();

        let fps = fps.max(1) as i32;

        let mut octx = ffmpeg::format::output(&path).map_err(|e| {
            PipelineError::SinkOpen(format!("Could not create output {}: {e}", path.display()))
        })?;

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4).ok_or_else(|| {
            PipelineError::SinkOpen("MPEG-4 encoder not available".to_string())
        })?;

        let mut encoder = ffmpeg::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| PipelineError::SinkOpen(format!("Failed to create encoder: {e}")))?;

        let encoder_time_base = ffmpeg::Rational(1, fps);
        encoder.set_width(width);
        encoder.set_height(height);
        encoder.set_format(ffmpeg::format::Pixel::YUV420P);
        encoder.set_time_base(encoder_time_base);
        encoder.set_frame_rate(Some(ffmpeg::Rational(fps, 1)));
        encoder.set_bit_rate(4_000_000);
        if octx
            .format()
            .flags()
            .contains(ffmpeg::format::Flags::GLOBAL_HEADER)
        {
            encoder.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = encoder
            .open_as(codec)
            .map_err(|e| PipelineError::SinkOpen(format!("Failed to open encoder: {e}")))?;

        {
            let mut stream = octx.add_stream(codec).map_err(|e| {
                PipelineError::SinkOpen(format!("Failed to add video stream: {e}"))
            })?;
            stream.set_parameters(&encoder);
            stream.set_time_base(encoder_time_base);
        }

        octx.write_header()
            .map_err(|e| PipelineError::SinkOpen(format!("Failed to write header: {e}")))?;

        // The muxer may adjust the stream time base when writing the header
        let stream_time_base = octx
            .stream(0)
            .ok_or_else(|| PipelineError::SinkOpen("Output stream missing".to_string()))?
            .time_base();

        let scaler = ffmpeg::software::scaling::Context::get(
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| PipelineError::SinkOpen(format!("Failed to create scaler: {e}")))?;

        debug!(
            "Opened video sink {}: {}x{} @ {}fps",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            octx,
            encoder,
            scaler,
            encoder_time_base,
            stream_time_base,
            rgb_frame: ffmpeg::util::frame::video::Video::new(
                ffmpeg::format::Pixel::RGB24,
                width,
                height,
            ),
            yuv_frame: ffmpeg::util::frame::video::Video::empty(),
            next_pts: 0,
            width,
            height,
        })
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet
                .write_interleaved(&mut self.octx)
                .map_err(|e| PipelineError::Ffmpeg(format!("Failed to write packet: {e}")))?;
        }
        Ok(())
    }
}

impl FrameSink for VideoSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.width() != self.width || frame.height() != self.height {
            return Err(PipelineError::Ffmpeg(format!(
                "Frame size {}x{} does not match sink geometry {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        // Encoder frame rows carry alignment padding, so copy one row at a time
        let stride = self.rgb_frame.stride(0);
        let row_len = self.width as usize * 3;
        let src = frame.as_raw();
        let dst = self.rgb_frame.data_mut(0);
        for y in 0..self.height as usize {
            dst[y * stride..y * stride + row_len]
                .copy_from_slice(&src[y * row_len..(y + 1) * row_len]);
        }

        self.scaler
            .run(&self.rgb_frame, &mut self.yuv_frame)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to convert frame: {e}")))?;

        self.yuv_frame.set_pts(Some(self.next_pts));
        self.next_pts += 1;

        self.encoder
            .send_frame(&self.yuv_frame)
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to encode frame: {e}")))?;

        self.drain_packets()
    }

    fn finish(mut self) -> Result<()> {
        self.encoder
            .send_eof()
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to flush encoder: {e}")))?;
        self.drain_packets()?;
        self.octx
            .write_trailer()
            .map_err(|e| PipelineError::Ffmpeg(format!("Failed to write trailer: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_in_unwritable_directory_is_sink_open_error() {
        let err = VideoSink::create(Path::new("/nonexistent/dir/out.mp4"), 64, 48, 30)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::SinkOpen(_)));
    }

    #[test]
    fn test_empty_sink_finalizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mp4");
        let sink = VideoSink::create(&path, 64, 48, 30).unwrap();
        sink.finish().unwrap();
        assert!(path.exists());
    }
}

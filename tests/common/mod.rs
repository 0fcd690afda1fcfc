//! Shared fixtures for the end-to-end suites

use std::path::Path;

use image::{Rgb, RgbImage};
use visiotrack_common::{BoundingBox, Result};
use visiotrack_tracker::Tracker;
use visiotrack_transcode::{Encoder, EncoderError};
use visiotrack_video_io::{FrameSink, VideoSink};

/// Tracker replaying a fixed script of predictions; records its calls.
pub struct ScriptedTracker {
    script: Vec<BoundingBox>,
    cursor: usize,
    pub init_calls: usize,
}

impl ScriptedTracker {
    pub fn new(script: Vec<BoundingBox>) -> Self {
        Self {
            script,
            cursor: 0,
            init_calls: 0,
        }
    }

    /// Tracker drifting right and down a pixel per frame from `start`.
    pub fn drifting(start: BoundingBox) -> Self {
        let script = (1..512)
            .map(|i| BoundingBox::new(start.x + i, start.y + i, start.w, start.h))
            .collect();
        Self::new(script)
    }
}

impl Tracker for ScriptedTracker {
    fn init(&mut self, _frame: &RgbImage, _bbox: BoundingBox) -> Result<()> {
        self.init_calls += 1;
        Ok(())
    }

    fn update(&mut self, _frame: &RgbImage) -> Result<BoundingBox> {
        let index = self.cursor.min(self.script.len().saturating_sub(1));
        self.cursor += 1;
        Ok(self.script[index])
    }
}

/// Encoder standing in for a working ffmpeg: copies the input through.
pub struct CopyEncoder;

impl Encoder for CopyEncoder {
    fn reencode(&self, input: &Path, output: &Path) -> std::result::Result<(), EncoderError> {
        std::fs::copy(input, output)?;
        Ok(())
    }
}

/// Encoder standing in for a missing ffmpeg installation.
pub struct UnavailableEncoder;

impl Encoder for UnavailableEncoder {
    fn reencode(&self, _input: &Path, _output: &Path) -> std::result::Result<(), EncoderError> {
        Err(EncoderError::Unavailable(
            "ffmpeg binary not found".to_string(),
        ))
    }
}

/// Encode a synthetic clip: a white square marching across a dark frame.
pub fn write_test_video(path: &Path, width: u32, height: u32, fps: u32, frames: u32) {
    let mut sink = VideoSink::create(path, width, height, fps).unwrap();
    for i in 0..frames {
        let mut frame = RgbImage::from_pixel(width, height, Rgb([16, 16, 48]));
        let offset = 10 + i * 4;
        for dy in 0..32.min(height) {
            for dx in 0..32.min(width) {
                let x = (offset + dx) % width;
                let y = (20 + dy) % height;
                frame.put_pixel(x, y, Rgb([255, 255, 255]));
            }
        }
        sink.write_frame(&frame).unwrap();
    }
    sink.finish().unwrap();
}

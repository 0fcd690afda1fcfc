//! Final-pass transcoding using FFmpeg
//!
//! The frame loop writes an MPEG-4 intermediate; this crate re-encodes it
//! into the browser-compatible target profile (H.264, 8-bit 4:2:0, fast
//! preset, CRF 23, faststart container layout). Re-encoding is best-effort:
//! when the external encoder is unavailable or fails, the raw intermediate
//! is promoted to the final artifact unchanged and the request still
//! succeeds.

use std::io;
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};
use visiotrack_common::{PipelineError, Result};

/// Errors specific to the external encoder
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoder unavailable: {0}")]
    Unavailable(String),

    #[error("ffmpeg execution failed: {0}")]
    Ffmpeg(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<EncoderError> for PipelineError {
    fn from(err: EncoderError) -> Self {
        PipelineError::Ffmpeg(err.to_string())
    }
}

/// External re-encode capability.
///
/// Implementations re-encode `input` into the target profile at `output`.
/// The fallback policy lives in [`transcode_to_final`], not here.
pub trait Encoder {
    /// # Errors
    ///
    /// Returns `Unavailable` when the encoder cannot run at all, `Ffmpeg`
    /// when it runs and fails.
    fn reencode(&self, input: &Path, output: &Path) -> std::result::Result<(), EncoderError>;
}

/// Subprocess `ffmpeg` encoder with the fixed web-playback profile.
#[derive(Debug, Clone, Default)]
pub struct FfmpegEncoder;

impl FfmpegEncoder {
    fn build_command(input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new("ffmpeg");
        cmd.arg("-i")
            .arg(input)
            .args(["-c:v", "libx264"])
            .args(["-preset", "fast"])
            .args(["-crf", "23"])
            .args(["-pix_fmt", "yuv420p"])
            .args(["-movflags", "+faststart"])
            .arg("-y")
            .arg(output);
        cmd
    }
}

impl Encoder for FfmpegEncoder {
    fn reencode(&self, input: &Path, output: &Path) -> std::result::Result<(), EncoderError> {
        let mut cmd = Self::build_command(input, output);
        debug!("FFmpeg command: {:?}", cmd);

        let result = cmd.output().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                EncoderError::Unavailable("ffmpeg binary not found".to_string())
            } else {
                EncoderError::Ffmpeg(format!("Failed to execute ffmpeg: {e}"))
            }
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(EncoderError::Ffmpeg(format!("ffmpeg failed: {stderr}")));
        }

        Ok(())
    }
}

/// Outcome of the transcode stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// The final artifact is in the target profile
    Reencoded,
    /// The encoder failed; the final artifact is the raw intermediate
    RawFallback,
}

impl TranscodeOutcome {
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, TranscodeOutcome::RawFallback)
    }
}

/// Produce the final artifact from the intermediate.
///
/// On successful re-encode the intermediate is deleted. On any encoder
/// failure the intermediate itself is moved into the final slot: encoder
/// failure only affects playback compatibility, never the request.
///
/// # Errors
///
/// Returns `Io` only when the fallback move itself fails; encoder failure
/// is absorbed by the fallback.
pub fn transcode_to_final(
    encoder: &dyn Encoder,
    intermediate: &Path,
    final_path: &Path,
) -> Result<TranscodeOutcome> {
    info!("Re-encoding video for browser compatibility");

    match encoder.reencode(intermediate, final_path) {
        Ok(()) => {
            if let Err(e) = std::fs::remove_file(intermediate) {
                warn!("Failed to remove intermediate {}: {e}", intermediate.display());
            }
            info!("Video re-encoded successfully");
            Ok(TranscodeOutcome::Reencoded)
        }
        Err(e) => {
            warn!("FFmpeg encoding failed: {e}, using original");
            move_file(intermediate, final_path)?;
            Ok(TranscodeOutcome::RawFallback)
        }
    }
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::result::Result<(), io::Error> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    struct CopyEncoder;

    impl Encoder for CopyEncoder {
        fn reencode(&self, input: &Path, output: &Path) -> std::result::Result<(), EncoderError> {
            fs::copy(input, output)?;
            Ok(())
        }
    }

    struct BrokenEncoder;

    impl Encoder for BrokenEncoder {
        fn reencode(&self, _input: &Path, _output: &Path) -> std::result::Result<(), EncoderError> {
            Err(EncoderError::Unavailable("ffmpeg binary not found".to_string()))
        }
    }

    #[test]
    fn test_command_uses_web_profile() {
        let cmd = FfmpegEncoder::build_command(Path::new("in.mp4"), Path::new("out.mp4"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "fast"]));
        assert!(args.windows(2).any(|w| w == ["-crf", "23"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
        assert!(args.windows(2).any(|w| w == ["-movflags", "+faststart"]));
        assert!(args.contains(&"-y".to_string()));
    }

    #[test]
    fn test_success_removes_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = dir.path().join("clip_temp.mp4");
        let final_path = dir.path().join("tracked.mp4");
        fs::write(&intermediate, b"raw video").unwrap();

        let outcome = transcode_to_final(&CopyEncoder, &intermediate, &final_path).unwrap();

        assert_eq!(outcome, TranscodeOutcome::Reencoded);
        assert!(!intermediate.exists());
        assert_eq!(fs::read(&final_path).unwrap(), b"raw video");
    }

    #[test]
    fn test_failure_falls_back_to_raw_intermediate() {
        let dir = tempfile::tempdir().unwrap();
        let intermediate = dir.path().join("clip_temp.mp4");
        let final_path = dir.path().join("tracked.mp4");
        fs::write(&intermediate, b"raw video").unwrap();

        let outcome = transcode_to_final(&BrokenEncoder, &intermediate, &final_path).unwrap();

        assert_eq!(outcome, TranscodeOutcome::RawFallback);
        assert!(outcome.is_fallback());
        assert!(!intermediate.exists());
        assert_eq!(fs::read(&final_path).unwrap(), b"raw video");
    }
}

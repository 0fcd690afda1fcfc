//! Shared tracker model service
//!
//! One ONNX session is constructed per process and reused across requests.
//! Construction is lazy and happens under the session lock, so concurrent
//! first-use requests cannot double-construct. A run handle keeps the lock
//! for its entire run: the handle's tracking state is private to the run,
//! and `init`/`update` sequences from concurrent requests never interleave
//! against the session.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use image::RgbImage;
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::Session;
use tracing::info;
use visiotrack_common::{BoundingBox, PipelineError, Result};

use crate::siam::{self, SiamTrackerConfig, TrackState};
use crate::Tracker;

pub struct TrackerService {
    model_path: PathBuf,
    config: SiamTrackerConfig,
    session: Mutex<Option<Session>>,
    accelerated: bool,
}

impl TrackerService {
    /// Create the service. The model is not loaded until first use.
    #[must_use]
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self::with_config(model_path, SiamTrackerConfig::default())
    }

    #[must_use]
    pub fn with_config(model_path: impl Into<PathBuf>, config: SiamTrackerConfig) -> Self {
        let accelerated = CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false);
        Self {
            model_path: model_path.into(),
            config,
            session: Mutex::new(None),
            accelerated,
        }
    }

    /// Path of the model weight file
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Whether the model has been loaded
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.session.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Whether accelerated compute is available to the runtime
    #[must_use]
    pub fn gpu_available(&self) -> bool {
        self.accelerated
    }

    /// Compute device the tracker runs on
    #[must_use]
    pub fn device(&self) -> &'static str {
        if self.accelerated {
            "cuda"
        } else {
            "cpu"
        }
    }

    /// Load the model eagerly so the first request does not pay the cost.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`TrackerService::acquire`].
    pub fn preload(&self) -> Result<()> {
        let _ = self.acquire()?;
        Ok(())
    }

    /// Acquire the tracker for one run, loading the model if needed.
    ///
    /// The returned handle holds the session for the whole run; concurrent
    /// requests serialize here.
    ///
    /// # Errors
    ///
    /// Returns `ModelMissing` if the weight file does not exist, `Tracker`
    /// if the session cannot be created.
    pub fn acquire(&self) -> Result<TrackerHandle<'_>> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| PipelineError::Tracker("Tracker lock poisoned".to_string()))?;

        if guard.is_none() {
            if !self.model_path.exists() {
                return Err(PipelineError::ModelMissing(
                    self.model_path.display().to_string(),
                ));
            }

            info!("Loading tracker model from {:?}", self.model_path);
            let session = Session::builder()
                .map_err(|e| PipelineError::Tracker(format!("Failed to create session builder: {e}")))?
                .commit_from_file(&self.model_path)
                .map_err(|e| PipelineError::Tracker(format!("Failed to load tracker model: {e}")))?;
            info!("Tracker model loaded on {}", self.device());

            *guard = Some(session);
        }

        Ok(TrackerHandle {
            session: guard,
            config: self.config.clone(),
            state: None,
        })
    }
}

/// Exclusive use of the shared tracker for one pipeline run.
///
/// Owns the run's [`TrackState`]; dropping the handle discards the state
/// and releases the session to the next request.
pub struct TrackerHandle<'a> {
    session: MutexGuard<'a, Option<Session>>,
    config: SiamTrackerConfig,
    state: Option<TrackState>,
}

impl Tracker for TrackerHandle<'_> {
    fn init(&mut self, frame: &RgbImage, bbox: BoundingBox) -> Result<()> {
        self.state = Some(siam::init_state(&self.config, frame, bbox));
        Ok(())
    }

    fn update(&mut self, frame: &RgbImage) -> Result<BoundingBox> {
        let state = self
            .state
            .as_mut()
            .ok_or_else(|| PipelineError::Tracker("update called before init".to_string()))?;
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| PipelineError::Tracker("Session not initialized".to_string()))?;
        siam::update_state(session, &self.config, state, frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_model_missing_error() {
        let service = TrackerService::new("/nonexistent/tracker.onnx");
        let err = service.acquire().err().unwrap();
        assert!(matches!(err, PipelineError::ModelMissing(_)));
        assert!(err.to_string().contains("/nonexistent/tracker.onnx"));
        assert!(!service.is_loaded());
    }

    #[test]
    fn test_preload_reports_missing_model() {
        let service = TrackerService::new("/nonexistent/tracker.onnx");
        assert!(service.preload().is_err());
    }

    #[test]
    fn test_device_name_matches_acceleration_flag() {
        let service = TrackerService::new("/nonexistent/tracker.onnx");
        let device = service.device();
        assert_eq!(device == "cuda", service.gpu_available());
    }
}

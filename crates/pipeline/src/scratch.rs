//! Request-scoped scratch artifacts

use std::path::{Path, PathBuf};

use tracing::debug;

/// A scratch file owned by the pipeline for the duration of a run.
///
/// The file is removed on drop unless ownership is released to the caller,
/// so every early-return path cleans up without explicit handling.
pub(crate) struct ScratchArtifact {
    path: PathBuf,
    armed: bool,
}

impl ScratchArtifact {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Hand the file over to the caller; it will no longer be removed on
    /// drop.
    pub(crate) fn release(mut self) -> PathBuf {
        self.armed = false;
        self.path.clone()
    }
}

impl Drop for ScratchArtifact {
    fn drop(&mut self) {
        if self.armed && self.path.exists() {
            debug!("Removing scratch artifact {}", self.path.display());
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.mp4");
        fs::write(&path, b"data").unwrap();

        {
            let _artifact = ScratchArtifact::new(path.clone());
        }

        assert!(!path.exists());
    }

    #[test]
    fn test_released_artifact_survives_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.mp4");
        fs::write(&path, b"data").unwrap();

        let artifact = ScratchArtifact::new(path.clone());
        let released = artifact.release();

        assert!(released.exists());
    }

    #[test]
    fn test_missing_file_drop_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let _artifact = ScratchArtifact::new(dir.path().join("never_created.mp4"));
    }
}

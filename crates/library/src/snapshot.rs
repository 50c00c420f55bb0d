use std::fs;
use std::path::{Path, PathBuf};

use common::Track;
use tracing::{debug, warn};

/// The last successful scan, persisted as a JSON array of tracks.
///
/// Failures never surface: a snapshot that cannot be written or read simply
/// means the next start performs a full scan.
#[derive(Clone, Debug)]
pub struct SnapshotCache {
    path: PathBuf,
}

#[derive(Debug)]
enum SnapshotError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(err) => write!(f, "io error: {}", err),
            SnapshotError::Json(err) => write!(f, "json error: {}", err),
        }
    }
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Json(err)
    }
}

impl SnapshotCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, tracks: &[Track]) {
        match self.write(tracks) {
            Ok(()) => debug!("Saved snapshot of {} tracks to {:?}", tracks.len(), self.path),
            Err(err) => warn!("Failed to save snapshot {:?}: {}", self.path, err),
        }
    }

    /// `None` when the snapshot is absent, empty, or unreadable.
    pub fn load(&self) -> Option<Vec<Track>> {
        if !self.path.exists() {
            return None;
        }
        match self.read() {
            Ok(tracks) if tracks.is_empty() => None,
            Ok(tracks) => Some(tracks),
            Err(err) => {
                warn!("Ignoring unreadable snapshot {:?}: {}", self.path, err);
                None
            }
        }
    }

    pub fn exists(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    pub fn clear(&self) {
        if !self.path.exists() {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            warn!("Failed to delete snapshot {:?}: {}", self.path, err);
        }
    }

    fn write(&self, tracks: &[Track]) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_vec(tracks)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn read(&self) -> Result<Vec<Track>, SnapshotError> {
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

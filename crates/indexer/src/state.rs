use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use library::{LibraryView, MediaSource, SnapshotCache};
use parking_lot::RwLock;

use crate::config::IndexerConfig;
use crate::enrich::GenreEnricher;

#[derive(Clone)]
pub struct AppState {
    pub library_state: Arc<RwLock<LibraryState>>,
    pub config_path: PathBuf,
    pub config: Arc<RwLock<IndexerConfig>>,
    pub snapshot: SnapshotCache,
    pub enricher: Arc<GenreEnricher>,
    pub source: Arc<dyn MediaSource>,
}

impl AppState {
    pub fn new(
        config_path: PathBuf,
        config: IndexerConfig,
        snapshot: SnapshotCache,
        enricher: Arc<GenreEnricher>,
        source: Arc<dyn MediaSource>,
    ) -> Self {
        Self {
            library_state: Arc::new(RwLock::new(LibraryState::default())),
            config_path,
            config: Arc::new(RwLock::new(config)),
            snapshot,
            enricher,
            source,
        }
    }

    pub fn view(&self) -> Option<Arc<LibraryView>> {
        self.library_state.read().view.clone()
    }
}

#[derive(Clone)]
pub struct LibraryState {
    pub view: Option<Arc<LibraryView>>,
    pub status: LibraryStatus,
}

impl Default for LibraryState {
    fn default() -> Self {
        Self {
            view: None,
            status: LibraryStatus::Unconfigured,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryStatus {
    Unconfigured,
    Scanning { started: SystemTime },
    Ready(LibraryStats),
    Error(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub tracks: usize,
    pub folders: usize,
    pub genres: usize,
    pub skipped: usize,
    pub from_snapshot: bool,
}

impl LibraryStats {
    pub fn from_view(view: &LibraryView, skipped: usize, from_snapshot: bool) -> Self {
        Self {
            tracks: view.tracks.len(),
            folders: view.folders.len(),
            genres: view.genres.len(),
            skipped,
            from_snapshot,
        }
    }
}

pub mod artist;
pub mod genre_cache;
pub mod scan;
pub mod snapshot;
pub mod source;
pub mod taxonomy;
pub mod tree;

use common::{Folder, GenreBucket, Track};

pub use metadata::RawTags;

pub use artist::{best_artist, is_unknown_artist, normalize_artist_name};
pub use genre_cache::{CacheEntry, CacheError, CachedGenre, GenreCache, NOT_FOUND_MARKER};
pub use scan::{extract_tracks, ExtractReport, ScanReport, ScannedTrack};
pub use snapshot::SnapshotCache;
pub use source::{FsSource, MediaSource, SourceEntry, SourceError};
pub use taxonomy::{map_to_top_genre, TOP_GENRES};
pub use tree::{build_folder_tree, group_by_genre, root_folder};

/// Everything the browsing side needs, derived from one track list.
#[derive(Clone, Debug, Default)]
pub struct LibraryView {
    pub tracks: Vec<Track>,
    pub folders: Vec<Folder>,
    pub genres: Vec<GenreBucket>,
}

impl LibraryView {
    pub fn from_tracks(tracks: Vec<Track>) -> Self {
        let folders = build_folder_tree(&tracks);
        let genres = group_by_genre(&tracks);
        Self {
            tracks,
            folders,
            genres,
        }
    }

    pub fn root(&self) -> Option<Folder> {
        root_folder(&self.tracks)
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

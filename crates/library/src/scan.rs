use common::{join_folder_path, stable_id, strip_extension, Track, UNKNOWN_ALBUM};
use tracing::{debug, info, warn};

use crate::artist::best_artist;
use crate::source::{MediaSource, SourceEntry};
use crate::taxonomy::map_to_top_genre;

/// A phase-1 track plus the raw genre tag it was mapped from, kept so the
/// enrichment pass can fall back to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScannedTrack {
    pub track: Track,
    pub metadata_genre: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct ExtractReport {
    pub tracks: Vec<ScannedTrack>,
    /// Entries that could not be listed or read.
    pub skipped: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub tracks: Vec<Track>,
    pub skipped: usize,
}

/// Walks each root depth first and builds a track for every audio entry.
/// Genres come from the tag only; nothing here touches the network.
pub fn extract_tracks(source: &dyn MediaSource, roots: &[String]) -> ExtractReport {
    let mut report = ExtractReport::default();
    for root in roots {
        let before = report.tracks.len();
        walk(source, root, "", &mut report);
        info!(
            "Scanned {}: {} tracks",
            root,
            report.tracks.len() - before
        );
    }
    if report.skipped > 0 {
        warn!("Skipped {} unreadable entries", report.skipped);
    }
    report
}

fn walk(source: &dyn MediaSource, locator: &str, folder_path: &str, report: &mut ExtractReport) {
    let children = match source.children(locator) {
        Ok(children) => children,
        Err(err) => {
            warn!("Failed to list {}: {}", locator, err);
            report.skipped += 1;
            return;
        }
    };

    for child in children {
        if child.is_directory {
            let sub_path = join_folder_path(folder_path, &child.display_name);
            walk(source, &child.locator, &sub_path, report);
        } else if child.is_audio() {
            match scan_track(source, &child, folder_path) {
                Some(scanned) => report.tracks.push(scanned),
                None => report.skipped += 1,
            }
        }
    }
}

fn scan_track(
    source: &dyn MediaSource,
    entry: &SourceEntry,
    folder_path: &str,
) -> Option<ScannedTrack> {
    let tags = match source.read_tags(&entry.locator) {
        Ok(tags) => tags,
        Err(err) => {
            warn!("Failed to read tags for {}: {}", entry.locator, err);
            return None;
        }
    };

    let title = tags
        .title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| strip_extension(&entry.display_name).to_string());
    let artist = best_artist(tags.artist.as_deref(), &entry.display_name, folder_path);
    let album = tags
        .album
        .filter(|album| !album.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    let genre = map_to_top_genre(tags.genre.as_deref());
    debug!("{} -> {} / {} [{}]", entry.locator, artist, title, genre);

    Some(ScannedTrack {
        track: Track {
            id: stable_id(&entry.locator),
            title,
            artist,
            album,
            duration_ms: tags.duration_ms.unwrap_or(0),
            content_uri: entry.locator.clone(),
            folder_path: folder_path.to_string(),
            genre,
        },
        metadata_genre: tags.genre,
    })
}

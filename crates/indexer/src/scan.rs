use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use common::{Track, OTHER_GENRE};
use library::{
    extract_tracks, is_unknown_artist, normalize_artist_name, CacheError, LibraryView, ScanReport,
    ScannedTrack,
};
use tracing::{info, warn};

use crate::config::{resolve_path, save_config, ConfigError};
use crate::enrich::GenreEnricher;
use crate::state::{AppState, LibraryStats, LibraryStatus};

pub enum FolderChange {
    Add(String),
    Remove(String),
}

/// Publishes the saved snapshot if there is one, otherwise runs both scan
/// phases and saves the result. `force_rescan` discards the snapshot first.
pub async fn start_index(state: &AppState, force_rescan: bool) -> LibraryStatus {
    if force_rescan {
        state.snapshot.clear();
    }

    if let Some(tracks) = state.snapshot.load() {
        info!("Loaded {} tracks from snapshot", tracks.len());
        return publish(state, LibraryView::from_tracks(tracks), 0, true);
    }

    let roots: Vec<String> = {
        let config = state.config.read();
        config
            .source_folders
            .iter()
            .map(|folder| {
                resolve_path(&state.config_path, folder)
                    .to_string_lossy()
                    .to_string()
            })
            .collect()
    };
    if roots.is_empty() {
        info!("No source folders configured yet; add one with `add-folder`.");
        let mut guard = state.library_state.write();
        guard.view = None;
        guard.status = LibraryStatus::Unconfigured;
        return guard.status.clone();
    }

    {
        let mut guard = state.library_state.write();
        guard.status = LibraryStatus::Scanning {
            started: SystemTime::now(),
        };
    }

    match scan_sources(state, roots).await {
        Ok(report) => {
            state.snapshot.save(&report.tracks);
            publish(state, LibraryView::from_tracks(report.tracks), report.skipped, false)
        }
        Err(message) => {
            warn!("Library scan failed: {}", message);
            let mut guard = state.library_state.write();
            guard.view = None;
            guard.status = LibraryStatus::Error(message);
            guard.status.clone()
        }
    }
}

/// Phase 1 on a blocking worker, then genre enrichment for the tracks
/// whose tags did not map onto the taxonomy.
pub async fn scan_sources(state: &AppState, roots: Vec<String>) -> Result<ScanReport, String> {
    let source = Arc::clone(&state.source);
    let extracted = tokio::task::spawn_blocking(move || extract_tracks(source.as_ref(), &roots))
        .await
        .map_err(|err| err.to_string())?;

    let tracks = enrich_tracks(&state.enricher, extracted.tracks).await;
    Ok(ScanReport {
        tracks,
        skipped: extracted.skipped,
    })
}

pub async fn enrich_tracks(enricher: &GenreEnricher, scanned: Vec<ScannedTrack>) -> Vec<Track> {
    let mut seen = HashSet::new();
    let artists: Vec<String> = scanned
        .iter()
        .filter(|item| item.track.genre == OTHER_GENRE && !is_unknown_artist(&item.track.artist))
        .filter(|item| seen.insert(normalize_artist_name(&item.track.artist)))
        .map(|item| item.track.artist.clone())
        .collect();
    info!(
        "Enriching genres: {} tracks, {} unique artists",
        scanned.len(),
        artists.len()
    );
    enricher.prefetch_genres_for_artists(&artists).await;

    let mut tracks = Vec::with_capacity(scanned.len());
    for item in scanned {
        if item.track.genre != OTHER_GENRE {
            tracks.push(item.track);
            continue;
        }
        let genre = enricher
            .genre_for_artist(&item.track.artist, item.metadata_genre.as_deref())
            .await;
        let mut track = item.track;
        track.genre = genre;
        tracks.push(track);
    }
    tracks
}

/// Persists the folder list and rescans when it actually changed.
pub async fn apply_folder_change(
    state: &AppState,
    change: FolderChange,
) -> Result<Option<LibraryStatus>, ConfigError> {
    let updated = {
        let mut config = state.config.write();
        let changed = match &change {
            FolderChange::Add(folder) => config.add_source_folder(folder),
            FolderChange::Remove(folder) => config.remove_source_folder(folder),
        };
        if changed {
            save_config(&state.config_path, &config)?;
        }
        changed
    };
    if !updated {
        return Ok(None);
    }
    info!("Source folders changed; rescanning");
    Ok(Some(start_index(state, true).await))
}

pub async fn clear_genre_cache_and_rescan(state: &AppState) -> Result<LibraryStatus, CacheError> {
    state.enricher.clear_cache()?;
    Ok(start_index(state, true).await)
}

fn publish(
    state: &AppState,
    view: LibraryView,
    skipped: usize,
    from_snapshot: bool,
) -> LibraryStatus {
    let stats = LibraryStats::from_view(&view, skipped, from_snapshot);
    info!(
        "Library ready: {} tracks, {} folders, {} genres",
        stats.tracks, stats.folders, stats.genres
    );
    let mut guard = state.library_state.write();
    guard.view = Some(Arc::new(view));
    guard.status = LibraryStatus::Ready(stats);
    guard.status.clone()
}

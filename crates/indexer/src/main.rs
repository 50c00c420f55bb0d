mod config;
mod connectivity;
mod enrich;
mod external;
mod scan;
mod state;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use common::Folder;
use config::{config_path_from_env, load_or_create_config, resolve_path};
use connectivity::{Connectivity, HostProbe, Offline};
use enrich::GenreEnricher;
use external::LastFmProvider;
use library::{FsSource, GenreCache, SnapshotCache};
use scan::{apply_folder_change, clear_genre_cache_and_rescan, start_index, FolderChange};
use state::{AppState, LibraryStatus};
use tracing::{info, warn};

/// Indexes local music folders into a browsable tree and genre buckets.
#[derive(Parser)]
#[command(name = "music-indexer")]
struct Args {
    /// Path to the YAML config file.
    #[arg(long, env = "MUSIC_INDEXER_CONFIG")]
    config: Option<PathBuf>,

    /// Skip network genre lookups for this run.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load the saved snapshot, or scan if there is none.
    Scan,
    /// Discard the snapshot and rescan.
    Refresh,
    /// Add a source folder and rescan.
    AddFolder { path: String },
    /// Remove a source folder and rescan.
    RemoveFolder { path: String },
    /// List source folders.
    Folders,
    /// Print the folder tree.
    Tree,
    /// Print genre buckets with track counts.
    Genres,
    /// Show what the genre cache holds.
    CacheStats,
    /// Clear the genre cache and rescan.
    ClearGenreCache,
    /// Delete genre cache entries older than the given age.
    PruneGenreCache {
        #[arg(long, default_value = "30")]
        days: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(config_path_from_env);
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Created default config at {:?}", config_path);
    } else {
        info!("Loaded config from {:?}", config_path);
    }

    let cache = GenreCache::open(&resolve_path(&config_path, &config.genre_cache_path))?;
    let provider = LastFmProvider::new(
        &config.lastfm_base_url,
        &config.lastfm_api_key,
        config.request_timeout(),
    )?;
    let connectivity: Arc<dyn Connectivity> = if args.offline || !config.enrichment_enabled {
        info!("Genre enrichment disabled; using cached genres only");
        Arc::new(Offline)
    } else if config.lastfm_api_key.trim().is_empty() {
        warn!("No Last.fm API key configured; using cached genres only");
        Arc::new(Offline)
    } else {
        match HostProbe::for_url(provider.endpoint(), config.probe_timeout()) {
            Some(probe) => Arc::new(probe),
            None => {
                warn!("Cannot probe {}; using cached genres only", provider.endpoint());
                Arc::new(Offline)
            }
        }
    };
    let enricher = Arc::new(GenreEnricher::new(
        cache,
        Arc::new(provider),
        connectivity,
        config.min_request_spacing(),
    ));
    let snapshot = SnapshotCache::new(resolve_path(&config_path, &config.snapshot_path));
    let state = AppState::new(config_path, config, snapshot, enricher, Arc::new(FsSource));

    match args.command.unwrap_or(Command::Scan) {
        Command::Scan => report(&start_index(&state, false).await),
        Command::Refresh => report(&start_index(&state, true).await),
        Command::AddFolder { path } => {
            match apply_folder_change(&state, FolderChange::Add(path.clone())).await? {
                Some(status) => report(&status),
                None => println!("{} is already a source folder", path.trim()),
            }
        }
        Command::RemoveFolder { path } => {
            match apply_folder_change(&state, FolderChange::Remove(path.clone())).await? {
                Some(status) => report(&status),
                None => println!("{} is not a source folder", path.trim()),
            }
        }
        Command::Folders => {
            let folders = state.config.read().source_folders.clone();
            if folders.is_empty() {
                println!("No source folders configured");
            }
            for folder in folders {
                println!("{}", folder);
            }
        }
        Command::Tree => {
            start_index(&state, false).await;
            match state.view().and_then(|view| view.root()) {
                Some(root) => print_folder(&root, 0),
                None => println!("Library is empty"),
            }
        }
        Command::Genres => {
            start_index(&state, false).await;
            let Some(view) = state.view() else {
                println!("Library is empty");
                return Ok(());
            };
            for bucket in &view.genres {
                println!("{:<24} {:>6}", bucket.name, bucket.tracks.len());
            }
        }
        Command::CacheStats => {
            let stats = state.enricher.cache_stats();
            println!("{} cached artists", stats.total_cached);
            for artist in stats.cached_artists {
                println!("  {}", artist);
            }
        }
        Command::ClearGenreCache => report(&clear_genre_cache_and_rescan(&state).await?),
        Command::PruneGenreCache { days } => {
            let removed = state
                .enricher
                .prune(Duration::from_secs(days.saturating_mul(24 * 60 * 60)))?;
            println!("Removed {} entries older than {} days", removed, days);
        }
    }

    Ok(())
}

fn report(status: &LibraryStatus) {
    match status {
        LibraryStatus::Unconfigured => {
            println!("No source folders configured; add one with `add-folder <path>`")
        }
        LibraryStatus::Scanning { .. } => println!("Scan in progress"),
        LibraryStatus::Ready(stats) => {
            let origin = if stats.from_snapshot { "snapshot" } else { "scan" };
            println!(
                "{} tracks in {} top-level folders, {} genres (from {})",
                stats.tracks, stats.folders, stats.genres, origin
            );
            if stats.skipped > 0 {
                println!("{} entries could not be read", stats.skipped);
            }
        }
        LibraryStatus::Error(message) => println!("Scan failed: {}", message),
    }
}

fn print_folder(folder: &Folder, depth: usize) {
    println!(
        "{}{} ({})",
        "  ".repeat(depth),
        folder.name,
        folder.total_track_count()
    );
    for subfolder in &folder.subfolders {
        print_folder(subfolder, depth + 1);
    }
    for track in &folder.tracks {
        println!(
            "{}- {} / {} [{}]",
            "  ".repeat(depth + 1),
            track.artist,
            track.title,
            track.genre
        );
    }
}

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;
pub const CONFIG_ENV: &str = "MUSIC_INDEXER_CONFIG";

const DEFAULT_LASTFM_BASE_URL: &str = "https://ws.audioscrobbler.com/";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
const DEFAULT_MIN_REQUEST_SPACING_MS: u64 = 200;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub version: u32,
    pub source_folders: Vec<String>,
    pub snapshot_path: String,
    pub genre_cache_path: String,
    pub enrichment_enabled: bool,
    pub lastfm_base_url: String,
    pub lastfm_api_key: String,
    pub request_timeout_secs: u64,
    pub min_request_spacing_ms: u64,
    pub connectivity_probe_timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source_folders: Vec::new(),
            snapshot_path: "track_cache.json".to_string(),
            genre_cache_path: "genre_cache.redb".to_string(),
            enrichment_enabled: true,
            lastfm_base_url: DEFAULT_LASTFM_BASE_URL.to_string(),
            lastfm_api_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            min_request_spacing_ms: DEFAULT_MIN_REQUEST_SPACING_MS,
            connectivity_probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

impl IndexerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_spacing(&self) -> Duration {
        Duration::from_millis(self.min_request_spacing_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.connectivity_probe_timeout_secs)
    }

    /// Adds a folder unless an equal entry is already present.
    pub fn add_source_folder(&mut self, folder: &str) -> bool {
        let folder = folder.trim();
        if folder.is_empty() || self.source_folders.iter().any(|f| f == folder) {
            return false;
        }
        self.source_folders.push(folder.to_string());
        true
    }

    pub fn remove_source_folder(&mut self, folder: &str) -> bool {
        let folder = folder.trim();
        let before = self.source_folders.len();
        self.source_folders.retain(|f| f != folder);
        self.source_folders.len() != before
    }

    fn normalize(&mut self) {
        if self.version < CONFIG_VERSION {
            self.version = CONFIG_VERSION;
        }
        if self.snapshot_path.trim().is_empty() {
            self.snapshot_path = "track_cache.json".to_string();
        }
        if self.genre_cache_path.trim().is_empty() {
            self.genre_cache_path = "genre_cache.redb".to_string();
        }
        if self.lastfm_base_url.trim().is_empty() {
            self.lastfm_base_url = DEFAULT_LASTFM_BASE_URL.to_string();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        if self.min_request_spacing_ms == 0 {
            self.min_request_spacing_ms = DEFAULT_MIN_REQUEST_SPACING_MS;
        }
        if self.connectivity_probe_timeout_secs == 0 {
            self.connectivity_probe_timeout_secs = DEFAULT_PROBE_TIMEOUT_SECS;
        }
        self.source_folders.retain(|folder| !folder.trim().is_empty());
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var(CONFIG_ENV) {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => default_config_path(),
    }
}

fn default_config_path() -> PathBuf {
    match env::current_exe() {
        Ok(exe) => exe
            .parent()
            .map(|dir| dir.join("indexer.yaml"))
            .unwrap_or_else(|| PathBuf::from("indexer.yaml")),
        Err(_) => PathBuf::from("indexer.yaml"),
    }
}

pub fn load_or_create_config(path: &Path) -> Result<(IndexerConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: IndexerConfig = if contents.trim().is_empty() {
            IndexerConfig::default()
        } else {
            serde_yaml::from_str(&contents)?
        };
        config.normalize();
        return Ok((config, false));
    }

    let config = IndexerConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &IndexerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Relative paths in the config are taken relative to the config file.
pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}

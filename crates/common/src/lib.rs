use serde::{Deserialize, Serialize};

pub const OTHER_GENRE: &str = "Other";
pub const UNKNOWN_ARTIST: &str = "Unknown";
pub const UNKNOWN_ALBUM: &str = "Unknown";
pub const ROOT_FOLDER_PATH: &str = "root";
pub const ROOT_FOLDER_LABEL: &str = "Music";

/// A scanned audio file. Field names follow the persisted snapshot layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub content_uri: String,
    /// "" for files at a scan root, otherwise a '/'-joined relative path.
    pub folder_path: String,
    pub genre: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Folder {
    pub path: String,
    pub name: String,
    pub tracks: Vec<Track>,
    pub subfolders: Vec<Folder>,
}

impl Folder {
    /// Tracks in this folder followed by those of every subfolder, depth first.
    pub fn all_tracks_recursive(&self) -> Vec<&Track> {
        let mut out: Vec<&Track> = self.tracks.iter().collect();
        for subfolder in &self.subfolders {
            out.extend(subfolder.all_tracks_recursive());
        }
        out
    }

    pub fn total_track_count(&self) -> usize {
        self.tracks.len()
            + self
                .subfolders
                .iter()
                .map(Folder::total_track_count)
                .sum::<usize>()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenreBucket {
    pub name: String,
    pub tracks: Vec<Track>,
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

pub fn join_folder_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Everything before the last '/', or `None` for a top-level path.
pub fn parent_folder_path(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

pub fn folder_name(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Drops a trailing ".ext" when it looks like a file extension.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => {
            let ext = &name[idx + 1..];
            if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                &name[..idx]
            } else {
                name
            }
        }
        _ => name,
    }
}

//! Artist name heuristics: tag metadata first, then filename patterns, then
//! the first folder of the relative path.

use std::sync::OnceLock;

use common::{strip_extension, UNKNOWN_ARTIST};
use regex::Regex;

const INVALID_ARTIST_WORDS: [&str; 14] = [
    "track",
    "unknown",
    "various",
    "va",
    "compilation",
    "soundtrack",
    "ost",
    "original",
    "audio",
    "music",
    "untitled",
    "none",
    "n/a",
    "null",
];

/// Ordered from most to least specific. A leading track number must be
/// consumed before the generic "Artist - Title" split gets a chance.
fn filename_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // "01 - Artist - Title", "01. Artist - Title"
            Regex::new(r"^\d+[.\-\s]+(.+?)\s*-\s*(.+)$").expect("track pattern"),
            // "Artist_-_Title"
            Regex::new(r"^(.+?)_-_(.+)$").expect("underscore pattern"),
            // "Artist - Title"
            Regex::new(r"^(.+?)\s*-\s*(.+)$").expect("artist pattern"),
        ]
    })
}

pub fn best_artist(metadata_artist: Option<&str>, filename: &str, folder_path: &str) -> String {
    if let Some(artist) = metadata_artist.map(str::trim) {
        if !artist.is_empty()
            && !artist.eq_ignore_ascii_case("unknown")
            && is_valid_artist_name(artist)
        {
            return artist.to_string();
        }
    }

    if let Some(artist) = artist_from_filename(filename) {
        return artist;
    }

    if let Some(artist) = artist_from_folder_path(folder_path) {
        return artist;
    }

    UNKNOWN_ARTIST.to_string()
}

pub fn artist_from_filename(filename: &str) -> Option<String> {
    let clean_name = strip_extension(filename).trim();

    for pattern in filename_patterns() {
        let Some(captures) = pattern.captures(clean_name) else {
            continue;
        };
        let Some(group) = captures.get(1) else {
            continue;
        };
        let artist = clean_artist_name(group.as_str());
        if !artist.is_empty() && is_valid_artist_name(&artist) {
            return Some(artist);
        }
    }

    None
}

/// Treats the first folder below the scan root as the artist
/// ("Artist/Album/Track.mp3").
pub fn artist_from_folder_path(folder_path: &str) -> Option<String> {
    let first = folder_path.split('/').find(|part| !part.trim().is_empty())?;
    let artist = clean_artist_name(first);
    if !artist.is_empty() && is_valid_artist_name(&artist) {
        Some(artist)
    } else {
        None
    }
}

pub fn is_valid_artist_name(name: &str) -> bool {
    let normalized = name.to_lowercase();

    if normalized.chars().count() < 2 {
        return false;
    }

    if normalized.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    !INVALID_ARTIST_WORDS.iter().any(|word| {
        normalized == *word
            || normalized
                .strip_prefix(word)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

/// Genre cache key for an artist. Idempotent.
pub fn normalize_artist_name(artist: &str) -> String {
    artist
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('&', "and")
}

/// True when an artist string carries no usable identity.
pub fn is_unknown_artist(artist: &str) -> bool {
    let trimmed = artist.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(UNKNOWN_ARTIST)
}

fn clean_artist_name(value: &str) -> String {
    value
        .replace('_', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

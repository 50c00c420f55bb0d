use std::path::Path;

use lofty::error::LoftyError;
use lofty::prelude::{AudioFile, ItemKey, TaggedFileExt};

/// Tag triples read from a single audio file. Every field is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<u64>,
    pub genre: Option<String>,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

pub fn read_tags(path: &Path) -> Result<RawTags, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut tags = RawTags::default();

    let duration_ms = properties.duration().as_millis();
    if duration_ms > 0 {
        tags.duration_ms = Some(duration_ms.min(u128::from(u64::MAX)) as u64);
    }

    if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
        tags.title = clean_text(tag.get_string(&ItemKey::TrackTitle));
        tags.album = clean_text(tag.get_string(&ItemKey::AlbumTitle));
        let track_artist = clean_text(tag.get_string(&ItemKey::TrackArtist));
        let album_artist = clean_text(tag.get_string(&ItemKey::AlbumArtist));
        tags.artist = track_artist.or(album_artist);
        tags.genre = tag.get_string(&ItemKey::Genre).and_then(clean_genre);
    }

    Ok(tags)
}

fn clean_text(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ID3v2 multi-value frames arrive NUL-separated.
fn clean_genre(value: &str) -> Option<String> {
    let joined = value
        .split('\0')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

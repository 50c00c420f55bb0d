use std::path::Path;

use metadata::{read_tags, MetadataError, RawTags};
use tracing::warn;
use walkdir::WalkDir;

/// One child of a directory as reported by a [`MediaSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceEntry {
    pub is_directory: bool,
    pub display_name: String,
    pub mime_type: Option<String>,
    pub locator: String,
}

impl SourceEntry {
    pub fn is_audio(&self) -> bool {
        !self.is_directory
            && self
                .mime_type
                .as_deref()
                .is_some_and(|mime| mime.starts_with("audio"))
    }
}

/// File tree enumeration and tag extraction, addressed by opaque locators.
pub trait MediaSource: Send + Sync {
    fn children(&self, locator: &str) -> Result<Vec<SourceEntry>, SourceError>;

    fn read_tags(&self, locator: &str) -> Result<RawTags, SourceError>;
}

/// Local filesystem source. Locators are paths.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsSource;

impl MediaSource for FsSource {
    fn children(&self, locator: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let dir = Path::new(locator);
        if !dir.is_dir() {
            return Err(SourceError::NotADirectory(locator.to_string()));
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(dir)
            .follow_links(false)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry under {:?}: {}", dir, err);
                    continue;
                }
            };
            let path = entry.path();
            let is_directory = entry.file_type().is_dir();
            let mime_type = if is_directory {
                None
            } else {
                mime_guess::from_path(path)
                    .first()
                    .map(|mime| mime.essence_str().to_string())
            };
            entries.push(SourceEntry {
                is_directory,
                display_name: entry.file_name().to_string_lossy().to_string(),
                mime_type,
                locator: path.to_string_lossy().to_string(),
            });
        }
        Ok(entries)
    }

    fn read_tags(&self, locator: &str) -> Result<RawTags, SourceError> {
        Ok(read_tags(Path::new(locator))?)
    }
}

#[derive(Debug)]
pub enum SourceError {
    NotADirectory(String),
    Metadata(MetadataError),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::NotADirectory(locator) => write!(f, "not a directory: {}", locator),
            SourceError::Metadata(err) => write!(f, "metadata error: {}", err),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<MetadataError> for SourceError {
    fn from(err: MetadataError) -> Self {
        SourceError::Metadata(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn lists_children_sorted_with_mime_types() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("Jazz")).unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.flac"), b"").unwrap();
        fs::write(dir.path().join("cover.jpg"), b"").unwrap();

        let root = dir.path().to_string_lossy().to_string();
        let children = FsSource.children(&root).unwrap();
        let names: Vec<&str> = children.iter().map(|e| e.display_name.as_str()).collect();
        assert_eq!(names, vec!["Jazz", "a.flac", "b.mp3", "cover.jpg"]);

        assert!(children[0].is_directory);
        assert!(!children[0].is_audio());
        assert!(children[1].is_audio());
        assert!(children[2].is_audio());
        assert!(!children[3].is_audio());
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").to_string_lossy().to_string();
        assert!(matches!(
            FsSource.children(&missing),
            Err(SourceError::NotADirectory(_))
        ));
    }

    #[test]
    fn unreadable_audio_is_a_metadata_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.mp3");
        fs::write(&file, b"not really audio").unwrap();
        let result = FsSource.read_tags(&file.to_string_lossy());
        assert!(matches!(result, Err(SourceError::Metadata(_))));
    }
}

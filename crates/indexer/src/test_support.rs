use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use library::{MediaSource, RawTags, SourceEntry, SourceError};
use tokio::time::Instant;

use crate::connectivity::Connectivity;
use crate::external::{ProviderError, TagProvider};

#[derive(Clone)]
pub enum Reply {
    Tags(Vec<&'static str>),
    Fail,
    NoKey,
}

#[derive(Default)]
pub struct FakeProvider {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl FakeProvider {
    pub fn with(replies: &[(&str, Reply)]) -> Arc<Self> {
        Arc::new(Self {
            replies: replies
                .iter()
                .map(|(artist, reply)| (artist.to_string(), reply.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn called_artists(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(artist, _)| artist.clone())
            .collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, at)| *at).collect()
    }
}

#[async_trait]
impl TagProvider for FakeProvider {
    async fn artist_tags(&self, artist: &str) -> Result<Vec<String>, ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push((artist.to_string(), Instant::now()));
        tokio::task::yield_now().await;
        match self.replies.get(artist) {
            Some(Reply::Tags(tags)) => Ok(tags.iter().map(|t| t.to_string()).collect()),
            Some(Reply::Fail) => Err(ProviderError::Status(500)),
            Some(Reply::NoKey) => Err(ProviderError::MissingApiKey),
            None => Ok(Vec::new()),
        }
    }
}

pub struct FakeConnectivity(pub AtomicBool);

impl FakeConnectivity {
    pub fn online(online: bool) -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(online)))
    }
}

#[async_trait]
impl Connectivity for FakeConnectivity {
    async fn is_online(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// In-memory directory tree. Locators are '/'-joined paths.
#[derive(Default)]
pub struct MemorySource {
    dirs: HashMap<String, Vec<SourceEntry>>,
    tags: HashMap<String, RawTags>,
    pub listings: AtomicUsize,
}

impl MemorySource {
    pub fn add_dir(&mut self, parent: &str, name: &str) -> String {
        let locator = format!("{}/{}", parent, name);
        self.dirs.entry(parent.to_string()).or_default().push(SourceEntry {
            is_directory: true,
            display_name: name.to_string(),
            mime_type: None,
            locator: locator.clone(),
        });
        self.dirs.entry(locator.clone()).or_default();
        locator
    }

    pub fn add_root(&mut self, locator: &str) {
        self.dirs.entry(locator.to_string()).or_default();
    }

    pub fn add_file(&mut self, parent: &str, name: &str, tags: RawTags) {
        let locator = format!("{}/{}", parent, name);
        self.dirs.entry(parent.to_string()).or_default().push(SourceEntry {
            is_directory: false,
            display_name: name.to_string(),
            mime_type: Some("audio/mpeg".to_string()),
            locator: locator.clone(),
        });
        self.tags.insert(locator, tags);
    }
}

impl MediaSource for MemorySource {
    fn children(&self, locator: &str) -> Result<Vec<SourceEntry>, SourceError> {
        self.listings.fetch_add(1, Ordering::Relaxed);
        self.dirs
            .get(locator)
            .cloned()
            .ok_or_else(|| SourceError::NotADirectory(locator.to_string()))
    }

    fn read_tags(&self, locator: &str) -> Result<RawTags, SourceError> {
        self.tags
            .get(locator)
            .cloned()
            .ok_or_else(|| SourceError::NotADirectory(locator.to_string()))
    }
}

pub fn tags(artist: Option<&str>, genre: Option<&str>) -> RawTags {
    RawTags {
        title: None,
        artist: artist.map(str::to_string),
        album: None,
        duration_ms: Some(200_000),
        genre: genre.map(str::to_string),
    }
}

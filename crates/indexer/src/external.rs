use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

/// Source of community tags for an artist, most relevant first.
#[async_trait]
pub trait TagProvider: Send + Sync {
    async fn artist_tags(&self, artist: &str) -> Result<Vec<String>, ProviderError>;
}

#[derive(Debug)]
pub enum ProviderError {
    MissingApiKey,
    InvalidUrl(String),
    Http(reqwest::Error),
    Status(u16),
    Decode(serde_json::Error),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::MissingApiKey => write!(f, "api key is required"),
            ProviderError::InvalidUrl(url) => write!(f, "invalid base url: {}", url),
            ProviderError::Http(err) => write!(f, "http error: {}", err),
            ProviderError::Status(status) => write!(f, "http {}", status),
            ProviderError::Decode(err) => write!(f, "decode error: {}", err),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err)
    }
}

/// `artist.getinfo` against the Last.fm 2.0 API.
pub struct LastFmProvider {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl LastFmProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent("music-indexer/0.1")
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: api_endpoint(base_url)?,
            api_key: api_key.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl TagProvider for LastFmProvider {
    async fn artist_tags(&self, artist: &str) -> Result<Vec<String>, ProviderError> {
        if self.api_key.is_empty() {
            return Err(ProviderError::MissingApiKey);
        }
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("method", "artist.getinfo"),
                ("artist", artist),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        parse_artist_tags(&body)
    }
}

pub fn api_endpoint(base_url: &str) -> Result<Url, ProviderError> {
    let trimmed = base_url.trim();
    let base = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&base)
        .and_then(|url| url.join("2.0/"))
        .map_err(|_| ProviderError::InvalidUrl(trimmed.to_string()))
}

#[derive(Deserialize)]
struct ArtistInfoResponse {
    artist: Option<ArtistInfo>,
    error: Option<i64>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ArtistInfo {
    tags: Option<TagsField>,
}

// Last.fm sends an object for one tag, an array for several, and an empty
// string when there are none.
#[derive(Deserialize)]
#[serde(untagged)]
enum TagsField {
    Tags { tag: OneOrMany },
    Other(serde_json::Value),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<LastFmTag>),
    One(LastFmTag),
}

#[derive(Deserialize)]
struct LastFmTag {
    name: String,
}

pub fn parse_artist_tags(body: &str) -> Result<Vec<String>, ProviderError> {
    let payload: ArtistInfoResponse = serde_json::from_str(body)?;
    if let Some(code) = payload.error {
        debug!(
            "Last.fm error {}: {}",
            code,
            payload.message.as_deref().unwrap_or("")
        );
        return Ok(Vec::new());
    }
    let tags = match payload.artist.and_then(|artist| artist.tags) {
        Some(TagsField::Tags { tag: OneOrMany::Many(tags) }) => tags,
        Some(TagsField::Tags { tag: OneOrMany::One(tag) }) => vec![tag],
        Some(TagsField::Other(_)) | None => Vec::new(),
    };
    Ok(tags
        .into_iter()
        .map(|tag| tag.name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect())
}

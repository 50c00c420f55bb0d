use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use library::genre_cache::CacheEntry;
use library::{
    is_unknown_artist, map_to_top_genre, normalize_artist_name, CacheError, CachedGenre,
    GenreCache,
};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::connectivity::Connectivity;
use crate::external::{ProviderError, TagProvider};

const MIN_TAG_LEN: usize = 3;

// A tag is discarded when it equals or contains any of these.
const IGNORED_TAGS: &[&str] = &[
    "swedish",
    "british",
    "american",
    "german",
    "french",
    "japanese",
    "korean",
    "norwegian",
    "finnish",
    "italian",
    "spanish",
    "brazilian",
    "australian",
    "canadian",
    "irish",
    "dutch",
    "belgian",
    "russian",
    "polish",
    "austrian",
    "uk",
    "usa",
    "female vocalists",
    "male vocalists",
    "female vocalist",
    "male vocalist",
    "female",
    "male",
    "vocalist",
    "vocalists",
    "singer",
    "artists",
    "60s",
    "70s",
    "80s",
    "90s",
    "00s",
    "2000s",
    "2010s",
    "2020s",
    "1960s",
    "1970s",
    "1980s",
    "1990s",
    "seen live",
    "favorites",
    "favourite",
    "love",
    "loved",
    "my music",
    "under 2000 listeners",
    "spotify",
    "beautiful",
    "awesome",
    "cool",
    "good",
    "great",
    "best",
    "albums i own",
    "top 100",
];

/// Outcome of one provider lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    NotFound,
    Unreachable,
    ProviderError(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_cached: usize,
    pub cached_artists: Vec<String>,
}

/// Resolves artist genres through the persistent cache and the tag provider.
///
/// All provider calls go through one exclusive section and are spaced at
/// least `min_spacing` apart. The cache is re-checked inside that section so
/// concurrent lookups for the same artist issue a single request.
pub struct GenreEnricher {
    cache: GenreCache,
    provider: Arc<dyn TagProvider>,
    connectivity: Arc<dyn Connectivity>,
    min_spacing: Duration,
    last_call: Mutex<Option<Instant>>,
    offline_logged: AtomicBool,
}

impl GenreEnricher {
    pub fn new(
        cache: GenreCache,
        provider: Arc<dyn TagProvider>,
        connectivity: Arc<dyn Connectivity>,
        min_spacing: Duration,
    ) -> Self {
        Self {
            cache,
            provider,
            connectivity,
            min_spacing,
            last_call: Mutex::new(None),
            offline_logged: AtomicBool::new(false),
        }
    }

    /// Never fails: every path ends in a usable genre label.
    pub async fn genre_for_artist(&self, artist: &str, metadata_genre: Option<&str>) -> String {
        if is_unknown_artist(artist) {
            return map_to_top_genre(metadata_genre);
        }

        let key = normalize_artist_name(artist);
        match self.cached(&key) {
            Some(CachedGenre::Genre(genre)) => return genre,
            Some(CachedGenre::NotFound) => return map_to_top_genre(metadata_genre),
            None => {}
        }

        match self.lookup(artist, &key).await {
            Lookup::Found(genre) => genre,
            Lookup::NotFound | Lookup::Unreachable => map_to_top_genre(metadata_genre),
            Lookup::ProviderError(message) => {
                debug!("Falling back for {}: {}", artist, message);
                map_to_top_genre(metadata_genre)
            }
        }
    }

    /// Queries the provider for an artist that missed the cache and records
    /// the outcome. Unreachable results are not cached.
    pub async fn lookup(&self, artist: &str, key: &str) -> Lookup {
        if !self.connectivity.is_online().await {
            if !self.offline_logged.swap(true, Ordering::Relaxed) {
                info!("Network unavailable; skipping genre lookups");
            }
            return Lookup::Unreachable;
        }
        self.offline_logged.store(false, Ordering::Relaxed);

        let mut last_call = self.last_call.lock().await;

        match self.cached(key) {
            Some(CachedGenre::Genre(genre)) => return Lookup::Found(genre),
            Some(CachedGenre::NotFound) => return Lookup::NotFound,
            None => {}
        }

        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_spacing {
                tokio::time::sleep(self.min_spacing - elapsed).await;
            }
        }
        *last_call = Some(Instant::now());

        match self.provider.artist_tags(artist).await {
            Ok(tags) => match first_genre_tag(&tags) {
                Some(tag) => {
                    let genre = canonical_genre(&tag);
                    info!("Genre for {}: {}", artist, genre);
                    self.store(key, CacheEntry::found(genre.clone(), Some(tags.join(", "))));
                    Lookup::Found(genre)
                }
                None => {
                    debug!("No usable tags for {}", artist);
                    self.store(key, CacheEntry::not_found());
                    Lookup::NotFound
                }
            },
            Err(ProviderError::MissingApiKey) => {
                if !self.offline_logged.swap(true, Ordering::Relaxed) {
                    info!("No Last.fm API key configured; skipping genre lookups");
                }
                Lookup::Unreachable
            }
            Err(err) => {
                warn!("Genre lookup failed for {}: {}", artist, err);
                self.store(key, CacheEntry::not_found());
                Lookup::ProviderError(err.to_string())
            }
        }
    }

    /// Warms the cache for a batch of artists. Returns how many distinct
    /// uncached artists were looked up.
    pub async fn prefetch_genres_for_artists(&self, artists: &[String]) -> usize {
        let mut seen = HashSet::new();
        let mut looked_up = 0;
        for artist in artists {
            if is_unknown_artist(artist) {
                continue;
            }
            let key = normalize_artist_name(artist);
            if !seen.insert(key.clone()) || self.is_cached(&key) {
                continue;
            }
            self.lookup(artist, &key).await;
            looked_up += 1;
        }
        looked_up
    }

    pub fn cache_stats(&self) -> CacheStats {
        match self.cache.artists() {
            Ok(cached_artists) => CacheStats {
                total_cached: cached_artists.len(),
                cached_artists,
            },
            Err(err) => {
                warn!("Failed to read genre cache: {}", err);
                CacheStats::default()
            }
        }
    }

    pub fn clear_cache(&self) -> Result<(), CacheError> {
        self.cache.clear_all()?;
        info!("Cleared genre cache");
        Ok(())
    }

    pub fn prune(&self, max_age: Duration) -> Result<usize, CacheError> {
        let removed = self.cache.clear_older_than_age(max_age)?;
        info!("Pruned {} genre cache entries", removed);
        Ok(removed)
    }

    fn cached(&self, key: &str) -> Option<CachedGenre> {
        match self.cache.genre(key) {
            Ok(cached) => cached,
            Err(err) => {
                warn!("Genre cache read failed for {}: {}", key, err);
                None
            }
        }
    }

    fn is_cached(&self, key: &str) -> bool {
        match self.cache.contains(key) {
            Ok(found) => found,
            Err(err) => {
                warn!("Genre cache read failed for {}: {}", key, err);
                false
            }
        }
    }

    fn store(&self, key: &str, entry: CacheEntry) {
        if let Err(err) = self.cache.put(key, &entry) {
            warn!("Genre cache write failed for {}: {}", key, err);
        }
    }
}

/// First tag in provider order that survives the ignore list.
pub fn first_genre_tag(tags: &[String]) -> Option<String> {
    tags.iter()
        .map(|tag| tag.trim())
        .find(|tag| is_usable_tag(tag))
        .map(str::to_string)
}

fn is_usable_tag(tag: &str) -> bool {
    let lower = tag.to_lowercase();
    if lower.chars().count() < MIN_TAG_LEN {
        return false;
    }
    !IGNORED_TAGS
        .iter()
        .any(|ignored| lower == *ignored || lower.contains(ignored))
}

pub fn canonical_genre(tag: &str) -> String {
    match tag.to_lowercase().as_str() {
        "r&b" | "rnb" => return "R&B".to_string(),
        "hip-hop" | "hip hop" => return "Hip-Hop".to_string(),
        "edm" => return "EDM".to_string(),
        "j-pop" | "jpop" => return "J-Pop".to_string(),
        "k-pop" | "kpop" => return "K-Pop".to_string(),
        "lo-fi" | "lofi" => return "Lo-Fi".to_string(),
        _ => {}
    }
    if tag.contains('-') {
        tag.split('-')
            .map(capitalize_first)
            .collect::<Vec<_>>()
            .join("-")
    } else {
        capitalize_first(tag)
    }
}

fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::HostProbe;
    use crate::external::LastFmProvider;
    use crate::test_support::{FakeConnectivity, FakeProvider, Reply};
    use library::NOT_FOUND_MARKER;

    fn enricher(
        provider: Arc<FakeProvider>,
        online: bool,
    ) -> (tempfile::TempDir, GenreCache, GenreEnricher) {
        let dir = tempfile::tempdir().unwrap();
        let cache = GenreCache::open(&dir.path().join("genre_cache.redb")).unwrap();
        let enricher = GenreEnricher::new(
            cache.clone(),
            provider,
            FakeConnectivity::online(online),
            Duration::from_millis(200),
        );
        (dir, cache, enricher)
    }

    #[test]
    fn filters_ignored_and_short_tags() {
        let tags: Vec<String> = ["seen live", "Female Vocalists", "80s", "UK", "ok", "indie rock"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(first_genre_tag(&tags), Some("indie rock".to_string()));

        let contains: Vec<String> = ["british rock", "uk garage", "trip-hop"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(first_genre_tag(&contains), Some("trip-hop".to_string()));

        let none: Vec<String> = ["american", "90s", "awesome"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        assert_eq!(first_genre_tag(&none), None);
        assert_eq!(first_genre_tag(&[]), None);
    }

    #[test]
    fn canonicalizes_capitalization() {
        assert_eq!(canonical_genre("rnb"), "R&B");
        assert_eq!(canonical_genre("r&b"), "R&B");
        assert_eq!(canonical_genre("hip hop"), "Hip-Hop");
        assert_eq!(canonical_genre("EDM"), "EDM");
        assert_eq!(canonical_genre("kpop"), "K-Pop");
        assert_eq!(canonical_genre("j-pop"), "J-Pop");
        assert_eq!(canonical_genre("lofi"), "Lo-Fi");
        assert_eq!(canonical_genre("post-punk"), "Post-Punk");
        assert_eq!(canonical_genre("trip-hop"), "Trip-Hop");
        assert_eq!(canonical_genre("indie rock"), "Indie rock");
        assert_eq!(canonical_genre("shoegaze"), "Shoegaze");
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_misses_are_spaced() {
        let provider = FakeProvider::with(&[
            ("Radiohead", Reply::Tags(vec!["alternative"])),
            ("Portishead", Reply::Tags(vec!["trip-hop"])),
            ("Massive Attack", Reply::Tags(vec!["electronic"])),
        ]);
        let (_dir, _cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(enricher.genre_for_artist("Radiohead", None).await, "Alternative");
        assert_eq!(enricher.genre_for_artist("Portishead", None).await, "Trip-Hop");
        assert_eq!(
            enricher.genre_for_artist("Massive Attack", None).await,
            "Electronic"
        );

        let times = provider.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_misses_queue_with_spacing() {
        let provider = FakeProvider::with(&[
            ("Radiohead", Reply::Tags(vec!["alternative"])),
            ("Portishead", Reply::Tags(vec!["trip-hop"])),
            ("Massive Attack", Reply::Tags(vec!["electronic"])),
        ]);
        let (_dir, _cache, enricher) = enricher(provider.clone(), true);

        let (first, second, third) = tokio::join!(
            enricher.genre_for_artist("Radiohead", None),
            enricher.genre_for_artist("Portishead", None),
            enricher.genre_for_artist("Massive Attack", None)
        );
        assert_eq!(first, "Alternative");
        assert_eq!(second, "Trip-Hop");
        assert_eq!(third, "Electronic");

        let times = provider.call_times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(200));
        }
    }

    #[tokio::test]
    async fn dropped_network_is_not_negatively_cached() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let probe = HostProbe::new("127.0.0.1", port, Duration::from_secs(2));
        assert!(probe.is_online().await);

        let dir = tempfile::tempdir().unwrap();
        let cache = GenreCache::open(&dir.path().join("genre_cache.redb")).unwrap();
        let provider = LastFmProvider::new(
            &format!("http://127.0.0.1:{}", port),
            "test-key",
            Duration::from_secs(2),
        )
        .unwrap();
        let enricher = GenreEnricher::new(
            cache.clone(),
            Arc::new(provider),
            Arc::new(probe),
            Duration::from_millis(200),
        );
        drop(listener);

        assert_eq!(
            enricher.genre_for_artist("Radiohead", Some("Art Rock")).await,
            "Rock"
        );
        assert_eq!(enricher.lookup("Radiohead", "radiohead").await, Lookup::Unreachable);
        assert!(!cache.contains("radiohead").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn cached_genre_skips_provider() {
        let provider = FakeProvider::with(&[("Nina Simone", Reply::Tags(vec!["jazz", "soul"]))]);
        let (_dir, cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(enricher.genre_for_artist("Nina Simone", None).await, "Jazz");
        assert_eq!(enricher.genre_for_artist("  nina   SIMONE ", None).await, "Jazz");
        assert_eq!(provider.call_count(), 1);

        let entry = cache.entry("nina simone").unwrap().unwrap();
        assert_eq!(entry.genre, "Jazz");
        assert_eq!(entry.raw_tags.as_deref(), Some("jazz, soul"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_usable_tags_is_negatively_cached() {
        let provider =
            FakeProvider::with(&[("Abba", Reply::Tags(vec!["swedish", "seen live", "70s"]))]);
        let (_dir, cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(enricher.genre_for_artist("Abba", Some("Europop")).await, "Pop");
        assert_eq!(cache.entry("abba").unwrap().unwrap().genre, NOT_FOUND_MARKER);

        assert_eq!(enricher.genre_for_artist("Abba", Some("Disco")).await, "Other");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn provider_failure_is_negatively_cached() {
        let provider = FakeProvider::with(&[("Burial", Reply::Fail)]);
        let (_dir, cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(
            enricher.lookup("Burial", "burial").await,
            Lookup::ProviderError("http 500".to_string())
        );
        assert!(cache.contains("burial").unwrap());
        assert_eq!(enricher.genre_for_artist("Burial", Some("Dubstep")).await, "Electronic");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_lookup_writes_nothing() {
        let provider = FakeProvider::with(&[("Bjork", Reply::Tags(vec!["electronic"]))]);
        let (_dir, cache, enricher) = enricher(provider.clone(), false);

        assert_eq!(enricher.genre_for_artist("Bjork", Some("Art Pop")).await, "Pop");
        assert_eq!(enricher.lookup("Bjork", "bjork").await, Lookup::Unreachable);
        assert_eq!(provider.call_count(), 0);
        assert!(!cache.contains("bjork").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn missing_api_key_writes_nothing() {
        let provider = FakeProvider::with(&[("Bjork", Reply::NoKey)]);
        let (_dir, cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(enricher.genre_for_artist("Bjork", None).await, "Other");
        assert!(!cache.contains("bjork").unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_artist_uses_metadata_only() {
        let provider = FakeProvider::with(&[]);
        let (_dir, cache, enricher) = enricher(provider.clone(), true);

        assert_eq!(enricher.genre_for_artist("Unknown", Some("Jazz")).await, "Jazz");
        assert_eq!(enricher.genre_for_artist("   ", None).await, "Other");
        assert_eq!(provider.call_count(), 0);
        assert_eq!(cache.count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_lookups_share_one_request() {
        let provider = FakeProvider::with(&[(
            "The Beatles",
            Reply::Tags(vec!["classic rock", "british", "60s"]),
        )]);
        let (_dir, _cache, enricher) = enricher(provider.clone(), true);

        let (first, second) = tokio::join!(
            enricher.genre_for_artist("The Beatles", None),
            enricher.genre_for_artist("The Beatles", None)
        );
        assert_eq!(first, "Classic rock");
        assert_eq!(second, "Classic rock");
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn prefetch_stats_and_clear() {
        let provider = FakeProvider::with(&[
            ("Air", Reply::Tags(vec!["electronic"])),
            ("Daft Punk", Reply::Tags(vec!["house"])),
        ]);
        let (_dir, _cache, enricher) = enricher(provider.clone(), true);

        let artists = vec![
            "Air".to_string(),
            "air".to_string(),
            "Unknown".to_string(),
            "Daft Punk".to_string(),
        ];
        assert_eq!(enricher.prefetch_genres_for_artists(&artists).await, 2);
        assert_eq!(provider.call_count(), 2);
        assert_eq!(enricher.prefetch_genres_for_artists(&artists).await, 0);
        assert_eq!(provider.call_count(), 2);

        let stats = enricher.cache_stats();
        assert_eq!(stats.total_cached, 2);
        assert_eq!(
            stats.cached_artists,
            vec!["air".to_string(), "daft punk".to_string()]
        );

        enricher.clear_cache().unwrap();
        assert_eq!(enricher.cache_stats(), CacheStats::default());
    }
}

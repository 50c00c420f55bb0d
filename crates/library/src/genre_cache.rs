use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition, TableError,
    TransactionError,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

const ARTIST_GENRE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("artist_genre_cache");

/// Stored in place of a genre when a lookup found nothing usable.
pub const NOT_FOUND_MARKER: &str = "_UNKNOWN_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub genre: String,
    pub raw_tags: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub last_updated: u64,
}

impl CacheEntry {
    pub fn found(genre: String, raw_tags: Option<String>) -> Self {
        Self {
            genre,
            raw_tags,
            last_updated: now_millis(),
        }
    }

    pub fn not_found() -> Self {
        Self {
            genre: NOT_FOUND_MARKER.to_string(),
            raw_tags: None,
            last_updated: now_millis(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.genre == NOT_FOUND_MARKER
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CachedGenre {
    Genre(String),
    NotFound,
}

/// Persistent artist → genre table keyed by normalized artist name.
#[derive(Clone)]
pub struct GenreCache {
    db: Arc<Database>,
}

impl GenreCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let db = if path.exists() {
            Database::open(path)?
        } else {
            Database::create(path)?
        };
        Self::with_db(Arc::new(db))
    }

    pub fn with_db(db: Arc<Database>) -> Result<Self, CacheError> {
        let cache = Self { db };
        cache.init_tables()?;
        Ok(cache)
    }

    fn init_tables(&self) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(ARTIST_GENRE_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn genre(&self, artist_key: &str) -> Result<Option<CachedGenre>, CacheError> {
        Ok(self.entry(artist_key)?.map(|entry| {
            if entry.is_not_found() {
                CachedGenre::NotFound
            } else {
                CachedGenre::Genre(entry.genre)
            }
        }))
    }

    /// Undecodable entries read as absent.
    pub fn entry(&self, artist_key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ARTIST_GENRE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let Some(value) = table.get(artist_key)? else {
            return Ok(None);
        };
        match bincode::deserialize::<CacheEntry>(value.value()) {
            Ok(entry) => Ok(Some(entry)),
            Err(err) => {
                warn!("Discarding corrupt genre cache entry {:?}: {}", artist_key, err);
                Ok(None)
            }
        }
    }

    pub fn put(&self, artist_key: &str, entry: &CacheEntry) -> Result<(), CacheError> {
        let bytes = bincode::serialize(entry)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ARTIST_GENRE_TABLE)?;
            table.insert(artist_key, bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn insert_all(&self, entries: &[(String, CacheEntry)]) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(ARTIST_GENRE_TABLE)?;
            for (key, entry) in entries {
                let bytes = bincode::serialize(entry)?;
                table.insert(key.as_str(), bytes.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn contains(&self, artist_key: &str) -> Result<bool, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ARTIST_GENRE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let found = table.get(artist_key)?.is_some();
        Ok(found)
    }

    pub fn count(&self) -> Result<usize, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ARTIST_GENRE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        Ok(table.len()? as usize)
    }

    pub fn artists(&self) -> Result<Vec<String>, CacheError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(ARTIST_GENRE_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut artists = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            artists.push(entry.0.value().to_string());
        }
        Ok(artists)
    }

    pub fn clear_all(&self) -> Result<(), CacheError> {
        let write_txn = self.db.begin_write()?;
        match write_txn.delete_table(ARTIST_GENRE_TABLE) {
            Ok(_) | Err(TableError::TableDoesNotExist(_)) => {}
            Err(err) => return Err(err.into()),
        }
        {
            let _ = write_txn.open_table(ARTIST_GENRE_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Deletes entries last updated before `threshold_ms`. Returns the number
    /// removed; undecodable entries are removed as well.
    pub fn clear_older_than(&self, threshold_ms: u64) -> Result<usize, CacheError> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(ARTIST_GENRE_TABLE)?;
            let mut stale = Vec::new();
            for entry in table.iter()? {
                let (key, value) = entry?;
                let expired = match bincode::deserialize::<CacheEntry>(value.value()) {
                    Ok(entry) => entry.last_updated < threshold_ms,
                    Err(_) => true,
                };
                if expired {
                    stale.push(key.value().to_string());
                }
            }
            for key in &stale {
                table.remove(key.as_str())?;
            }
            stale.len()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn clear_older_than_age(&self, max_age: Duration) -> Result<usize, CacheError> {
        let age_ms = u64::try_from(max_age.as_millis()).unwrap_or(u64::MAX);
        self.clear_older_than(now_millis().saturating_sub(age_ms))
    }
}

#[derive(Debug)]
pub enum CacheError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Io(err) => write!(f, "io error: {}", err),
            CacheError::Redb(err) => write!(f, "db error: {}", err),
            CacheError::Bincode(err) => write!(f, "bincode error: {}", err),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err)
    }
}

impl From<redb::Error> for CacheError {
    fn from(err: redb::Error) -> Self {
        CacheError::Redb(err)
    }
}

impl From<DatabaseError> for CacheError {
    fn from(err: DatabaseError) -> Self {
        CacheError::Redb(err.into())
    }
}

impl From<TableError> for CacheError {
    fn from(err: TableError) -> Self {
        CacheError::Redb(err.into())
    }
}

impl From<TransactionError> for CacheError {
    fn from(err: TransactionError) -> Self {
        CacheError::Redb(err.into())
    }
}

impl From<StorageError> for CacheError {
    fn from(err: StorageError) -> Self {
        CacheError::Redb(err.into())
    }
}

impl From<CommitError> for CacheError {
    fn from(err: CommitError) -> Self {
        CacheError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for CacheError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        CacheError::Bincode(err)
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|value| u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

//! TTL snapshot cache for enriched category data.
//!
//! [`CacheStore`] encodes each snapshot as a JSON [`CacheEntry`] and hands
//! the bytes to a [`Storage`] backend. Entries older than the TTL are deleted
//! on read, and so are entries that fail to parse, so a corrupt file costs one
//! refetch and is never reported to the caller.
//!
//! There is no cross-process locking. Two writers for the same key race and
//! the last rename wins, which is fine because a key only ever holds the
//! latest snapshot of one category.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::clock::{elapsed, to_chrono, Clock};
use crate::config;
use crate::error::{ListingsError, Result};
use crate::models::CategoryData;

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Key to bytes persistence used by [`CacheStore`].
pub trait Storage: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Replace the value for `key`. Readers must never observe a partial write.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Remove `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// One `<key>.json` file per entry inside a cache directory.
pub struct FileStorage {
    /// Directory where cached snapshots are stored.
    pub cache_dir: PathBuf,
}

impl FileStorage {
    /// Create file storage rooted at `cache_dir`, or the platform default
    /// cache directory when `None`. Creates the directory if needed.
    pub fn new(cache_dir: Option<PathBuf>) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self { cache_dir: dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", key))
    }
}

impl Storage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        // Temp file in the same directory so the final rename stays on one filesystem.
        let mut tmp = NamedTempFile::new_in(&self.cache_dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove all cached files and recreate the cache directory.
    fn clear(&self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }
}

/// Process-local storage, handy for tests and short-lived tools.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.entries
            .lock()
            .map_err(|_| ListingsError::InvalidArgument("memory storage lock poisoned".into()))
    }
}

impl Storage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.lock()?.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// CacheEntry / CachedSnapshot
// ---------------------------------------------------------------------------

/// At-rest snapshot record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// `None` when the TTL reaches past any representable timestamp.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub payload: CategoryData,
}

/// A cache hit: the stored payload and how old it is.
#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub payload: CategoryData,
    pub age: Duration,
}

// ---------------------------------------------------------------------------
// CacheStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct CacheStore {
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CacheStore {
    pub fn new(storage: Arc<dyn Storage>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            storage,
            clock,
            ttl,
        }
    }

    /// Convenience constructor for a [`FileStorage`] backed store.
    pub fn in_dir<P: AsRef<Path>>(dir: P, clock: Arc<dyn Clock>, ttl: Duration) -> Result<Self> {
        let storage = FileStorage::new(Some(dir.as_ref().to_path_buf()))?;
        Ok(Self::new(Arc::new(storage), clock, ttl))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Storage key for a category.
    ///
    /// ASCII letters, digits and `-` pass through; every other byte,
    /// including `_`, becomes `_XX` hex. Distinct ids therefore never share
    /// a key, and the result is safe as a file name.
    pub fn key_for(category_id: &str) -> String {
        let mut key = String::with_capacity(9 + category_id.len());
        key.push_str("category_");
        for byte in category_id.bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'-' {
                key.push(byte as char);
            } else {
                let _ = write!(key, "_{:02X}", byte);
            }
        }
        key
    }

    /// Return the snapshot for `key` if it exists, parses and is within TTL.
    ///
    /// Corrupt and expired entries are deleted. Storage errors are logged and
    /// reported as a miss.
    pub fn get(&self, key: &str) -> Option<CachedSnapshot> {
        let bytes = match self.storage.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(key, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let entry = match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.key == key => entry,
            Ok(entry) => {
                warn!(key, stored_key = %entry.key, "cache entry key mismatch -- removing");
                self.evict(key);
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry -- removing");
                self.evict(key);
                return None;
            }
        };

        let age = elapsed(entry.created_at, self.clock.now());
        if age > self.ttl {
            info!(key, age_secs = age.as_secs(), "cache entry expired -- removing");
            self.evict(key);
            return None;
        }

        debug!(key, age_secs = age.as_secs(), "cache hit");
        Some(CachedSnapshot {
            payload: entry.payload,
            age,
        })
    }

    /// Store `payload` under `key`, stamped with the current time.
    pub fn set(&self, key: &str, payload: &CategoryData) -> Result<()> {
        let created_at = self.clock.now();
        let entry = CacheEntry {
            key: key.to_string(),
            created_at,
            expires_at: expiry(created_at, self.ttl),
            payload: payload.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&entry)?;
        self.storage.write(key, &bytes)?;
        debug!(key, bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.storage.remove(key)
    }

    /// Age of the live entry for `key`, or `None` if there is no live entry.
    pub fn age(&self, key: &str) -> Option<Duration> {
        self.get(key).map(|snapshot| snapshot.age)
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        self.storage.clear()
    }

    fn evict(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!(key, error = %e, "failed to remove cache entry");
        }
    }
}

/// `created_at + ttl`, or `None` past year 9999 so the record stays valid RFC 3339.
fn expiry(created_at: DateTime<Utc>, ttl: Duration) -> Option<DateTime<Utc>> {
    created_at
        .checked_add_signed(to_chrono(ttl))
        .filter(|t| t.year() <= 9999)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_none_when_ttl_is_unbounded() {
        let now = Utc::now();
        assert_eq!(expiry(now, Duration::MAX), None);
        assert_eq!(
            expiry(now, Duration::from_secs(60)),
            Some(now + chrono::Duration::seconds(60))
        );
    }

    #[test]
    fn key_keeps_plain_ids_readable() {
        assert_eq!(CacheStore::key_for("9355"), "category_9355");
        assert_eq!(CacheStore::key_for("abc-DEF"), "category_abc-DEF");
    }

    #[test]
    fn key_escapes_everything_else() {
        assert_eq!(CacheStore::key_for("a/b"), "category_a_2Fb");
        assert_eq!(CacheStore::key_for("a_b"), "category_a_5Fb");
        assert_eq!(CacheStore::key_for("../x"), "category__2E_2E_2Fx");
    }

    #[test]
    fn keys_do_not_collide_on_escape_lookalikes() {
        // "_2F" literally vs "/" escaped.
        assert_ne!(CacheStore::key_for("_2F"), CacheStore::key_for("/"));
        assert_ne!(CacheStore::key_for("a b"), CacheStore::key_for("a_b"));
        assert_ne!(CacheStore::key_for("é"), CacheStore::key_for("e"));
    }

    #[test]
    fn memory_storage_roundtrip_and_remove() {
        let storage = MemoryStorage::new();
        storage.write("k", b"v").unwrap();
        assert_eq!(storage.read("k").unwrap(), Some(b"v".to_vec()));
        storage.remove("k").unwrap();
        storage.remove("k").unwrap();
        assert_eq!(storage.read("k").unwrap(), None);
    }
}

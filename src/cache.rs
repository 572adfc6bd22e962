//! Key/value cache with per-key max-age.
//!
//! [`FileCache`] keeps one `<key>.json` file per key in a directory; an
//! entry's age is its file's modification time.  Writes go through a
//! temporary file and a rename, so a concurrent reader sees either the old
//! or the new value.  Stale reads are tolerated.

use crate::traits::CacheStore;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

pub const RELAY_LIST_KEY: &str = "mullvad_relay_list";
pub const VERSION_KEY: &str = "mullvad_version";
pub const ACCOUNT_KEY: &str = "mullvad_account";

/// Errors from reading or writing the cache directory.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache encode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cache store error: {0}")]
    Backend(String),
}

/// Return the cached value for `key`, or compute, store and return it.
///
/// A corrupt entry counts as a miss.  A failed store is logged and the
/// freshly computed value is still returned.
pub fn cached_data<S, T, E>(
    store: &S,
    key: &str,
    max_age: Duration,
    compute: impl FnOnce() -> Result<T, E>,
) -> Result<T, E>
where
    S: CacheStore,
    T: Serialize + DeserializeOwned,
{
    if let Some(raw) = store.load(key, max_age) {
        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("cache hit: {}", key);
                return Ok(value);
            }
            Err(e) => warn!("discarding corrupt cache entry {}: {}", key, e),
        }
    }
    debug!("cache miss: {}", key);
    let value = compute()?;
    if let Err(e) = store_data(store, key, &value) {
        warn!("failed to cache {}: {}", key, e);
    }
    Ok(value)
}

/// Serialize `value` and overwrite `key`.
pub fn store_data<S: CacheStore, T: Serialize>(
    store: &S,
    key: &str,
    value: &T,
) -> Result<(), CacheError> {
    let raw = serde_json::to_string_pretty(value)?;
    store
        .store(key, &raw)
        .map_err(|e| CacheError::Backend(e.to_string()))
}

//  On-disk store

/// Directory-backed [`CacheStore`].
#[derive(Debug, Clone)]
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    /// The directory is created lazily on first write.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

fn io_err(path: &Path, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl CacheStore for FileCache {
    type Error = CacheError;

    fn load(&self, key: &str, max_age: Duration) -> Option<String> {
        let path = self.path_for(key);
        let modified = std::fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > max_age {
            debug!("{} expired ({:?} old)", key, age);
            return None;
        }
        std::fs::read_to_string(&path).ok()
    }

    fn store(&self, key: &str, value: &str) -> Result<(), CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| io_err(&self.dir, e))?;
        let path = self.path_for(key);
        AtomicFile::new(&path, OverwriteBehavior::AllowOverwrite)
            .write(|f| {
                f.write_all(value.as_bytes())?;
                f.flush()
            })
            .map_err(|e| io_err(&path, std::io::Error::other(e.to_string())))?;
        debug!("stored {}", path.display());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(io_err(&self.dir, e)),
        };
        for entry in entries {
            let path = entry.map_err(|e| io_err(&self.dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            }
        }
        Ok(())
    }
}

//  In-memory store

/// A [`CacheStore`] that never expires, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, String>>,
}

/// [`MemoryCache`] cannot fail.
#[derive(Debug, thiserror::Error)]
#[error("unreachable")]
pub struct NeverFails;

impl MemoryCache {
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl CacheStore for MemoryCache {
    type Error = NeverFails;

    fn load(&self, key: &str, _max_age: Duration) -> Option<String> {
        self.get(key)
    }

    fn store(&self, key: &str, value: &str) -> Result<(), NeverFails> {
        self.entries.borrow_mut().insert(key.into(), value.into());
        Ok(())
    }

    fn clear(&self) -> Result<(), NeverFails> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

//! Small JSON file cache for values that are expensive to recompute, such as
//! dashboard aggregates built from several queries.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{internal_error, invalid_argument, FirestoreResult};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    value: JsonValue,
}

/// TTL cache persisted as one JSON file. A missing or unreadable file is
/// treated as an empty cache.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    ttl: Duration,
    lock: Mutex<()>,
}

impl JsonFileCache {
    pub fn new(path: impl AsRef<Path>, ttl: Duration) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ttl,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value for `key` if it was stored less than `ttl` ago and
    /// still deserializes as `T`.
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let _guard = self.lock.lock().ok()?;
        let mut file = self.load();
        let entry = file.entries.remove(key)?;
        if self.is_expired(&entry, Utc::now()) {
            return None;
        }
        serde_json::from_value(entry.value).ok()
    }

    pub fn put<T>(&self, key: &str, value: &T) -> FirestoreResult<()>
    where
        T: Serialize,
    {
        let value = serde_json::to_value(value)
            .map_err(|err| invalid_argument(format!("Failed to serialize cache value for '{key}': {err}")))?;
        let _guard = self.guard()?;
        let mut file = self.load();
        let now = Utc::now();
        file.entries.retain(|_, entry| !self.is_expired(entry, now));
        file.entries.insert(
            key.to_string(),
            CacheEntry {
                stored_at: now,
                value,
            },
        );
        self.store(&file)
    }

    pub fn remove(&self, key: &str) -> FirestoreResult<()> {
        let _guard = self.guard()?;
        let mut file = self.load();
        if file.entries.remove(key).is_some() {
            self.store(&file)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> FirestoreResult<()> {
        let _guard = self.guard()?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(internal_error(format!(
                "Failed to remove cache file {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn guard(&self) -> FirestoreResult<std::sync::MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| internal_error("Cache lock poisoned"))
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.stored_at);
        match age.to_std() {
            Ok(age) => age >= self.ttl,
            // Stored in the future: clock moved backwards, keep it.
            Err(_) => false,
        }
    }

    fn load(&self) -> CacheFile {
        let Ok(contents) = fs::read_to_string(&self.path) else {
            return CacheFile::default();
        };
        match serde_json::from_str(&contents) {
            Ok(file) => file,
            Err(err) => {
                log::debug!("ignoring unreadable cache file {}: {err}", self.path.display());
                CacheFile::default()
            }
        }
    }

    fn store(&self, file: &CacheFile) -> FirestoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    internal_error(format!("Failed to create cache directory: {err}"))
                })?;
            }
        }
        let serialized = serde_json::to_string(file)
            .map_err(|err| internal_error(format!("Failed to serialize cache file: {err}")))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|err| {
                internal_error(format!(
                    "Failed to write cache file {}: {err}",
                    self.path.display()
                ))
            })
    }
}

//! Fingerprint-keyed store with expiry, persisted to disk when possible
//!
//! Every entry lives in memory for the lifetime of the process. When a cache
//! directory is available, entries are also written one file per fingerprint
//! (`<hex>.json`) so that later invocations of the CLI can reuse them. Files
//! are written to a temporary sibling and atomically renamed into place, so a
//! concurrent reader sees either the old entry or the new one, never a partial
//! write.
//!
//! The store never reports failures to its callers. If the directory cannot
//! be created or written, it logs a warning and keeps working from memory.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use super::Fingerprint;

/// Name of the subdirectory holding cached call results
const CALLS_DIR: &str = "calls";

/// Source of the current time for expiry decisions
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        let current = *now;
        *now = chrono::Duration::from_std(by)
            .ok()
            .and_then(|by| current.checked_add_signed(by))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// A stored call result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Fingerprint of the call that produced `value`
    pub key: Fingerprint,
    /// The serialized result of the call
    pub value: Value,
    /// When the entry goes stale; `None` means never
    pub expires_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    /// Whether the entry is stale at `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

/// Expiry-aware storage for cached call results
pub struct CacheStore {
    /// In-process copy of every entry seen or written
    memory: Mutex<HashMap<Fingerprint, CacheEntry>>,
    /// Directory for persisted entries; `None` once persistence is off
    dir: RwLock<Option<PathBuf>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheStore")
            .field("dir", &*self.dir.read())
            .field("entries", &self.memory.lock().len())
            .field("clock", &self.clock)
            .finish()
    }
}

impl CacheStore {
    /// Creates a store that never touches the filesystem
    pub fn in_memory() -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            dir: RwLock::new(None),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a store persisting entries into `dir`
    ///
    /// The directory is created if needed. If that fails, the returned store
    /// is memory-only.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let store = Self::in_memory();
        match fs::create_dir_all(&dir) {
            Ok(()) => {
                tracing::debug!(dir = %dir.display(), "using persistent cache");
                *store.dir.write() = Some(dir);
            }
            Err(err) => {
                tracing::warn!(
                    dir = %dir.display(),
                    error = %err,
                    "cache directory unavailable, caching in memory only"
                );
            }
        }
        store
    }

    /// Creates a store in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/rarc/calls/` on Linux, or the platform equivalent.
    /// Falls back to a memory-only store when no home directory is known.
    pub fn with_default_dir() -> Self {
        match default_dir() {
            Some(dir) => Self::open(dir),
            None => {
                tracing::warn!("no cache directory for this platform, caching in memory only");
                Self::in_memory()
            }
        }
    }

    /// Replaces the clock used for expiry decisions
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the directory entries are persisted to, if any
    pub fn dir(&self) -> Option<PathBuf> {
        self.dir.read().clone()
    }

    /// Whether entries are still being written to disk
    pub fn is_persistent(&self) -> bool {
        self.dir.read().is_some()
    }

    /// Number of entries held in memory
    pub fn len(&self) -> usize {
        self.memory.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an unexpired entry
    ///
    /// Returns `None` when the key was never stored, or when the stored entry
    /// has expired. Unreadable files count as never stored.
    pub fn get(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let now = self.clock.now();

        let cached = self.memory.lock().get(key).cloned();
        let entry = match cached {
            Some(entry) => entry,
            None => {
                let entry = self.read_file(key)?;
                self.memory.lock().insert(*key, entry.clone());
                entry
            }
        };

        if entry.is_expired(now) {
            tracing::debug!(key = %key, "cache entry expired");
            return None;
        }
        Some(entry)
    }

    /// Stores `value` under `key`, replacing any previous entry
    ///
    /// With `ttl == None` the entry never expires, otherwise it expires at
    /// `now + ttl`.
    pub fn put(&self, key: Fingerprint, value: Value, ttl: Option<Duration>) {
        let now = self.clock.now();
        let expires_at = ttl.map(|ttl| {
            chrono::Duration::from_std(ttl)
                .ok()
                .and_then(|ttl| now.checked_add_signed(ttl))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        });
        let entry = CacheEntry {
            key,
            value,
            expires_at,
        };

        if let Some(dir) = self.dir() {
            if let Err(err) = write_entry(&dir, &entry) {
                self.degrade(&dir, &err);
            }
        }
        self.memory.lock().insert(key, entry);
    }

    /// Removes the entry for `key`, in memory and on disk
    pub fn delete(&self, key: &Fingerprint) {
        self.memory.lock().remove(key);
        if let Some(dir) = self.dir() {
            match fs::remove_file(entry_path(&dir, key)) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(key = %key, error = %err, "failed to delete cache entry"),
            }
        }
    }

    /// Removes every entry, returning how many persisted entries were deleted
    pub fn clear(&self) -> io::Result<usize> {
        self.memory.lock().clear();
        let Some(dir) = self.dir() else {
            return Ok(0);
        };

        let mut removed = 0;
        for dir_entry in fs::read_dir(&dir)? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") && remove_entry_file(&path)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn read_file(&self, key: &Fingerprint) -> Option<CacheEntry> {
        let dir = self.dir()?;
        let path = entry_path(&dir, key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "unreadable cache entry");
                return None;
            }
        };

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if entry.key == *key => Some(entry),
            Ok(_) => {
                tracing::debug!(path = %path.display(), "cache entry key mismatch");
                None
            }
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "corrupt cache entry");
                None
            }
        }
    }

    /// Turns persistence off for the rest of the process
    fn degrade(&self, dir: &Path, err: &io::Error) {
        tracing::warn!(
            dir = %dir.display(),
            error = %err,
            "failed to write cache entry, caching in memory only"
        );
        *self.dir.write() = None;
    }
}

/// Returns the platform cache directory for call results
pub fn default_dir() -> Option<PathBuf> {
    let project_dirs = ProjectDirs::from("", "", "rarc")?;
    Some(project_dirs.cache_dir().join(CALLS_DIR))
}

fn entry_path(dir: &Path, key: &Fingerprint) -> PathBuf {
    dir.join(format!("{key}.json"))
}

/// Deletes one entry file; `false` if it was already gone
fn remove_entry_file(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

fn write_entry(dir: &Path, entry: &CacheEntry) -> io::Result<()> {
    let json = serde_json::to_vec(entry)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(&json)?;
    tmp.persist(entry_path(dir, &entry.key))
        .map_err(|e| e.error)?;
    Ok(())
}

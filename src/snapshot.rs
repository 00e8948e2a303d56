//! Persistent key-value snapshot store.
//!
//! Each named value is stored as one full JSON document that replaces the
//! previous copy on every save. Reads never fail: a missing, unreadable or
//! unparsable payload yields the caller's default. Writes never fail either:
//! backend errors are logged and dropped, leaving the prior durable copy in
//! place while the in-memory value stays authoritative.
//!
//! [`Persisted`] binds a value to a key and writes a snapshot after every
//! committed mutation through an observer list.

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::StorageError;

/// Sled tree holding all snapshots.
pub const SNAPSHOT_TREE: &str = "snapshots";

// ============================================================================
// Backends
// ============================================================================

/// Raw byte storage under string keys.
pub trait KvBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Durable backend on a sled tree.
pub struct SledBackend {
    _db: sled::Db,
    tree: sled::Tree,
}

impl SledBackend {
    pub fn open(db: &sled::Db) -> Result<Self, StorageError> {
        Ok(Self {
            tree: db.open_tree(SNAPSHOT_TREE)?,
            _db: db.clone(),
        })
    }
}

impl KvBackend for SledBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.tree.flush()?;
        Ok(())
    }
}

/// In-process backend. Can be switched into a failing mode to simulate a
/// full or unavailable disk.
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, every write returns an error and stores nothing.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KvBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory backend lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("quota exceeded".to_string()));
        }
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| StorageError::Unavailable("memory backend lock poisoned".to_string()))?;
        entries.insert(key.to_string(), bytes);
        Ok(())
    }
}

// ============================================================================
// Snapshot store
// ============================================================================

/// Cloneable handle to a snapshot backend.
#[derive(Clone)]
pub struct SnapshotStore {
    backend: Arc<dyn KvBackend>,
}

impl SnapshotStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Open (or create) a sled database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self::new(Arc::new(SledBackend::open(&db)?)))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Load the value saved under `key`, or `default` if there is none or it
    /// cannot be read back as `T`.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let bytes = match self.backend.read(key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return default,
            Err(e) => {
                warn!(
                    "event=snapshot_load module=snapshot status=error key={} error={}",
                    key, e
                );
                return default;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "event=snapshot_load module=snapshot status=corrupt key={} error={}",
                    key, e
                );
                default
            }
        }
    }

    /// Overwrite the snapshot under `key`. Failures are logged and dropped.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    "event=snapshot_write module=snapshot status=error key={} error={}",
                    key, e
                );
                return;
            }
        };
        let len = bytes.len();
        match self.backend.write(key, bytes) {
            Ok(()) => debug!(
                "event=snapshot_write module=snapshot status=ok key={} bytes={}",
                key, len
            ),
            Err(e) => warn!(
                "event=snapshot_write module=snapshot status=dropped key={} error={}",
                key, e
            ),
        }
    }

    /// Best-effort durable flush.
    pub fn flush(&self) {
        if let Err(e) = self.backend.flush() {
            warn!("event=snapshot_flush module=snapshot status=error error={}", e);
        }
    }
}

// ============================================================================
// Persisted values
// ============================================================================

pub type Observer<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A value loaded from a snapshot key and written back after every committed
/// change.
pub struct Persisted<T> {
    key: &'static str,
    value: T,
    observers: Vec<Observer<T>>,
}

impl<T> Persisted<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    /// Load `key` from `store` (falling back to `default`) and register the
    /// snapshot writer as the first observer.
    pub fn load(store: &SnapshotStore, key: &'static str, default: T) -> Self {
        let value = store.load(key, default);
        let writer = store.clone();
        let mut cell = Self {
            key,
            value,
            observers: Vec::new(),
        };
        cell.observe(move |value: &T| writer.save(key, value));
        cell
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Register a callback run after every committed change.
    pub fn observe(&mut self, observer: impl Fn(&T) + Send + Sync + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Replace the value and commit.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.notify();
    }

    /// Mutate the value and commit.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut T) -> R) -> R {
        let out = f(&mut self.value);
        self.notify();
        out
    }

    /// Mutate the value; commit only if `f` reports a change.
    pub fn update_if(&mut self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let changed = f(&mut self.value);
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.value);
        }
    }
}

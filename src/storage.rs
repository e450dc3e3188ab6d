//! Key-value persistence.
//!
//! A [`Backend`] is the raw medium (one JSON file per key, or a map in
//! memory). A [`Store`] layers JSON load/save on top and absorbs every
//! failure: loads fall back to a default, saves report `false`. Nothing here
//! ever returns an error to a mutation caller.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::StorageError;

pub trait Backend {
    /// `Ok(None)` when nothing is stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Backend for FileBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // write then rename so a crash never leaves half a file behind
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process backend. `reject_writes` simulates a full or disabled medium.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    items: HashMap<String, String>,
    writes: usize,
    pub reject_writes: bool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    pub fn with_item(mut self, key: &str, value: &str) -> Self {
        self.items.insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    /// Number of accepted writes so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Backend for MemoryBackend {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).cloned())
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.reject_writes {
            return Err(StorageError::Rejected(key.to_string()));
        }
        self.items.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

#[derive(Debug)]
pub struct Store<B> {
    backend: B,
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Value stored under `key`, or `default` if it is missing or unreadable.
    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        match self.try_load(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(key, "no stored value, using default");
                default
            }
            Err(err) => {
                warn!(key, %err, "could not read stored value, using default");
                default
            }
        }
    }

    fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.backend.get_item(key)? {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    /// Returns whether the write reached the backend.
    pub fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> bool {
        match self.try_save(key, value) {
            Ok(()) => true,
            Err(err) => {
                error!(key, %err, "failed to persist value");
                false
            }
        }
    }

    fn try_save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(value)?;
        self.backend.set_item(key, &data)
    }
}

/// One value bound to one key. Reads come from memory; every `set` writes
/// through to the store exactly once.
#[derive(Debug)]
pub struct Persisted<T> {
    key: &'static str,
    value: T,
}

impl<T: Serialize + DeserializeOwned> Persisted<T> {
    pub fn load<B: Backend>(store: &Store<B>, key: &'static str, default: T) -> Self {
        let value = store.load(key, default);
        Self { key, value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    /// Replaces the value in memory, then persists it. The in-memory value
    /// is kept even when the write fails.
    pub fn set<B: Backend>(&mut self, store: &mut Store<B>, value: T) -> bool {
        self.value = value;
        store.save(self.key, &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_loads_default() {
        let store = Store::new(MemoryBackend::new());
        let value: Vec<u32> = store.load("nums", vec![7]);
        assert_eq!(value, vec![7]);
    }

    #[test]
    fn corrupt_value_loads_default() {
        let store = Store::new(MemoryBackend::new().with_item("nums", "[1, 2,"));
        let value: Vec<u32> = store.load("nums", vec![]);
        assert!(value.is_empty());
    }

    #[test]
    fn wrong_shape_loads_default() {
        let store = Store::new(MemoryBackend::new().with_item("nums", r#"{"a":1}"#));
        let value: Vec<u32> = store.load("nums", vec![9]);
        assert_eq!(value, vec![9]);
    }

    #[test]
    fn save_then_load_round_trips() {
        let mut store = Store::new(MemoryBackend::new());
        assert!(store.save("nums", &vec![1u32, 2, 3]));
        let value: Vec<u32> = store.load("nums", vec![]);
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn rejected_write_reports_false_and_keeps_memory() {
        let mut store = Store::new(MemoryBackend::rejecting());
        let mut nums = Persisted::load(&store, "nums", Vec::<u32>::new());
        assert!(!nums.set(&mut store, vec![4]));
        assert_eq!(nums.get(), &vec![4]);
        assert_eq!(store.backend().raw("nums"), None);
    }

    #[test]
    fn file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = FileBackend::new(dir.path().join("nested"));
        assert!(backend.get_item("tasks").unwrap().is_none());
        backend.set_item("tasks", "[]").unwrap();
        assert_eq!(backend.get_item("tasks").unwrap().as_deref(), Some("[]"));
        assert!(backend.path_for("tasks").exists());
        assert!(!backend.path_for("tasks").with_extension("json.tmp").exists());
    }

    #[test]
    fn file_backend_unwritable_dir_fails_softly() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where the data directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();
        let mut store = Store::new(FileBackend::new(&blocker));
        assert!(!store.save("tasks", &Vec::<u32>::new()));
        let value: Vec<u32> = store.load("tasks", vec![1]);
        assert_eq!(value, vec![1]);
    }
}

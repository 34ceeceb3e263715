//! Persistent state storage
//!
//! The service talks to storage through [`StorageAdapter`] so hosts can plug
//! in whatever key/value backend they have. [`PersistStore`] layers a typed,
//! write-through state cell on top of an adapter.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::{Result, ServiceError};

/// Key/value storage the service persists into
pub trait StorageAdapter: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory storage for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStorage {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageAdapter for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.read().unwrap().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.write().unwrap().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.read().unwrap().keys().cloned().collect())
    }
}

/// Storage backed by one JSON file per key inside a directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| ServiceError::Storage(format!("create {}: {}", dir.display(), e)))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl StorageAdapter for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ServiceError::Storage(format!("read {}: {}", key, e))),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        // Write to a sibling temp file first so readers never see a torn file
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)
            .map_err(|e| ServiceError::Storage(format!("write {}: {}", key, e)))?;
        fs::rename(&tmp, &path)
            .map_err(|e| ServiceError::Storage(format!("rename {}: {}", key, e)))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ServiceError::Storage(format!("remove {}: {}", key, e))),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| ServiceError::Storage(format!("list {}: {}", self.dir.display(), e)))?;
        let mut keys = Vec::new();
        for entry in entries {
            let entry =
                entry.map_err(|e| ServiceError::Storage(format!("list entry: {}", e)))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    keys.push(stem.to_string());
                }
            }
        }
        Ok(keys)
    }
}

/// Typed state cell persisted under a fixed key
///
/// Reads come from the in-memory copy. Every [`PersistStore::update`] writes
/// the whole state back through the adapter.
pub struct PersistStore<T> {
    storage: Arc<dyn StorageAdapter>,
    name: String,
    state: Mutex<T>,
}

impl<T: Serialize + DeserializeOwned + Clone> PersistStore<T> {
    /// Load existing state under `name`, falling back to `template`
    pub fn load(storage: Arc<dyn StorageAdapter>, name: &str, template: T) -> Result<Self> {
        let state = match storage.get_item(name)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(state) => state,
                Err(e) => {
                    warn!(name, error = %e, "stored state unreadable, starting from template");
                    template
                }
            },
            None => template,
        };
        Ok(Self {
            storage,
            name: name.to_string(),
            state: Mutex::new(state),
        })
    }

    /// Snapshot of the current state
    pub fn get(&self) -> T {
        self.state.lock().unwrap().clone()
    }

    /// Mutate the state and write it back to storage
    pub fn update(&self, mutate: impl FnOnce(&mut T)) -> Result<()> {
        let mut guard = self.state.lock().unwrap();
        mutate(&mut guard);
        let raw = serde_json::to_string(&*guard)?;
        self.storage.set_item(&self.name, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Serialize, Deserialize, PartialEq, Debug, Default)]
    struct Counter {
        count: u32,
    }

    #[test]
    fn test_memory_storage_round_trip() {
        let storage = MemoryStorage::new();
        assert_eq!(storage.get_item("a").unwrap(), None);
        storage.set_item("a", "1").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), Some("1".to_string()));
        storage.remove_item("a").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        assert_eq!(storage.get_item("state").unwrap(), None);
        storage.set_item("state", "{\"count\":1}").unwrap();
        assert_eq!(
            storage.get_item("state").unwrap(),
            Some("{\"count\":1}".to_string())
        );
        assert_eq!(storage.keys().unwrap(), vec!["state".to_string()]);
        storage.remove_item("state").unwrap();
        storage.remove_item("state").unwrap();
        assert_eq!(storage.get_item("state").unwrap(), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = FileStorage::new(dir.path()).unwrap();
            storage.set_item("state", "persisted").unwrap();
        }
        let storage = FileStorage::new(dir.path()).unwrap();
        assert_eq!(
            storage.get_item("state").unwrap(),
            Some("persisted".to_string())
        );
    }

    #[test]
    fn test_persist_store_uses_template_when_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let store = PersistStore::load(storage, "counter", Counter { count: 7 }).unwrap();
        assert_eq!(store.get(), Counter { count: 7 });
    }

    #[test]
    fn test_persist_store_recovers_from_corrupt_state() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item("counter", "{not json").unwrap();
        let store =
            PersistStore::load(storage.clone(), "counter", Counter::default()).unwrap();
        assert_eq!(store.get(), Counter::default());
    }

    #[test]
    fn test_persist_store_writes_through() {
        let storage = Arc::new(MemoryStorage::new());
        let store =
            PersistStore::load(storage.clone(), "counter", Counter::default()).unwrap();
        store.update(|state| state.count = 3).unwrap();

        let reloaded =
            PersistStore::load(storage, "counter", Counter::default()).unwrap();
        assert_eq!(reloaded.get(), Counter { count: 3 });
    }
}

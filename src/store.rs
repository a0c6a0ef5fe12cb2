//! Flat-file JSON record store.
//!
//! Each collection is one pretty-printed JSON array on disk. Every access
//! reads the whole document; every mutation rewrites it. Writers of the
//! same collection are serialized by a per-collection lock, and documents
//! are replaced by renaming a sibling temp file so readers never see a
//! partial write.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Named collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Notes,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Users, Collection::Notes];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Notes => "notes",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::Users => "users.json",
            Collection::Notes => "notes.json",
        }
    }

    fn index(self) -> usize {
        match self {
            Collection::Users => 0,
            Collection::Notes => 1,
        }
    }
}

/// Whole-document JSON store rooted at a data directory
#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    locks: [Mutex<()>; 2],
}

impl JsonStore {
    /// Open a store, creating the directory and empty collections as needed
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self {
            dir: dir.into(),
            locks: [Mutex::new(()), Mutex::new(())],
        };
        store.init()?;
        Ok(store)
    }

    /// Write `[]` for every collection that has no document yet
    pub fn init(&self) -> StoreResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;
        for collection in Collection::ALL {
            let _guard = self.lock(collection)?;
            let path = self.path(collection);
            if !path.exists() {
                tracing::info!("initializing empty collection {}", path.display());
                write_document::<serde_json::Value>(&path, &[])?;
            }
        }
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a collection's document
    pub fn path(&self, collection: Collection) -> PathBuf {
        self.dir.join(collection.file_name())
    }

    /// Read the entire collection. A missing document is initialized empty.
    pub fn load<T: DeserializeOwned>(&self, collection: Collection) -> StoreResult<Vec<T>> {
        let path = self.path(collection);
        match read_document(&path)? {
            Some(records) => Ok(records),
            None => {
                let _guard = self.lock(collection)?;
                if !path.exists() {
                    write_document::<serde_json::Value>(&path, &[])?;
                }
                Ok(Vec::new())
            }
        }
    }

    /// Overwrite the entire collection
    pub fn save<T: Serialize>(&self, collection: Collection, records: &[T]) -> StoreResult<()> {
        let _guard = self.lock(collection)?;
        write_document(&self.path(collection), records)
    }

    /// Load, mutate and save one collection under its writer lock.
    ///
    /// The document is rewritten only when `f` returns `Ok`.
    pub fn update<T, R, E, F>(&self, collection: Collection, f: F) -> Result<R, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<StoreError>,
        F: FnOnce(&mut Vec<T>) -> Result<R, E>,
    {
        let _guard = self.lock(collection)?;
        let path = self.path(collection);
        let mut records = read_document(&path)?.unwrap_or_default();
        let result = f(&mut records)?;
        write_document(&path, &records)?;
        Ok(result)
    }

    fn lock(&self, collection: Collection) -> StoreResult<MutexGuard<'_, ()>> {
        self.locks[collection.index()]
            .lock()
            .map_err(|_| StoreError::Poisoned(collection.name()))
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<Vec<T>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::io(path, e)),
    };

    if content.trim().is_empty() {
        return Ok(Some(Vec::new()));
    }

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StoreError::json(path, e))
}

fn write_document<T: Serialize>(path: &Path, records: &[T]) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(records).map_err(|e| StoreError::json(path, e))?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        key: String,
        value: u32,
    }

    fn row(key: &str, value: u32) -> Row {
        Row {
            key: key.to_string(),
            value,
        }
    }

    #[test]
    fn test_open_initializes_empty_collections() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path().join("db")).unwrap();

        for collection in Collection::ALL {
            let content = fs::read_to_string(store.path(collection)).unwrap();
            assert_eq!(content.trim(), "[]");
        }
    }

    #[test]
    fn test_load_missing_document_self_initializes() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        fs::remove_file(store.path(Collection::Notes)).unwrap();

        let rows: Vec<Row> = store.load(Collection::Notes).unwrap();
        assert!(rows.is_empty());
        assert!(store.path(Collection::Notes).exists());
    }

    #[test]
    fn test_save_then_load_keeps_order() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        let rows = vec![row("b", 2), row("a", 1), row("c", 3)];

        store.save(Collection::Users, &rows).unwrap();
        let loaded: Vec<Row> = store.load(Collection::Users).unwrap();
        assert_eq!(loaded, rows);
    }

    #[test]
    fn test_save_overwrites_whole_collection() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();

        store
            .save(Collection::Users, &[row("a", 1), row("b", 2)])
            .unwrap();
        store.save(Collection::Users, &[row("z", 9)]).unwrap();

        let loaded: Vec<Row> = store.load(Collection::Users).unwrap();
        assert_eq!(loaded, vec![row("z", 9)]);
        assert!(!dir.path().join("users.json.tmp").exists());
    }

    #[test]
    fn test_failed_update_leaves_document_untouched() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.save(Collection::Notes, &[row("a", 1)]).unwrap();
        let before = fs::read_to_string(store.path(Collection::Notes)).unwrap();

        let result: Result<(), StoreError> =
            store.update(Collection::Notes, |rows: &mut Vec<Row>| {
                rows.clear();
                Err(StoreError::Poisoned("test"))
            });
        assert!(result.is_err());

        let after = fs::read_to_string(store.path(Collection::Notes)).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        fs::write(store.path(Collection::Users), "{ not json").unwrap();

        let result: StoreResult<Vec<Row>> = store.load(Collection::Users);
        assert!(matches!(result, Err(StoreError::Json { .. })));
    }

    #[test]
    fn test_concurrent_updates_do_not_lose_writes() {
        let dir = tempdir().unwrap();
        let store = Arc::new(JsonStore::open(dir.path()).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store
                            .update(Collection::Notes, |rows: &mut Vec<Row>| {
                                rows.push(row(&format!("{}-{}", t, i), i));
                                Ok::<_, StoreError>(())
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let rows: Vec<Row> = store.load(Collection::Notes).unwrap();
        assert_eq!(rows.len(), 80);
    }
}

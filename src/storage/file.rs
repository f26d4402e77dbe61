use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::storage::{validate_key, Storage, StorageError};

const EXTENSION: &str = "json";

/// One JSON file per key; `a/b` is stored at `<root>/a/b.json`.
///
/// Calls are plain blocking `std::fs` IO and writes happen under the store's
/// record lock. Sized for demo data; the HTTP layer runs writes on the
/// blocking pool.
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StorageError::Io {
            key: root.display().to_string(),
            source,
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }
}

fn io_error(key: &str) -> impl FnOnce(std::io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl Storage for FileStorage {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error(key))?;
        }

        // Readers never observe a partially written record.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_error(key))?;
        fs::rename(&tmp, &path).map_err(io_error(key))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(key)(err)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(key)(err)),
        }
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        collect_keys(&self.root, &self.root, &mut keys)?;
        keys.retain(|key| key.starts_with(prefix));
        Ok(keys)
    }
}

fn collect_keys(root: &Path, dir: &Path, keys: &mut Vec<String>) -> Result<(), StorageError> {
    let entries = fs::read_dir(dir).map_err(|source| StorageError::Io {
        key: dir.display().to_string(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| StorageError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() {
            collect_keys(root, &path, keys)?;
            continue;
        }

        if path.extension().and_then(|ext| ext.to_str()) != Some(EXTENSION) {
            continue;
        }

        if let Ok(relative) = path.with_extension("").strip_prefix(root) {
            let key = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            keys.push(key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::FileStorage;
    use crate::storage::Storage;

    #[test]
    fn records_survive_reopening() {
        let dir = tempfile::tempdir().unwrap();

        let storage = FileStorage::open(dir.path()).unwrap();
        storage.put("pickup-requests/one", "{\"a\":1}").unwrap();
        storage.put("sessions/two", "{\"b\":2}").unwrap();
        drop(storage);

        let reopened = FileStorage::open(dir.path()).unwrap();
        assert_eq!(
            reopened.get("pickup-requests/one").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            reopened.keys("pickup-requests/").unwrap(),
            vec!["pickup-requests/one".to_string()]
        );
    }

    #[test]
    fn missing_and_deleted_keys_read_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();

        assert!(storage.get("sessions/nope").unwrap().is_none());

        storage.put("sessions/gone", "{}").unwrap();
        storage.delete("sessions/gone").unwrap();
        storage.delete("sessions/gone").unwrap();
        assert!(storage.get("sessions/gone").unwrap().is_none());
        assert!(storage.keys("sessions/").unwrap().is_empty());
    }

    #[test]
    fn traversal_keys_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        assert!(storage.put("../escape", "{}").is_err());
    }
}

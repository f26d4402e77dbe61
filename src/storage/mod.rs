//! Keyed blob storage. Each pickup request and each session lives under its
//! own key so that a write never rewrites unrelated records.

pub mod file;
pub mod memory;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub const REQUESTS_PREFIX: &str = "pickup-requests/";
pub const SESSIONS_PREFIX: &str = "sessions/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    #[error("storage io error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed record under {key}: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait Storage: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// All keys starting with `prefix`, in no particular order.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError>;
}

pub fn put_json<T: Serialize>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serde {
        key: key.to_string(),
        source,
    })?;
    storage.put(key, &raw)
}

pub fn get_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match storage.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StorageError::Serde {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

/// Loads every record under `prefix`.
pub fn load_all<T: DeserializeOwned>(
    storage: &dyn Storage,
    prefix: &str,
) -> Result<Vec<(String, T)>, StorageError> {
    let mut records = Vec::new();
    for key in storage.keys(prefix)? {
        if let Some(value) = get_json(storage, &key)? {
            records.push((key, value));
        }
    }
    Ok(records)
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::{get_json, load_all, put_json, validate_key, MemoryStorage, Storage};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        name: String,
        weight: u32,
    }

    #[test]
    fn json_helpers_round_trip_through_storage() {
        let storage = MemoryStorage::new();
        let record = Record {
            name: "copper".to_string(),
            weight: 3,
        };

        put_json(&storage, "scrap/a", &record).unwrap();
        let loaded: Option<Record> = get_json(&storage, "scrap/a").unwrap();
        assert_eq!(loaded, Some(record));

        let missing: Option<Record> = get_json(&storage, "scrap/b").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn load_all_only_reads_the_prefix() {
        let storage = MemoryStorage::new();
        storage.put("scrap/a", r#"{"name":"a","weight":1}"#).unwrap();
        storage.put("scrap/b", r#"{"name":"b","weight":2}"#).unwrap();
        storage.put("other/c", r#"{"name":"c","weight":3}"#).unwrap();

        let records: Vec<(String, Record)> = load_all(&storage, "scrap/").unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn malformed_record_surfaces_as_error() {
        let storage = MemoryStorage::new();
        storage.put("scrap/a", "not json").unwrap();
        assert!(get_json::<Record>(&storage, "scrap/a").is_err());
    }

    #[test]
    fn keys_cannot_escape_the_namespace() {
        assert!(validate_key("pickup-requests/abc-123").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("a b").is_err());
    }
}

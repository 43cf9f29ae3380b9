//! JSON-file-backed [`Storage`] implementation bundled with the binary.
//!
//! Writes are atomic: serialize to a sibling temp file, `fsync`, then rename over the
//! target, so a reader never observes a half-written document (spec.md §4.3).

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::AdapterError;
use crate::model::{Archive, Cache, CspConfig};
use crate::storage::Storage;

/// Stores `cache.json`, `csp_config.json`, and `archive.json` under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AdapterError> {
        let path = self.path(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let value = serde_json::from_slice(&bytes).map_err(|e| {
                    AdapterError::StorageRead(format!("{}: malformed document: {e}", path.display()))
                })?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AdapterError::StorageRead(format!("{}: {e}", path.display()))),
        }
    }

    async fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), AdapterError> {
        let path = self.path(name);
        let temp_path = self.path(&format!("{name}.tmp-{}", uuid::Uuid::new_v4()));

        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| AdapterError::Unexpected(format!("failed to serialize {name}: {e}")))?;

        write_atomic(&temp_path, &path, &bytes).await
    }
}

async fn write_atomic(temp_path: &Path, final_path: &Path, bytes: &[u8]) -> Result<(), AdapterError> {
    let err = |e: std::io::Error| AdapterError::StorageCache(format!("{}: {e}", final_path.display()));

    let mut file = tokio::fs::File::create(temp_path).await.map_err(err)?;
    file.write_all(bytes).await.map_err(err)?;
    file.sync_all().await.map_err(err)?;
    drop(file);

    tokio::fs::rename(temp_path, final_path).await.map_err(err)
}

impl Storage for FileStorage {
    async fn get_cache(&self) -> Result<Option<Cache>, AdapterError> {
        self.read("cache").await
    }

    async fn save_cache(&self, cache: &Cache) -> Result<(), AdapterError> {
        self.write("cache", cache).await
    }

    async fn get_csp_config(&self) -> Result<Option<CspConfig>, AdapterError> {
        self.read("csp_config").await
    }

    async fn save_csp_config(&self, config: &CspConfig) -> Result<(), AdapterError> {
        self.write("csp_config", config).await.map_err(|e| {
            AdapterError::StorageCspConfig(e.to_string())
        })
    }

    async fn get_archive(&self) -> Result<Archive, AdapterError> {
        Ok(self.read("archive").await?.unwrap_or_default())
    }

    async fn save_archive(&self, archive: &Archive) -> Result<(), AdapterError> {
        self.write("archive", archive).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn round_trips_cache() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());

        assert!(storage.get_cache().await.unwrap().is_none());

        let now = Utc::now();
        let cache = Cache::new(now, now, now);
        storage.save_cache(&cache).await.unwrap();

        let loaded = storage.get_cache().await.unwrap().unwrap();
        assert_eq!(loaded, cache);
    }

    #[tokio::test]
    async fn missing_archive_defaults_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path());
        let archive = storage.get_archive().await.unwrap();
        assert!(archive.entries.is_empty());
    }

    #[tokio::test]
    async fn malformed_document_is_a_storage_read_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("cache.json"), b"not json").await.unwrap();
        let storage = FileStorage::new(dir.path());
        let err = storage.get_cache().await.unwrap_err();
        assert!(matches!(err, AdapterError::StorageRead(_)));
    }
}

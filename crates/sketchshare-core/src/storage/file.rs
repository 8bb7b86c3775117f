//! Directory-backed shape store for native platforms.

use super::{BoxFuture, ShapeStore, StoreError, StoreResult};
use crate::model::ShapeRecord;
use std::fs;
use std::path::PathBuf;

/// File-based shape store.
///
/// Each record lives in `<key>.json` inside the base directory, mirroring an
/// auto-increment object store. Records are returned in numeric key order.
pub struct FileShapeStore {
    /// Directory holding the record files.
    base_path: PathBuf,
}

impl FileShapeStore {
    /// Open an existing store; a missing directory is an error.
    pub fn open(base_path: PathBuf) -> StoreResult<Self> {
        if !base_path.is_dir() {
            return Err(StoreError::NotFound(base_path.display().to_string()));
        }
        Ok(Self { base_path })
    }

    fn record_path(&self, key: u64) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    /// Keys of all record files, ascending.
    fn keys(&self) -> StoreResult<Vec<u64>> {
        let entries = fs::read_dir(&self.base_path)
            .map_err(|e| StoreError::Io(format!("Failed to read directory: {}", e)))?;

        let mut keys: Vec<u64> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| path.file_stem()?.to_str()?.parse().ok())
            .collect();
        keys.sort_unstable();
        Ok(keys)
    }
}

impl ShapeStore for FileShapeStore {
    fn get_all(&self) -> BoxFuture<'_, StoreResult<Vec<ShapeRecord>>> {
        Box::pin(async move {
            let mut records = Vec::new();
            for key in self.keys()? {
                let path = self.record_path(key);
                let json = fs::read_to_string(&path).map_err(|e| {
                    StoreError::Io(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let record = serde_json::from_str(&json).map_err(|e| {
                    StoreError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
                })?;
                records.push(record);
            }
            Ok(records)
        })
    }
}

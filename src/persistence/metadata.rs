use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{atomic_write, PersistenceError, PersistenceResult};

/// File name of the per-world metadata record.
pub const METADATA_FILE: &str = "level.json";

/// The persisted descriptor that lets a world be reconstructed after a
/// restart. Written once when the world is created, read once when it is
/// loaded; never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WorldMetadataRecord {
    /// World name; matches the storage directory name.
    pub level_name: String,
    /// Stable type key of the generator that built this world. Resolvable
    /// through the generator registry's type index, unlike the short
    /// display name used at creation time.
    pub generator_type: String,
}

impl WorldMetadataRecord {
    pub fn new(level_name: impl Into<String>, generator_type: impl Into<String>) -> Self {
        Self {
            level_name: level_name.into(),
            generator_type: generator_type.into(),
        }
    }

    /// Whether `dir` holds a metadata record.
    pub fn exists(dir: &Path) -> bool {
        dir.join(METADATA_FILE).is_file()
    }

    /// Persist the record into `dir`, atomically.
    pub fn save(&self, dir: &Path) -> PersistenceResult<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        atomic_write(&dir.join(METADATA_FILE), &bytes)
    }

    /// Read the record stored in `dir`.
    pub fn load(dir: &Path) -> PersistenceResult<Self> {
        let path = dir.join(METADATA_FILE);
        if !path.is_file() {
            return Err(PersistenceError::MissingMetadata(path));
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

//! On-disk persistence: per-world metadata records and chunk storage.

mod chunk_store;
mod metadata;

pub use chunk_store::ChunkStore;
pub use metadata::{WorldMetadataRecord, METADATA_FILE};

use std::io;
use std::path::{Path, PathBuf};

/// Result type for persistence operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Errors that can occur during persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chunk encoding error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("no metadata record at {0}")]
    MissingMetadata(PathBuf),

    #[error("corrupted chunk data: {0}")]
    CorruptedChunk(String),

    #[error("chunk format version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}

/// Write `bytes` to `path` atomically: write a sibling temp file first, then
/// rename it into place so readers never observe a partial file.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> PersistenceResult<()> {
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

//! World lifecycle: the registry of live worlds, single-flight admission of
//! create/load operations, asynchronous initialization, and the seams to
//! the underlying storage engine.

pub mod admission;
pub mod backend;
pub mod chunk;
pub mod instance;
pub mod local;
pub mod manager;

pub use admission::AdmissionSlot;
pub use backend::{GeneratedChunkObserver, WorldBackend, WorldProvisioner};
pub use chunk::{BlockId, Chunk, ChunkPos, CHUNK_SIZE, WORLD_HEIGHT_CHUNKS};
pub use instance::WorldInstance;
pub use local::{LocalProvisioner, LocalWorld};
pub use manager::{CreateResult, WorldLifecycleManager};

use crate::persistence::PersistenceError;

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

/// Errors crossing the backend and initialization seams.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("world provisioning failed: {0}")]
    Provision(String),

    #[error("world initialization failed: {0}")]
    InitializationFailed(String),
}

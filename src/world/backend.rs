use std::path::Path;
use std::sync::Arc;

use crate::generator::WorldGenerator;
use crate::world::chunk::ChunkPos;
use crate::world::WorldResult;

/// Callback fired when the backing store generates a chunk instead of
/// loading it from disk.
pub type GeneratedChunkObserver = Arc<dyn Fn(ChunkPos) + Send + Sync>;

/// One provisioned world as seen by the lifecycle layer.
///
/// Implementations are internally synchronized; `initialize` is blocking
/// and is always driven from a background thread.
pub trait WorldBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Blocking setup: prime the spawn region, loading or generating its
    /// chunks.
    fn initialize(&self) -> WorldResult<()>;

    /// Persist everything marked dirty since the last flush.
    fn flush(&self) -> WorldResult<()>;

    /// Flush (when persistence is enabled) and release resources.
    /// Idempotent.
    fn close(&self);

    /// Record that a chunk needs saving on the next flush.
    fn mark_chunk_dirty(&self, pos: ChunkPos);

    /// Register `observer` for freshly generated chunks. The returned token
    /// is handed back to [`WorldBackend::unsubscribe_generated`] when the
    /// subscriber goes away.
    fn subscribe_generated(&self, observer: GeneratedChunkObserver) -> u64;

    fn unsubscribe_generated(&self, token: u64);
}

/// Constructs the underlying world object for a generator and storage path.
pub trait WorldProvisioner: Send + Sync {
    fn provision(
        &self,
        name: &str,
        generator: Arc<dyn WorldGenerator>,
        dir: &Path,
    ) -> WorldResult<Arc<dyn WorldBackend>>;
}

//! File-backed reference implementation of the storage-engine seam.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::config::WorldsConfig;
use crate::generator::WorldGenerator;
use crate::persistence::ChunkStore;
use crate::world::backend::{GeneratedChunkObserver, WorldBackend, WorldProvisioner};
use crate::world::chunk::{BlockId, Chunk, ChunkPos, CHUNK_SIZE, WORLD_HEIGHT_CHUNKS};
use crate::world::WorldResult;

/// A world whose chunks live in memory and persist to one file each.
///
/// Only *modified* chunks are tracked as dirty here. Freshly *generated*
/// chunks are reported through the observer channel; marking them dirty is
/// the subscriber's job (see `WorldInstance`).
pub struct LocalWorld {
    name: String,
    generator: Arc<dyn WorldGenerator>,
    store: ChunkStore,
    chunks: DashMap<ChunkPos, Arc<RwLock<Chunk>>>,
    dirty: Mutex<HashSet<ChunkPos>>,
    observers: RwLock<HashMap<u64, GeneratedChunkObserver>>,
    next_observer: AtomicU64,
    save_enabled: bool,
    spawn_radius: i32,
    closed: AtomicBool,
}

impl LocalWorld {
    pub fn create(
        name: &str,
        generator: Arc<dyn WorldGenerator>,
        dir: &Path,
        config: &WorldsConfig,
    ) -> WorldResult<Self> {
        let store = ChunkStore::open(dir)?;
        Ok(Self {
            name: name.to_string(),
            generator,
            store,
            chunks: DashMap::new(),
            dirty: Mutex::new(HashSet::new()),
            observers: RwLock::new(HashMap::new()),
            next_observer: AtomicU64::new(1),
            save_enabled: config.save_enabled,
            spawn_radius: config.spawn_radius,
            closed: AtomicBool::new(false),
        })
    }

    /// Chunk positions covering the spawn region.
    fn spawn_region(&self) -> Vec<ChunkPos> {
        let r = self.spawn_radius;
        let mut region = Vec::new();
        for x in -r..=r {
            for z in -r..=r {
                for y in 0..WORLD_HEIGHT_CHUNKS {
                    region.push(ChunkPos::new(x, y, z));
                }
            }
        }
        region
    }

    /// Resolve a chunk, loading it from the store or running the generator.
    /// Generated (not loaded) chunks are announced to observers.
    fn load_or_generate(&self, pos: ChunkPos) -> WorldResult<Arc<RwLock<Chunk>>> {
        use dashmap::mapref::entry::Entry;

        if let Some(chunk) = self.chunks.get(&pos) {
            return Ok(Arc::clone(&chunk));
        }

        let (chunk, generated) = if self.store.contains(pos) {
            (self.store.load(pos)?, false)
        } else {
            let mut chunk = Chunk::new(pos);
            self.generator.generate_chunk(&mut chunk);
            (chunk, true)
        };

        match self.chunks.entry(pos) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let chunk = Arc::new(RwLock::new(chunk));
                entry.insert(Arc::clone(&chunk));
                if generated {
                    self.notify_generated(pos);
                }
                Ok(chunk)
            }
        }
    }

    fn notify_generated(&self, pos: ChunkPos) {
        for observer in self.observers.read().values() {
            observer(pos);
        }
    }

    /// Block read at world coordinates; resolves the owning chunk first.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> WorldResult<BlockId> {
        let chunk = self.load_or_generate(ChunkPos::containing(x, y, z))?;
        let chunk = chunk.read();
        let pos = chunk.pos();
        Ok(chunk.get(
            x - pos.x * CHUNK_SIZE,
            y - pos.y * CHUNK_SIZE,
            z - pos.z * CHUNK_SIZE,
        ))
    }

    /// Block write at world coordinates; marks the owning chunk dirty.
    pub fn set_block(&self, x: i32, y: i32, z: i32, block: BlockId) -> WorldResult<()> {
        let pos = ChunkPos::containing(x, y, z);
        let chunk = self.load_or_generate(pos)?;
        {
            let mut chunk = chunk.write();
            chunk.set(
                x - pos.x * CHUNK_SIZE,
                y - pos.y * CHUNK_SIZE,
                z - pos.z * CHUNK_SIZE,
                block,
            );
        }
        self.mark_chunk_dirty(pos);
        Ok(())
    }

    /// Number of chunks currently resident.
    pub fn loaded_chunks(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks waiting for the next flush.
    pub fn pending_saves(&self) -> usize {
        self.dirty.lock().len()
    }
}

impl WorldBackend for LocalWorld {
    fn name(&self) -> &str {
        &self.name
    }

    fn initialize(&self) -> WorldResult<()> {
        let started = Instant::now();
        for pos in self.spawn_region() {
            self.load_or_generate(pos)?;
        }
        log::info!(
            "world \"{}\" primed {} spawn chunks in {:?}",
            self.name,
            self.loaded_chunks(),
            started.elapsed()
        );
        Ok(())
    }

    fn flush(&self) -> WorldResult<()> {
        if !self.save_enabled {
            log::warn!(
                "cannot save world \"{}\", saving is disabled in the configuration",
                self.name
            );
            return Ok(());
        }

        let pending: Vec<ChunkPos> = self.dirty.lock().drain().collect();
        for (index, pos) in pending.iter().enumerate() {
            if let Some(chunk) = self.chunks.get(pos) {
                if let Err(e) = self.store.save(&chunk.read()) {
                    // everything not yet written stays dirty for a retry
                    let mut dirty = self.dirty.lock();
                    dirty.extend(&pending[index..]);
                    return Err(e.into());
                }
            }
        }
        if !pending.is_empty() {
            log::debug!("world \"{}\" flushed {} chunks", self.name, pending.len());
        }
        Ok(())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.flush() {
            log::error!("failed to save world \"{}\" on close: {}", self.name, e);
        }
        self.chunks.clear();
        self.observers.write().clear();
    }

    fn mark_chunk_dirty(&self, pos: ChunkPos) {
        self.dirty.lock().insert(pos);
    }

    fn subscribe_generated(&self, observer: GeneratedChunkObserver) -> u64 {
        let token = self.next_observer.fetch_add(1, Ordering::Relaxed);
        self.observers.write().insert(token, observer);
        token
    }

    fn unsubscribe_generated(&self, token: u64) {
        self.observers.write().remove(&token);
    }
}

/// Provisions [`LocalWorld`] backends under the configured storage root.
pub struct LocalProvisioner {
    config: WorldsConfig,
}

impl LocalProvisioner {
    pub fn new(config: WorldsConfig) -> Self {
        Self { config }
    }
}

impl WorldProvisioner for LocalProvisioner {
    fn provision(
        &self,
        name: &str,
        generator: Arc<dyn WorldGenerator>,
        dir: &Path,
    ) -> WorldResult<Arc<dyn WorldBackend>> {
        Ok(Arc::new(LocalWorld::create(name, generator, dir, &self.config)?))
    }
}

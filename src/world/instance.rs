use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

use crossbeam_channel::{bounded, Receiver};

use crate::generator::WorldGenerator;
use crate::world::backend::WorldBackend;
use crate::world::{WorldError, WorldResult};

/// A live world registered with the lifecycle manager.
///
/// Constructed unready; the manager's completion path flips `ready` exactly
/// once, after initialization and the first flush have finished. The flag
/// is never reverted.
pub struct WorldInstance {
    name: String,
    generator_name: String,
    generator: Arc<dyn WorldGenerator>,
    backend: Arc<dyn WorldBackend>,
    ready: AtomicBool,
    observer_token: u64,
}

impl WorldInstance {
    /// Wrap a freshly provisioned backend.
    ///
    /// Subscribes the dirty-marking observer at construction: stores that
    /// only track *modified* chunks as dirty would otherwise drop generator
    /// output on shutdown. The observer holds no strong reference to the
    /// backend and is unregistered by [`WorldInstance::close`].
    pub fn new(
        name: impl Into<String>,
        generator_name: impl Into<String>,
        generator: Arc<dyn WorldGenerator>,
        backend: Arc<dyn WorldBackend>,
    ) -> Arc<Self> {
        let weak: Weak<dyn WorldBackend> = Arc::downgrade(&backend);
        let observer_token = backend.subscribe_generated(Arc::new(move |pos| {
            if let Some(backend) = weak.upgrade() {
                backend.mark_chunk_dirty(pos);
            }
        }));

        Arc::new(Self {
            name: name.into(),
            generator_name: generator_name.into(),
            generator,
            backend,
            ready: AtomicBool::new(false),
            observer_token,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name the generator was registered under.
    pub fn generator_name(&self) -> &str {
        &self.generator_name
    }

    pub fn generator(&self) -> &Arc<dyn WorldGenerator> {
        &self.generator
    }

    pub fn backend(&self) -> &Arc<dyn WorldBackend> {
        &self.backend
    }

    /// Whether initialization and the first persistence flush completed,
    /// making the world safe for occupancy.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Run the backend's blocking setup on its own thread. The returned
    /// channel yields the single completion result.
    pub fn initialize(self: &Arc<Self>) -> Receiver<WorldResult<()>> {
        let (tx, rx) = bounded(1);
        let instance = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(format!("world-init-{}", self.name))
            .spawn({
                let tx = tx.clone();
                move || {
                    let _ = tx.send(instance.backend.initialize());
                }
            });
        if let Err(e) = spawned {
            let _ = tx.send(Err(WorldError::InitializationFailed(format!(
                "could not spawn initialization thread: {}",
                e
            ))));
        }
        rx
    }

    /// Close the underlying world; the observer is unregistered first.
    pub fn close(&self) {
        self.backend.unsubscribe_generated(self.observer_token);
        self.backend.close();
    }
}

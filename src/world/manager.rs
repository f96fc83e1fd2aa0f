//! The world lifecycle manager: admission, registration, persistence of
//! metadata, and asynchronous completion of world initialization.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use dashmap::DashMap;

use crate::config::WorldsConfig;
use crate::generator::{GeneratorRegistry, WorldGenerator};
use crate::persistence::{PersistenceError, WorldMetadataRecord};
use crate::world::admission::AdmissionSlot;
use crate::world::backend::WorldProvisioner;
use crate::world::instance::WorldInstance;
use crate::world::{WorldError, WorldResult};

/// Outcome of a create or load request.
///
/// Validation failures and contention are ordinary results, never errors.
/// `Initializing` is the only outcome followed by an asynchronous
/// completion callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateResult {
    /// The requested generator name is not registered.
    InvalidWorldGenerator,
    /// A live world already uses this name.
    NameTaken,
    /// Infrastructure failure in the synchronous phase; details are logged.
    UnknownError,
    /// Retained for the old synchronous creation path; the asynchronous
    /// path reports `Initializing` instead.
    Created,
    /// Admitted. Initialization runs in the background and the completion
    /// callback will fire exactly once.
    Initializing,
    /// Another create or load currently holds the admission slot.
    Busy,
    /// The stored metadata names a generator that is not registered.
    GeneratorUnavailable,
    /// Storage for this name already exists on disk; load it instead.
    WorldExists,
    /// No world storage with a metadata record exists under this name.
    InvalidWorld,
}

/// Callback receiving the asynchronous outcome of an admitted request.
pub type ReadyCallback = Box<dyn FnOnce(Result<Arc<WorldInstance>, WorldError>) + Send>;

/// Owns every live world and serializes world creation and loading through
/// a capacity-1 admission slot.
///
/// Lookup, listing and destruction never touch the slot and may run
/// concurrently with an in-flight create or load.
pub struct WorldLifecycleManager {
    config: WorldsConfig,
    registry: Arc<GeneratorRegistry>,
    provisioner: Arc<dyn WorldProvisioner>,
    worlds: Arc<DashMap<String, Arc<WorldInstance>>>,
    slot: Arc<AdmissionSlot>,
}

impl WorldLifecycleManager {
    /// Create the manager and its storage root.
    pub fn new(
        config: WorldsConfig,
        registry: Arc<GeneratorRegistry>,
        provisioner: Arc<dyn WorldProvisioner>,
    ) -> WorldResult<Self> {
        fs::create_dir_all(&config.root)?;
        if !config.save_enabled {
            log::warn!(
                "world saving is disabled in the configuration, worlds will not survive a restart"
            );
        }
        Ok(Self {
            config,
            registry,
            provisioner,
            worlds: Arc::new(DashMap::new()),
            slot: Arc::new(AdmissionSlot::new()),
        })
    }

    fn world_dir(&self, name: &str) -> PathBuf {
        self.config.root.join(name)
    }

    /// World names double as storage directory names; reject anything that
    /// could resolve outside the storage root.
    fn valid_name(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.chars().any(char::is_whitespace)
    }

    /// Admit and start creation of a new world. Returns immediately;
    /// `Initializing` means `on_ready` fires later with the outcome.
    pub fn create<F>(&self, name: &str, generator_name: &str, on_ready: F) -> CreateResult
    where
        F: FnOnce(Result<Arc<WorldInstance>, WorldError>) + Send + 'static,
    {
        if self.slot.is_busy() {
            return CreateResult::Busy;
        }
        if !self.slot.try_acquire() {
            return CreateResult::Busy;
        }

        match self.admit_create(name, generator_name) {
            Ok(instance) => {
                self.spawn_completion(instance, Box::new(on_ready));
                CreateResult::Initializing
            }
            Err(result) => {
                self.slot.release();
                result
            }
        }
    }

    /// Admit and start loading of a persisted world. Same gating and
    /// completion discipline as [`WorldLifecycleManager::create`]; the slot
    /// is released on every synchronous failure path.
    pub fn load<F>(&self, name: &str, on_ready: F) -> CreateResult
    where
        F: FnOnce(Result<Arc<WorldInstance>, WorldError>) + Send + 'static,
    {
        if self.slot.is_busy() {
            return CreateResult::Busy;
        }
        if !self.slot.try_acquire() {
            return CreateResult::Busy;
        }

        match self.admit_load(name) {
            Ok(instance) => {
                self.spawn_completion(instance, Box::new(on_ready));
                CreateResult::Initializing
            }
            Err(result) => {
                self.slot.release();
                result
            }
        }
    }

    /// Synchronous phase of `create`; the caller holds the slot.
    fn admit_create(
        &self,
        name: &str,
        generator_name: &str,
    ) -> Result<Arc<WorldInstance>, CreateResult> {
        if !Self::valid_name(name) {
            log::warn!("rejecting unusable world name {:?}", name);
            return Err(CreateResult::UnknownError);
        }

        let generator: Arc<dyn WorldGenerator> = match self.registry.get(generator_name) {
            Some(generator) => Arc::from(generator),
            None => return Err(CreateResult::InvalidWorldGenerator),
        };

        if self.worlds.contains_key(name) {
            return Err(CreateResult::NameTaken);
        }

        let dir = self.world_dir(name);
        if dir.exists() {
            return Err(CreateResult::WorldExists);
        }

        // The metadata record lands on disk before initialization starts,
        // so a crash mid-initialization still leaves a reloadable world.
        let persisted = fs::create_dir_all(&dir)
            .map_err(WorldError::from)
            .and_then(|_| {
                WorldMetadataRecord::new(name, generator.type_key())
                    .save(&dir)
                    .map_err(WorldError::from)
            });
        if let Err(e) = persisted {
            log::error!("failed to persist metadata for world \"{}\": {}", name, e);
            return Err(CreateResult::UnknownError);
        }

        self.register(name, generator_name, generator, &dir)
    }

    /// Synchronous phase of `load`; the caller holds the slot.
    fn admit_load(&self, name: &str) -> Result<Arc<WorldInstance>, CreateResult> {
        if !Self::valid_name(name) {
            log::warn!("rejecting unusable world name {:?}", name);
            return Err(CreateResult::UnknownError);
        }

        let dir = self.world_dir(name);
        let record = match WorldMetadataRecord::load(&dir) {
            Ok(record) => record,
            Err(PersistenceError::MissingMetadata(_)) => return Err(CreateResult::InvalidWorld),
            Err(e) => {
                log::error!("failed to read metadata for world \"{}\": {}", name, e);
                return Err(CreateResult::UnknownError);
            }
        };

        let Some(generator_name) = self.registry.name_for_type(&record.generator_type) else {
            log::warn!(
                "world \"{}\" was created with generator \"{}\", which is not registered",
                name,
                record.generator_type
            );
            return Err(CreateResult::GeneratorUnavailable);
        };
        let generator: Arc<dyn WorldGenerator> = match self.registry.get(&generator_name) {
            Some(generator) => Arc::from(generator),
            None => return Err(CreateResult::GeneratorUnavailable),
        };

        if self.worlds.contains_key(name) {
            return Err(CreateResult::NameTaken);
        }

        self.register(name, &generator_name, generator, &dir)
    }

    /// Provision the backend and insert the instance into the registry.
    /// Shared tail of create and load.
    fn register(
        &self,
        name: &str,
        generator_name: &str,
        generator: Arc<dyn WorldGenerator>,
        dir: &Path,
    ) -> Result<Arc<WorldInstance>, CreateResult> {
        use dashmap::mapref::entry::Entry;

        let backend = match self.provisioner.provision(name, Arc::clone(&generator), dir) {
            Ok(backend) => backend,
            Err(e) => {
                log::error!("failed to provision world \"{}\": {}", name, e);
                return Err(CreateResult::UnknownError);
            }
        };

        let instance = WorldInstance::new(name, generator_name, generator, backend);
        match self.worlds.entry(name.to_string()) {
            Entry::Occupied(_) => {
                instance.close();
                Err(CreateResult::NameTaken)
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&instance));
                Ok(instance)
            }
        }
    }

    /// Asynchronous phase: wait for initialization, flush, flip readiness,
    /// free the slot, notify. Runs on its own thread. The slot is released
    /// on success and failure alike, and strictly before the callback so
    /// that a caller reacting to the callback is never turned away busy.
    fn spawn_completion(&self, instance: Arc<WorldInstance>, on_ready: ReadyCallback) {
        let initialized = instance.initialize();
        let worlds = Arc::clone(&self.worlds);
        let slot = Arc::clone(&self.slot);

        thread::spawn(move || {
            let result = match initialized.recv() {
                Ok(Ok(())) => instance.backend().flush(),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(WorldError::InitializationFailed(format!(
                    "initialization of \"{}\" ended without a result",
                    instance.name()
                ))),
            };

            match result {
                Ok(()) => {
                    instance.mark_ready();
                    log::info!("world \"{}\" is ready", instance.name());
                    slot.release();
                    on_ready(Ok(instance));
                }
                Err(e) => {
                    log::error!(
                        "initialization of world \"{}\" failed: {}",
                        instance.name(),
                        e
                    );
                    worlds.remove(instance.name());
                    instance.close();
                    slot.release();
                    on_ready(Err(e));
                }
            }
        });
    }

    /// Load every world with storage under the root, strictly one at a
    /// time. Startup-only: blocks between loads until the previous world
    /// reports its outcome. Returns the number of worlds brought up;
    /// failures are logged and skipped.
    pub fn load_all(&self) -> usize {
        let mut names: Vec<String> = match fs::read_dir(&self.config.root) {
            Ok(entries) => entries
                .filter_map(|entry| {
                    let entry = entry.ok()?;
                    entry
                        .file_type()
                        .ok()?
                        .is_dir()
                        .then(|| entry.file_name().to_string_lossy().into_owned())
                })
                .collect(),
            Err(e) => {
                log::error!(
                    "cannot enumerate world storage root {:?}: {}",
                    self.config.root,
                    e
                );
                return 0;
            }
        };
        names.sort();

        let mut loaded = 0;
        for name in names {
            let (tx, rx) = crossbeam_channel::bounded(1);
            match self.load(&name, move |outcome| {
                let _ = tx.send(outcome.is_ok());
            }) {
                CreateResult::Initializing => match rx.recv() {
                    Ok(true) => loaded += 1,
                    _ => log::warn!("world \"{}\" failed to initialize during startup", name),
                },
                other => log::warn!("skipping world \"{}\" during startup: {:?}", name, other),
            }
        }
        loaded
    }

    /// Look up a live world.
    pub fn get(&self, name: &str) -> Option<Arc<WorldInstance>> {
        self.worlds.get(name).map(|instance| Arc::clone(&instance))
    }

    /// Name and generator display name of every live world, sorted by name.
    pub fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .worlds
            .iter()
            .map(|entry| (entry.key().clone(), entry.generator_name().to_string()))
            .collect();
        entries.sort();
        entries
    }

    /// Remove and close a world. Its storage stays on disk, so the world
    /// can be loaded again later. Never contends with the admission slot.
    pub fn destroy(&self, name: &str) -> bool {
        match self.worlds.remove(name) {
            Some((_, instance)) => {
                instance.close();
                log::info!("destroyed world \"{}\"", name);
                true
            }
            None => false,
        }
    }

    /// Close every world and empty the registry. Must not run concurrently
    /// with in-flight create or load operations.
    pub fn close(&self) {
        for entry in self.worlds.iter() {
            entry.value().close();
        }
        self.worlds.clear();
    }
}

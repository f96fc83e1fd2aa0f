//! Lifecycle management for multiple isolated, independently persisted
//! simulation worlds inside a host application.
//!
//! Worlds are created against a named generator, reconstructed from their
//! on-disk metadata after a restart, listed, and destroyed at runtime.
//! Creation and loading are admitted one at a time through a capacity-1
//! slot; initialization runs on background threads and readiness is
//! reported through a completion callback, never by blocking the caller.
//!
//! ```no_run
//! use std::sync::Arc;
//! use multiworld::{
//!     builtin_candidates, GeneratorRegistry, LocalProvisioner, WorldLifecycleManager,
//!     WorldsConfig,
//! };
//!
//! let config = WorldsConfig::default();
//! let registry = Arc::new(GeneratorRegistry::new());
//! registry.register_candidates(&builtin_candidates());
//!
//! let provisioner = Arc::new(LocalProvisioner::new(config.clone()));
//! let manager = WorldLifecycleManager::new(config, registry, provisioner)?;
//!
//! manager.create("alpha", "flatland", |outcome| match outcome {
//!     Ok(world) => println!("world {} is ready", world.name()),
//!     Err(e) => eprintln!("world creation failed: {}", e),
//! });
//! # Ok::<(), multiworld::WorldError>(())
//! ```

pub mod config;
pub mod generator;
pub mod persistence;
pub mod world;

pub use config::{ConfigError, WorldsConfig};
pub use generator::{
    builtin_candidates, GeneratorCandidate, GeneratorRegistry, NoiseTerrainGenerator,
    SuperflatGenerator, WorldGenerator,
};
pub use world::{
    AdmissionSlot, BlockId, Chunk, ChunkPos, CreateResult, LocalProvisioner, LocalWorld,
    WorldBackend, WorldError, WorldInstance, WorldLifecycleManager, WorldProvisioner,
};

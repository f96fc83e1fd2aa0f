//! World generators and the registry resolving them by name or type key.

mod superflat;
mod terrain;

pub use superflat::SuperflatGenerator;
pub use terrain::NoiseTerrainGenerator;

use std::sync::Arc;

use dashmap::DashMap;

use crate::world::chunk::Chunk;

/// Produces terrain for chunks that have never been persisted.
pub trait WorldGenerator: Send + Sync {
    /// Stable identifier recorded in world metadata; must resolve back to
    /// this implementation across restarts. Distinct from the display name
    /// the generator is registered under.
    fn type_key(&self) -> &'static str;

    /// Fill `chunk` with generated content.
    fn generate_chunk(&self, chunk: &mut Chunk);

    /// Surface height of the column at world coordinates (`x`, `z`).
    fn surface_height(&self, x: i32, z: i32) -> i32;
}

type GeneratorFactory = Arc<dyn Fn() -> Box<dyn WorldGenerator> + Send + Sync>;

/// One entry in an explicit bulk-registration list.
///
/// Replaces runtime type scanning: crates enumerate their generator types as
/// candidates and hand them to [`GeneratorRegistry::register_candidates`].
#[derive(Clone, Copy)]
pub struct GeneratorCandidate {
    /// Stable type key, e.g. `multiworld::generator::SuperflatGenerator`.
    pub type_key: &'static str,
    /// Overrides the display name derived from the type key.
    pub display_name: Option<&'static str>,
    /// Zero-argument construction path; candidates without one are skipped.
    pub construct: Option<fn() -> Box<dyn WorldGenerator>>,
}

/// Maps generator names to factories producing fresh generator instances,
/// with a secondary index from stable type keys back to names.
pub struct GeneratorRegistry {
    factories: DashMap<String, GeneratorFactory>,
    type_index: DashMap<String, String>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self {
            factories: DashMap::new(),
            type_index: DashMap::new(),
        }
    }

    /// Store a factory under `name`. Returns false without touching the
    /// registry when the name is already taken.
    pub fn register<F>(&self, name: &str, type_key: &str, factory: F) -> bool
    where
        F: Fn() -> Box<dyn WorldGenerator> + Send + Sync + 'static,
    {
        use dashmap::mapref::entry::Entry;

        match self.factories.entry(name.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(factory));
                // first registration of a type wins the reverse mapping
                self.type_index
                    .entry(type_key.to_string())
                    .or_insert_with(|| name.to_string());
                true
            }
        }
    }

    /// Produce a fresh generator instance for `name`.
    pub fn get(&self, name: &str) -> Option<Box<dyn WorldGenerator>> {
        let factory = self.factories.get(name).map(|f| Arc::clone(f.value()))?;
        Some(factory())
    }

    /// Display name a type key was registered under.
    pub fn name_for_type(&self, type_key: &str) -> Option<String> {
        self.type_index.get(type_key).map(|name| name.value().clone())
    }

    /// Produce a fresh generator instance for a stable type key, as stored
    /// in world metadata.
    pub fn get_by_type(&self, type_key: &str) -> Option<Box<dyn WorldGenerator>> {
        self.name_for_type(type_key).and_then(|name| self.get(&name))
    }

    /// Registered display names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Register every usable candidate. Candidates without a construction
    /// path are skipped with a warning; duplicates are ignored silently.
    pub fn register_candidates(&self, candidates: &[GeneratorCandidate]) {
        for candidate in candidates {
            let Some(construct) = candidate.construct else {
                log::warn!(
                    "cannot register generator \"{}\", no zero-argument constructor",
                    candidate.type_key
                );
                continue;
            };

            let name = candidate
                .display_name
                .unwrap_or_else(|| short_type_name(candidate.type_key));

            if self.register(name, candidate.type_key, construct) {
                log::info!(
                    "registered world generator \"{}\" with name \"{}\"",
                    candidate.type_key,
                    name
                );
            }
        }
    }

    /// Drop every registration.
    pub fn close(&self) {
        self.factories.clear();
        self.type_index.clear();
    }
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Last path segment of a type key, used as the default display name.
fn short_type_name(type_key: &str) -> &str {
    type_key.rsplit("::").next().unwrap_or(type_key)
}

/// Candidates for the generators shipped with this crate.
pub fn builtin_candidates() -> Vec<GeneratorCandidate> {
    vec![
        GeneratorCandidate {
            type_key: SuperflatGenerator::TYPE_KEY,
            display_name: Some("flatland"),
            construct: Some(|| Box::<SuperflatGenerator>::default()),
        },
        GeneratorCandidate {
            type_key: NoiseTerrainGenerator::TYPE_KEY,
            display_name: Some("terrain"),
            construct: Some(|| Box::<NoiseTerrainGenerator>::default()),
        },
    ]
}

//! End-to-end lifecycle coverage: admission, readiness, persistence
//! round-trips and startup loading.

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::bounded;
use tempfile::TempDir;

use multiworld::generator::{GeneratorCandidate, GeneratorRegistry, SuperflatGenerator};
use multiworld::persistence::WorldMetadataRecord;
use multiworld::world::chunk::Chunk;
use multiworld::{
    builtin_candidates, CreateResult, LocalProvisioner, WorldGenerator, WorldInstance,
    WorldLifecycleManager, WorldsConfig,
};

/// Generator that dawdles over every chunk so the busy window of an
/// in-flight initialization is wide enough to observe.
struct SlowGenerator {
    delay: Duration,
    inner: SuperflatGenerator,
}

impl SlowGenerator {
    const TYPE_KEY: &'static str = "world_lifecycle::SlowGenerator";
}

impl Default for SlowGenerator {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(60),
            inner: SuperflatGenerator::default(),
        }
    }
}

impl WorldGenerator for SlowGenerator {
    fn type_key(&self) -> &'static str {
        Self::TYPE_KEY
    }

    fn generate_chunk(&self, chunk: &mut Chunk) {
        thread::sleep(self.delay);
        self.inner.generate_chunk(chunk);
    }

    fn surface_height(&self, x: i32, z: i32) -> i32 {
        self.inner.surface_height(x, z)
    }
}

fn test_registry() -> Arc<GeneratorRegistry> {
    let registry = Arc::new(GeneratorRegistry::new());
    registry.register_candidates(&builtin_candidates());
    registry.register_candidates(&[GeneratorCandidate {
        type_key: SlowGenerator::TYPE_KEY,
        display_name: Some("slowpoke"),
        construct: Some(|| Box::<SlowGenerator>::default()),
    }]);
    registry
}

fn test_manager(root: &Path) -> WorldLifecycleManager {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = WorldsConfig {
        root: root.to_path_buf(),
        spawn_radius: 0,
        ..Default::default()
    };
    let provisioner = Arc::new(LocalProvisioner::new(config.clone()));
    WorldLifecycleManager::new(config, test_registry(), provisioner).expect("manager")
}

/// Create a world and block until its completion callback fires.
fn create_and_wait(
    manager: &WorldLifecycleManager,
    name: &str,
    generator: &str,
) -> Result<Arc<WorldInstance>> {
    let (tx, rx) = bounded(1);
    let result = manager.create(name, generator, move |outcome| {
        let _ = tx.send(outcome);
    });
    assert_eq!(result, CreateResult::Initializing);
    Ok(rx.recv_timeout(Duration::from_secs(30))??)
}

#[test]
fn test_create_reports_initializing_then_ready() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    let (tx, rx) = bounded(1);
    let result = manager.create("alpha", "slowpoke", move |outcome| {
        let _ = tx.send(outcome);
    });
    assert_eq!(result, CreateResult::Initializing);

    // registered immediately, but not yet ready
    let instance = manager.get("alpha").expect("registered instance");
    assert!(!instance.is_ready());
    assert_eq!(instance.generator_name(), "slowpoke");

    // while the slot is held, every create and load is turned away
    assert_eq!(manager.create("beta", "flatland", |_| {}), CreateResult::Busy);
    assert_eq!(manager.load("beta", |_| {}), CreateResult::Busy);

    let ready = rx.recv_timeout(Duration::from_secs(30))??;
    assert!(ready.is_ready());
    assert_eq!(ready.name(), "alpha");

    // the callback fired, so the slot is free again
    let gamma = create_and_wait(&manager, "gamma", "flatland")?;
    assert!(gamma.is_ready());
    Ok(())
}

#[test]
fn test_duplicate_name_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    create_and_wait(&manager, "alpha", "flatland")?;
    assert_eq!(
        manager.create("alpha", "flatland", |_| {}),
        CreateResult::NameTaken
    );
    Ok(())
}

#[test]
fn test_unknown_generator_is_rejected() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    assert_eq!(
        manager.create("alpha", "no-such-generator", |_| {}),
        CreateResult::InvalidWorldGenerator
    );
    assert!(manager.get("alpha").is_none());
    assert!(!root.path().join("alpha").exists());

    // the rejection released the slot
    create_and_wait(&manager, "alpha", "flatland")?;
    Ok(())
}

#[test]
fn test_destroy_removes_world() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    create_and_wait(&manager, "alpha", "flatland")?;
    assert!(manager.destroy("alpha"));
    assert!(manager.get("alpha").is_none());
    assert!(!manager.destroy("alpha"));
    assert!(!manager.destroy("never-existed"));
    Ok(())
}

#[test]
fn test_create_on_existing_storage_suggests_load() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    create_and_wait(&manager, "alpha", "flatland")?;
    assert!(manager.destroy("alpha"));

    // storage survives destruction, so the name is creatable only via load
    assert_eq!(
        manager.create("alpha", "flatland", |_| {}),
        CreateResult::WorldExists
    );

    let (tx, rx) = bounded(1);
    assert_eq!(
        manager.load("alpha", move |outcome| {
            let _ = tx.send(outcome);
        }),
        CreateResult::Initializing
    );
    let instance = rx.recv_timeout(Duration::from_secs(30))??;
    assert!(instance.is_ready());
    Ok(())
}

#[test]
fn test_metadata_round_trip_after_restart() -> Result<()> {
    let root = TempDir::new()?;

    {
        let manager = test_manager(root.path());
        create_and_wait(&manager, "alpha", "flatland")?;
        manager.close();
    }

    let record = WorldMetadataRecord::load(&root.path().join("alpha"))?;
    assert_eq!(record.level_name, "alpha");
    assert_eq!(record.generator_type, SuperflatGenerator::TYPE_KEY);

    // a fresh manager resolves the persisted generator identity
    let manager = test_manager(root.path());
    let (tx, rx) = bounded(1);
    assert_eq!(
        manager.load("alpha", move |outcome| {
            let _ = tx.send(outcome);
        }),
        CreateResult::Initializing
    );
    let instance = rx.recv_timeout(Duration::from_secs(30))??;
    assert!(instance.is_ready());
    assert_eq!(instance.generator_name(), "flatland");
    assert_eq!(instance.generator().type_key(), SuperflatGenerator::TYPE_KEY);
    Ok(())
}

#[test]
fn test_load_without_metadata_is_invalid_world() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    assert_eq!(manager.load("ghost", |_| {}), CreateResult::InvalidWorld);

    // a bare directory without a record is not loadable either
    std::fs::create_dir(root.path().join("husk"))?;
    assert_eq!(manager.load("husk", |_| {}), CreateResult::InvalidWorld);
    Ok(())
}

#[test]
fn test_load_with_unregistered_generator_is_unavailable() -> Result<()> {
    let root = TempDir::new()?;

    {
        let manager = test_manager(root.path());
        create_and_wait(&manager, "alpha", "flatland")?;
        manager.close();
    }

    // a manager whose registry lacks the recorded generator type
    let config = WorldsConfig {
        root: root.path().to_path_buf(),
        spawn_radius: 0,
        ..Default::default()
    };
    let provisioner = Arc::new(LocalProvisioner::new(config.clone()));
    let manager =
        WorldLifecycleManager::new(config, Arc::new(GeneratorRegistry::new()), provisioner)?;

    assert_eq!(
        manager.load("alpha", |_| {}),
        CreateResult::GeneratorUnavailable
    );
    Ok(())
}

#[test]
fn test_load_all_brings_up_every_world_in_turn() -> Result<()> {
    let root = TempDir::new()?;

    {
        let manager = test_manager(root.path());
        for name in ["one", "two", "three"] {
            create_and_wait(&manager, name, "flatland")?;
        }
        manager.close();
    }

    let manager = test_manager(root.path());
    assert_eq!(manager.load_all(), 3);

    let listed = manager.list();
    assert_eq!(
        listed,
        vec![
            ("one".to_string(), "flatland".to_string()),
            ("three".to_string(), "flatland".to_string()),
            ("two".to_string(), "flatland".to_string()),
        ]
    );
    for (name, _) in listed {
        assert!(manager.get(&name).expect("loaded world").is_ready());
    }
    Ok(())
}

#[test]
fn test_load_all_skips_broken_directories() -> Result<()> {
    let root = TempDir::new()?;

    {
        let manager = test_manager(root.path());
        create_and_wait(&manager, "alpha", "flatland")?;
        manager.close();
    }

    // a directory without a metadata record must not stop startup
    std::fs::create_dir(root.path().join("husk"))?;

    let manager = test_manager(root.path());
    assert_eq!(manager.load_all(), 1);
    assert!(manager.get("alpha").is_some());
    assert!(manager.get("husk").is_none());
    Ok(())
}

#[test]
fn test_close_shuts_every_world() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    create_and_wait(&manager, "alpha", "flatland")?;
    create_and_wait(&manager, "beta", "terrain")?;
    assert_eq!(manager.list().len(), 2);

    manager.close();
    assert!(manager.list().is_empty());
    assert!(manager.get("alpha").is_none());
    Ok(())
}

#[test]
fn test_destroy_ignores_the_admission_slot() -> Result<()> {
    let root = TempDir::new()?;
    let manager = test_manager(root.path());

    create_and_wait(&manager, "alpha", "flatland")?;

    let (tx, rx) = bounded(1);
    assert_eq!(
        manager.create("slow", "slowpoke", move |outcome| {
            let _ = tx.send(outcome);
        }),
        CreateResult::Initializing
    );

    // destruction of an unrelated world proceeds while the slot is held
    assert!(manager.destroy("alpha"));
    assert!(manager.get("alpha").is_none());

    let instance = rx.recv_timeout(Duration::from_secs(30))??;
    assert!(instance.is_ready());
    Ok(())
}

//! Runtime configuration for the world host.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Settings governing world storage and provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldsConfig {
    /// Directory holding one subdirectory per world.
    pub root: PathBuf,
    /// Persist chunks on flush and close. When disabled, worlds live only
    /// in memory and do not survive a restart.
    pub save_enabled: bool,
    /// Radius, in chunks, of the spawn region primed during world
    /// initialization.
    pub spawn_radius: i32,
}

impl Default for WorldsConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("worlds"),
            save_enabled: true,
            spawn_radius: 2,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl WorldsConfig {
    /// Load settings from a TOML file; absent keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&std::fs::read_to_string(path)?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorldsConfig::default();
        assert_eq!(config.root, PathBuf::from("worlds"));
        assert!(config.save_enabled);
        assert_eq!(config.spawn_radius, 2);
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("worlds.toml");
        std::fs::write(&path, "root = \"/srv/worlds\"\nspawn_radius = 1\n").expect("write");

        let config = WorldsConfig::from_file(&path).expect("parse");
        assert_eq!(config.root, PathBuf::from("/srv/worlds"));
        assert_eq!(config.spawn_radius, 1);
        assert!(config.save_enabled);
    }

    #[test]
    fn test_malformed_file_is_rejected() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("worlds.toml");
        std::fs::write(&path, "spawn_radius = \"far\"\n").expect("write");

        assert!(matches!(
            WorldsConfig::from_file(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}

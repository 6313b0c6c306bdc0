//! Server configuration, loaded from .interstellar/config.yaml

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use interstellar_core::GalaxyConfig;
use serde::{Deserialize, Serialize};

/// Everything a [`GameService`](crate::GameService) needs besides its repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Directory holding game documents and the move journal
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// How many times a move is re-read and re-applied after losing a version race
    #[serde(default = "default_max_move_retries")]
    pub max_move_retries: u32,

    /// Write game events to `<data_dir>/events.jsonl`
    #[serde(default = "default_true")]
    pub journal: bool,

    /// Parameters for newly created galaxies
    pub galaxy: GalaxyConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".interstellar/games")
}
fn default_max_move_retries() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_move_retries: default_max_move_retries(),
            journal: true,
            galaxy: GalaxyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(config)
    }

    /// Load from a project root (looks for .interstellar/config.yaml)
    pub fn load_from_dir(root: &Path) -> Result<Self> {
        let config_path = root.join(".interstellar/config.yaml");
        let mut config = if config_path.exists() {
            Self::load(&config_path)?
        } else {
            Self::default()
        };
        config.resolve_paths(root);
        Ok(config)
    }

    /// Make a relative `data_dir` relative to `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        if self.data_dir.is_relative() {
            self.data_dir = root.join(&self.data_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.galaxy.validate().context("galaxy")?;
        if self.data_dir.as_os_str().is_empty() {
            bail!("data_dir must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServerConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.max_move_retries, 3);
        assert_eq!(config.data_dir, dir.path().join(".interstellar/games"));
        assert_eq!(config.galaxy, GalaxyConfig::default());
    }

    #[test]
    fn partial_yaml_overrides_only_what_it_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".interstellar")).unwrap();
        std::fs::write(
            dir.path().join(".interstellar/config.yaml"),
            "max_move_retries: 5\ngalaxy:\n  initial_fleets: 7\n  seed: 42\n",
        )
        .unwrap();

        let config = ServerConfig::load_from_dir(dir.path()).unwrap();
        assert_eq!(config.max_move_retries, 5);
        assert!(config.journal);
        assert_eq!(config.galaxy.initial_fleets, 7);
        assert_eq!(config.galaxy.seed, Some(42));
        assert_eq!(config.galaxy.max_systems, 30);
    }

    #[test]
    fn invalid_galaxy_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "galaxy:\n  min_systems: 40\n  max_systems: 10\n").unwrap();

        let err = ServerConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("systems range is inverted"));
    }
}

//! Configuration for the ECS and the simulation driver

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ecs::{DEFAULT_MAX_ENTITIES, NULL_ENTITY_ID};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration for a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    pub seed: u64,
    #[serde(default)]
    pub ecs: EcsConfig,
    #[serde(default)]
    pub spatial: SpatialConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EcsConfig {
    /// Size of the entity id space
    #[serde(default = "default_max_entities")]
    pub max_entities: u32,
    /// Dense slots reserved up front in every component pool
    #[serde(default = "default_pool_capacity")]
    pub initial_pool_capacity: usize,
}

fn default_max_entities() -> u32 {
    DEFAULT_MAX_ENTITIES
}

fn default_pool_capacity() -> usize {
    64
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            max_entities: default_max_entities(),
            initial_pool_capacity: default_pool_capacity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Edge length of a chunk in world units
    #[serde(default = "default_chunk_size")]
    pub chunk_size: f32,
}

fn default_chunk_size() -> f32 {
    16.0
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub ticks: u64,
    pub dt_seconds: f32,
    pub initial_entities: usize,
    pub spawn_per_tick: usize,
    /// Upper bound on the speed of spawned entities, in units per second
    pub max_speed: f32,
    pub min_lifetime_ticks: u32,
    pub max_lifetime_ticks: u32,
    /// Entities spawn within `[-world_extent, world_extent]` on both axes
    pub world_extent: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            ticks: 120,
            dt_seconds: 0.016,
            initial_entities: 256,
            spawn_per_tick: 4,
            max_speed: 3.0,
            min_lifetime_ticks: 30,
            max_lifetime_ticks: 240,
            world_extent: 128.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(io_err)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(io_err)?;

        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Small open world used by the CLI when no file is given
    pub fn sandbox() -> Self {
        Self {
            name: "sandbox".to_string(),
            seed: 7,
            ecs: EcsConfig::default(),
            spatial: SpatialConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.ecs.max_entities == 0 || self.ecs.max_entities >= NULL_ENTITY_ID {
            return invalid(format!(
                "ecs.max_entities must be in 1..={}, got {}",
                NULL_ENTITY_ID - 1,
                self.ecs.max_entities
            ));
        }
        if !(self.spatial.chunk_size > 0.0) {
            return invalid(format!(
                "spatial.chunk_size must be positive, got {}",
                self.spatial.chunk_size
            ));
        }

        let sim = &self.simulation;
        if !(sim.dt_seconds > 0.0) {
            return invalid(format!(
                "simulation.dt_seconds must be positive, got {}",
                sim.dt_seconds
            ));
        }
        if sim.min_lifetime_ticks == 0 || sim.min_lifetime_ticks > sim.max_lifetime_ticks {
            return invalid(format!(
                "simulation lifetime range {}..={} is empty",
                sim.min_lifetime_ticks, sim.max_lifetime_ticks
            ));
        }
        if sim.max_speed < 0.0 || !(sim.world_extent > 0.0) {
            return invalid("simulation.max_speed and world_extent must be non-negative".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_config() {
        let config = Config::sandbox();

        assert_eq!(config.name, "sandbox");
        assert_eq!(config.seed, 7);
        assert_eq!(config.ecs.max_entities, 65536);
        assert_eq!(config.spatial.chunk_size, 16.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_default() {
        let config = Config::from_yaml_str("name: tiny\nseed: 3\n").unwrap();
        assert_eq!(config.ecs, EcsConfig::default());
        assert_eq!(config.simulation.ticks, 120);
        assert_eq!(config.logging.level, "info");

        let config =
            Config::from_yaml_str("name: tiny\nseed: 3\nsimulation:\n  ticks: 5\n").unwrap();
        assert_eq!(config.simulation.ticks, 5);
        assert_eq!(config.simulation.spawn_per_tick, 4);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::sandbox();
        config.ecs.max_entities = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::sandbox();
        config.ecs.max_entities = u32::MAX;
        assert!(config.validate().is_err());

        let mut config = Config::sandbox();
        config.spatial.chunk_size = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::sandbox();
        config.simulation.min_lifetime_ticks = 500;
        assert!(config.validate().is_err());

        assert!(Config::from_yaml_str("name: x\nseed: 1\necs:\n  max_entities: 0\n").is_err());
        assert!(matches!(
            Config::from_yaml_str("name: [\n"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_yaml("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! JSON diagnostic dump of a world's population and pools.
//!
//! Not a save format: only counts and component metadata are written.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ecs::{ComponentId, EntityWorld};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolReport {
    pub id: ComponentId,
    pub name: String,
    pub size_bytes: usize,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldReport {
    pub name: String,
    pub tick: u64,
    pub generated_at: String,
    pub entity_count: usize,
    pub max_entities: u32,
    pub pools: Vec<PoolReport>,
}

impl WorldReport {
    pub fn capture(name: &str, tick: u64, world: &EntityWorld) -> Self {
        let em = world.manager();
        let pools = em
            .registry()
            .iter()
            .map(|info| PoolReport {
                id: info.id,
                name: info.name.to_string(),
                size_bytes: info.size,
                len: em.pool_len_by_id(info.id),
            })
            .collect();

        Self {
            name: name.to_string(),
            tick,
            generated_at: chrono::Local::now().to_rfc3339(),
            entity_count: world.entity_count(),
            max_entities: world.max_entities(),
            pools,
        }
    }

    pub fn pool(&self, name: &str) -> Option<&PoolReport> {
        self.pools.iter().find(|pool| pool.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize world report")
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write report to {}", path.display()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read report {}", path.display()))?;
        serde_json::from_str(&contents).context("malformed world report")
    }
}

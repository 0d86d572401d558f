//! Spatial chunk map - broad-phase lookup of entities by world region.
//!
//! The map keeps itself current through `Position` lifecycle hooks; systems
//! that move entities call [`ChunkMap::relocate`] after writing the new
//! position.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::components::{Position, Size};
use crate::config::SpatialConfig;
use crate::ecs::{Entity, EntityWorld};

/// Chunk coordinates; chunk `(0, 0)` covers `[0, chunk_size)` on both axes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Inclusive rectangle of chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRect {
    pub min: ChunkPos,
    pub max: ChunkPos,
}

impl ChunkRect {
    pub fn iter(self) -> impl Iterator<Item = ChunkPos> {
        (self.min.y..=self.max.y)
            .flat_map(move |y| (self.min.x..=self.max.x).map(move |x| ChunkPos::new(x, y)))
    }
}

pub struct ChunkMap {
    chunk_size: f32,
    chunks: HashMap<ChunkPos, Vec<Entity>>,
    /// Chunks each tracked entity is currently bucketed into
    tracked: HashMap<Entity, ChunkRect>,
}

impl ChunkMap {
    pub fn new(config: &SpatialConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunks: HashMap::new(),
            tracked: HashMap::new(),
        }
    }

    /// Hooks `map` into the world's `Position` add and remove events
    pub fn install(map: &Rc<RefCell<ChunkMap>>, world: &mut EntityWorld) -> bool {
        let on_add = Rc::clone(map);
        let added = world.on_add::<Position>(move |w, entity| {
            // a deferred event may arrive after the entity is gone
            let Some(&position) = w.get::<Position>(entity) else {
                return;
            };
            let size = w.get::<Size>(entity).copied();
            on_add.borrow_mut().insert(entity, &position, size.as_ref());
        });

        let on_remove = Rc::clone(map);
        let removed = world.before_remove::<Position>(move |_, entity| {
            on_remove.borrow_mut().remove(entity);
        });

        if !(added && removed) {
            warn!("chunk map not installed: Position is not registered");
            return false;
        }
        debug!("chunk map installed");
        true
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn chunk_at(&self, x: f32, y: f32) -> ChunkPos {
        ChunkPos::new(
            (x / self.chunk_size).floor() as i32,
            (y / self.chunk_size).floor() as i32,
        )
    }

    /// Chunks overlapped by an entity at `position` with optional `size`
    pub fn bounds(&self, position: &Position, size: Option<&Size>) -> ChunkRect {
        let (width, height) = size.map_or((0.0, 0.0), |s| (s.width.max(0.0), s.height.max(0.0)));
        ChunkRect {
            min: self.chunk_at(position.x, position.y),
            max: self.chunk_at(position.x + width, position.y + height),
        }
    }

    pub fn insert(&mut self, entity: Entity, position: &Position, size: Option<&Size>) {
        if self.tracked.contains_key(&entity) {
            self.remove(entity);
        }
        let rect = self.bounds(position, size);
        for chunk in rect.iter() {
            self.chunks.entry(chunk).or_default().push(entity);
        }
        self.tracked.insert(entity, rect);
    }

    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(rect) = self.tracked.remove(&entity) else {
            return false;
        };
        for chunk in rect.iter() {
            if let Some(bucket) = self.chunks.get_mut(&chunk) {
                if let Some(i) = bucket.iter().position(|&e| e == entity) {
                    bucket.swap_remove(i);
                }
                if bucket.is_empty() {
                    self.chunks.remove(&chunk);
                }
            }
        }
        true
    }

    /// Rebuckets a moved entity. Returns whether its chunk set changed.
    pub fn relocate(&mut self, entity: Entity, position: &Position, size: Option<&Size>) -> bool {
        let rect = self.bounds(position, size);
        if self.tracked.get(&entity) == Some(&rect) {
            return false;
        }
        self.insert(entity, position, size);
        true
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.tracked.contains_key(&entity)
    }

    pub fn entities_in_chunk(&self, chunk: ChunkPos) -> &[Entity] {
        self.chunks.get(&chunk).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Entities bucketed in any chunk overlapping the world-space box
    /// `[min, max]`, each reported once
    pub fn entities_in_range(&self, min: (f32, f32), max: (f32, f32)) -> Vec<Entity> {
        let rect = ChunkRect {
            min: self.chunk_at(min.0, min.1),
            max: self.chunk_at(max.0, max.1),
        };
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for chunk in rect.iter() {
            for &entity in self.entities_in_chunk(chunk) {
                if seen.insert(entity) {
                    found.push(entity);
                }
            }
        }
        found
    }

    /// Calls `f` once for every entity in a chunk within `radius` of the point
    pub fn for_each_entity_near_point(&self, x: f32, y: f32, radius: f32, mut f: impl FnMut(Entity)) {
        for entity in self.entities_in_range((x - radius, y - radius), (x + radius, y + radius)) {
            f(entity);
        }
    }

    /// Closest live entity whose position lies within `radius` of the point
    pub fn find_closest_entity(
        &self,
        world: &EntityWorld,
        x: f32,
        y: f32,
        radius: f32,
    ) -> Option<Entity> {
        let limit = radius * radius;
        let mut best: Option<(f32, Entity)> = None;
        self.for_each_entity_near_point(x, y, radius, |entity| {
            let Some(position) = world.get::<Position>(entity) else {
                return;
            };
            let distance = position.distance_squared(x, y);
            if distance <= limit && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, entity));
            }
        });
        best.map(|(_, entity)| entity)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

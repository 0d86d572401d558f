//! Game component types used by the simulation driver

use serde::{Deserialize, Serialize};

use crate::ecs::{Component, EntityWorld};
use crate::error::EcsError;

/// World-space position of an entity's top-left corner
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, x: f32, y: f32) -> f32 {
        let (dx, dy) = (self.x - x, self.y - y);
        dx * dx + dy * dy
    }
}

impl Component for Position {}

/// Axis-aligned extent, in world units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Default for Size {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

impl Component for Size {}

/// Units per second
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

impl Component for Velocity {}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining_ticks: u32,
}

impl Component for Lifetime {}

/// Flag: never moved by the movement system
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Anchored;

impl Component for Anchored {}

/// Registers every game component, in a fixed order so ids are stable
pub fn register_all(world: &mut EntityWorld) -> Result<(), EcsError> {
    world.register::<Position>()?;
    world.register::<Size>()?;
    world.register::<Velocity>()?;
    world.register::<Lifetime>()?;
    world.register::<Anchored>()?;
    Ok(())
}

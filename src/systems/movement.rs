use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::{
    components::{Anchored, Position, Size, Velocity},
    ecs::EntityWorld,
    engine::{System, SystemContext},
    rng::SystemRng,
    spatial::ChunkMap,
};

/// Integrates velocity into position, bouncing off the world edge, and keeps
/// the chunk map in step
pub struct MovementSystem {
    chunks: Rc<RefCell<ChunkMap>>,
    world_extent: f32,
    rebucketed: u64,
}

impl MovementSystem {
    pub fn new(chunks: Rc<RefCell<ChunkMap>>, world_extent: f32) -> Self {
        Self {
            chunks,
            world_extent,
            rebucketed: 0,
        }
    }

    /// Moves that crossed a chunk boundary, over the whole run
    pub fn rebucketed(&self) -> u64 {
        self.rebucketed
    }
}

fn bounce(position: &mut f32, speed: &mut f32, extent: f32) {
    if *position < -extent {
        *position = -extent;
        *speed = speed.abs();
    } else if *position > extent {
        *position = extent;
        *speed = -speed.abs();
    }
}

impl System for MovementSystem {
    fn name(&self) -> &str {
        "movement"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut EntityWorld,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let movers = world
            .query()
            .with::<(Position, Velocity)>()
            .without::<(Anchored,)>()
            .build();
        let dt = ctx.dt_seconds;
        let extent = self.world_extent;
        let chunks = &self.chunks;
        let mut rebucketed = 0;

        world.for_each(movers, |w, entity| {
            let Some(mut velocity) = w.get::<Velocity>(entity).copied() else {
                return;
            };
            let Some(position) = w.get_mut::<Position>(entity) else {
                return;
            };
            position.x += velocity.dx * dt;
            position.y += velocity.dy * dt;
            bounce(&mut position.x, &mut velocity.dx, extent);
            bounce(&mut position.y, &mut velocity.dy, extent);
            let position = *position;

            w.set(entity, velocity);
            let size = w.get::<Size>(entity).copied();
            if chunks.borrow_mut().relocate(entity, &position, size.as_ref()) {
                rebucketed += 1;
            }
        });

        self.rebucketed += rebucketed;
        Ok(())
    }
}

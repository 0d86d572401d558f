use anyhow::{Context, Result};
use log::{debug, warn};
use rand::Rng;

use crate::{
    components::{Anchored, Lifetime, Position, Size, Velocity},
    config::SimulationConfig,
    ecs::{EntityWorld, PrototypeId},
    engine::{System, SystemContext},
    rng::SystemRng,
};

/// Spawns a batch of wandering entities on the first tick and a trickle after
pub struct SpawnSystem {
    settings: SimulationConfig,
    prototype: Option<PrototypeId>,
    spawned: u64,
}

impl SpawnSystem {
    pub fn new(settings: &SimulationConfig) -> Self {
        Self {
            settings: settings.clone(),
            prototype: None,
            spawned: 0,
        }
    }

    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    fn prototype(&mut self, world: &mut EntityWorld) -> Result<PrototypeId> {
        if let Some(id) = self.prototype {
            return Ok(id);
        }
        let signature = world
            .signature_of::<(Size, Velocity, Lifetime)>()
            .context("wanderer components are not registered")?;
        let id = world.define_prototype("wanderer", signature);
        self.prototype = Some(id);
        Ok(id)
    }
}

impl System for SpawnSystem {
    fn name(&self) -> &str {
        "spawn"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut EntityWorld,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let prototype = self.prototype(world)?;
        let count = if ctx.tick == 1 {
            self.settings.initial_entities
        } else {
            self.settings.spawn_per_tick
        };

        let s = &self.settings;
        let mut created = 0;
        for _ in 0..count {
            let entity = world.spawn(prototype);
            if entity.is_null() {
                warn!("spawn stopped at {} entities: world is full", world.entity_count());
                break;
            }

            // anchored entities never move and are left out of movement queries
            if rng.gen_bool(0.1) {
                world.add_component(entity, Anchored);
            } else {
                world.set(
                    entity,
                    Velocity {
                        dx: rng.gen_range(-s.max_speed..=s.max_speed),
                        dy: rng.gen_range(-s.max_speed..=s.max_speed),
                    },
                );
            }
            world.set(
                entity,
                Lifetime {
                    remaining_ticks: rng.gen_range(s.min_lifetime_ticks..=s.max_lifetime_ticks),
                },
            );
            world.set(
                entity,
                Size {
                    width: rng.gen_range(0.5..=2.0),
                    height: rng.gen_range(0.5..=2.0),
                },
            );

            // position last so the chunk map sees the final size
            let position = Position::new(
                rng.gen_range(-s.world_extent..=s.world_extent),
                rng.gen_range(-s.world_extent..=s.world_extent),
            );
            world.add_component(entity, position);
            created += 1;
        }

        self.spawned += created;
        if created > 0 {
            debug!("tick {}: spawned {created} entities", ctx.tick);
        }
        Ok(())
    }
}

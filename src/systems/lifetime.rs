use anyhow::Result;
use log::debug;

use crate::{
    components::Lifetime,
    ecs::EntityWorld,
    engine::{System, SystemContext},
    rng::SystemRng,
};

/// Counts lifetimes down and destroys expired entities.
///
/// Destruction happens mid-iteration inside a deferred scope, so remove hooks
/// run only after the pass has finished.
pub struct LifetimeSystem {
    expired: u64,
}

impl LifetimeSystem {
    pub fn new() -> Self {
        Self { expired: 0 }
    }

    pub fn expired(&self) -> u64 {
        self.expired
    }
}

impl Default for LifetimeSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for LifetimeSystem {
    fn name(&self) -> &str {
        "lifetime"
    }

    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut EntityWorld,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let mortal = world.query().with::<(Lifetime,)>().build();

        let expired = world.deferred(|w| {
            let mut expired = 0;
            w.for_each(mortal, |w, entity| {
                let Some(lifetime) = w.get_mut::<Lifetime>(entity) else {
                    return;
                };
                lifetime.remaining_ticks = lifetime.remaining_ticks.saturating_sub(1);
                if lifetime.remaining_ticks == 0 && w.destroy(entity) {
                    expired += 1;
                }
            });
            expired
        });

        self.expired += expired;
        if expired > 0 {
            debug!("tick {}: {expired} entities expired", ctx.tick);
        }
        Ok(())
    }
}

//! Fixed-step engine that runs named systems against an [`EntityWorld`]

use std::time::Instant;

use anyhow::{Context, Result};
use log::{debug, trace};

use crate::{
    config::Config,
    ecs::EntityWorld,
    rng::{RngManager, SystemRng},
};

pub struct EngineSettings {
    pub name: String,
    pub seed: u64,
    pub dt_seconds: f32,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            seed: config.seed,
            dt_seconds: config.simulation.dt_seconds,
        }
    }
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    pub fn build(self) -> Engine {
        Engine {
            rng: RngManager::new(self.settings.seed),
            systems: self.systems,
            settings: self.settings,
            tick: 0,
        }
    }
}

pub struct Engine {
    rng: RngManager,
    systems: Vec<Box<dyn System>>,
    settings: EngineSettings,
    tick: u64,
}

impl Engine {
    /// Runs every system once, in insertion order
    pub fn tick(&mut self, world: &mut EntityWorld) -> Result<TickSummary> {
        self.tick += 1;
        let mut system_reports = Vec::with_capacity(self.systems.len());

        for system in &mut self.systems {
            let ctx = SystemContext {
                tick: self.tick,
                dt_seconds: self.settings.dt_seconds,
                run_name: &self.settings.name,
            };
            let mut rng = self.rng.stream(system.name());
            let start = Instant::now();
            system
                .run(&ctx, world, &mut rng)
                .with_context(|| format!("system `{}` failed on tick {}", system.name(), self.tick))?;
            system_reports.push(SystemRunReport {
                name: system.name().to_string(),
                duration_ms: start.elapsed().as_secs_f64() * 1_000.0,
            });
        }

        // hooks must never be left queued between ticks
        debug_assert!(!world.is_deferring());

        let summary = TickSummary {
            tick: self.tick,
            entity_count: world.entity_count(),
            system_reports,
        };
        trace!(
            "tick {} done: {} entities in {:.3} ms",
            summary.tick,
            summary.entity_count,
            summary.total_ms()
        );
        Ok(summary)
    }

    pub fn run(&mut self, world: &mut EntityWorld, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_, _| {})
    }

    /// Runs `ticks` ticks, handing each summary to `hook`
    pub fn run_with_hook<F>(&mut self, world: &mut EntityWorld, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(&TickSummary, &EntityWorld),
    {
        debug!(
            "running `{}` for {ticks} ticks with {} systems",
            self.settings.name,
            self.systems.len()
        );
        for _ in 0..ticks {
            let summary = self.tick(world)?;
            hook(&summary, world);
        }
        Ok(())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|system| system.name()).collect()
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt_seconds: f32,
    pub run_name: &'a str,
}

pub trait System {
    fn name(&self) -> &str;
    fn run(
        &mut self,
        ctx: &SystemContext,
        world: &mut EntityWorld,
        rng: &mut SystemRng<'_>,
    ) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct SystemRunReport {
    pub name: String,
    pub duration_ms: f64,
}

#[derive(Clone, Debug)]
pub struct TickSummary {
    pub tick: u64,
    pub entity_count: usize,
    pub system_reports: Vec<SystemRunReport>,
}

impl TickSummary {
    pub fn total_ms(&self) -> f64 {
        self.system_reports.iter().map(|r| r.duration_ms).sum()
    }
}

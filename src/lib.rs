pub mod components;
pub mod config;
pub mod crash;
pub mod ecs;
pub mod engine;
pub mod error;
pub mod report;
pub mod rng;
pub mod spatial;
pub mod systems;

pub use config::Config;
pub use ecs::{Entity, EntityWorld};
pub use engine::{Engine, EngineBuilder, TickSummary};
pub use error::EcsError;

mod lifetime;
mod movement;
mod spawn;

pub use lifetime::LifetimeSystem;
pub use movement::MovementSystem;
pub use spawn::SpawnSystem;

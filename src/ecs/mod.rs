//! Entity Component System (ECS) implementation
//!
//! Dense, archetype-free storage: each component type owns a packed pool,
//! entities are versioned integer handles and component membership is a
//! 64-bit signature per entity. [`EntityWorld`] is the entry point.

pub mod component;
pub mod entity;
pub mod events;
pub mod manager;
pub mod pool;
pub mod prototype;
pub mod query;
pub mod registry;
pub mod signature;
pub mod world;

pub use component::{Component, ComponentSet, ComponentStorage};
pub(crate) use entity::EntityData;
pub use entity::{
    Entity, EntityId, EntityVersion, DEFAULT_MAX_ENTITIES, NULL_ENTITY_ID, NULL_ENTITY_VERSION,
};
pub use events::{EventCallback, EventDispatch, EventKind};
pub use manager::EntityManager;
pub use pool::ComponentPool;
pub use prototype::{Prototype, PrototypeId, PrototypeRegistry};
pub use query::{Filter, Query, QueryBuilder};
pub use registry::{ComponentInfo, ComponentRegistry};
pub use signature::{ComponentId, SetBits, Signature, MAX_COMPONENTS};
pub use world::EntityWorld;

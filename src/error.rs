use thiserror::Error;

use crate::ecs::{ComponentId, Entity, PrototypeId, MAX_COMPONENTS};

/// Errors detected by the entity component store.
///
/// Construction-time operations return these directly. Hot-path operations
/// log them at the point of detection and hand back a neutral value instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EcsError {
    #[error("ran out of entity space ({live} live of {capacity} slots)")]
    OutOfCapacity { live: usize, capacity: u32 },
    #[error("entity {0} does not exist")]
    StaleEntity(Entity),
    #[error("component type `{0}` is not registered")]
    UnregisteredComponent(&'static str),
    #[error("component id {0} has no pool")]
    UnknownComponentId(ComponentId),
    #[error("cannot register `{0}`: limit of {max} component types reached", max = MAX_COMPONENTS)]
    TooManyComponents(&'static str),
    #[error("prototype id {0} is not defined")]
    UnknownPrototype(PrototypeId),
    #[error("stop_deferring called without a matching start_deferring")]
    NotDeferring,
}

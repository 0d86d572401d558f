//! Entity handles and the per-slot bookkeeping behind them

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Signature;

/// Dense index into the entity tables
pub type EntityId = u32;

/// Generation counter of an entity slot
pub type EntityVersion = u32;

/// Reserved id carried by [`Entity::NULL`]; never handed out by a manager.
pub const NULL_ENTITY_ID: EntityId = EntityId::MAX;

/// Version carried by [`Entity::NULL`] and default handles. Live slots start at 1.
pub const NULL_ENTITY_VERSION: EntityVersion = 0;

/// Default upper bound on simultaneously addressable entity slots
pub const DEFAULT_MAX_ENTITIES: u32 = 1 << 16;

pub(crate) const NULL_INDEX: u32 = u32::MAX;

/// A copyable reference to a live or historical entity slot.
///
/// A handle stays valid until the entity it names is destroyed; afterwards the
/// slot's version moves on and every outstanding copy reports as dead, even if
/// the id is handed out again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub version: EntityVersion,
}

impl Entity {
    /// Handle that never refers to a live entity
    pub const NULL: Entity = Entity {
        id: NULL_ENTITY_ID,
        version: NULL_ENTITY_VERSION,
    };

    pub const fn new(id: EntityId, version: EntityVersion) -> Self {
        Self { id, version }
    }

    pub const fn is_null(self) -> bool {
        self.id == NULL_ENTITY_ID
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "NullEntity")
        } else {
            write!(f, "Entity(id: {}, version: {})", self.id, self.version)
        }
    }
}

/// Per-id slot state owned by the entity manager
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntityData {
    pub version: EntityVersion,
    /// Position in the live array, or `NULL_INDEX` when the slot is free
    pub index: u32,
    pub signature: Signature,
    /// Creation stamp, compared against the watermark of an iteration pass
    pub birth: u64,
    /// Set while before-remove hooks run for a pending destroy
    pub destroying: bool,
}

impl EntityData {
    pub const fn vacant() -> Self {
        Self {
            version: 1,
            index: NULL_INDEX,
            signature: Signature::EMPTY,
            birth: 0,
            destroying: false,
        }
    }

    #[inline]
    pub const fn is_live(&self) -> bool {
        self.index != NULL_INDEX
    }

    /// Retires the current generation. Version 0 is skipped on wrap-around.
    pub fn retire(&mut self) {
        self.version = match self.version.wrapping_add(1) {
            NULL_ENTITY_VERSION => 1,
            next => next,
        };
        self.index = NULL_INDEX;
        self.signature = Signature::EMPTY;
        self.destroying = false;
    }
}

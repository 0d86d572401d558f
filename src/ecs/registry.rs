//! Runtime component type registry

use std::any::TypeId;
use std::collections::HashMap;
use std::mem;

use log::debug;

use super::{Component, ComponentId, MAX_COMPONENTS};
use crate::error::EcsError;

/// Static facts about a registered component type
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    pub name: &'static str,
    pub size: usize,
    pub type_id: TypeId,
}

/// Assigns stable, dense numeric ids to component types in registration order
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    infos: Vec<ComponentInfo>,
    by_type: HashMap<TypeId, ComponentId>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`. Registering the same type twice returns the
    /// id it already has.
    pub fn register<T: Component>(&mut self, name: &'static str) -> Result<ComponentId, EcsError> {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.by_type.get(&type_id) {
            return Ok(id);
        }
        if self.infos.len() >= MAX_COMPONENTS {
            return Err(EcsError::TooManyComponents(name));
        }

        let id = self.infos.len() as ComponentId;
        let size = mem::size_of::<T>();
        self.infos.push(ComponentInfo {
            id,
            name,
            size,
            type_id,
        });
        self.by_type.insert(type_id, id);
        debug!("registered component `{name}` as id {id} ({size} bytes)");
        Ok(id)
    }

    #[inline]
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id as usize)
    }

    pub fn id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.infos.iter().find(|info| info.name == name).map(|info| info.id)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }
}

/// Last path segment of a type name, e.g. `Position` for `game::components::Position`
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

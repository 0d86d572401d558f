//! The entity table and component pools.
//!
//! [`EntityManager`] is the sole owner of entity slots, the free-id stack, the
//! packed live-entity array and one pool per registered component type. It
//! performs structural changes but raises no events; [`super::EntityWorld`]
//! layers event dispatch on top of it.

use std::mem;

use log::error;

use super::registry::short_type_name;
use super::{
    Component, ComponentId, ComponentPool, ComponentRegistry, ComponentSet, ComponentStorage,
    Entity, EntityData, EntityId, EntityVersion, Filter, Signature, NULL_ENTITY_ID,
    NULL_ENTITY_VERSION,
};
use crate::config::EcsConfig;
use crate::error::EcsError;

pub struct EntityManager {
    /// One slot per possible id, indexed by id
    entity_data: Vec<EntityData>,
    /// Packed array of live handles
    live: Vec<Entity>,
    /// Unused ids, reused last-in first-out
    free_ids: Vec<EntityId>,
    registry: ComponentRegistry,
    /// Indexed by component id
    pools: Vec<Box<dyn ComponentStorage>>,
    initial_pool_capacity: usize,
    /// Entities created so far; stamps each new slot's `birth`
    births: u64,
}

/// Walks the live array for one iteration pass.
///
/// Entities created after the cursor was opened are skipped, and the walk
/// never goes past the live count it started with. Destroying an entity moves
/// the last live entity into its slot; if that slot was already passed, the
/// moved entity is skipped until the next pass.
pub(crate) struct PassCursor {
    index: usize,
    end: usize,
    watermark: u64,
}

impl PassCursor {
    pub fn open(em: &EntityManager) -> Self {
        Self {
            index: 0,
            end: em.live.len(),
            watermark: em.births,
        }
    }

    /// Next entity that was live when the pass opened, with its signature
    pub fn next(&mut self, em: &EntityManager) -> Option<(Entity, Signature)> {
        while self.index < self.end.min(em.live.len()) {
            let entity = em.live[self.index];
            self.index += 1;
            let data = &em.entity_data[entity.id as usize];
            if data.birth < self.watermark {
                return Some((entity, data.signature));
            }
        }
        None
    }
}

impl EntityManager {
    pub fn new(max_entities: u32) -> Self {
        Self::with_config(&EcsConfig {
            max_entities,
            ..EcsConfig::default()
        })
    }

    pub fn with_config(config: &EcsConfig) -> Self {
        // NULL_ENTITY_ID itself must never be handed out
        let max_entities = config.max_entities.min(NULL_ENTITY_ID);

        // reversed so that ids are popped lowest first
        let free_ids: Vec<EntityId> = (0..max_entities).rev().collect();

        Self {
            entity_data: vec![EntityData::vacant(); max_entities as usize],
            live: Vec::new(),
            free_ids,
            registry: ComponentRegistry::new(),
            pools: Vec::new(),
            initial_pool_capacity: config.initial_pool_capacity,
            births: 0,
        }
    }

    // --- component types ---

    /// Registers `T` with a pool whose added-without-value slots use `T::default()`
    pub fn register<T: Component + Default>(&mut self) -> Result<ComponentId, EcsError> {
        self.register_with::<T>(short_type_name::<T>(), T::default)
    }

    /// Registers `T` under an explicit name and default constructor
    pub fn register_with<T: Component>(
        &mut self,
        name: &'static str,
        make_default: fn() -> T,
    ) -> Result<ComponentId, EcsError> {
        if let Some(id) = self.registry.id_of::<T>() {
            return Ok(id);
        }
        let id = self.registry.register::<T>(name)?;
        self.pools.push(Box::new(ComponentPool::with_capacity(
            self.initial_pool_capacity,
            make_default,
        )));
        debug_assert_eq!(self.pools.len(), id as usize + 1);
        Ok(id)
    }

    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Id of `T`, without logging when it is unregistered
    #[inline]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.registry.id_of::<T>()
    }

    /// Id of `T`; an unregistered type is a configuration error and is logged
    pub(crate) fn require_id<T: Component>(&self) -> Option<ComponentId> {
        let id = self.registry.id_of::<T>();
        if id.is_none() {
            error!(
                "{}",
                EcsError::UnregisteredComponent(std::any::type_name::<T>())
            );
        }
        id
    }

    pub fn signature_of<C: ComponentSet>(&self) -> Option<Signature> {
        let signature = C::signature(&self.registry);
        if signature.is_none() {
            error!(
                "component set {:?} contains unregistered types",
                C::type_names()
            );
        }
        signature
    }

    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let id = self.require_id::<T>()?;
        self.typed_pool(id)
    }

    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    pub fn component_name(&self, id: ComponentId) -> Option<&'static str> {
        match self.registry.info(id) {
            Some(info) => Some(info.name),
            None => {
                error!("{}", EcsError::UnknownComponentId(id));
                None
            }
        }
    }

    pub fn component_id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.registry.id_by_name(name)
    }

    pub fn component_size(&self, id: ComponentId) -> Option<usize> {
        match self.registry.info(id) {
            Some(info) => Some(info.size),
            None => {
                error!("{}", EcsError::UnknownComponentId(id));
                None
            }
        }
    }

    /// Number of entities currently holding `T`
    pub fn pool_len<T: Component>(&self) -> usize {
        self.require_id::<T>()
            .map_or(0, |id| self.pool_len_by_id(id))
    }

    pub fn pool_len_by_id(&self, id: ComponentId) -> usize {
        self.pools.get(id as usize).map_or(0, |pool| pool.len())
    }

    // --- entity lifecycle ---

    pub fn try_create(&mut self) -> Result<Entity, EcsError> {
        let Some(id) = self.free_ids.pop() else {
            return Err(EcsError::OutOfCapacity {
                live: self.live.len(),
                capacity: self.max_entities(),
            });
        };

        let data = &mut self.entity_data[id as usize];
        data.index = self.live.len() as u32;
        data.signature = Signature::EMPTY;
        data.birth = self.births;
        self.births += 1;

        let entity = Entity::new(id, data.version);
        self.live.push(entity);
        Ok(entity)
    }

    /// Creates an entity, or returns [`Entity::NULL`] when the id space is
    /// exhausted. Exhaustion is logged as critical.
    pub fn create(&mut self) -> Entity {
        match self.try_create() {
            Ok(entity) => entity,
            Err(err) => {
                error!("critical: {err}");
                Entity::NULL
            }
        }
    }

    /// Creates up to `count` entities, stopping early at capacity
    pub fn create_many(&mut self, count: usize) -> Vec<Entity> {
        let mut created = Vec::with_capacity(count.min(self.free_ids.len()));
        for _ in 0..count {
            match self.try_create() {
                Ok(entity) => created.push(entity),
                Err(err) => {
                    error!("critical: {err} (created {} of {count})", created.len());
                    break;
                }
            }
        }
        created
    }

    /// Destroys `entity` and evicts all of its components. A stale handle is
    /// logged and ignored.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.exists(entity) {
            error!("cannot destroy: {}", EcsError::StaleEntity(entity));
            return false;
        }

        let data = self.entity_data[entity.id as usize];
        for id in data.signature {
            if let Some(pool) = self.pools.get_mut(id as usize) {
                pool.remove(entity.id);
            }
        }

        let index = data.index as usize;
        self.live.swap_remove(index);
        if let Some(moved) = self.live.get(index) {
            self.entity_data[moved.id as usize].index = index as u32;
        }

        self.entity_data[entity.id as usize].retire();
        self.free_ids.push(entity.id);
        true
    }

    /// Flags a live entity as having a destroy in progress. Returns false if
    /// it was already flagged.
    pub(crate) fn begin_destroy(&mut self, entity: Entity) -> bool {
        match self.entity_data.get_mut(entity.id as usize) {
            Some(data) if !data.destroying => {
                data.destroying = true;
                true
            }
            _ => false,
        }
    }

    #[inline]
    pub fn exists(&self, entity: Entity) -> bool {
        match self.entity_data.get(entity.id as usize) {
            Some(data) => data.version == entity.version && data.is_live(),
            None => false,
        }
    }

    /// Component signature of `entity`; empty if it does not exist
    #[inline]
    pub fn signature(&self, entity: Entity) -> Signature {
        if self.exists(entity) {
            self.entity_data[entity.id as usize].signature
        } else {
            Signature::EMPTY
        }
    }

    pub fn has<C: ComponentSet>(&self, entity: Entity) -> bool {
        match self.signature_of::<C>() {
            Some(required) => self.has_signature(entity, required),
            None => false,
        }
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        match self.require_id::<T>() {
            Some(id) => self.signature(entity).test(id),
            None => false,
        }
    }

    #[inline]
    pub fn has_signature(&self, entity: Entity, required: Signature) -> bool {
        self.exists(entity) && self.entity_data[entity.id as usize].signature.has_all(required)
    }

    // --- component access ---

    /// `None` if the entity is dead, does not own `T`, or `T` is a flag component
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        let id = self.require_id::<T>()?;
        if !self.signature(entity).test(id) {
            return None;
        }
        self.typed_pool::<T>(id)?.get(entity.id)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let id = self.require_id::<T>()?;
        if !self.signature(entity).test(id) {
            return None;
        }
        self.typed_pool_mut::<T>(id)?.get_mut(entity.id)
    }

    /// Overwrites an owned component. Returns false if there was nothing to set.
    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        match self.get_mut::<T>(entity) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        self.insert_component(entity, value).is_some()
    }

    /// Stores `value` for `entity`. Returns the component id and whether the
    /// component is newly owned (`false` means an existing value was replaced).
    pub(crate) fn insert_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Option<(ComponentId, bool)> {
        if !self.exists(entity) {
            error!(
                "cannot add `{}`: {}",
                short_type_name::<T>(),
                EcsError::StaleEntity(entity)
            );
            return None;
        }
        let id = self.require_id::<T>()?;
        let newly_added = !self.entity_data[entity.id as usize].signature.test(id);

        // flag components carry no value to replace
        if newly_added || mem::size_of::<T>() != 0 {
            self.typed_pool_mut::<T>(id)?.insert(entity.id, value);
        }
        self.entity_data[entity.id as usize].signature.insert(id);
        Some((id, newly_added))
    }

    /// Adds a default-initialized component by id. Returns whether it is newly
    /// owned, or `None` on failure.
    pub(crate) fn insert_default(&mut self, entity: Entity, id: ComponentId) -> Option<bool> {
        if !self.exists(entity) {
            error!("cannot add component {id}: {}", EcsError::StaleEntity(entity));
            return None;
        }
        let Some(pool) = self.pools.get_mut(id as usize) else {
            error!("{}", EcsError::UnknownComponentId(id));
            return None;
        };

        let signature = &mut self.entity_data[entity.id as usize].signature;
        if signature.test(id) {
            return Some(false);
        }
        pool.add_default(entity.id);
        signature.insert(id);
        Some(true)
    }

    pub fn add_component_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        self.insert_default(entity, id).is_some()
    }

    /// Adds every component of `signature` that `entity` does not own yet,
    /// default-initialized. Returns the ids that were actually added.
    pub fn add_signature(&mut self, entity: Entity, signature: Signature) -> Option<Signature> {
        if !self.exists(entity) {
            error!("cannot add signature: {}", EcsError::StaleEntity(entity));
            return None;
        }

        let owned = self.entity_data[entity.id as usize].signature;
        let mut added = Signature::EMPTY;
        for id in signature.difference(owned) {
            match self.pools.get_mut(id as usize) {
                Some(pool) => {
                    pool.add_default(entity.id);
                    added.insert(id);
                }
                None => error!("{}", EcsError::UnknownComponentId(id)),
            }
        }
        self.entity_data[entity.id as usize].signature = owned | added;
        Some(added)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        match self.require_id::<T>() {
            Some(id) => self.remove_component_id(entity, id),
            None => false,
        }
    }

    /// Evicts component `id` from `entity`. Returns false if it was not owned.
    pub fn remove_component_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        if !self.exists(entity) {
            error!(
                "cannot remove component {id}: {}",
                EcsError::StaleEntity(entity)
            );
            return false;
        }
        let Some(pool) = self.pools.get_mut(id as usize) else {
            error!("{}", EcsError::UnknownComponentId(id));
            return false;
        };

        let signature = &mut self.entity_data[entity.id as usize].signature;
        if !signature.test(id) {
            return false;
        }
        pool.remove(entity.id);
        signature.remove(id);
        true
    }

    // --- population ---

    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    pub fn max_entities(&self) -> u32 {
        self.entity_data.len() as u32
    }

    pub fn live_entities(&self) -> &[Entity] {
        &self.live
    }

    /// The `index`th live entity; out of range is logged and yields [`Entity::NULL`]
    pub fn entity_at(&self, index: usize) -> Entity {
        match self.live.get(index) {
            Some(&entity) => entity,
            None => {
                error!(
                    "entity index {index} out of bounds ({} live entities)",
                    self.live.len()
                );
                Entity::NULL
            }
        }
    }

    /// Current version of slot `id`, or [`NULL_ENTITY_VERSION`] for ids out of range
    pub fn entity_version(&self, id: EntityId) -> EntityVersion {
        self.entity_data
            .get(id as usize)
            .map_or(NULL_ENTITY_VERSION, |data| data.version)
    }

    // --- iteration ---

    /// Visits live entities whose signature matches `filter`.
    ///
    /// The callback may create and destroy entities. Entities created during
    /// the pass are not visited. Destroying an entity moves the last live
    /// entity into its slot; if that slot was already passed, the moved entity
    /// is skipped until the next pass.
    pub fn for_each<F: Filter>(&mut self, filter: F, mut callback: impl FnMut(&mut Self, Entity)) {
        let mut cursor = PassCursor::open(self);
        while let Some((entity, signature)) = cursor.next(self) {
            if filter.matches(signature) {
                callback(self, entity);
            }
        }
    }

    /// Like [`EntityManager::for_each`], but stops at the first entity for
    /// which `callback` returns true and returns it.
    pub fn for_each_early_return<F: Filter>(
        &mut self,
        filter: F,
        mut callback: impl FnMut(&mut Self, Entity) -> bool,
    ) -> Option<Entity> {
        let mut cursor = PassCursor::open(self);
        while let Some((entity, signature)) = cursor.next(self) {
            if filter.matches(signature) && callback(self, entity) {
                return Some(entity);
            }
        }
        None
    }

    /// Read-only iteration over matching live entities
    pub fn iter<'a, F: Filter + 'a>(&'a self, filter: F) -> impl Iterator<Item = Entity> + 'a {
        self.live
            .iter()
            .copied()
            .filter(move |entity| filter.matches(self.entity_data[entity.id as usize].signature))
    }

    fn typed_pool<T: Component>(&self, id: ComponentId) -> Option<&ComponentPool<T>> {
        self.pools
            .get(id as usize)?
            .as_any()
            .downcast_ref::<ComponentPool<T>>()
    }

    fn typed_pool_mut<T: Component>(&mut self, id: ComponentId) -> Option<&mut ComponentPool<T>> {
        self.pools
            .get_mut(id as usize)?
            .as_any_mut()
            .downcast_mut::<ComponentPool<T>>()
    }
}

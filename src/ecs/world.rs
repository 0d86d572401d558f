//! EntityWorld - the ECS facade used by game code.
//!
//! Wraps the [`EntityManager`] and raises component lifecycle events around
//! every structural change. All mutation goes through `&mut EntityWorld`, so
//! callbacks receive the world they were raised from.

use std::rc::Rc;

use log::{debug, error, trace};

use super::events::DeferredEvent;
use super::manager::PassCursor;
use super::{
    Component, ComponentId, ComponentPool, ComponentSet, Entity, EntityId, EntityManager,
    EntityVersion, EventDispatch, EventKind, Filter, Prototype, PrototypeId, PrototypeRegistry,
    QueryBuilder, Signature,
};
use crate::config::EcsConfig;
use crate::error::EcsError;

pub struct EntityWorld {
    em: EntityManager,
    events: EventDispatch,
    prototypes: PrototypeRegistry,
}

impl EntityWorld {
    pub fn new(config: &EcsConfig) -> Self {
        Self {
            em: EntityManager::with_config(config),
            events: EventDispatch::new(),
            prototypes: PrototypeRegistry::new(),
        }
    }

    pub fn with_max_entities(max_entities: u32) -> Self {
        Self::new(&EcsConfig {
            max_entities,
            ..EcsConfig::default()
        })
    }

    /// Read-only access to the underlying storage
    pub fn manager(&self) -> &EntityManager {
        &self.em
    }

    // --- registration ---

    pub fn register<T: Component + Default>(&mut self) -> Result<ComponentId, EcsError> {
        self.em.register::<T>()
    }

    pub fn register_with<T: Component>(
        &mut self,
        name: &'static str,
        make_default: fn() -> T,
    ) -> Result<ComponentId, EcsError> {
        self.em.register_with(name, make_default)
    }

    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.em.component_id::<T>()
    }

    pub fn signature_of<C: ComponentSet>(&self) -> Option<Signature> {
        self.em.signature_of::<C>()
    }

    pub fn define_prototype(&mut self, name: &str, signature: Signature) -> PrototypeId {
        self.prototypes.define(name, signature)
    }

    pub fn prototype(&self, id: PrototypeId) -> Option<&Prototype> {
        self.prototypes.get(id)
    }

    pub fn prototype_id(&self, name: &str) -> Option<PrototypeId> {
        self.prototypes.id_by_name(name)
    }

    // --- lifecycle ---

    pub fn try_create(&mut self) -> Result<Entity, EcsError> {
        self.em.try_create()
    }

    pub fn create(&mut self) -> Entity {
        self.em.create()
    }

    pub fn create_many(&mut self, count: usize) -> Vec<Entity> {
        self.em.create_many(count)
    }

    /// Creates an entity carrying the prototype's components, default-initialized
    pub fn spawn(&mut self, prototype: PrototypeId) -> Entity {
        let Some(signature) = self.prototypes.get(prototype).map(|p| p.signature) else {
            error!("cannot spawn: {}", EcsError::UnknownPrototype(prototype));
            return Entity::NULL;
        };
        let entity = self.create();
        if !entity.is_null() {
            self.add_signature(entity, signature);
        }
        entity
    }

    /// Destroys `entity`, raising before-remove for each owned component in
    /// ascending id order before anything is evicted.
    ///
    /// A hook that destroys the same entity again while its hooks are running
    /// gets `true` back and changes nothing; the outer call finishes the job.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.em.exists(entity) {
            error!("cannot destroy: {}", EcsError::StaleEntity(entity));
            return false;
        }
        if !self.em.begin_destroy(entity) {
            trace!("{entity} is already being destroyed");
            return true;
        }

        for id in self.em.signature(entity) {
            self.raise(EventKind::BeforeRemove, id, entity);
        }
        self.em.destroy(entity)
    }

    #[inline]
    pub fn exists(&self, entity: Entity) -> bool {
        self.em.exists(entity)
    }

    pub fn signature(&self, entity: Entity) -> Signature {
        self.em.signature(entity)
    }

    pub fn has<C: ComponentSet>(&self, entity: Entity) -> bool {
        self.em.has::<C>(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.em.has_component::<T>(entity)
    }

    pub fn has_signature(&self, entity: Entity, signature: Signature) -> bool {
        self.em.has_signature(entity, signature)
    }

    // --- components ---

    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.em.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.em.get_mut(entity)
    }

    pub fn set<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        self.em.set(entity, value)
    }

    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        self.em.pool::<T>()
    }

    /// Attaches `value`. On-add fires only when the component was not owned
    /// before; adding an owned component just replaces its value.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> bool {
        match self.em.insert_component(entity, value) {
            Some((id, newly_added)) => {
                if newly_added {
                    self.raise(EventKind::OnAdd, id, entity);
                }
                true
            }
            None => false,
        }
    }

    pub fn add_component_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        match self.em.insert_default(entity, id) {
            Some(newly_added) => {
                if newly_added {
                    self.raise(EventKind::OnAdd, id, entity);
                }
                true
            }
            None => false,
        }
    }

    /// Adds every missing component of `signature`. On-add events are raised
    /// after all components are in place, in ascending id order.
    pub fn add_signature(&mut self, entity: Entity, signature: Signature) -> bool {
        let Some(added) = self.em.add_signature(entity, signature) else {
            return false;
        };
        for id in added {
            self.raise(EventKind::OnAdd, id, entity);
        }
        true
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        match self.em.require_id::<T>() {
            Some(id) => self.remove_component_id(entity, id),
            None => false,
        }
    }

    /// Raises before-remove while the value is still readable, then evicts
    pub fn remove_component_id(&mut self, entity: Entity, id: ComponentId) -> bool {
        if !self.em.exists(entity) {
            error!(
                "cannot remove component {id}: {}",
                EcsError::StaleEntity(entity)
            );
            return false;
        }
        if !self.em.signature(entity).test(id) {
            if self.em.registry().info(id).is_none() {
                error!("{}", EcsError::UnknownComponentId(id));
            }
            return false;
        }

        self.raise(EventKind::BeforeRemove, id, entity);
        if !self.em.exists(entity) {
            return true;
        }
        self.em.remove_component_id(entity, id)
    }

    // --- events ---

    /// Installs the on-add hook for `T`, replacing any previous one
    pub fn on_add<T: Component>(&mut self, callback: impl Fn(&mut EntityWorld, Entity) + 'static) -> bool {
        self.set_hook::<T>(EventKind::OnAdd, Some(Rc::new(callback)))
    }

    /// Installs the before-remove hook for `T`, replacing any previous one
    pub fn before_remove<T: Component>(
        &mut self,
        callback: impl Fn(&mut EntityWorld, Entity) + 'static,
    ) -> bool {
        self.set_hook::<T>(EventKind::BeforeRemove, Some(Rc::new(callback)))
    }

    pub fn clear_hook<T: Component>(&mut self, kind: EventKind) -> bool {
        self.set_hook::<T>(kind, None)
    }

    fn set_hook<T: Component>(
        &mut self,
        kind: EventKind,
        callback: Option<super::EventCallback>,
    ) -> bool {
        match self.em.require_id::<T>() {
            Some(id) => {
                self.events.set(kind, id, callback);
                true
            }
            None => false,
        }
    }

    /// Queues events instead of firing them until the matching
    /// [`EntityWorld::stop_deferring`]. Scopes nest.
    pub fn start_deferring(&mut self) {
        self.events.begin();
    }

    /// Closes a deferral scope. Closing the outermost scope replays the queue
    /// in the order events were raised; events raised by replayed callbacks
    /// are appended and replayed in the same drain.
    pub fn stop_deferring(&mut self) {
        match self.events.end() {
            Ok(true) => self.drain_events(),
            Ok(false) => {}
            Err(err) => error!("{err}"),
        }
    }

    pub fn is_deferring(&self) -> bool {
        self.events.is_deferring()
    }

    pub fn pending_events(&self) -> usize {
        self.events.pending()
    }

    /// Runs `f` inside a deferral scope
    pub fn deferred<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.start_deferring();
        let result = f(self);
        self.stop_deferring();
        result
    }

    fn raise(&mut self, kind: EventKind, component: ComponentId, entity: Entity) {
        let Some(callback) = self.events.callback(kind, component) else {
            return;
        };
        if self.events.is_deferring() {
            self.events.enqueue(DeferredEvent {
                entity,
                kind,
                component,
                callback,
            });
        } else {
            callback(self, entity);
        }
    }

    fn drain_events(&mut self) {
        let pending = self.events.pending();
        if pending == 0 {
            return;
        }
        debug!("draining {pending} deferred events");

        self.events.begin_drain();
        while let Some(event) = self.events.pop() {
            trace!(
                "{:?} for component {} on {}",
                event.kind,
                event.component,
                event.entity
            );
            (event.callback)(self, event.entity);
        }
        self.events.end_drain();
    }

    // --- iteration ---

    /// See [`EntityManager::for_each`] for the guarantees under mutation
    pub fn for_each<F: Filter>(&mut self, filter: F, mut callback: impl FnMut(&mut Self, Entity)) {
        let mut cursor = PassCursor::open(&self.em);
        while let Some((entity, signature)) = cursor.next(&self.em) {
            if filter.matches(signature) {
                callback(self, entity);
            }
        }
    }

    pub fn for_each_early_return<F: Filter>(
        &mut self,
        filter: F,
        mut callback: impl FnMut(&mut Self, Entity) -> bool,
    ) -> Option<Entity> {
        let mut cursor = PassCursor::open(&self.em);
        while let Some((entity, signature)) = cursor.next(&self.em) {
            if filter.matches(signature) && callback(self, entity) {
                return Some(entity);
            }
        }
        None
    }

    pub fn iter<'a, F: Filter + 'a>(&'a self, filter: F) -> impl Iterator<Item = Entity> + 'a {
        self.em.iter(filter)
    }

    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(self.em.registry())
    }

    // --- diagnostics ---

    pub fn entity_count(&self) -> usize {
        self.em.entity_count()
    }

    pub fn max_entities(&self) -> u32 {
        self.em.max_entities()
    }

    pub fn entity_at(&self, index: usize) -> Entity {
        self.em.entity_at(index)
    }

    pub fn entity_version(&self, id: EntityId) -> EntityVersion {
        self.em.entity_version(id)
    }

    pub fn component_count(&self) -> usize {
        self.em.component_count()
    }

    pub fn component_name(&self, id: ComponentId) -> Option<&'static str> {
        self.em.component_name(id)
    }

    pub fn component_id_by_name(&self, name: &str) -> Option<ComponentId> {
        self.em.component_id_by_name(name)
    }

    pub fn component_size(&self, id: ComponentId) -> Option<usize> {
        self.em.component_size(id)
    }

    pub fn pool_len<T: Component>(&self) -> usize {
        self.em.pool_len::<T>()
    }
}

impl Default for EntityWorld {
    fn default() -> Self {
        Self::new(&EcsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[derive(Debug, Default, Clone, Copy, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[derive(Debug, Default)]
    struct Selected;
    impl Component for Selected {}

    fn world() -> EntityWorld {
        let mut world = EntityWorld::with_max_entities(64);
        world.register::<Position>().unwrap();
        world.register::<Health>().unwrap();
        world.register::<Selected>().unwrap();
        world
    }

    type Log = Rc<RefCell<Vec<(&'static str, Entity)>>>;

    fn record(world: &mut EntityWorld) -> Log {
        let log: Log = Rc::default();
        let sink = log.clone();
        world.on_add::<Position>(move |_, e| sink.borrow_mut().push(("add", e)));
        let sink = log.clone();
        world.before_remove::<Position>(move |_, e| sink.borrow_mut().push(("remove", e)));
        log
    }

    #[test]
    fn test_on_add_fires_once() {
        let mut world = world();
        let log = record(&mut world);
        let e = world.create();

        world.add_component(e, Position { x: 1.0, y: 1.0 });
        world.add_component(e, Position { x: 2.0, y: 2.0 });
        assert_eq!(*log.borrow(), vec![("add", e)]);
        assert_eq!(world.get::<Position>(e).map(|p| p.x), Some(2.0));
    }

    #[test]
    fn test_before_remove_sees_value() {
        let mut world = world();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        world.before_remove::<Health>(move |w, e| {
            *sink.borrow_mut() = w.get::<Health>(e).copied();
        });

        let e = world.create();
        world.add_component(e, Health(42));
        assert!(world.remove_component::<Health>(e));
        assert_eq!(*seen.borrow(), Some(Health(42)));
        assert!(!world.has_component::<Health>(e));
        assert!(!world.remove_component::<Health>(e));
    }

    #[test]
    fn test_deferred_events_replay_in_order() {
        let mut world = world();
        let log = record(&mut world);
        let a = world.create();
        let b = world.create();

        world.start_deferring();
        world.add_component(a, Position::default());
        world.add_component(b, Position::default());
        world.remove_component::<Position>(a);
        assert!(log.borrow().is_empty());
        assert_eq!(world.pending_events(), 3);
        world.stop_deferring();

        assert_eq!(*log.borrow(), vec![("add", a), ("add", b), ("remove", a)]);
        assert!(!world.is_deferring());
        assert_eq!(world.pending_events(), 0);
    }

    #[test]
    fn test_nested_deferral_drains_at_outermost() {
        let mut world = world();
        let log = record(&mut world);
        let e = world.create();

        world.deferred(|w| {
            w.deferred(|w| {
                w.add_component(e, Position::default());
            });
            assert!(log.borrow().is_empty());
        });
        assert_eq!(log.borrow().len(), 1);

        // unmatched stop is ignored
        world.stop_deferring();
        assert!(!world.is_deferring());
    }

    #[test]
    fn test_events_raised_while_draining_are_appended() {
        let mut world = world();
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = order.clone();
        world.on_add::<Position>(move |w, e| {
            sink.borrow_mut().push("position");
            w.add_component(e, Health(1));
        });
        let sink = order.clone();
        world.on_add::<Health>(move |_, _| sink.borrow_mut().push("health"));
        let sink = order.clone();
        world.on_add::<Selected>(move |_, _| sink.borrow_mut().push("selected"));

        let e = world.create();
        world.deferred(|w| {
            w.add_component(e, Position::default());
            w.add_component(e, Selected);
        });
        assert_eq!(*order.borrow(), vec!["position", "selected", "health"]);
    }

    #[test]
    fn test_destroy_fires_before_remove() {
        let mut world = world();
        let log = record(&mut world);
        let e = world.create();
        world.add_component(e, Position::default());
        world.add_component(e, Health(3));

        assert!(world.destroy(e));
        assert_eq!(log.borrow().last(), Some(&("remove", e)));
        assert!(!world.exists(e));
        assert_eq!(world.pool_len::<Position>(), 0);
        assert!(!world.destroy(e));
    }

    #[test]
    fn test_spawn_from_prototype() {
        let mut world = world();
        let log = record(&mut world);
        let signature = world.signature_of::<(Position, Health)>().unwrap();
        let unit = world.define_prototype("unit", signature);

        let e = world.spawn(unit);
        assert!(world.has::<(Position, Health)>(e));
        assert_eq!(world.get::<Health>(e), Some(&Health(0)));
        assert_eq!(*log.borrow(), vec![("add", e)]);

        assert!(world.spawn(99).is_null());
        assert_eq!(world.prototype_id("unit"), Some(unit));
    }

    #[test]
    fn test_add_by_id_and_remove_by_id() {
        let mut world = world();
        let log = record(&mut world);
        let e = world.create();
        let id = world.component_id::<Position>().unwrap();

        assert!(world.add_component_id(e, id));
        assert!(world.remove_component_id(e, id));
        assert_eq!(*log.borrow(), vec![("add", e), ("remove", e)]);
        assert!(!world.add_component_id(e, 60));
    }

    #[test]
    fn test_query_iteration() {
        let mut world = world();
        let entities = world.create_many(4);
        for &e in &entities {
            world.add_component(e, Position::default());
        }
        world.add_component(entities[1], Selected);

        let query = world
            .query()
            .with::<(Position,)>()
            .without::<(Selected,)>()
            .build();
        let visible: Vec<_> = world.iter(query).collect();
        assert_eq!(visible, vec![entities[0], entities[2], entities[3]]);

        let mut count = 0;
        world.for_each(query, |_, _| count += 1);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_callback_may_destroy_during_iteration() {
        let mut world = world();
        let entities = world.create_many(3);
        for &e in &entities {
            world.add_component(e, Health(1));
        }
        let health = world.query().with::<(Health,)>().build();

        let mut visited = Vec::new();
        world.for_each(health, |w, e| {
            visited.push(e);
            if e == entities[0] {
                w.destroy(e);
                w.create();
            }
        });
        // entities[2] moved into slot 0 after it was visited
        assert_eq!(visited, vec![entities[0], entities[1]]);
        assert_eq!(world.entity_count(), 3);
    }

    #[test]
    fn test_hook_destroying_own_entity_is_reentrant() {
        let mut world = world();
        let removals = Rc::new(RefCell::new(0));
        let sink = removals.clone();
        world.before_remove::<Health>(move |w, e| {
            *sink.borrow_mut() += 1;
            assert!(w.destroy(e));
        });

        let e = world.create();
        world.add_component(e, Health(5));
        world.add_component(e, Position::default());
        assert!(world.destroy(e));
        assert!(!world.exists(e));
        assert_eq!(*removals.borrow(), 1);
        assert_eq!(world.pool_len::<Health>(), 0);
        assert_eq!(world.pool_len::<Position>(), 0);
    }
}

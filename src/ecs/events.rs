//! Component lifecycle hooks and the deferred event queue.
//!
//! At most one callback per component type and event kind. While deferring,
//! raised events are queued and replayed in order once the outermost
//! deferral scope ends.

use std::collections::VecDeque;
use std::rc::Rc;

use super::{ComponentId, Entity, EntityWorld, MAX_COMPONENTS};
use crate::error::EcsError;

/// Hook invoked with the world and the affected entity
pub type EventCallback = Rc<dyn Fn(&mut EntityWorld, Entity)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// After a component becomes owned
    OnAdd,
    /// Before a component is evicted
    BeforeRemove,
}

#[derive(Clone)]
pub(crate) struct DeferredEvent {
    pub entity: Entity,
    pub kind: EventKind,
    pub component: ComponentId,
    pub callback: EventCallback,
}

pub struct EventDispatch {
    on_add: Vec<Option<EventCallback>>,
    before_remove: Vec<Option<EventCallback>>,
    /// Open deferral scopes
    depth: u32,
    /// Set while the queue is being replayed
    draining: bool,
    queue: VecDeque<DeferredEvent>,
}

impl EventDispatch {
    pub fn new() -> Self {
        Self {
            on_add: vec![None; MAX_COMPONENTS],
            before_remove: vec![None; MAX_COMPONENTS],
            depth: 0,
            draining: false,
            queue: VecDeque::new(),
        }
    }

    /// Installs or clears the callback for `(kind, component)`
    pub fn set(&mut self, kind: EventKind, component: ComponentId, callback: Option<EventCallback>) {
        if let Some(slot) = self.table_mut(kind).get_mut(component as usize) {
            *slot = callback;
        }
    }

    pub fn callback(&self, kind: EventKind, component: ComponentId) -> Option<EventCallback> {
        self.table(kind).get(component as usize)?.clone()
    }

    pub fn has_callback(&self, kind: EventKind, component: ComponentId) -> bool {
        matches!(self.table(kind).get(component as usize), Some(Some(_)))
    }

    /// True inside a deferral scope or while the queue is being replayed
    pub fn is_deferring(&self) -> bool {
        self.depth > 0 || self.draining
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn begin(&mut self) {
        self.depth += 1;
    }

    /// Closes one scope. Returns whether the caller should now drain the queue.
    pub(crate) fn end(&mut self) -> Result<bool, EcsError> {
        if self.depth == 0 {
            return Err(EcsError::NotDeferring);
        }
        self.depth -= 1;
        Ok(self.depth == 0 && !self.draining)
    }

    pub(crate) fn enqueue(&mut self, event: DeferredEvent) {
        self.queue.push_back(event);
    }

    pub(crate) fn begin_drain(&mut self) {
        self.draining = true;
    }

    pub(crate) fn end_drain(&mut self) {
        self.draining = false;
    }

    pub(crate) fn pop(&mut self) -> Option<DeferredEvent> {
        self.queue.pop_front()
    }

    fn table(&self, kind: EventKind) -> &[Option<EventCallback>] {
        match kind {
            EventKind::OnAdd => &self.on_add,
            EventKind::BeforeRemove => &self.before_remove,
        }
    }

    fn table_mut(&mut self, kind: EventKind) -> &mut [Option<EventCallback>] {
        match kind {
            EventKind::OnAdd => &mut self.on_add,
            EventKind::BeforeRemove => &mut self.before_remove,
        }
    }
}

impl Default for EventDispatch {
    fn default() -> Self {
        Self::new()
    }
}

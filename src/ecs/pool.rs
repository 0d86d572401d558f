//! Packed storage for a single component type.
//!
//! Values live in a dense array with no holes. A sparse table maps entity ids
//! to dense positions, and removal swaps the last value into the hole, so add,
//! remove and lookup are all O(1).

use std::any::Any;
use std::mem;

use super::{Component, ComponentStorage, EntityId};
use crate::crash;

const ABSENT: u32 = u32::MAX;

pub struct ComponentPool<T: Component> {
    dense: Vec<T>,
    /// Entity id owning each dense slot, parallel to `dense`
    owners: Vec<EntityId>,
    /// Entity id -> dense position, or `ABSENT`
    sparse: Vec<u32>,
    /// Membership count for zero-sized types, which keep no tables at all
    flag_count: usize,
    make_default: fn() -> T,
}

impl<T: Component> ComponentPool<T> {
    /// Creates an empty pool. `make_default` fills slots added without a value.
    pub fn new(make_default: fn() -> T) -> Self {
        Self::with_capacity(0, make_default)
    }

    pub fn with_capacity(capacity: usize, make_default: fn() -> T) -> Self {
        let capacity = if Self::FLAG { 0 } else { capacity };
        Self {
            dense: Vec::with_capacity(capacity),
            owners: Vec::with_capacity(capacity),
            sparse: Vec::new(),
            flag_count: 0,
            make_default,
        }
    }

    const FLAG: bool = mem::size_of::<T>() == 0;

    /// Stores `value` for `entity_id`, overwriting any existing value.
    /// Returns the dense position of the value.
    pub fn insert(&mut self, entity_id: EntityId, value: T) -> usize {
        if Self::FLAG {
            self.flag_count += 1;
            return 0;
        }

        if let Some(index) = self.dense_index(entity_id) {
            self.dense[index] = value;
            return index;
        }

        self.grow_sparse(entity_id);
        if self.dense.len() == self.dense.capacity() {
            // try_reserve keeps Vec's doubling growth but reports failure
            if let Err(err) = self.dense.try_reserve(1) {
                crash::fatal(format_args!(
                    "component pool for `{}` failed to grow past {} entries: {err}",
                    std::any::type_name::<T>(),
                    self.dense.len()
                ));
            }
        }
        if let Err(err) = self.owners.try_reserve(1) {
            crash::fatal(format_args!("component pool owner table failed to grow: {err}"));
        }

        let index = self.dense.len();
        self.dense.push(value);
        self.owners.push(entity_id);
        self.sparse[entity_id as usize] = index as u32;
        index
    }

    /// Adds a default-initialized value for `entity_id`
    pub fn add(&mut self, entity_id: EntityId) -> usize {
        let value = (self.make_default)();
        self.insert(entity_id, value)
    }

    /// Evicts `entity_id`'s value by swapping the last value into its slot
    pub fn take(&mut self, entity_id: EntityId) -> Option<T> {
        if Self::FLAG {
            return None;
        }

        let index = self.dense_index(entity_id)?;
        let value = self.dense.swap_remove(index);
        self.owners.swap_remove(index);
        self.sparse[entity_id as usize] = ABSENT;

        // the former last element now sits at `index`
        if let Some(&moved) = self.owners.get(index) {
            self.sparse[moved as usize] = index as u32;
        }
        Some(value)
    }

    /// Removes `entity_id` from the pool. For flag components this only
    /// updates the membership count.
    pub fn remove(&mut self, entity_id: EntityId) -> bool {
        if Self::FLAG {
            if self.flag_count == 0 {
                return false;
            }
            self.flag_count -= 1;
            return true;
        }
        self.take(entity_id).is_some()
    }

    #[inline]
    pub fn get(&self, entity_id: EntityId) -> Option<&T> {
        let index = self.dense_index(entity_id)?;
        Some(&self.dense[index])
    }

    #[inline]
    pub fn get_mut(&mut self, entity_id: EntityId) -> Option<&mut T> {
        let index = self.dense_index(entity_id)?;
        Some(&mut self.dense[index])
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.dense_index(entity_id).is_some()
    }

    pub fn len(&self) -> usize {
        if Self::FLAG {
            self.flag_count
        } else {
            self.dense.len()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Owners of the dense slots, in storage order
    pub fn entities(&self) -> &[EntityId] {
        &self.owners
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.owners.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.owners.iter().copied().zip(self.dense.iter_mut())
    }

    #[inline]
    fn dense_index(&self, entity_id: EntityId) -> Option<usize> {
        if Self::FLAG {
            return None;
        }
        match self.sparse.get(entity_id as usize) {
            Some(&index) if index != ABSENT => Some(index as usize),
            _ => None,
        }
    }

    fn grow_sparse(&mut self, entity_id: EntityId) {
        let needed = entity_id as usize + 1;
        if needed <= self.sparse.len() {
            return;
        }
        let new_len = needed.next_power_of_two();
        if let Err(err) = self.sparse.try_reserve(new_len - self.sparse.len()) {
            crash::fatal(format_args!("component pool sparse table failed to grow: {err}"));
        }
        self.sparse.resize(new_len, ABSENT);
    }
}

impl<T: Component> ComponentStorage for ComponentPool<T> {
    fn add_default(&mut self, entity_id: EntityId) {
        self.add(entity_id);
    }

    fn remove(&mut self, entity_id: EntityId) -> bool {
        ComponentPool::remove(self, entity_id)
    }

    fn has(&self, entity_id: EntityId) -> bool {
        self.contains(entity_id)
    }

    fn clear(&mut self) {
        self.dense.clear();
        self.owners.clear();
        self.sparse.clear();
        self.flag_count = 0;
    }

    fn len(&self) -> usize {
        ComponentPool::len(self)
    }

    fn is_flag(&self) -> bool {
        Self::FLAG
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

use slab::Slab;

use crate::log;
use super::{
    id::{InstanceId, PoolId},
    object::{SpawnedObject, SpawnedObjectController},
    template::{Spawnable, Template},
};

// We reserve generation 0 as a sentinel value.
pub const INITIAL_GENERATION:  u32 = 1;
pub const RESERVED_GENERATION: u32 = 0;

// ----------------------------------------------
// InstanceStorage
// ----------------------------------------------

// Owns every instance of a pool, cached or transient.
// Slots are recycled, so lookups always verify the handle generation.
pub struct InstanceStorage<T> {
    pool: PoolId,
    slots: Slab<SpawnedObject<T>>,
    generation: u32,
}

impl<T> InstanceStorage<T>
    where T: Spawnable
{
    pub fn new(pool: PoolId) -> Self {
        debug_assert!(pool.is_valid());
        Self {
            pool,
            slots: Slab::new(),
            generation: INITIAL_GENERATION,
        }
    }

    // Instantiates a new deactivated instance from the template.
    // Returns None if the template factory fails.
    pub fn insert(&mut self, template: &Template<T>, is_cached: bool, is_transient: bool) -> Option<InstanceId> {
        let Some(object) = template.instantiate() else {
            log::error!(log::channel!("spawn_pool"), "Failed to instantiate template '{}' ({}).", template.name(), template.id());
            return None;
        };

        let generation = self.next_generation();
        let entry = self.slots.vacant_entry();
        let id = InstanceId::new(self.pool, generation, entry.key());

        let controller = SpawnedObjectController::new(id, template.id(), is_cached, is_transient);
        entry.insert(SpawnedObject::new(controller, template.clone(), object));

        Some(id)
    }

    pub fn remove(&mut self, id: InstanceId) -> Option<SpawnedObject<T>> {
        if !self.contains(id) {
            return None;
        }
        self.slots.try_remove(id.index())
    }

    #[inline]
    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    #[inline]
    pub fn get(&self, id: InstanceId) -> Option<&SpawnedObject<T>> {
        if !self.owns_handle(id) {
            return None;
        }
        self.slots
            .get(id.index())
            .filter(|object| object.id() == id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: InstanceId) -> Option<&mut SpawnedObject<T>> {
        if !self.owns_handle(id) {
            return None;
        }
        self.slots
            .get_mut(id.index())
            .filter(|object| object.id() == id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> Vec<InstanceId> {
        self.slots.iter().map(|(_, object)| object.id()).collect()
    }

    #[inline]
    fn owns_handle(&self, id: InstanceId) -> bool {
        id.is_valid() && id.pool() == self.pool
    }

    #[inline]
    fn next_generation(&mut self) -> u32 {
        let generation = self.generation;
        self.generation = self.generation.wrapping_add(1);
        if self.generation == RESERVED_GENERATION || self.generation == u32::MAX {
            self.generation = INITIAL_GENERATION;
        }
        generation
    }
}

// ----------------------------------------------
// Unit Tests
// ----------------------------------------------

use std::collections::HashSet;
use serde::{Serialize, Deserialize};

use crate::{
    log,
    utils::{ParentId, Transform},
};
use super::{
    id::{InstanceId, PrefabId},
    object::SpawnedObject,
    storage::InstanceStorage,
    template::{Spawnable, Template},
};

// ----------------------------------------------
// CacheSettings
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)] // Missing fields get defaults from CacheSettings::default().
pub struct CacheSettings {
    // Instances created up-front when the cache is loaded.
    pub cache_size: usize,
    // Instances created each time the free set runs dry. Treated as at least 1.
    pub resize_buffer: usize,
    // Maximum number of pooled instances. Zero or negative means unbounded.
    pub limit: i32,
    // Refuse to spawn past the limit instead of falling back to a transient instance.
    pub hard_limit: bool,
}

impl CacheSettings {
    #[inline]
    pub fn new(cache_size: usize, resize_buffer: usize, limit: i32) -> Self {
        Self { cache_size, resize_buffer, limit, hard_limit: false }
    }

    #[inline]
    #[must_use]
    pub fn with_hard_limit(mut self, hard_limit: bool) -> Self {
        self.hard_limit = hard_limit;
        self
    }

    #[inline]
    pub fn effective_resize_buffer(&self) -> usize {
        self.resize_buffer.max(1)
    }

    #[inline]
    pub fn max_instances(&self) -> Option<usize> {
        if self.limit > 0 {
            Some(self.limit as usize)
        } else {
            None
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            cache_size: 0,
            resize_buffer: 1,
            limit: 0,
            hard_limit: false,
        }
    }
}

// ----------------------------------------------
// PrefabCache
// ----------------------------------------------

// Pool of interchangeable instances of one template.
// Every instance the cache owns sits in exactly one of `free` or `active`.
pub struct PrefabCache<T> {
    template: Template<T>,
    settings: CacheSettings,
    free: Vec<InstanceId>, // Stack; the most recently despawned instance is reused first.
    active: HashSet<InstanceId>,
    overflow_count: usize, // Transient instances in `active` created past the limit.
}

impl<T> PrefabCache<T>
    where T: Spawnable
{
    pub fn new(template: Template<T>, settings: CacheSettings) -> Self {
        debug_assert!(template.is_valid());
        Self {
            template,
            settings,
            free: Vec::new(),
            active: HashSet::new(),
            overflow_count: 0,
        }
    }

    // ----------------------
    // Queries:
    // ----------------------

    #[inline]
    pub fn name(&self) -> &str {
        self.template.name()
    }

    #[inline]
    pub fn prefab_id(&self) -> PrefabId {
        self.template.id()
    }

    #[inline]
    pub fn template(&self) -> &Template<T> {
        &self.template
    }

    #[inline]
    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    #[inline]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    // All instances the cache currently tracks, transients included.
    #[inline]
    pub fn total_count(&self) -> usize {
        self.free.len() + self.active.len()
    }

    // Instances counted against the limit.
    #[inline]
    pub fn cached_count(&self) -> usize {
        self.total_count() - self.overflow_count
    }

    #[inline]
    pub fn overflow_count(&self) -> usize {
        self.overflow_count
    }

    #[inline]
    pub fn is_free(&self, id: InstanceId) -> bool {
        self.free.contains(&id)
    }

    #[inline]
    pub fn is_active(&self, id: InstanceId) -> bool {
        self.active.contains(&id)
    }

    #[inline]
    pub fn owns(&self, id: InstanceId) -> bool {
        self.is_active(id) || self.is_free(id)
    }

    // Active instances, in unspecified order.
    #[inline]
    pub fn iter_active(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.active.iter().copied()
    }

    #[inline]
    pub fn iter_free(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.free.iter().copied()
    }

    // ----------------------
    // Lifecycle:
    // ----------------------

    // Destroys whatever the cache held before, then pre-warms `cache_size`
    // deactivated instances. Returns the number of instances created.
    pub(crate) fn load<F>(&mut self, storage: &mut InstanceStorage<T>, on_killed: F) -> usize
        where F: FnMut(&mut SpawnedObject<T>)
    {
        self.clear(storage, on_killed);

        let wanted = match self.settings.max_instances() {
            Some(limit) => self.settings.cache_size.min(limit),
            None => self.settings.cache_size,
        };

        for _ in 0..wanted {
            match storage.insert(&self.template, true, false) {
                Some(id) => self.push_new_free(storage, id),
                None => break,
            }
        }

        if self.free.len() != self.settings.cache_size {
            log::warn!(log::channel!("spawn_pool"),
                       "Cache '{}' pre-warmed {} of {} requested instances.",
                       self.name(), self.free.len(), self.settings.cache_size);
        }

        self.free.len()
    }

    pub(crate) fn spawn(&mut self,
                        storage: &mut InstanceStorage<T>,
                        transform: Transform,
                        parent: Option<ParentId>) -> Option<InstanceId> {
        if self.free.is_empty() {
            self.grow(storage);
        }

        let id = match self.free.pop() {
            Some(id) => id,
            None => self.spawn_overflow(storage)?,
        };

        let Some(object) = storage.get_mut(id) else {
            debug_assert!(false, "Cache '{}' references missing instance {id}!", self.template.name());
            return None;
        };

        let spawned = object.spawn_at(transform, parent);
        debug_assert!(spawned, "Purged instance {id} found in the free set of cache '{}'!", self.template.name());

        self.active.insert(id);
        Some(id)
    }

    // Returns false if the instance is not currently active in this cache.
    // Overflow instances are destroyed instead of being recycled, so their
    // listeners get a Killed event right after the Despawned one.
    pub(crate) fn despawn<F>(&mut self,
                             storage: &mut InstanceStorage<T>,
                             id: InstanceId,
                             mut on_killed: F) -> bool
        where F: FnMut(&mut SpawnedObject<T>)
    {
        if !self.active.remove(&id) {
            return false;
        }

        let Some(object) = storage.get_mut(id) else {
            debug_assert!(false, "Cache '{}' references missing instance {id}!", self.template.name());
            return false;
        };

        object.despawn();

        if object.controller().is_transient() {
            self.overflow_count -= 1;
            if let Some(mut object) = storage.remove(id) {
                object.purge();
                on_killed(&mut object);
            }
            return true;
        }

        self.free.push(id);
        true
    }

    // Drops the instance from both sets without deactivating it.
    // The caller remains responsible for destroying it.
    pub(crate) fn purge(&mut self, storage: &mut InstanceStorage<T>, id: InstanceId) -> bool {
        let was_active = self.active.remove(&id);

        let mut was_free = false;
        while let Some(index) = self.free.iter().position(|free_id| *free_id == id) {
            self.free.remove(index);
            was_free = true;
        }

        if !was_active && !was_free {
            return false;
        }

        if let Some(object) = storage.get_mut(id) {
            if was_active && object.controller().is_transient() {
                self.overflow_count -= 1;
            }
            object.purge();
        }

        true
    }

    // Destroys every instance, free and active alike.
    pub(crate) fn clear<F>(&mut self, storage: &mut InstanceStorage<T>, mut on_killed: F) -> usize
        where F: FnMut(&mut SpawnedObject<T>)
    {
        let ids: Vec<InstanceId> = self.free.drain(..).chain(self.active.drain()).collect();
        self.overflow_count = 0;

        let mut destroyed = 0;
        for id in ids {
            if let Some(mut object) = storage.remove(id) {
                object.purge();
                on_killed(&mut object);
                destroyed += 1;
            }
        }
        destroyed
    }

    // ----------------------
    // Internal:
    // ----------------------

    // Adds up to `resize_buffer` instances to the free set, respecting the limit.
    fn grow(&mut self, storage: &mut InstanceStorage<T>) -> usize {
        let mut count = self.settings.effective_resize_buffer();
        if let Some(limit) = self.settings.max_instances() {
            count = count.min(limit.saturating_sub(self.cached_count()));
        }

        let mut grown = 0;
        for _ in 0..count {
            match storage.insert(&self.template, false, false) {
                Some(id) => {
                    self.push_new_free(storage, id);
                    grown += 1;
                },
                None => break,
            }
        }

        if grown != 0 {
            log::verbose!(log::channel!("spawn_pool"),
                          "Cache '{}' grew by {} instance(s), {} total.",
                          self.name(), grown, self.cached_count());
        }
        grown
    }

    // Freshly created instances enter the free set already Cached.
    fn push_new_free(&mut self, storage: &mut InstanceStorage<T>, id: InstanceId) {
        if let Some(object) = storage.get_mut(id) {
            object.mark_cached();
        }
        self.free.push(id);
    }

    fn spawn_overflow(&mut self, storage: &mut InstanceStorage<T>) -> Option<InstanceId> {
        if self.settings.hard_limit {
            log::warn!(log::channel!("spawn_pool"),
                       "Cache '{}' reached its limit of {} instances.",
                       self.name(), self.settings.limit);
            return None;
        }

        let id = storage.insert(&self.template, false, true)?;
        self.overflow_count += 1;

        log::verbose!(log::channel!("spawn_pool"),
                      "Cache '{}' is at its limit ({}); spawning transient instance {}.",
                      self.name(), self.settings.limit, id);
        Some(id)
    }
}

impl<T> std::fmt::Debug for PrefabCache<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("PrefabCache")
            .field("template", &self.template)
            .field("settings", &self.settings)
            .field("free", &self.free.len())
            .field("active", &self.active.len())
            .field("overflow", &self.overflow_count)
            .finish()
    }
}

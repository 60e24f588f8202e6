use crate::{
    log,
    config::PoolConfigs,
    utils::{
        ParentId,
        Transform,
        hash::{self, PreHashedKeyMap},
    },
};

use events::{ListenerKey, ListenerList, SpawnEvent, SpawnEventKind};
use storage::InstanceStorage;

pub mod cache;
pub mod error;
pub mod events;
pub mod id;
pub mod object;
pub mod registry;
pub mod storage;
pub mod template;

pub use cache::{CacheSettings, PrefabCache};
pub use error::{PoolError, PoolResult};
pub use id::{InstanceId, PoolId, PrefabId};
pub use object::{SpawnState, SpawnedObject, SpawnedObjectController};
pub use registry::PoolRegistry;
pub use template::{Spawnable, Template};

#[cfg(test)]
mod tests;

// ----------------------------------------------
// SpawnPool
// ----------------------------------------------

// Registry of prefab caches and single entry point for spawn, despawn and
// purge requests. Owns every instance it hands out.
//
// Not internally synchronized: a pool is confined to the thread that
// drives it and all operations complete synchronously.
pub struct SpawnPool<T>
    where T: Spawnable
{
    id: PoolId,
    name: String,
    caches: PreHashedKeyMap<PrefabId, PrefabCache<T>>,
    storage: InstanceStorage<T>,
    listeners: ListenerList<T>,
}

impl<T> SpawnPool<T>
    where T: Spawnable
{
    pub fn new(name: &str) -> Self {
        let id = PoolId::next();
        Self {
            id,
            name: name.to_string(),
            caches: hash::new_const_hash_map(),
            storage: InstanceStorage::new(id),
            listeners: ListenerList::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> PoolId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    // ----------------------
    // Registration:
    // ----------------------

    // Creates and pre-warms a cache for the template.
    // Rejected without any mutation if the template is already registered.
    pub fn register(&mut self, template: &Template<T>, settings: CacheSettings) -> PoolResult<PrefabId> {
        if !template.is_valid() {
            return Err(PoolError::InvalidArgument("template must have a valid id and a non-empty name"));
        }

        let prefab_id = template.id();
        if let Some(existing) = self.caches.get(&prefab_id) {
            return Err(PoolError::DuplicateRegistration {
                id: prefab_id,
                name: existing.name().to_string(),
            });
        }

        let mut cache = PrefabCache::new(template.clone(), settings);
        let listeners = &mut self.listeners;
        let prewarmed = cache.load(&mut self.storage, |object| kill_object(listeners, object));

        log::info!(log::channel!("spawn_pool"),
                   "Registered '{}' ({}) with pool '{}': {} pre-warmed, resize buffer {}, limit {}.",
                   template.name(), prefab_id, self.name, prewarmed,
                   settings.effective_resize_buffer(), settings.limit);

        self.caches.insert(prefab_id, cache);
        Ok(prefab_id)
    }

    // Registers every template that has an entry in the configs.
    // Templates without an entry are skipped. Returns how many were registered.
    pub fn register_from_config(&mut self, templates: &[Template<T>], configs: &PoolConfigs) -> PoolResult<usize> {
        let mut registered = 0;
        for template in templates {
            match configs.find(template.name()) {
                Some(config) => {
                    self.register(template, config.settings)?;
                    registered += 1;
                },
                None => {
                    log::verbose!(log::channel!("spawn_pool"),
                                  "No cache config for '{}'; leaving it unregistered.", template.name());
                }
            }
        }

        for config in &configs.caches {
            if !templates.iter().any(|template| template.name() == config.name) {
                log::warn!(log::channel!("spawn_pool"),
                           "Cache config '{}' does not match any template.", config.name);
            }
        }

        Ok(registered)
    }

    // Tears down the cache and destroys all of its instances.
    pub fn unregister(&mut self, prefab_id: PrefabId) -> bool {
        let Some(mut cache) = self.caches.remove(&prefab_id) else {
            return false;
        };

        let listeners = &mut self.listeners;
        let destroyed = cache.clear(&mut self.storage, |object| kill_object(listeners, object));

        log::info!(log::channel!("spawn_pool"),
                   "Unregistered '{}' ({}) from pool '{}', {} instance(s) destroyed.",
                   cache.name(), prefab_id, self.name, destroyed);
        true
    }

    #[inline]
    pub fn unregister_template(&mut self, template: &Template<T>) -> bool {
        self.unregister(template.id())
    }

    // Destroys every instance of the cache but keeps it registered.
    pub fn clear_cache(&mut self, prefab_id: PrefabId) -> bool {
        let Some(cache) = self.caches.get_mut(&prefab_id) else {
            return false;
        };
        let listeners = &mut self.listeners;
        cache.clear(&mut self.storage, |object| kill_object(listeners, object));
        true
    }

    // Destroys every instance of the cache and pre-warms it again.
    pub fn reload_cache(&mut self, prefab_id: PrefabId) -> bool {
        let Some(cache) = self.caches.get_mut(&prefab_id) else {
            return false;
        };
        let listeners = &mut self.listeners;
        cache.load(&mut self.storage, |object| kill_object(listeners, object));
        true
    }

    // ----------------------
    // Queries:
    // ----------------------

    #[inline]
    pub fn contains(&self, prefab_id: PrefabId) -> bool {
        self.caches.contains_key(&prefab_id)
    }

    #[inline]
    pub fn find_cache(&self, prefab_id: PrefabId) -> Option<&PrefabCache<T>> {
        self.caches.get(&prefab_id)
    }

    // Number of registered templates.
    #[inline]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    #[inline]
    pub fn caches(&self) -> impl Iterator<Item = &PrefabCache<T>> {
        self.caches.values()
    }

    // Every live instance, cached or transient.
    #[inline]
    pub fn instance_count(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn get(&self, id: InstanceId) -> Option<&SpawnedObject<T>> {
        self.storage.get(id)
    }

    #[inline]
    pub fn object(&self, id: InstanceId) -> Option<&T> {
        self.storage.get(id).map(|object| object.object())
    }

    #[inline]
    pub fn object_mut(&mut self, id: InstanceId) -> Option<&mut T> {
        self.storage.get_mut(id).map(|object| object.object_mut())
    }

    #[inline]
    pub fn controller(&self, id: InstanceId) -> Option<&SpawnedObjectController> {
        self.storage.get(id).map(|object| object.controller())
    }

    #[inline]
    pub fn is_spawned(&self, id: InstanceId) -> bool {
        self.storage.get(id).is_some_and(|object| object.is_spawned())
    }

    // ----------------------
    // Spawn / Despawn:
    // ----------------------

    // Unregistered templates are still spawnable, as a single transient
    // instance outside of any cache.
    pub fn spawn(&mut self, template: &Template<T>, transform: Transform, parent: Option<ParentId>) -> Option<InstanceId> {
        if !template.is_valid() {
            log::error!(log::channel!("spawn_pool"), "Cannot spawn from an invalid template: {template:?}");
            return None;
        }

        let id = match self.caches.get_mut(&template.id()) {
            Some(cache) => cache.spawn(&mut self.storage, transform, parent)?,
            None => self.spawn_transient(template, transform, parent)?,
        };

        self.notify(id, SpawnEventKind::Spawned);
        Some(id)
    }

    pub fn spawn_registered(&mut self, prefab_id: PrefabId, transform: Transform, parent: Option<ParentId>) -> Option<InstanceId> {
        let template = self.caches.get(&prefab_id)?.template().clone();
        self.spawn(&template, transform, parent)
    }

    // Listeners see the instance while it is still active: pool listeners
    // first, then the instance's own, then the global ones. Only then is it
    // returned to its cache.
    pub fn despawn(&mut self, id: InstanceId) -> PoolResult<bool> {
        if !id.is_valid() {
            return Err(PoolError::InvalidArgument("despawn requires a valid instance handle"));
        }

        let Some(prefab_id) = self.active_prefab_of(id) else {
            return Ok(false);
        };

        self.notify(id, SpawnEventKind::Despawned);

        let Self { caches, storage, listeners, .. } = self;
        let Some(cache) = caches.get_mut(&prefab_id) else {
            return Ok(false);
        };

        Ok(cache.despawn(storage, id, |object| kill_object(listeners, object)))
    }

    // Removes the instance from pool bookkeeping without any notification.
    // The instance is left alive in its current state and can only be
    // destroyed afterwards.
    pub fn purge(&mut self, id: InstanceId) -> PoolResult<bool> {
        if !id.is_valid() {
            return Err(PoolError::InvalidArgument("purge requires a valid instance handle"));
        }

        let Some(controller) = self.controller(id).copied() else {
            return Ok(false);
        };

        if controller.is_purged() {
            return Ok(false);
        }

        if let Some(cache) = self.caches.get_mut(&controller.prefab_id()) {
            if cache.owns(id) {
                return Ok(cache.purge(&mut self.storage, id));
            }
        }

        // Transient instance outside of any cache.
        if let Some(object) = self.storage.get_mut(id) {
            object.purge();
        }
        Ok(true)
    }

    // Teardown hook of a single instance: purges it if the pool still owns
    // it, fires the Killed notifications and drops it.
    // Stale or foreign handles are ignored.
    pub fn destroy(&mut self, id: InstanceId) -> bool {
        let Some(object) = self.storage.get(id) else {
            return false;
        };

        let prefab_id = object.controller().prefab_id();
        if let Some(cache) = self.caches.get_mut(&prefab_id) {
            cache.purge(&mut self.storage, id);
        }

        let Some(mut object) = self.storage.remove(id) else {
            return false;
        };

        object.purge();
        kill_object(&mut self.listeners, &mut object);
        true
    }

    // Spawns a fresh instance of the same template at the current placement
    // of `id`. A null handle was never initialized through a pool and is an
    // error; stale, foreign and purged handles yield None.
    pub fn clone_instance(&mut self, id: InstanceId) -> PoolResult<Option<InstanceId>> {
        if !id.is_valid() {
            return Err(PoolError::InvalidOperation("cannot clone an instance that has no owning pool"));
        }

        let Some(object) = self.storage.get(id) else {
            return Ok(None);
        };

        if !object.controller().is_initialized() {
            return Err(PoolError::InvalidOperation("cannot clone an instance that has no owning pool"));
        }

        if object.controller().is_purged() {
            return Ok(None);
        }

        let template = object.template().clone();
        let transform = object.transform();
        let parent = object.parent();

        Ok(self.spawn(&template, transform, parent))
    }

    // ----------------------
    // Listeners:
    // ----------------------

    pub fn add_listener<F>(&mut self, listener_fn: F) -> ListenerKey
        where F: FnMut(&SpawnEvent, &SpawnedObject<T>) + 'static
    {
        self.listeners.add(listener_fn)
    }

    pub fn remove_listener(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    // Returns None if the instance does not belong to this pool.
    pub fn add_instance_listener<F>(&mut self, id: InstanceId, listener_fn: F) -> Option<ListenerKey>
        where F: FnMut(&SpawnEvent, &SpawnedObject<T>) + 'static
    {
        self.storage
            .get_mut(id)
            .map(|object| object.add_listener(listener_fn))
    }

    pub fn remove_instance_listener(&mut self, id: InstanceId, key: ListenerKey) -> bool {
        self.storage
            .get_mut(id)
            .is_some_and(|object| object.remove_listener(key))
    }

    // ----------------------
    // Teardown:
    // ----------------------

    // Destroys every instance, cached or transient, and unregisters all caches.
    pub fn teardown(&mut self) {
        if self.caches.is_empty() && self.storage.is_empty() {
            return;
        }

        let Self { caches, storage, listeners, .. } = self;
        let mut destroyed = 0;

        for (_, mut cache) in caches.drain() {
            destroyed += cache.clear(storage, |object| kill_object(listeners, object));
        }

        // Whatever is left was never owned by a cache.
        for id in storage.ids() {
            if let Some(mut object) = storage.remove(id) {
                object.purge();
                kill_object(listeners, &mut object);
                destroyed += 1;
            }
        }

        log::info!(log::channel!("spawn_pool"),
                   "Pool '{}' torn down, {} instance(s) destroyed.", self.name, destroyed);
    }

    // ----------------------
    // Internal:
    // ----------------------

    fn spawn_transient(&mut self, template: &Template<T>, transform: Transform, parent: Option<ParentId>) -> Option<InstanceId> {
        let id = self.storage.insert(template, false, true)?;
        let object = self.storage.get_mut(id)?;
        object.spawn_at(transform, parent);

        log::verbose!(log::channel!("spawn_pool"),
                      "'{}' is not registered with pool '{}'; spawned transient instance {}.",
                      template.name(), self.name, id);
        Some(id)
    }

    // Prefab of the cache that currently has `id` in its active set.
    fn active_prefab_of(&self, id: InstanceId) -> Option<PrefabId> {
        let prefab_id = self.storage.get(id)?.controller().prefab_id();
        self.caches
            .get(&prefab_id)
            .filter(|cache| cache.is_active(id))
            .map(|_| prefab_id)
    }

    fn notify(&mut self, id: InstanceId, kind: SpawnEventKind) {
        if let Some(object) = self.storage.get_mut(id) {
            dispatch(&mut self.listeners, object, kind);
        }
    }
}

impl<T> Drop for SpawnPool<T>
    where T: Spawnable
{
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T> std::fmt::Debug for SpawnPool<T>
    where T: Spawnable
{
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SpawnPool")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("caches", &self.caches.len())
            .field("instances", &self.storage.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ----------------------------------------------
// Notification fan-out
// ----------------------------------------------

// Pool listeners, then instance listeners, then global listeners.
fn dispatch<T>(listeners: &mut ListenerList<T>, object: &mut SpawnedObject<T>, kind: SpawnEventKind)
    where T: Spawnable
{
    let event = object.make_event(kind);
    listeners.notify(&event, object);
    object.notify(&event);
    events::notify_global(&event);
}

fn kill_object<T>(listeners: &mut ListenerList<T>, object: &mut SpawnedObject<T>)
    where T: Spawnable
{
    dispatch(listeners, object, SpawnEventKind::Killed);
    object.kill();
}

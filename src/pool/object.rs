use serde::{Serialize, Deserialize};
use strum_macros::Display;

use crate::utils::{ParentId, Transform};
use super::{
    id::{InstanceId, PoolId, PrefabId},
    events::{ListenerKey, ListenerList, SpawnEvent, SpawnEventKind},
    template::{Spawnable, Template},
};

// ----------------------------------------------
// SpawnState
// ----------------------------------------------

// Uninitialized -> Cached <-> Active -> Purged
// Purged is terminal: the instance is out of every cache set and can only
// be destroyed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
pub enum SpawnState {
    #[default]
    Uninitialized,
    Cached,
    Active,
    Purged,
}

// ----------------------------------------------
// SpawnedObjectController
// ----------------------------------------------

// Identity and state tag of one pooled instance. Routes despawn/purge
// requests back to the cache that owns the instance.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnedObjectController {
    instance: InstanceId,
    prefab_id: PrefabId,
    pool: Option<PoolId>, // Back-reference only, never owns the pool.
    state: SpawnState,
    is_cached: bool,      // Pre-warmed by a cache load rather than created on demand.
    is_transient: bool,   // Lives outside of any cache limit accounting.
}

impl SpawnedObjectController {
    pub fn new(instance: InstanceId, prefab_id: PrefabId, is_cached: bool, is_transient: bool) -> Self {
        debug_assert!(instance.is_valid());
        Self {
            instance,
            prefab_id,
            pool: Some(instance.pool()),
            state: SpawnState::Uninitialized,
            is_cached,
            is_transient,
        }
    }

    #[inline]
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    #[inline]
    pub fn prefab_id(&self) -> PrefabId {
        self.prefab_id
    }

    #[inline]
    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    #[inline]
    pub fn state(&self) -> SpawnState {
        self.state
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.pool.is_some() && self.instance.is_valid()
    }

    #[inline]
    pub fn is_spawned(&self) -> bool {
        self.state == SpawnState::Active
    }

    #[inline]
    pub fn is_purged(&self) -> bool {
        self.state == SpawnState::Purged
    }

    #[inline]
    pub fn is_cached(&self) -> bool {
        self.is_cached
    }

    #[inline]
    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    // Calling this twice in a row is allowed; the caller simply fires the
    // spawn notifications again. Purged controllers refuse the transition.
    pub fn set_spawned(&mut self) -> bool {
        if self.is_purged() {
            return false;
        }
        self.state = SpawnState::Active;
        true
    }

    pub fn set_despawned(&mut self) -> bool {
        if self.is_purged() {
            return false;
        }
        self.state = SpawnState::Cached;
        true
    }

    pub fn set_purged(&mut self) {
        self.state = SpawnState::Purged;
    }
}

// ----------------------------------------------
// SpawnedObject
// ----------------------------------------------

// A concrete instance owned by a pool: the host object plus its controller,
// placement and the instance-level lifecycle listeners.
pub struct SpawnedObject<T> {
    controller: SpawnedObjectController,
    template: Template<T>,
    object: T,
    transform: Transform,
    parent: Option<ParentId>,
    active: bool,
    listeners: ListenerList<T>,
}

impl<T> SpawnedObject<T>
    where T: Spawnable
{
    // New instances start deactivated under the pool root.
    pub(crate) fn new(controller: SpawnedObjectController, template: Template<T>, object: T) -> Self {
        Self {
            controller,
            template,
            object,
            transform: Transform::identity(),
            parent: None,
            active: false,
            listeners: ListenerList::new(),
        }
    }

    #[inline]
    pub fn controller(&self) -> &SpawnedObjectController {
        &self.controller
    }

    #[inline]
    pub fn id(&self) -> InstanceId {
        self.controller.instance()
    }

    #[inline]
    pub fn template(&self) -> &Template<T> {
        &self.template
    }

    #[inline]
    pub fn object(&self) -> &T {
        &self.object
    }

    #[inline]
    pub fn object_mut(&mut self) -> &mut T {
        &mut self.object
    }

    #[inline]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    #[inline]
    pub fn parent(&self) -> Option<ParentId> {
        self.parent
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_spawned(&self) -> bool {
        self.controller.is_spawned()
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn add_listener<F>(&mut self, listener_fn: F) -> ListenerKey
        where F: FnMut(&SpawnEvent, &SpawnedObject<T>) + 'static
    {
        self.listeners.add(listener_fn)
    }

    pub(crate) fn remove_listener(&mut self, key: ListenerKey) -> bool {
        self.listeners.remove(key)
    }

    pub(crate) fn make_event(&self, kind: SpawnEventKind) -> SpawnEvent {
        SpawnEvent {
            kind,
            pool: self.controller.pool().unwrap_or(PoolId::invalid()),
            prefab: self.controller.prefab_id(),
            instance: self.controller.instance(),
            transform: self.transform,
        }
    }

    // Fires the instance-level listeners.
    pub(crate) fn notify(&mut self, event: &SpawnEvent) {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        listeners.notify(event, self);
        self.listeners = listeners;
    }

    // Reposition, reparent, activate and mark spawned.
    pub(crate) fn spawn_at(&mut self, transform: Transform, parent: Option<ParentId>) -> bool {
        if !self.controller.set_spawned() {
            return false;
        }
        self.transform = transform;
        self.parent = parent;
        self.active = true;
        self.object.on_spawned(&self.transform);
        true
    }

    // Deactivate and return under the pool root.
    pub(crate) fn despawn(&mut self) -> bool {
        if !self.controller.set_despawned() {
            return false;
        }
        self.active = false;
        self.parent = None;
        self.object.on_despawned();
        true
    }

    // Uninitialized -> Cached for instances that enter a free set
    // without ever having been spawned.
    pub(crate) fn mark_cached(&mut self) -> bool {
        self.controller.set_despawned()
    }

    pub(crate) fn purge(&mut self) {
        self.controller.set_purged();
    }

    pub(crate) fn kill(&mut self) {
        self.active = false;
        self.object.on_killed();
    }
}

impl<T> std::fmt::Debug for SpawnedObject<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("SpawnedObject")
            .field("controller", &self.controller)
            .field("template", &self.template.name())
            .field("transform", &self.transform)
            .field("parent", &self.parent)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

// ----------------------------------------------
// Unit Tests
// ----------------------------------------------

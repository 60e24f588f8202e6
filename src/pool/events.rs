use std::cell::RefCell;
use std::rc::Rc;

use slab::Slab;
use serde::{Serialize, Deserialize};
use strum_macros::{Display, EnumCount};

use crate::{log, utils::Transform};
use super::{
    id::{InstanceId, PoolId, PrefabId},
    object::SpawnedObject,
};

// ----------------------------------------------
// SpawnEvent
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Display, EnumCount, Serialize, Deserialize)]
pub enum SpawnEventKind {
    Spawned,
    Despawned,
    Killed,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SpawnEvent {
    pub kind: SpawnEventKind,
    pub pool: PoolId,
    pub prefab: PrefabId,
    pub instance: InstanceId,
    pub transform: Transform,
}

// ----------------------------------------------
// ListenerKey
// ----------------------------------------------

// Returned when a listener is added; used to remove it later.
// A key is invalidated once its listener is removed.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(usize);

impl ListenerKey {
    #[inline]
    pub const fn invalid() -> Self {
        Self(usize::MAX)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }
}

// ----------------------------------------------
// ListenerList
// ----------------------------------------------

// Ordered list of callbacks. Invocation follows insertion order as long
// as no listener has been removed; freed slots are reused by later adds.
pub type InstanceListenerFn<T> = dyn FnMut(&SpawnEvent, &SpawnedObject<T>);

pub struct ListenerList<T> {
    listeners: Slab<Box<InstanceListenerFn<T>>>,
}

impl<T> ListenerList<T> {
    #[inline]
    pub fn new() -> Self {
        Self { listeners: Slab::new() }
    }

    pub fn add<F>(&mut self, listener_fn: F) -> ListenerKey
        where F: FnMut(&SpawnEvent, &SpawnedObject<T>) + 'static
    {
        ListenerKey(self.listeners.insert(Box::new(listener_fn)))
    }

    pub fn remove(&mut self, key: ListenerKey) -> bool {
        self.listeners.try_remove(key.0).is_some()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&mut self, event: &SpawnEvent, instance: &SpawnedObject<T>) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event, instance);
        }
    }
}

impl<T> Default for ListenerList<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------
// Global listeners
// ----------------------------------------------

type GlobalListenerFn = dyn FnMut(&SpawnEvent);
type SharedGlobalListener = Rc<RefCell<Box<GlobalListenerFn>>>;

std::thread_local! {
    // Process-wide for the thread that drives the pools (pools are not Send).
    // Called for every spawn/despawn/kill of every pool, after the pool and
    // instance listeners.
    static GLOBAL_LISTENERS: RefCell<Slab<SharedGlobalListener>> = RefCell::new(Slab::new());
}

pub fn add_global_listener<F>(listener_fn: F) -> ListenerKey
    where F: FnMut(&SpawnEvent) + 'static
{
    let listener: SharedGlobalListener = Rc::new(RefCell::new(Box::new(listener_fn)));
    GLOBAL_LISTENERS.with(|listeners| {
        ListenerKey(listeners.borrow_mut().insert(listener))
    })
}

pub fn remove_global_listener(key: ListenerKey) -> bool {
    if !key.is_valid() {
        return false;
    }
    GLOBAL_LISTENERS.with(|listeners| {
        listeners.borrow_mut().try_remove(key.0).is_some()
    })
}

pub fn clear_global_listeners() {
    GLOBAL_LISTENERS.with(|listeners| listeners.borrow_mut().clear());
}

pub fn global_listener_count() -> usize {
    GLOBAL_LISTENERS.with(|listeners| listeners.borrow().len())
}

pub fn notify_global(event: &SpawnEvent) {
    // Snapshot first so listeners may add/remove global listeners while
    // being notified. Changes take effect on the next event.
    let snapshot: Vec<SharedGlobalListener> = GLOBAL_LISTENERS.with(|listeners| {
        listeners.borrow().iter().map(|(_, listener)| Rc::clone(listener)).collect()
    });

    for listener in snapshot {
        match listener.try_borrow_mut() {
            Ok(mut listener_fn) => (*listener_fn)(event),
            Err(_) => {
                log::warn!(log::channel!("spawn_pool"),
                           "Skipping re-entrant global listener for {} event of instance {}.",
                           event.kind, event.instance);
            }
        }
    }
}

// ----------------------------------------------
// Unit Tests
// ----------------------------------------------

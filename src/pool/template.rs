use std::rc::Rc;

use crate::utils::Transform;
use super::id::PrefabId;

// ----------------------------------------------
// Spawnable
// ----------------------------------------------

// Implemented by the host object type a pool hands out.
// Hooks run after the pool has updated the instance bookkeeping.
pub trait Spawnable {
    fn on_spawned(&mut self, _transform: &Transform) {
    }

    fn on_despawned(&mut self) {
    }

    fn on_killed(&mut self) {
    }
}

// ----------------------------------------------
// Template
// ----------------------------------------------

type FactoryFn<T> = dyn Fn() -> Option<T>;

// A prefab: named factory producing fresh instances of T.
// Cloning a template shares the same factory.
pub struct Template<T> {
    id: PrefabId,
    name: String,
    factory: Rc<FactoryFn<T>>,
}

impl<T> Template<T> {
    // Template identity is derived from its name.
    pub fn new<F>(name: &str, factory: F) -> Self
        where F: Fn() -> Option<T> + 'static
    {
        Self::with_id(PrefabId::from_name(name), name, factory)
    }

    pub fn with_id<F>(id: PrefabId, name: &str, factory: F) -> Self
        where F: Fn() -> Option<T> + 'static
    {
        Self {
            id,
            name: name.to_string(),
            factory: Rc::new(factory),
        }
    }

    #[inline]
    pub fn id(&self) -> PrefabId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id.is_valid() && !self.name.is_empty()
    }

    // None signals an instantiation failure.
    #[inline]
    pub fn instantiate(&self) -> Option<T> {
        (self.factory)()
    }
}

impl<T> Clone for Template<T> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: self.name.clone(),
            factory: Rc::clone(&self.factory),
        }
    }
}

impl<T> std::fmt::Debug for Template<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

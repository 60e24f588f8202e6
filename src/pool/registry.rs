use crate::log;
use super::{
    InstanceId,
    PoolError,
    PoolId,
    PoolResult,
    SpawnPool,
    template::Spawnable,
};

pub const DEFAULT_POOL_NAME: &str = "SpawnPool";

// ----------------------------------------------
// PoolRegistry
// ----------------------------------------------

// Explicit home for the default pool and any additional named pools.
// The host owns the registry: create it at startup, call `reset()` (or drop
// it) at shutdown. Dropping a pool destroys all of its instances.
pub struct PoolRegistry<T>
    where T: Spawnable
{
    default_pool: Option<SpawnPool<T>>,
    named_pools: Vec<SpawnPool<T>>,
}

impl<T> PoolRegistry<T>
    where T: Spawnable
{
    pub fn new() -> Self {
        Self {
            default_pool: None,
            named_pools: Vec::new(),
        }
    }

    // ----------------------
    // Default pool:
    // ----------------------

    #[inline]
    pub fn has_default(&self) -> bool {
        self.default_pool.is_some()
    }

    #[inline]
    pub fn try_get(&self) -> Option<&SpawnPool<T>> {
        self.default_pool.as_ref()
    }

    #[inline]
    pub fn try_get_mut(&mut self) -> Option<&mut SpawnPool<T>> {
        self.default_pool.as_mut()
    }

    // Fails if a default pool already exists; use `get_or_create()` for
    // lazy access.
    pub fn create_and_register(&mut self, name: &str) -> PoolResult<&mut SpawnPool<T>> {
        if self.has_default() {
            return Err(PoolError::InvalidOperation("a default pool is already registered"));
        }
        if name.is_empty() {
            return Err(PoolError::InvalidArgument("pool name must not be empty"));
        }
        if self.find_named(name).is_some() {
            return Err(PoolError::InvalidOperation("a pool with the same name is already registered"));
        }

        log::info!(log::channel!("spawn_pool"), "Created default pool '{name}'.");
        Ok(self.default_pool.insert(SpawnPool::new(name)))
    }

    pub fn get_or_create(&mut self) -> &mut SpawnPool<T> {
        self.default_pool.get_or_insert_with(|| {
            log::info!(log::channel!("spawn_pool"), "Lazily created default pool '{DEFAULT_POOL_NAME}'.");
            SpawnPool::new(DEFAULT_POOL_NAME)
        })
    }

    // Installs `pool` as the default, handing back the previous one (if any)
    // so the caller decides when it is torn down.
    pub fn replace_default(&mut self, pool: SpawnPool<T>) -> Option<SpawnPool<T>> {
        self.default_pool.replace(pool)
    }

    // Tears down and forgets the default pool. Returns false if there was none.
    pub fn reset(&mut self) -> bool {
        match self.default_pool.take() {
            Some(pool) => {
                log::info!(log::channel!("spawn_pool"), "Resetting default pool '{}'.", pool.name());
                drop(pool);
                true
            },
            None => false,
        }
    }

    // ----------------------
    // Named pools:
    // ----------------------

    // `insert_named` and `create_and_register` refuse a name already taken
    // by the default pool or by another named pool.
    pub fn insert_named(&mut self, pool: SpawnPool<T>) -> PoolResult<PoolId> {
        if pool.name().is_empty() {
            return Err(PoolError::InvalidArgument("pool name must not be empty"));
        }
        let default_name = self.default_pool.as_ref().map(|default| default.name());
        if default_name == Some(pool.name()) || self.find_named(pool.name()).is_some() {
            return Err(PoolError::InvalidOperation("a pool with the same name is already registered"));
        }

        let id = pool.id();
        self.named_pools.push(pool);
        Ok(id)
    }

    pub fn find_named(&self, name: &str) -> Option<&SpawnPool<T>> {
        self.named_pools.iter().find(|pool| pool.name() == name)
    }

    pub fn find_named_mut(&mut self, name: &str) -> Option<&mut SpawnPool<T>> {
        self.named_pools.iter_mut().find(|pool| pool.name() == name)
    }

    pub fn remove_named(&mut self, name: &str) -> Option<SpawnPool<T>> {
        let index = self.named_pools.iter().position(|pool| pool.name() == name)?;
        Some(self.named_pools.remove(index))
    }

    // ----------------------
    // Routing:
    // ----------------------

    pub fn find_by_id(&self, id: PoolId) -> Option<&SpawnPool<T>> {
        self.pools().find(|pool| pool.id() == id)
    }

    pub fn find_by_id_mut(&mut self, id: PoolId) -> Option<&mut SpawnPool<T>> {
        self.default_pool
            .iter_mut()
            .chain(self.named_pools.iter_mut())
            .find(|pool| pool.id() == id)
    }

    // Resolves the back-reference carried by an instance handle.
    // None once the owning pool has been torn down.
    #[inline]
    pub fn owner_of(&mut self, id: InstanceId) -> Option<&mut SpawnPool<T>> {
        self.find_by_id_mut(id.pool())
    }

    // Despawns through whichever registered pool owns the instance.
    pub fn despawn(&mut self, id: InstanceId) -> PoolResult<bool> {
        if !id.is_valid() {
            return Err(PoolError::InvalidArgument("despawn requires a valid instance handle"));
        }
        match self.owner_of(id) {
            Some(pool) => pool.despawn(id),
            None => Ok(false),
        }
    }

    // Destroys through whichever registered pool owns the instance.
    // Safe to call after the owning pool is gone.
    pub fn destroy(&mut self, id: InstanceId) -> bool {
        self.owner_of(id).is_some_and(|pool| pool.destroy(id))
    }

    pub fn pools(&self) -> impl Iterator<Item = &SpawnPool<T>> {
        self.default_pool.iter().chain(self.named_pools.iter())
    }

    // Tears down every pool, default and named.
    pub fn reset_all(&mut self) {
        self.reset();
        self.named_pools.clear();
    }
}

impl<T> Default for PoolRegistry<T>
    where T: Spawnable
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

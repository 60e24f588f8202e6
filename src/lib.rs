// Object pooling with spawn/despawn lifecycle tracking.
//
// A `SpawnPool` maps templates (prefabs) to `PrefabCache`s of pre-built,
// deactivated instances. Spawning pops a free instance (growing the cache
// as configured), despawning returns it, purging drops it from the books.
// Every transition is reported to pool, instance and global listeners.

// NOTE: Allow these for the whole project.
#![allow(clippy::collapsible_if)]

pub mod log;
pub mod config;
pub mod pool;
pub mod utils;

pub use config::{CacheConfig, PoolConfigs};
pub use pool::{
    CacheSettings,
    InstanceId,
    PoolError,
    PoolId,
    PoolRegistry,
    PoolResult,
    PrefabCache,
    PrefabId,
    SpawnPool,
    SpawnState,
    Spawnable,
    SpawnedObject,
    SpawnedObjectController,
    Template,
    events::{self, ListenerKey, SpawnEvent, SpawnEventKind},
};
pub use utils::{ParentId, Quat, Transform, Vec3};

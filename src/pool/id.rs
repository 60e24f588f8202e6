use std::sync::atomic::{AtomicU32, Ordering};
use serde::{Serialize, Deserialize};

use crate::utils::hash::{self, FNV1aHash};

// ----------------------------------------------
// PrefabId
// ----------------------------------------------

// Identity of a spawnable template. Unique per template within a pool.
// Usually the FNV-1a hash of the template name; 0 is reserved as invalid.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefabId(FNV1aHash);

impl PrefabId {
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        Self(hash::fnv1a_from_str(name))
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self(hash::NULL_HASH)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != hash::NULL_HASH
    }
}

impl Default for PrefabId {
    #[inline]
    fn default() -> Self {
        Self::invalid()
    }
}

impl std::fmt::Display for PrefabId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{:016x}", self.0)
        } else {
            write!(f, "[invalid]")
        }
    }
}

// ----------------------------------------------
// PoolId
// ----------------------------------------------

// Process-unique pool identity. Controllers keep one of these as their
// back-reference to the owning pool, so a handle never keeps a pool alive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolId(u32);

static NEXT_POOL_ID: AtomicU32 = AtomicU32::new(1);

impl PoolId {
    pub fn next() -> Self {
        Self(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self(0)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "pool#{}", self.0)
    }
}

// ----------------------------------------------
// InstanceId
// ----------------------------------------------

// Generational handle of one pooled instance.
// The generation changes every time a storage slot is reused, so handles
// to destroyed instances go stale instead of aliasing a newer instance.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pool: PoolId,
    generation: u32,
    index: u32, // Index into the pool storage; u32::MAX = invalid.
}

impl InstanceId {
    #[inline]
    pub fn new(pool: PoolId, generation: u32, index: usize) -> Self {
        // Reserved values for invalid.
        debug_assert!(pool.is_valid());
        debug_assert!(generation < u32::MAX);
        debug_assert!(index < u32::MAX as usize);
        Self {
            pool,
            generation,
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self {
            pool: PoolId::invalid(),
            generation: u32::MAX,
            index: u32::MAX,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.pool.is_valid() && self.generation < u32::MAX && self.index < u32::MAX
    }

    #[inline]
    pub fn pool(self) -> PoolId {
        self.pool
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }
}

impl Default for InstanceId {
    #[inline]
    fn default() -> Self {
        Self::invalid()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "[{},{},{}]", self.pool.0, self.generation, self.index)
        } else {
            write!(f, "[invalid]")
        }
    }
}

// ----------------------------------------------
// Unit Tests
// ----------------------------------------------

#[test]
fn test_prefab_id_from_name() {
    assert!(PrefabId::from_name("bullet").is_valid());
    assert!(!PrefabId::from_name("").is_valid());
    assert_eq!(PrefabId::from_name("bullet"), PrefabId::from_name("bullet"));
    assert_ne!(PrefabId::from_name("bullet"), PrefabId::from_name("rocket"));
    assert_eq!(PrefabId::default(), PrefabId::invalid());
}

#[test]
fn test_pool_ids_are_unique() {
    let a = PoolId::next();
    let b = PoolId::next();
    assert!(a.is_valid() && b.is_valid());
    assert_ne!(a, b);
}

#[test]
fn test_instance_id_validity() {
    let pool = PoolId::next();
    let id = InstanceId::new(pool, 3, 7);
    assert!(id.is_valid());
    assert_eq!(id.pool(), pool);
    assert_eq!(id.generation(), 3);
    assert_eq!(id.index(), 7);

    assert!(!InstanceId::invalid().is_valid());
    assert!(!InstanceId::default().is_valid());
    assert_eq!(InstanceId::invalid().to_string(), "[invalid]");
}

use std::{
    collections::HashMap,
    hash::{BuildHasherDefault, Hasher},
};

// ----------------------------------------------
// PreHashedKeyMap / IdentityHasher
// ----------------------------------------------

#[derive(Default)]
pub struct IdentityHasher {
    hash: u64,
}

// Hasher for maps where the key is a u64 that is itself already
// the hash of some data, so no further hashing is needed.
// Just returns the value as is.
impl Hasher for IdentityHasher {
    fn write(&mut self, _: &[u8]) {
        panic!("Only write_u64 is supported!");
    }

    #[inline]
    fn write_u64(&mut self, h: u64) {
        self.hash = h;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }
}

pub type PreHashedKeyMap<K, V> = HashMap<K, V, BuildHasherDefault<IdentityHasher>>;

// Creates a default initialized empty PreHashedKeyMap.
// This can be used in a `const` context, such as to initialize a static
// variable.
#[inline]
pub const fn new_const_hash_map<K, V>() -> PreHashedKeyMap<K, V> {
    PreHashedKeyMap::with_hasher(BuildHasherDefault::<IdentityHasher>::new())
}

// ----------------------------------------------
// FNV-1a hash utilities
// ----------------------------------------------

pub type FNV1aHash = u64;
pub type StringHash = FNV1aHash;
pub const NULL_HASH: FNV1aHash = 0;

pub const fn fnv1a_from_str(s: &str) -> FNV1aHash {
    if s.is_empty() {
        return NULL_HASH;
    }

    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    let bytes = s.as_bytes();
    let mut hash = FNV_OFFSET;
    let mut i = 0;

    while i < bytes.len() {
        hash ^= bytes[i] as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }

    hash
}

#[test]
fn test_fnv1a() {
    assert_eq!(fnv1a_from_str(""), NULL_HASH);
    assert_eq!(fnv1a_from_str("a"), 0xaf63dc4c8601ec8c);
    assert_eq!(fnv1a_from_str("foobar"), 0x85944171f73967e8);
    assert_ne!(fnv1a_from_str("bullet"), fnv1a_from_str("Bullet"));
}

#[test]
fn test_pre_hashed_key_map() {
    let mut map: PreHashedKeyMap<FNV1aHash, &str> = new_const_hash_map();
    map.insert(fnv1a_from_str("bullet"), "bullet");
    map.insert(fnv1a_from_str("crate"), "crate");

    assert_eq!(map.get(&fnv1a_from_str("bullet")), Some(&"bullet"));
    assert_eq!(map.get(&fnv1a_from_str("crate")), Some(&"crate"));
    assert!(map.get(&fnv1a_from_str("missing")).is_none());
}

//! Collection cache
//!
//! Maps the content key of a file to the entity anchoring the one canonical,
//! resident copy of that file's content.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use void_ecs::Entity;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Content identity of a collection file (FNV-1a of its path)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey(u64);

impl ContentKey {
    pub fn from_path(path: &str) -> Self {
        let hash = path
            .bytes()
            .fold(FNV_OFFSET, |h, b| (h ^ b as u64).wrapping_mul(FNV_PRIME));
        Self(hash)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Content key to canonical collection entity
#[derive(Debug, Default)]
pub struct CollectionCache {
    entries: HashMap<ContentKey, Entity>,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn get(&self, key: ContentKey) -> Option<Entity> {
        self.entries.get(&key).copied()
    }

    #[inline]
    pub fn contains(&self, key: ContentKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn insert(&mut self, key: ContentKey, collection: Entity) -> Option<Entity> {
        self.entries.insert(key, collection)
    }

    pub fn remove(&mut self, key: ContentKey) -> Option<Entity> {
        self.entries.remove(&key)
    }

    /// Key whose canonical collection is `collection`
    pub fn key_of(&self, collection: Entity) -> Option<ContentKey> {
        self.entries
            .iter()
            .find(|(_, e)| **e == collection)
            .map(|(k, _)| *k)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContentKey, Entity)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

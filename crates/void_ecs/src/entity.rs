//! Entity - Unique identifiers for scene objects
//!
//! Entities are lightweight identifiers with generational indices
//! to detect use-after-free. An entity can also be *retired*: it stops being
//! live but its ID stays reserved so a stashed subgraph can later be revived
//! under the exact same IDs.

use core::fmt;
use core::hash::{Hash, Hasher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Entity identifier with generation for ABA protection
#[derive(Clone, Copy, PartialOrd, Ord)]
pub struct Entity {
    /// Index into entity storage
    index: u32,
    /// Generation to detect stale references
    generation: u32,
}

impl Entity {
    /// Create a new entity
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Create an invalid/null entity
    #[inline]
    pub const fn null() -> Self {
        Self {
            index: u32::MAX,
            generation: u32::MAX,
        }
    }

    /// Get the entity index
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Get the generation
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    /// Check if this is a null entity
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.index == u32::MAX
    }

    /// Convert to u64 for efficient storage
    #[inline]
    pub const fn to_bits(&self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }

    /// Create from u64
    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl PartialEq for Entity {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({}v{})", self.index, self.generation)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "{}v{}", self.index, self.generation)
        }
    }
}

// Entities travel as their u64 bit pattern
impl Serialize for Entity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = u64::deserialize(deserializer)?;
        Ok(Entity::from_bits(bits))
    }
}

/// Lifecycle of one allocator slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Alive,
    /// Not live, ID held back for [`EntityAllocator::revive`]
    Retired,
    Free,
}

/// Entity allocator with free list and retirement
pub struct EntityAllocator {
    /// Current generations for each index
    generations: Vec<u32>,
    /// State of each index
    states: Vec<SlotState>,
    /// Free indices
    free_list: Vec<u32>,
    /// Number of alive entities
    alive_count: usize,
}

impl EntityAllocator {
    /// Create a new entity allocator
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            states: Vec::new(),
            free_list: Vec::new(),
            alive_count: 0,
        }
    }

    /// Allocate a new entity
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(index) = self.free_list.pop() {
            self.states[index as usize] = SlotState::Alive;
            Entity::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.states.push(SlotState::Alive);
            Entity::new(index, 0)
        }
    }

    /// Deallocate a live or retired entity; its index becomes reusable
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        let was_alive = self.is_alive(entity);
        if !was_alive && !self.is_retired(entity) {
            return false;
        }

        let slot = entity.index as usize;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.states[slot] = SlotState::Free;
        self.free_list.push(entity.index);
        if was_alive {
            self.alive_count -= 1;
        }
        true
    }

    /// Take a live entity out of circulation without freeing its ID
    pub fn retire(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        self.states[entity.index as usize] = SlotState::Retired;
        self.alive_count -= 1;
        true
    }

    /// Make a retired entity live again under the same ID
    pub fn revive(&mut self, entity: Entity) -> bool {
        if !self.is_retired(entity) {
            return false;
        }
        self.states[entity.index as usize] = SlotState::Alive;
        self.alive_count += 1;
        true
    }

    /// Check if an entity is alive
    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slot_state(entity) == Some(SlotState::Alive)
    }

    /// Check if an entity is retired
    #[inline]
    pub fn is_retired(&self, entity: Entity) -> bool {
        self.slot_state(entity) == Some(SlotState::Retired)
    }

    fn slot_state(&self, entity: Entity) -> Option<SlotState> {
        if entity.is_null() {
            return None;
        }
        let slot = entity.index as usize;
        match self.generations.get(slot) {
            Some(&gen) if gen == entity.generation => self.states.get(slot).copied(),
            _ => None,
        }
    }

    /// Iterate alive entities in index order
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| **state == SlotState::Alive)
            .map(|(index, _)| Entity::new(index as u32, self.generations[index]))
    }

    /// Get the number of alive entities
    #[inline]
    pub fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Get total capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.generations.len()
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_null() {
        let e = Entity::null();
        assert!(e.is_null());
        assert_eq!(Entity::default(), e);
    }

    #[test]
    fn test_entity_bits() {
        let e = Entity::new(123, 456);
        let bits = e.to_bits();
        let restored = Entity::from_bits(bits);
        assert_eq!(e, restored);
    }

    #[test]
    fn test_entity_serde() {
        let e = Entity::new(7, 3);
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }

    #[test]
    fn test_allocator() {
        let mut alloc = EntityAllocator::new();

        let e1 = alloc.allocate();
        let e2 = alloc.allocate();

        assert!(alloc.is_alive(e1));
        assert!(alloc.is_alive(e2));
        assert_eq!(alloc.alive_count(), 2);

        alloc.deallocate(e1);
        assert!(!alloc.is_alive(e1));
        assert_eq!(alloc.alive_count(), 1);

        // Reallocate - should reuse index with new generation
        let e3 = alloc.allocate();
        assert_eq!(e3.index(), e1.index());
        assert_ne!(e3.generation(), e1.generation());
    }

    #[test]
    fn test_retired_ids_are_not_reused() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();

        assert!(alloc.retire(e1));
        assert!(!alloc.is_alive(e1));
        assert!(alloc.is_retired(e1));

        let e2 = alloc.allocate();
        assert_ne!(e2.index(), e1.index());

        assert!(alloc.revive(e1));
        assert!(alloc.is_alive(e1));
        assert_eq!(alloc.alive_count(), 2);
    }

    #[test]
    fn test_revive_requires_retirement() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        assert!(!alloc.revive(e1));

        alloc.deallocate(e1);
        assert!(!alloc.revive(e1));
    }

    #[test]
    fn test_iter_alive_skips_retired() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        let c = alloc.allocate();
        alloc.retire(b);

        let alive: Vec<Entity> = alloc.iter_alive().collect();
        assert_eq!(alive, vec![a, c]);
    }
}

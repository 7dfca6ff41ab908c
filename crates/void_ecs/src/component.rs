//! Component storage
//!
//! Dense per-kind storage: components live in one vector, the owning
//! entities in a parallel vector, plus a lookup table from entity to slot.
//! Removal preserves insertion order so enumeration is stable.

use std::collections::HashMap;

use crate::Entity;

/// Components that hold references to other entities
///
/// Cloning and restoring subgraphs rewrite those references through a
/// remap table, so every component kind that points at an entity must
/// expose its references here.
pub trait MapEntities {
    /// Rewrite every entity reference held by this component
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity);
}

/// Dense storage for one component kind
#[derive(Clone, Debug)]
pub struct ComponentStorage<T> {
    components: Vec<T>,
    entities: Vec<Entity>,
    lookup: HashMap<Entity, usize>,
}

impl<T> ComponentStorage<T> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
            entities: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    /// Insert or replace the component for `entity`, returning the old one
    pub fn insert(&mut self, entity: Entity, component: T) -> Option<T> {
        if let Some(&slot) = self.lookup.get(&entity) {
            return Some(std::mem::replace(&mut self.components[slot], component));
        }
        self.lookup.insert(entity, self.components.len());
        self.components.push(component);
        self.entities.push(entity);
        None
    }

    /// Remove the component for `entity`
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.lookup.remove(&entity)?;
        self.entities.remove(slot);
        let component = self.components.remove(slot);
        for moved in &self.entities[slot..] {
            if let Some(index) = self.lookup.get_mut(moved) {
                *index -= 1;
            }
        }
        Some(component)
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.lookup.get(&entity).map(|&slot| &self.components[slot])
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        match self.lookup.get(&entity) {
            Some(&slot) => Some(&mut self.components[slot]),
            None => None,
        }
    }

    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.lookup.contains_key(&entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Entity owning the component at `index`
    #[inline]
    pub fn entity_at(&self, index: usize) -> Option<Entity> {
        self.entities.get(index).copied()
    }

    #[inline]
    pub fn get_at(&self, index: usize) -> Option<&T> {
        self.components.get(index)
    }

    #[inline]
    pub fn get_at_mut(&mut self, index: usize) -> Option<&mut T> {
        self.components.get_mut(index)
    }

    /// Owning entities, parallel to the component order
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.entities.iter().copied().zip(self.components.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.entities.iter().copied().zip(self.components.iter_mut())
    }

    pub fn clear(&mut self) {
        self.components.clear();
        self.entities.clear();
        self.lookup.clear();
    }
}

impl<T> Default for ComponentStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_replace() {
        let mut storage = ComponentStorage::new();
        let e = Entity::new(0, 0);

        assert!(storage.insert(e, 1u32).is_none());
        assert_eq!(storage.get(e), Some(&1));
        assert_eq!(storage.insert(e, 2), Some(1));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_remove_keeps_order_and_lookup() {
        let mut storage = ComponentStorage::new();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        let c = Entity::new(2, 0);
        storage.insert(a, "a");
        storage.insert(b, "b");
        storage.insert(c, "c");

        assert_eq!(storage.remove(a), Some("a"));
        assert_eq!(storage.entities(), &[b, c]);
        assert_eq!(storage.get(c), Some(&"c"));
        assert_eq!(storage.entity_at(0), Some(b));
        assert!(storage.remove(a).is_none());
    }

    #[test]
    fn test_iter_mut() {
        let mut storage = ComponentStorage::new();
        storage.insert(Entity::new(0, 0), 1.0f32);
        storage.insert(Entity::new(1, 0), 2.0f32);
        for (_, value) in storage.iter_mut() {
            *value *= 10.0;
        }
        let values: Vec<f32> = storage.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10.0, 20.0]);
    }
}

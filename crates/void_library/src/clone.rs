//! Clone engine
//!
//! Cloning serializes a subgraph (or reuses a stash blob) and writes it back
//! under fresh IDs. The caller-supplied [`EntityRemap`] receives every
//! source-to-clone translation; entries already present in it redirect
//! external references, which is how clones get re-parented.

use std::collections::HashSet;

use log::debug;
use void_ecs::{DeserializeMode, Entity, EntityRemap};

use crate::error::Result;
use crate::instance::InstanceKind;
use crate::scene::Scene;
use crate::stash::SUBGRAPH_FLAGS;

impl Scene {
    /// Clone `entity` and its descendants, live or stashed.
    ///
    /// Returns the new root, or `None` when `entity` is neither live nor stashed.
    pub fn clone_entity(&mut self, entity: Entity, remap: &mut EntityRemap) -> Result<Option<Entity>> {
        let blob = if let Some(handle) = self.disabled_index.get(&entity).copied() {
            match self.disabled.get(handle) {
                Some(record) => record.blob()?,
                None => return Ok(None),
            }
        } else if self.world.is_alive(entity) {
            self.world.serialize_subgraph(entity, SUBGRAPH_FLAGS)?
        } else {
            debug!("Clone of {} skipped: neither live nor stashed", entity);
            return Ok(None);
        };

        let root = self
            .world
            .deserialize_subgraph(&blob, remap, DeserializeMode::Fresh)?;
        debug!("Cloned {} as {} ({} entities)", entity, root, blob.len());
        Ok(Some(root))
    }

    /// Clone everything `source` owns under `target`.
    ///
    /// Live children of `source` that belong to its entity list are cloned
    /// first. A library source also has its stashed members cloned. The
    /// returned remap covers every cloned entity.
    pub(crate) fn clone_owned(&mut self, source: Entity, target: Entity) -> Result<EntityRemap> {
        let (members, kind) = match self.instances.get(source) {
            Some(instance) => (instance.entities.clone(), instance.kind),
            None => (Vec::new(), InstanceKind::Default),
        };
        let owned: HashSet<Entity> = members.iter().copied().collect();

        let mut remap = EntityRemap::new();
        remap.insert(source, target);

        for child in self.world.children_of(source) {
            if owned.contains(&child) {
                self.clone_entity(child, &mut remap)?;
            }
        }
        if kind == InstanceKind::Library {
            for member in members {
                if self.is_stashed(member) {
                    self.clone_entity(member, &mut remap)?;
                }
            }
        }

        // references between separately cloned members
        let cloned: Vec<Entity> = remap.image().filter(|e| *e != target).collect();
        for entity in cloned {
            self.world.map_references(entity, &mut |r| remap.map(r));
        }

        remap.remove(source);
        Ok(remap)
    }

    /// Clone the content of the instance on `source` under `target`.
    ///
    /// The returned remap's domain is exactly the source instance's entities
    /// that were cloned.
    pub fn clone_instance(&mut self, source: Entity, target: Entity) -> Result<EntityRemap> {
        let members: HashSet<Entity> = self.require_instance(source)?.entities.iter().copied().collect();
        let mut remap = self.clone_owned(source, target)?;
        remap.retain(|e| members.contains(&e));
        Ok(remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use void_ecs::Renderable;

    #[test]
    fn test_clone_live_subgraph() {
        let mut scene = Scene::default();
        let room = scene.world.spawn_named("room");
        let lamp = scene.world.spawn_named("lamp");
        let bulb = scene.world.spawn_named("bulb");
        scene.world.attach(lamp, room).unwrap();
        scene.world.attach(bulb, lamp).unwrap();
        scene.world.add_component(bulb, Renderable::new(lamp));

        let mut remap = EntityRemap::new();
        let root = scene.clone_entity(lamp, &mut remap).unwrap().unwrap();
        let new_bulb = remap.get(bulb).unwrap();

        assert_eq!(remap.get(lamp), Some(root));
        assert_eq!(remap.len(), 2);
        assert_eq!(scene.world.parent_of(root), Some(room));
        assert_eq!(scene.world.parent_of(new_bulb), Some(root));
        assert_eq!(scene.world.get_component::<Renderable>(new_bulb).unwrap().mesh, root);
        assert_eq!(scene.world.name(new_bulb), Some("bulb"));
    }

    #[test]
    fn test_clone_stashed_subgraph() {
        let mut scene = Scene::default();
        let lamp = scene.world.spawn_named("lamp");
        let bulb = scene.world.spawn_named("bulb");
        scene.world.attach(bulb, lamp).unwrap();
        scene.disable(lamp).unwrap();

        let mut remap = EntityRemap::new();
        let root = scene.clone_entity(lamp, &mut remap).unwrap().unwrap();

        assert!(scene.world.is_alive(root));
        assert_ne!(root, lamp);
        assert_eq!(scene.world.name(root), Some("lamp"));
        assert_eq!(scene.world.parent_of(remap.get(bulb).unwrap()), Some(root));
        // stash untouched
        assert!(scene.is_stashed(lamp));
        assert!(scene.enable(lamp).unwrap());
        assert!(scene.world.is_alive(bulb));
    }

    #[test]
    fn test_clone_missing_entity() {
        let mut scene = Scene::default();
        let gone = scene.world.spawn();
        scene.world.despawn(gone);

        let mut remap = EntityRemap::new();
        assert!(scene.clone_entity(gone, &mut remap).unwrap().is_none());
        assert!(remap.is_empty());
    }
}

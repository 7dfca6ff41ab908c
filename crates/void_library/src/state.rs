//! Persisted library state
//!
//! Each library component is written in its persisted form (see the
//! component types), keyed by its owning entity:
//!
//! | Component      | Persisted fields            |
//! |----------------|-----------------------------|
//! | `Instance`     | `file`, `entity_name`       |
//! | `Disabled`     | wrapped entity              |
//! | `Stream`       | `substitute`, `zone`        |
//! | `ScriptObject` | each script's `file`, `properties` |
//!
//! Entity references are translated through an [`EntityRemap`] when the
//! state is applied, so it can follow a world that was itself remapped.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use void_ecs::{Entity, EntityRemap, MapEntities};

use crate::error::{LibraryError, Result};
use crate::instance::Instance;
use crate::scene::Scene;
use crate::script::ScriptObject;
use crate::stash::Disabled;
use crate::streaming::Stream;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LibraryState {
    pub instances: Vec<(Entity, Instance)>,
    pub disabled: Vec<(Entity, Disabled)>,
    pub streams: Vec<(Entity, Stream)>,
    pub scripts: Vec<(Entity, ScriptObject)>,
}

impl LibraryState {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| LibraryError::State(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| LibraryError::State(e.to_string()))
    }
}

impl Scene {
    /// Snapshot the persisted form of every library component
    pub fn to_state(&self) -> LibraryState {
        LibraryState {
            instances: self
                .instances
                .iter()
                .map(|(e, c)| (e, Instance::new(c.file.clone()).with_entity_name(c.entity_name.clone())))
                .collect(),
            disabled: self.disabled.iter().map(|(e, c)| (e, Disabled::new(c.entity))).collect(),
            streams: self
                .streams
                .iter()
                .map(|(e, c)| (e, Stream { substitute: c.substitute, ..Stream::new(c.zone) }))
                .collect(),
            scripts: self
                .scripts
                .iter()
                .map(|(e, c)| (e, ScriptObject { scripts: c.scripts.clone(), ..ScriptObject::default() }))
                .collect(),
        }
    }

    /// Attach the components of `state` to the live entities `remap` maps
    /// their owners to. Owners that are not live are skipped.
    ///
    /// Instances come back unresolved. Stash records carry no blob, so they
    /// are not added to the stash index.
    pub fn apply_state(&mut self, state: &LibraryState, remap: &EntityRemap) -> usize {
        let mut applied = 0;
        let mut mapper = |e: Entity| remap.map(e);

        for (owner, instance) in &state.instances {
            let owner = remap.map(*owner);
            if self.world.is_alive(owner) {
                let instance = Instance::new(instance.file.clone()).with_entity_name(instance.entity_name.clone());
                self.instances.insert(owner, instance);
                applied += 1;
            } else {
                warn!("Instance owner {} is not live; skipped", owner);
            }
        }
        for (owner, disabled) in &state.disabled {
            let owner = remap.map(*owner);
            if self.world.is_alive(owner) {
                let mut disabled = disabled.clone();
                disabled.map_entities(&mut mapper);
                self.disabled.insert(owner, disabled);
                applied += 1;
            } else {
                warn!("Disabled owner {} is not live; skipped", owner);
            }
        }
        for (owner, stream) in &state.streams {
            let owner = remap.map(*owner);
            if self.world.is_alive(owner) {
                let mut stream = stream.clone();
                stream.map_entities(&mut mapper);
                self.streams.insert(owner, stream);
                applied += 1;
            } else {
                warn!("Stream owner {} is not live; skipped", owner);
            }
        }
        for (owner, object) in &state.scripts {
            let owner = remap.map(*owner);
            if self.world.is_alive(owner) {
                if let Some(mut previous) = self.scripts.insert(owner, object.clone()) {
                    previous.unload(owner, self.script_host.as_ref());
                }
                applied += 1;
            } else {
                warn!("Script owner {} is not live; skipped", owner);
            }
        }

        debug!("Applied {} library components", applied);
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptDescriptor;
    use void_math::{Vec3, AABB};

    #[test]
    fn test_round_trip_through_bytes() {
        let mut scene = Scene::default();
        let house = scene.create_instance("house");
        scene.instance_mut(house).unwrap().file = "house.toml".into();
        scene.instance_mut(house).unwrap().entity_name = "door".into();
        let zone = AABB::new(Vec3::ZERO, Vec3::splat(4.0));
        scene.set_streamable(house, true, zone);
        scene.set_script(house, true, "house.lua");

        let bytes = scene.to_state().to_bytes().unwrap();
        let state = LibraryState::from_bytes(&bytes).unwrap();

        let mut other = Scene::default();
        let target = other.world_mut().spawn_named("house");
        let mut remap = EntityRemap::new();
        remap.insert(house, target);

        assert_eq!(other.apply_state(&state, &remap), 3);
        let instance = other.instance(target).unwrap();
        assert_eq!(instance.file, "house.toml");
        assert_eq!(instance.entity_name, "door");
        assert!(!instance.is_resolved());
        assert_eq!(other.stream(target).unwrap().zone, zone);
        assert_eq!(
            other.script_object(target).unwrap().scripts,
            vec![ScriptDescriptor::new("house.lua")]
        );
    }

    #[test]
    fn test_apply_skips_dead_owners() {
        let mut scene = Scene::default();
        let house = scene.create_instance("house");
        let state = scene.to_state();

        let mut other = Scene::default();
        assert_eq!(other.apply_state(&state, &EntityRemap::new()), 0);
        assert!(other.instance(house).is_none());
    }

    #[test]
    fn test_disabled_persists_wrapped_entity() {
        let mut scene = Scene::default();
        let crate_entity = scene.world_mut().spawn_named("crate");
        let handle = scene.disable(crate_entity).unwrap().unwrap();

        let state = scene.to_state();
        assert_eq!(state.disabled.len(), 1);
        assert_eq!(state.disabled[0].0, handle);
        assert_eq!(state.disabled[0].1.entity, crate_entity);
        assert!(state.disabled[0].1.data().is_empty());
    }
}

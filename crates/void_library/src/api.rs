//! Scripting-facing API
//!
//! Designer scripts reach the library through [`LibraryApi`]. Components are
//! only ever lent out for the duration of a closure; nothing returned by the
//! API borrows from the scene, so a script cannot hold a reference across
//! frames. Entities are plain generational IDs and stay safe to keep.
//!
//! The `with_*` accessors run their closure under the scene lock, so a
//! closure calling back into the API deadlocks.

use void_ecs::{Entity, Mesh};
use void_math::AABB;

use crate::error::{LibraryError, Result};
use crate::handle::SceneHandle;
use crate::instance::Instance;
use crate::script::ScriptObject;
use crate::stash::Disabled;
use crate::streaming::Stream;

#[derive(Clone)]
pub struct LibraryApi {
    handle: SceneHandle,
}

impl LibraryApi {
    pub fn new(handle: SceneHandle) -> Self {
        Self { handle }
    }

    pub fn handle(&self) -> &SceneHandle {
        &self.handle
    }

    // ========== Scoped component access ==========
    //
    // The scene lock is held while the closure runs and is not reentrant.
    // Closures must not call back into `LibraryApi` or the `SceneHandle`;
    // carry values out through the return value and act after it returns.

    pub fn with_instance<R>(&self, entity: Entity, f: impl FnOnce(&mut Instance) -> R) -> Option<R> {
        self.handle.lock().instances.get_mut(entity).map(f)
    }

    pub fn with_stream<R>(&self, entity: Entity, f: impl FnOnce(&mut Stream) -> R) -> Option<R> {
        self.handle.lock().streams.get_mut(entity).map(f)
    }

    /// Access the stash record held by handle entity `handle`
    pub fn with_disabled<R>(&self, handle: Entity, f: impl FnOnce(&mut Disabled) -> R) -> Option<R> {
        self.handle.lock().disabled.get_mut(handle).map(f)
    }

    pub fn with_script_object<R>(&self, entity: Entity, f: impl FnOnce(&mut ScriptObject) -> R) -> Option<R> {
        self.handle.lock().scripts.get_mut(entity).map(f)
    }

    // ========== Attributes ==========

    /// Set an instance's load strategy from its raw binding value
    pub fn set_instance_strategy(&self, entity: Entity, raw: u32) -> Result<()> {
        self.with_instance(entity, |i| i.set_strategy_raw(raw))
            .ok_or(LibraryError::NoInstance(entity))?
    }

    /// Set an instance's kind from its raw binding value
    pub fn set_instance_kind(&self, entity: Entity, raw: u32) -> Result<()> {
        self.with_instance(entity, |i| i.set_kind_raw(raw))
            .ok_or(LibraryError::NoInstance(entity))?
    }

    pub fn set_instance_file(&self, entity: Entity, file: &str) -> Result<()> {
        self.with_instance(entity, |i| i.file = file.to_string())
            .ok_or(LibraryError::NoInstance(entity))
    }

    pub fn set_instance_entity_name(&self, entity: Entity, name: &str) -> Result<()> {
        self.with_instance(entity, |i| i.entity_name = name.to_string())
            .ok_or(LibraryError::NoInstance(entity))
    }

    // ========== Enumeration ==========

    pub fn instance_entities(&self) -> Vec<Entity> {
        self.handle.lock().instance_entities()
    }

    pub fn disabled_entities(&self) -> Vec<Entity> {
        self.handle.lock().disabled_entities()
    }

    pub fn stream_entities(&self) -> Vec<Entity> {
        self.handle.lock().stream_entities()
    }

    pub fn script_entities(&self) -> Vec<Entity> {
        self.handle.lock().script_entities()
    }

    pub fn mesh_entities(&self) -> Vec<Entity> {
        self.handle.lock().world().storage::<Mesh>().entities().to_vec()
    }

    // ========== Entity requests ==========

    pub fn create_entity(&self) -> Entity {
        self.handle.lock().world_mut().spawn()
    }

    pub fn create_instance(&self, name: &str) -> Entity {
        self.handle.lock().create_instance(name)
    }

    /// Attach an empty instance component to an existing entity
    pub fn create_instance_component(&self, entity: Entity) -> Result<()> {
        self.handle.lock().attach_instance(entity)
    }

    pub fn set_streamable(&self, entity: Entity, set: bool, zone: AABB) {
        self.handle.lock().set_streamable(entity, set, zone);
    }

    pub fn set_script(&self, entity: Entity, set: bool, file: &str) {
        self.handle.lock().set_script(entity, set, file);
    }

    pub fn disable(&self, entity: Entity) -> Result<Option<Entity>> {
        self.handle.lock().disable(entity)
    }

    pub fn enable(&self, entity: Entity) -> Result<bool> {
        self.handle.lock().enable(entity)
    }

    /// One-off load of a whole file outside the instancing system
    pub fn load_scene(&self, file: &str) -> Result<Entity> {
        self.handle.lock().load_scene(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{InstanceKind, LoadStrategy};
    use crate::scene::Scene;

    fn api() -> LibraryApi {
        LibraryApi::new(SceneHandle::new(Scene::default()))
    }

    #[test]
    fn test_scoped_instance_access() {
        let api = api();
        let entity = api.create_instance("prop");

        api.set_instance_file(entity, "prop.toml").unwrap();
        api.set_instance_entity_name(entity, "lid").unwrap();
        api.set_instance_strategy(entity, 2).unwrap();
        api.set_instance_kind(entity, 1).unwrap();

        let (file, name, strategy, kind) = api
            .with_instance(entity, |i| (i.file.clone(), i.entity_name.clone(), i.strategy, i.kind))
            .unwrap();
        assert_eq!(file, "prop.toml");
        assert_eq!(name, "lid");
        assert_eq!(strategy, LoadStrategy::SpawnAndPreload);
        assert_eq!(kind, InstanceKind::Library);
        assert_eq!(api.instance_entities(), vec![entity]);
    }

    #[test]
    fn test_invalid_raw_values() {
        let api = api();
        let entity = api.create_instance("prop");

        assert!(matches!(
            api.set_instance_strategy(entity, 3),
            Err(LibraryError::InvalidArgument { attribute: "strategy", value: 3 })
        ));
        assert!(matches!(
            api.set_instance_kind(entity, 9),
            Err(LibraryError::InvalidArgument { attribute: "kind", value: 9 })
        ));

        let plain = api.create_entity();
        assert!(matches!(api.set_instance_kind(plain, 0), Err(LibraryError::NoInstance(_))));
        assert!(api.with_instance(plain, |_| ()).is_none());
    }

    #[test]
    fn test_values_carried_out_of_scoped_access() {
        let api = api();
        let entity = api.create_instance("prop");
        api.set_instance_file(entity, "prop.toml").unwrap();

        let file = api.with_instance(entity, |i| i.file.clone()).unwrap();
        let twin = api.create_instance("twin");
        api.set_instance_file(twin, &file).unwrap();

        assert_eq!(api.with_instance(twin, |i| i.file.clone()), Some(file));
    }

    #[test]
    fn test_streamable_toggle() {
        let api = api();
        let entity = api.create_instance("prop");

        api.set_streamable(entity, true, AABB::EMPTY);
        assert_eq!(api.stream_entities(), vec![entity]);
        assert_eq!(api.with_stream(entity, |s| s.transition()), Some(0.0));

        api.set_streamable(entity, false, AABB::EMPTY);
        assert!(api.stream_entities().is_empty());
    }

    #[test]
    fn test_disable_through_api() {
        let api = api();
        let entity = api.create_entity();

        let handle = api.disable(entity).unwrap().unwrap();
        assert_eq!(api.disabled_entities(), vec![handle]);
        assert_eq!(api.with_disabled(handle, |d| d.entity), Some(entity));
        assert!(api.enable(entity).unwrap());
        assert!(api.disabled_entities().is_empty());
    }

    #[test]
    fn test_script_through_api() {
        let api = api();
        let entity = api.create_entity();
        api.set_script(entity, true, "npc.lua");

        assert_eq!(api.script_entities(), vec![entity]);
        let files = api
            .with_script_object(entity, |o| o.scripts.iter().map(|s| s.file.clone()).collect::<Vec<_>>())
            .unwrap();
        assert_eq!(files, vec!["npc.lua"]);
    }
}

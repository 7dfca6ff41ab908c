//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use void_ecs::Entity;
use void_library::{
    InstanceKind, LibraryConfig, LoadStrategy, MemoryLoader, Scene, ScriptDescriptor, ScriptError, ScriptHost,
};

/// Two render entities and one logic marker
pub const HOUSE: &str = r#"
    [[entities]]
    name = "paint"
    [entities.material]
    base_color = [0.9, 0.9, 0.8, 1.0]

    [[entities]]
    name = "walls"
    [entities.mesh]
    path = "meshes/walls.obj"
    material = "paint"

    [[entities]]
    name = "door"
    parent = "walls"
    [entities.renderable]
    mesh = "walls"
    color = [1.0, 1.0, 1.0, 0.5]

    [[entities]]
    name = "spawn_point"
    [entities.transform]
    position = [0.0, 0.0, 2.0]
"#;

/// Two differently named roots
pub const PROPS: &str = r#"
    [[entities]]
    name = "barrel"
    [entities.mesh]
    path = "meshes/barrel.obj"

    [[entities]]
    name = "crate"
    [entities.mesh]
    path = "meshes/crate.obj"
"#;

/// One mesh entity and one logic marker
pub const MARKED: &str = r#"
    [[entities]]
    name = "statue"
    [entities.mesh]
    path = "meshes/statue.obj"

    [[entities]]
    name = "trigger"
"#;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn loader() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new()
            .with_source("house.toml", HOUSE)
            .with_source("props.toml", PROPS)
            .with_source("marked.toml", MARKED),
    )
}

pub fn scene(loader: &Arc<MemoryLoader>) -> Scene {
    init_logging();
    Scene::new(LibraryConfig::default(), loader.clone())
}

pub fn instance(scene: &mut Scene, name: &str, file: &str) -> Entity {
    let entity = scene.create_instance(name);
    scene.instance_mut(entity).unwrap().file = file.to_string();
    entity
}

pub fn configure(scene: &mut Scene, entity: Entity, strategy: LoadStrategy, kind: InstanceKind) {
    let instance = scene.instance_mut(entity).unwrap();
    instance.strategy = strategy;
    instance.kind = kind;
}

/// First entity of `entities` carrying `name`
pub fn named(scene: &Scene, entities: &[Entity], name: &str) -> Option<Entity> {
    entities.iter().copied().find(|&e| scene.world().name(e) == Some(name))
}

/// Script host recording every lifecycle call
#[derive(Default)]
pub struct RecordingHost {
    pub calls: Mutex<Vec<(String, Entity, String)>>,
}

impl RecordingHost {
    pub fn count(&self, kind: &str) -> usize {
        self.calls.lock().iter().filter(|(k, _, _)| k == kind).count()
    }
}

impl ScriptHost for RecordingHost {
    fn init_script(&self, entity: Entity, script: &ScriptDescriptor) -> Result<(), ScriptError> {
        self.calls.lock().push(("init".into(), entity, script.file.clone()));
        Ok(())
    }

    fn unload_script(&self, entity: Entity, script: &ScriptDescriptor) {
        self.calls.lock().push(("unload".into(), entity, script.file.clone()));
    }
}

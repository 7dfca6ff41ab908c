//! Collection loaders
//!
//! A loader turns a collection path into a scratch [`World`] whose root
//! entity parents every top-level entity of the file. The scene merges that
//! world into the live store on a cache miss.
//!
//! Collection files are TOML:
//!
//! ```toml
//! [[entities]]
//! name = "bark"
//! [entities.material]
//! base_color = [0.4, 0.3, 0.2, 1.0]
//!
//! [[entities]]
//! name = "trunk"
//! [entities.mesh]
//! path = "meshes/trunk.obj"
//! material = "bark"
//!
//! [[entities]]
//! name = "trunk_object"
//! parent = "trunk"
//! [entities.renderable]
//! mesh = "trunk"
//! color = [1.0, 1.0, 1.0, 0.8]
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use void_ecs::{Entity, LocalTransform, Material, Mesh, Renderable, World};

use crate::error::LoaderError;

/// Scratch world produced by a loader
pub struct LoadedCollection {
    pub world: World,
    /// Parent of every top-level entity in `world`
    pub root: Entity,
}

/// Source of collection content
pub trait CollectionLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<LoadedCollection, LoaderError>;
}

// ============================================================================
// File format
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CollectionFile {
    #[serde(default)]
    pub entities: Vec<EntityDef>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: String,
    /// Name of another entity in the same file
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: Option<TransformDef>,
    #[serde(default)]
    pub mesh: Option<MeshDef>,
    #[serde(default)]
    pub material: Option<MaterialDef>,
    #[serde(default)]
    pub renderable: Option<RenderableDef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransformDef {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MeshDef {
    pub path: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub vertex_count: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialDef {
    #[serde(default = "default_color")]
    pub base_color: [f32; 4],
    #[serde(default)]
    pub texture: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderableDef {
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default = "default_color")]
    pub color: [f32; 4],
}

fn default_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

/// Parse a collection file
pub fn parse_collection(path: &str, content: &str) -> Result<CollectionFile, LoaderError> {
    toml::from_str(content).map_err(|source| LoaderError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Build the scratch world for a parsed collection
pub fn build_collection(path: &str, file: &CollectionFile) -> Result<LoadedCollection, LoaderError> {
    let mut world = World::new();
    let root = world.spawn_named(path);

    let mut by_name: HashMap<&str, Entity> = HashMap::new();
    let spawned: Vec<Entity> = file
        .entities
        .iter()
        .map(|def| {
            let entity = world.spawn_named(def.name.as_str());
            by_name.entry(def.name.as_str()).or_insert(entity);
            entity
        })
        .collect();

    let lookup = |owner: &EntityDef, reference: &str| {
        by_name
            .get(reference)
            .copied()
            .ok_or_else(|| LoaderError::UnknownReference {
                path: path.to_string(),
                entity: owner.name.clone(),
                reference: reference.to_string(),
            })
    };

    for (def, &entity) in file.entities.iter().zip(&spawned) {
        let parent = match &def.parent {
            Some(name) => lookup(def, name)?,
            None => root,
        };
        world.attach(entity, parent).map_err(|source| LoaderError::Store {
            path: path.to_string(),
            source,
        })?;

        if let Some(transform) = &def.transform {
            world.add_component(
                entity,
                LocalTransform::from_translation(transform.position).with_scale(transform.scale),
            );
        }
        if let Some(mesh) = &def.mesh {
            let material = match &mesh.material {
                Some(name) => lookup(def, name)?,
                None => Entity::null(),
            };
            let mut component = Mesh::new(mesh.path.as_str()).with_material(material);
            component.vertex_count = mesh.vertex_count;
            world.add_component(entity, component);
        }
        if let Some(material) = &def.material {
            world.add_component(
                entity,
                Material {
                    base_color: material.base_color,
                    texture: material.texture.clone(),
                },
            );
        }
        if let Some(renderable) = &def.renderable {
            let mesh = match &renderable.mesh {
                Some(name) => lookup(def, name)?,
                None => Entity::null(),
            };
            world.add_component(entity, Renderable::new(mesh).with_color(renderable.color));
        }
    }

    Ok(LoadedCollection { world, root })
}

// ============================================================================
// Loaders
// ============================================================================

/// Reads collection files relative to a root directory
pub struct SceneFileLoader {
    root: PathBuf,
}

impl SceneFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }
}

impl CollectionLoader for SceneFileLoader {
    fn load(&self, path: &str) -> Result<LoadedCollection, LoaderError> {
        let full = self.root.join(path);
        let content = std::fs::read_to_string(&full).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoaderError::NotFound(path.to_string())
            } else {
                LoaderError::Io { path: full.clone(), source }
            }
        })?;
        debug!("Read collection file {}", full.display());
        build_collection(path, &parse_collection(path, &content)?)
    }
}

/// In-memory collection sources, counting every load
#[derive(Default)]
pub struct MemoryLoader {
    sources: RwLock<HashMap<String, String>>,
    loads: RwLock<HashMap<String, usize>>,
    total_loads: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every load
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_source(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.sources.write().insert(path.into(), content.into());
    }

    /// Loads attempted for `path`, failed ones included
    pub fn loads_of(&self, path: &str) -> usize {
        self.loads.read().get(path).copied().unwrap_or(0)
    }

    pub fn total_loads(&self) -> usize {
        self.total_loads.load(Ordering::SeqCst)
    }
}

impl CollectionLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<LoadedCollection, LoaderError> {
        self.total_loads.fetch_add(1, Ordering::SeqCst);
        *self.loads.write().entry(path.to_string()).or_insert(0) += 1;

        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }

        let content = self
            .sources
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LoaderError::NotFound(path.to_string()))?;
        build_collection(path, &parse_collection(path, &content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE: &str = r#"
        [[entities]]
        name = "bark"
        [entities.material]
        base_color = [0.4, 0.3, 0.2, 1.0]

        [[entities]]
        name = "trunk"
        [entities.mesh]
        path = "meshes/trunk.obj"
        material = "bark"
        vertex_count = 24

        [[entities]]
        name = "trunk_object"
        parent = "trunk"
        [entities.transform]
        position = [0.0, 1.0, 0.0]
        [entities.renderable]
        mesh = "trunk"
        color = [1.0, 1.0, 1.0, 0.8]
    "#;

    #[test]
    fn test_build_collection() {
        let loaded = build_collection("tree.toml", &parse_collection("tree.toml", TREE).unwrap()).unwrap();
        let world = &loaded.world;

        assert_eq!(world.entity_count(), 4);
        assert_eq!(world.name(loaded.root), Some("tree.toml"));

        let bark = world.find_by_name("bark").unwrap();
        let trunk = world.find_by_name("trunk").unwrap();
        let object = world.find_by_name("trunk_object").unwrap();

        assert_eq!(world.children_of(loaded.root), vec![bark, trunk]);
        assert_eq!(world.parent_of(object), Some(trunk));
        assert_eq!(world.get_component::<Mesh>(trunk).unwrap().material, bark);
        assert_eq!(world.get_component::<Mesh>(trunk).unwrap().vertex_count, 24);
        assert_eq!(world.get_component::<Renderable>(object).unwrap().mesh, trunk);
        assert_eq!(world.opacity(object), Some(0.8));
        assert_eq!(world.get_component::<LocalTransform>(object).unwrap().translation, [0.0, 1.0, 0.0]);
        assert!(world.has_component::<Material>(bark));
    }

    #[test]
    fn test_unknown_reference() {
        let content = r#"
            [[entities]]
            name = "orphan"
            parent = "nobody"
        "#;
        let err = build_collection("x.toml", &parse_collection("x.toml", content).unwrap())
            .err()
            .unwrap();
        assert!(matches!(err, LoaderError::UnknownReference { ref reference, .. } if reference == "nobody"));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            parse_collection("bad.toml", "[[entities]\nname ="),
            Err(LoaderError::Parse { .. })
        ));
    }

    #[test]
    fn test_memory_loader_counts() {
        let loader = MemoryLoader::new().with_source("tree.toml", TREE);
        assert!(loader.load("tree.toml").is_ok());
        assert!(matches!(loader.load("missing.toml"), Err(LoaderError::NotFound(_))));
        assert_eq!(loader.loads_of("tree.toml"), 1);
        assert_eq!(loader.loads_of("missing.toml"), 1);
        assert_eq!(loader.total_loads(), 2);
    }

    #[test]
    fn test_file_loader_missing() {
        let loader = SceneFileLoader::new(std::env::temp_dir());
        assert!(matches!(
            loader.load("void_library_no_such_collection.toml"),
            Err(LoaderError::NotFound(_))
        ));
    }
}

//! Scene
//!
//! The [`Scene`] owns the live entity store together with the library
//! components (instances, stream records, script objects, stash records),
//! the collection cache and the stash side index. Operations on it are
//! spread over the modules that implement them:
//!
//! - [`crate::resolve`] - instance resolution and unload
//! - [`crate::stash`] - disable / enable
//! - [`crate::clone`] - subgraph cloning
//! - [`crate::streaming`] - per-frame zone streaming
//! - [`crate::script`] - script objects

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};
use void_ecs::{ComponentStorage, Entity, World};
use void_math::AABB;

use crate::collection::CollectionCache;
use crate::config::LibraryConfig;
use crate::error::{LibraryError, Result};
use crate::instance::Instance;
use crate::loader::{CollectionLoader, MemoryLoader, SceneFileLoader};
use crate::script::{LoggingScriptHost, ScriptHost, ScriptObject};
use crate::stash::Disabled;
use crate::streaming::{Stream, StreamPhase};

/// Counters describing the library state of a scene
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LibraryStats {
    pub instances: usize,
    pub resolved_instances: usize,
    pub collections: usize,
    pub disabled: usize,
    pub streams: usize,
    pub resident_streams: usize,
    pub fading_streams: usize,
    pub scripts_initialized: usize,
}

pub struct Scene {
    pub(crate) world: World,
    pub(crate) instances: ComponentStorage<Instance>,
    pub(crate) streams: ComponentStorage<Stream>,
    pub(crate) scripts: ComponentStorage<ScriptObject>,
    /// Stash records, keyed by handle entity
    pub(crate) disabled: ComponentStorage<Disabled>,
    /// Original entity to stash handle
    pub(crate) disabled_index: HashMap<Entity, Entity>,
    pub(crate) collections: CollectionCache,
    pub(crate) loader: Arc<dyn CollectionLoader>,
    pub(crate) script_host: Arc<dyn ScriptHost>,
    pub(crate) config: LibraryConfig,
    pub(crate) stream_boundary: AABB,
}

impl Scene {
    pub fn new(config: LibraryConfig, loader: Arc<dyn CollectionLoader>) -> Self {
        let stream_boundary = config.initial_boundary.unwrap_or(AABB::EMPTY);
        Self {
            world: World::new(),
            instances: ComponentStorage::new(),
            streams: ComponentStorage::new(),
            scripts: ComponentStorage::new(),
            disabled: ComponentStorage::new(),
            disabled_index: HashMap::new(),
            collections: CollectionCache::new(),
            loader,
            script_host: Arc::new(LoggingScriptHost),
            config,
            stream_boundary,
        }
    }

    /// Scene reading collection files from `config.asset_root`
    pub fn with_file_loader(config: LibraryConfig) -> Self {
        let loader = Arc::new(SceneFileLoader::new(config.asset_root.clone()));
        Self::new(config, loader)
    }

    pub fn with_script_host(mut self, host: Arc<dyn ScriptHost>) -> Self {
        self.script_host = host;
        self
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[inline]
    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn loader(&self) -> Arc<dyn CollectionLoader> {
        Arc::clone(&self.loader)
    }

    pub fn collections(&self) -> &CollectionCache {
        &self.collections
    }

    // ========== Instances ==========

    /// Spawn a named entity carrying an empty [`Instance`]
    pub fn create_instance(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.world.spawn_named(name);
        self.instances.insert(entity, Instance::default());
        entity
    }

    /// Attach an empty [`Instance`] to an existing entity
    pub fn attach_instance(&mut self, entity: Entity) -> Result<()> {
        self.attach_instance_with(entity, Instance::default())
    }

    /// Attach `instance` to an existing entity, replacing any previous one
    pub fn attach_instance_with(&mut self, entity: Entity, instance: Instance) -> Result<()> {
        if !self.world.is_alive(entity) {
            return Err(void_ecs::EcsError::NotAlive(entity).into());
        }
        if let Some(previous) = self.instances.insert(entity, instance) {
            if previous.bound {
                warn!("Instance on {} replaced while bound to {}", entity, previous.file);
            }
        }
        Ok(())
    }

    pub fn instance(&self, entity: Entity) -> Option<&Instance> {
        self.instances.get(entity)
    }

    pub fn instance_mut(&mut self, entity: Entity) -> Option<&mut Instance> {
        self.instances.get_mut(entity)
    }

    pub fn remove_instance(&mut self, entity: Entity) -> Option<Instance> {
        self.instances.remove(entity)
    }

    pub fn instance_entities(&self) -> Vec<Entity> {
        self.instances.entities().to_vec()
    }

    pub fn stream_entities(&self) -> Vec<Entity> {
        self.streams.entities().to_vec()
    }

    pub fn script_entities(&self) -> Vec<Entity> {
        self.scripts.entities().to_vec()
    }

    /// Stash handle entities
    pub fn disabled_entities(&self) -> Vec<Entity> {
        self.disabled.entities().to_vec()
    }

    pub fn disabled(&self, handle: Entity) -> Option<&Disabled> {
        self.disabled.get(handle)
    }

    pub(crate) fn require_instance(&self, entity: Entity) -> Result<&Instance> {
        self.instances.get(entity).ok_or(LibraryError::NoInstance(entity))
    }

    // ========== Whole-file loads ==========

    /// Merge a whole collection file into the live store, outside the cache.
    ///
    /// Returns the entity parenting the loaded content.
    pub fn load_scene(&mut self, file: &str) -> Result<Entity> {
        let loaded = self.loader.load(file)?;
        let remap = self.world.merge(loaded.world);
        let root = remap.map(loaded.root);
        info!("Loaded scene {} ({} entities)", file, remap.len());
        Ok(root)
    }

    // ========== Stats ==========

    pub fn stats(&self) -> LibraryStats {
        let mut stats = LibraryStats {
            instances: self.instances.len(),
            collections: self.collections.len(),
            disabled: self.disabled_index.len(),
            streams: self.streams.len(),
            ..LibraryStats::default()
        };
        for (_, instance) in self.instances.iter() {
            if instance.is_resolved() {
                stats.resolved_instances += 1;
            }
        }
        for (_, stream) in self.streams.iter() {
            match stream.phase {
                StreamPhase::Resident => stats.resident_streams += 1,
                StreamPhase::FadingIn | StreamPhase::FadingOut => stats.fading_streams += 1,
                StreamPhase::Unloaded => {}
            }
        }
        for (_, object) in self.scripts.iter() {
            if object.initialized {
                stats.scripts_initialized += 1;
            }
        }
        stats
    }
}

impl Default for Scene {
    /// Scene with default config and an empty in-memory loader
    fn default() -> Self {
        Self::new(LibraryConfig::default(), Arc::new(MemoryLoader::new()))
    }
}

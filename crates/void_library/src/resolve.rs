//! Instance resolution
//!
//! Resolving an instance makes its collection resident (loading the file at
//! most once) and fills the instance with entities: either the collection
//! itself, for the instance that loaded it, or a clone of it.

use std::collections::HashSet;

use log::{debug, error, info, warn};
use void_ecs::{Entity, EntityRemap, Material, Mesh};

use crate::collection::ContentKey;
use crate::error::{LibraryError, Result};
use crate::instance::{Instance, InstanceKind, LoadStrategy};
use crate::loader::LoadedCollection;
use crate::scene::Scene;

impl Scene {
    /// Resolve the instance on `entity`; a no-op once resolved.
    ///
    /// A failed file load is returned to the caller and leaves the instance
    /// bound but unresolved, so streaming does not retry it every frame.
    pub fn resolve_instance(&mut self, entity: Entity) -> Result<()> {
        let instance = self
            .instances
            .get_mut(entity)
            .ok_or(LibraryError::NoInstance(entity))?;
        instance.bound = true;
        if instance.is_resolved() {
            debug!("Instance {} already resolved", entity);
            return Ok(());
        }

        let file = instance.file.clone();
        let strategy = instance.strategy;
        let key = ContentKey::from_path(&file);

        if !self.collections.contains(key) {
            match strategy {
                LoadStrategy::DirectLoad => {
                    let loaded = self.loader.load(&file).map_err(|e| {
                        error!("Failed to load collection {}: {}", file, e);
                        e
                    })?;
                    self.install_collection(entity, key, loaded)?;
                }
                LoadStrategy::SpawnAndPreload => self.preload(&file)?,
            }
        }

        let resolved = self.instances.get(entity).is_some_and(Instance::is_resolved);
        if !resolved {
            self.instantiate(entity, key)?;
        }
        self.capture_opacity(entity);
        Ok(())
    }

    /// Make `anchor` the canonical collection for `key` from a freshly
    /// loaded scratch world.
    ///
    /// When another load already installed `key`, the scratch world is
    /// dropped, `anchor` stays unresolved and `false` is returned.
    pub(crate) fn install_collection(
        &mut self,
        anchor: Entity,
        key: ContentKey,
        loaded: LoadedCollection,
    ) -> Result<bool> {
        if self.collections.contains(key) {
            debug!("Collection {} already installed, discarding duplicate load", key);
            return Ok(false);
        }
        let Some(kind) = self.instances.get(anchor).map(|i| i.kind) else {
            return Err(LibraryError::NoInstance(anchor));
        };

        let LoadedCollection { world: scratch, root } = loaded;
        let order: Vec<Entity> = scratch.iter_entities().filter(|e| *e != root).collect();
        let remap = self.world.merge(scratch);
        let root = remap.map(root);
        let introduced: Vec<Entity> = order.iter().filter_map(|e| remap.get(*e)).collect();

        for &e in &introduced {
            let parent = self.world.parent_of(e);
            if parent.is_none() || parent == Some(root) {
                self.world.attach(e, anchor)?;
            }
        }
        self.world.despawn_single(root);

        let members: HashSet<Entity> = introduced.iter().copied().collect();
        let entities: Vec<Entity> = self
            .world
            .descendants(anchor)
            .into_iter()
            .filter(|e| members.contains(e))
            .collect();

        self.collections.insert(key, anchor);
        let file = match self.instances.get_mut(anchor) {
            Some(instance) => {
                instance.collection_id = anchor;
                instance.entities = entities.clone();
                instance.file.clone()
            }
            None => String::new(),
        };
        info!("Loaded collection {} ({} entities) into {}", file, entities.len(), anchor);

        if kind == InstanceKind::Library {
            let mut stashed = 0;
            for &e in &entities {
                let render_data = self.world.has_component::<Mesh>(e) || self.world.has_component::<Material>(e);
                if !render_data && self.disable(e)?.is_some() {
                    stashed += 1;
                }
            }
            debug!("Library {} stashed {} entities", file, stashed);
        }
        Ok(true)
    }

    /// Load `file` into a synthesized library helper instance
    fn preload(&mut self, file: &str) -> Result<()> {
        let helper = self.create_instance(format!("{}{}", self.config.library_prefix, file));
        if let Some(instance) = self.instances.get_mut(helper) {
            *instance = Instance::new(file)
                .with_strategy(LoadStrategy::DirectLoad)
                .with_kind(InstanceKind::Library);
        }
        debug!("Preloading {} into helper {}", file, helper);

        if let Err(e) = self.resolve_instance(helper) {
            self.instances.remove(helper);
            self.world.despawn(helper);
            return Err(e);
        }
        Ok(())
    }

    /// Fill `anchor` from the cached collection for `key`
    fn instantiate(&mut self, anchor: Entity, key: ContentKey) -> Result<()> {
        let Some(collection) = self.collections.get(key) else {
            return Ok(());
        };
        let Some(source) = self.instances.get(collection).filter(|_| self.world.is_alive(collection)) else {
            warn!("Cached collection {} for key {} has no live instance", collection, key);
            return Ok(());
        };
        let members = source.entities.clone();
        let name = match self.instances.get(anchor) {
            Some(instance) => instance.entity_name.clone(),
            None => return Ok(()),
        };

        let entities = if name.is_empty() {
            let remap = self.clone_owned(collection, anchor)?;
            let entities: Vec<Entity> = members.iter().filter_map(|e| remap.get(*e)).collect();
            debug!("Cloned collection {} into {} ({} entities)", collection, anchor, entities.len());
            entities
        } else {
            let Some(found) = members
                .iter()
                .copied()
                .find(|&e| self.display_name(e) == Some(name.as_str()))
            else {
                warn!("No entity named '{}' in collection {}", name, collection);
                return Ok(());
            };

            let mut remap = EntityRemap::new();
            let Some(root) = self.clone_entity(found, &mut remap)? else {
                return Ok(());
            };
            self.world.attach(root, anchor)?;
            debug!("Cloned '{}' ({}) from collection {} into {}", name, found, collection, anchor);
            vec![root]
        };

        if let Some(instance) = self.instances.get_mut(anchor) {
            instance.collection_id = collection;
            instance.entities.clear();
            for e in entities {
                instance.push_entity(e);
            }
        }
        Ok(())
    }

    /// Record the authored opacity of every owned renderable on the stream record
    pub(crate) fn capture_opacity(&mut self, entity: Entity) {
        let Some(stream) = self.streams.get_mut(entity) else {
            return;
        };
        let Some(instance) = self.instances.get(entity) else {
            return;
        };
        for &e in &instance.entities {
            if let Some(opacity) = self.world.opacity(e) {
                stream.opacity_snapshot.insert(e, opacity);
            }
        }
    }

    /// Remove the entities the instance on `entity` owns directly and mark it
    /// unresolved and unbound.
    ///
    /// Entities re-parented away from the anchor survive. Unloading the
    /// canonical copy of a collection evicts it from the cache.
    pub fn unload_instance(&mut self, entity: Entity) {
        let Some(instance) = self.instances.get(entity) else {
            return;
        };
        let entities = instance.entities.clone();
        let canonical = instance.collection_id == entity;
        let file = instance.file.clone();

        let mut removed = 0;
        for &e in &entities {
            if self.world.parent_of(e) == Some(entity) {
                self.despawn_entity(e);
                removed += 1;
            }
        }

        if canonical {
            if let Some(key) = self.collections.key_of(entity) {
                self.collections.remove(key);
            }
            for &e in &entities {
                self.discard_stash(e);
            }
            info!("Evicted collection {} from {}", file, entity);
        }

        if let Some(instance) = self.instances.get_mut(entity) {
            instance.reset();
        }
        debug!("Unloaded instance {} ({} entities removed)", entity, removed);
    }

    /// Despawn `entity` and its descendants together with their library components
    pub fn despawn_entity(&mut self, entity: Entity) -> bool {
        if !self.world.is_alive(entity) {
            return false;
        }
        for e in self.world.descendants(entity) {
            self.unload_script_object(e);
            self.scripts.remove(e);
            self.streams.remove(e);
            self.instances.remove(e);
        }
        self.world.despawn(entity)
    }
}

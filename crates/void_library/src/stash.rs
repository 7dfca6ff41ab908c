//! Stash registry
//!
//! Disabling an entity captures its subgraph into a [`Disabled`] record held
//! by a fresh handle entity, then retires the original IDs. The original ID
//! stays a valid lookup key through the side index until it is enabled.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use void_ecs::{DeserializeMode, Entity, EntityRemap, MapEntities, SerializeFlags, SubgraphBlob};

use crate::error::Result;
use crate::scene::Scene;

/// Stashed subgraph, attached to its handle entity.
///
/// Only the wrapped entity reference is persisted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Disabled {
    /// Original root of the stashed subgraph
    pub entity: Entity,
    #[serde(skip)]
    pub(crate) data: Vec<u8>,
    /// Original IDs to the IDs used inside `data`
    #[serde(skip)]
    pub(crate) remap: EntityRemap,
}

impl Disabled {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            ..Self::default()
        }
    }

    /// Serialized subgraph bytes
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn remap(&self) -> &EntityRemap {
        &self.remap
    }

    pub fn blob(&self) -> Result<SubgraphBlob> {
        Ok(SubgraphBlob::from_bytes(&self.data)?)
    }
}

impl MapEntities for Disabled {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        self.entity = mapper(self.entity);
    }
}

pub(crate) const SUBGRAPH_FLAGS: SerializeFlags =
    SerializeFlags::RECURSIVE.union(SerializeFlags::KEEP_EXTERNAL_REFERENCES);

impl Scene {
    /// Stash `entity` and its live descendants.
    ///
    /// Returns the handle entity, or `None` when `entity` is not live.
    pub fn disable(&mut self, entity: Entity) -> Result<Option<Entity>> {
        if !self.world.is_alive(entity) {
            debug!("Disable of {} skipped: not live", entity);
            return Ok(None);
        }

        let blob = self.world.serialize_subgraph(entity, SUBGRAPH_FLAGS)?;
        let data = blob.to_bytes()?;
        let remap = EntityRemap::identity(blob.entities());

        let handle = match self.world.name(entity) {
            Some(name) => {
                let name = name.to_string();
                self.world.spawn_named(name)
            }
            None => self.world.spawn(),
        };

        self.world.retire(entity)?;
        self.disabled.insert(handle, Disabled { entity, data, remap });
        self.disabled_index.insert(entity, handle);

        debug!("Stashed {} ({} entities) under handle {}", entity, blob.len(), handle);
        Ok(Some(handle))
    }

    /// Restore a stashed subgraph under its original IDs.
    ///
    /// Returns false when `entity` was never stashed.
    pub fn enable(&mut self, entity: Entity) -> Result<bool> {
        let Some(handle) = self.disabled_index.get(&entity).copied() else {
            debug!("Enable of {} skipped: not stashed", entity);
            return Ok(false);
        };
        let Some(record) = self.disabled.get(handle) else {
            warn!("Stash index for {} points at {} which holds no record", entity, handle);
            self.disabled_index.remove(&entity);
            return Ok(false);
        };

        let blob = record.blob()?;
        let mut remap = record.remap.clone();
        self.world
            .deserialize_subgraph(&blob, &mut remap, DeserializeMode::Restore)?;

        self.disabled_index.remove(&entity);
        self.disabled.remove(handle);
        self.world.despawn(handle);

        debug!("Restored {} from handle {}", entity, handle);
        Ok(true)
    }

    #[inline]
    pub fn is_stashed(&self, entity: Entity) -> bool {
        self.disabled_index.contains_key(&entity)
    }

    /// Handle entity holding the stash of `entity`
    #[inline]
    pub fn stash_handle(&self, entity: Entity) -> Option<Entity> {
        self.disabled_index.get(&entity).copied()
    }

    /// Display name of a live entity, or of the stash handle standing in for it
    pub fn display_name(&self, entity: Entity) -> Option<&str> {
        match self.disabled_index.get(&entity) {
            Some(&handle) => self.world.name(handle),
            None => self.world.name(entity),
        }
    }

    /// Drop a stash record for good and hand its IDs back to the allocator
    pub(crate) fn discard_stash(&mut self, entity: Entity) {
        let Some(handle) = self.disabled_index.remove(&entity) else {
            return;
        };
        if let Some(record) = self.disabled.remove(handle) {
            for id in record.remap.image() {
                self.world.release(id);
            }
        }
        self.world.despawn(handle);
        debug!("Discarded stash of {}", entity);
    }
}

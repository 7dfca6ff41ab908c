//! Subgraph serialization
//!
//! A subgraph (an entity plus, optionally, its descendants) can be captured
//! into a self-contained [`SubgraphBlob`] and written back into a world,
//! either under fresh IDs (cloning) or under the IDs recorded by a remap
//! table (restoring a retired subgraph).
//!
//! Every write-back returns its ID translation through an [`EntityRemap`],
//! which is the only reliable way to find where a source entity ended up.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::MapEntities;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::hierarchy::{LocalTransform, Name, Parent};
use crate::render_components::{Material, Mesh, Renderable};
use crate::world::World;

/// Options controlling which entities a blob captures
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializeFlags(u32);

impl SerializeFlags {
    /// Root only
    pub const NONE: Self = Self(0);

    /// Include all descendants of the root
    pub const RECURSIVE: Self = Self(1 << 0);

    /// Keep references that point outside the subgraph; otherwise they are nulled
    pub const KEEP_EXTERNAL_REFERENCES: Self = Self(1 << 1);

    #[inline]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }
}

impl core::ops::BitOr for SerializeFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// How [`World::deserialize_subgraph`] chooses target IDs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeserializeMode {
    /// Allocate a new entity for every blob entity
    Fresh,
    /// Revive the retired entity the remap table names (or the blob ID itself)
    Restore,
}

/// All components of one entity
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity: Entity,
    pub name: Option<Name>,
    pub parent: Option<Parent>,
    pub transform: Option<LocalTransform>,
    pub mesh: Option<Mesh>,
    pub material: Option<Material>,
    pub renderable: Option<Renderable>,
}

impl MapEntities for EntityRecord {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if let Some(parent) = &mut self.parent {
            parent.map_entities(mapper);
        }
        if let Some(mesh) = &mut self.mesh {
            mesh.map_entities(mapper);
        }
        if let Some(renderable) = &mut self.renderable {
            renderable.map_entities(mapper);
        }
    }
}

/// Serialized entity subgraph; records are in pre-order, root first
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubgraphBlob {
    root: Entity,
    records: Vec<EntityRecord>,
}

impl SubgraphBlob {
    #[inline]
    pub fn root(&self) -> Entity {
        self.root
    }

    /// Source IDs captured by this blob, root first
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records.iter().map(|r| r.entity)
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Name recorded on the root entity
    pub fn root_name(&self) -> Option<&str> {
        self.records
            .first()
            .and_then(|r| r.name.as_ref())
            .map(Name::as_str)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| EcsError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let blob: Self = bincode::deserialize(bytes).map_err(|e| EcsError::Decode(e.to_string()))?;
        if blob.records.is_empty() {
            return Err(EcsError::EmptyBlob);
        }
        Ok(blob)
    }
}

/// Translation table from source entity IDs to target entity IDs
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRemap {
    map: HashMap<Entity, Entity>,
}

impl EntityRemap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table mapping every entity to itself
    pub fn identity(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            map: entities.into_iter().map(|e| (e, e)).collect(),
        }
    }

    pub fn insert(&mut self, from: Entity, to: Entity) -> Option<Entity> {
        self.map.insert(from, to)
    }

    pub fn remove(&mut self, from: Entity) -> Option<Entity> {
        self.map.remove(&from)
    }

    #[inline]
    pub fn get(&self, from: Entity) -> Option<Entity> {
        self.map.get(&from).copied()
    }

    /// Mapped ID, or `from` unchanged when unmapped
    #[inline]
    pub fn map(&self, from: Entity) -> Entity {
        self.get(from).unwrap_or(from)
    }

    #[inline]
    pub fn contains(&self, from: Entity) -> bool {
        self.map.contains_key(&from)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Entity, Entity)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }

    pub fn domain(&self) -> impl Iterator<Item = Entity> + '_ {
        self.map.keys().copied()
    }

    pub fn image(&self) -> impl Iterator<Item = Entity> + '_ {
        self.map.values().copied()
    }

    /// Chain two tables: `self` maps a to b, `next` maps b to c, the result
    /// maps a to c. Entries whose b is missing from `next` are dropped.
    pub fn compose(&self, next: &EntityRemap) -> EntityRemap {
        EntityRemap {
            map: self
                .map
                .iter()
                .filter_map(|(a, b)| next.get(*b).map(|c| (*a, c)))
                .collect(),
        }
    }

    /// Keep only the entries whose source satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.map.retain(|from, _| keep(*from));
    }

    /// Copy every entry of `other` into this table
    pub fn extend(&mut self, other: &EntityRemap) {
        self.map.extend(other.map.iter().map(|(k, v)| (*k, *v)));
    }
}

impl World {
    /// Capture `root` (and its descendants when [`SerializeFlags::RECURSIVE`])
    pub fn serialize_subgraph(&self, root: Entity, flags: SerializeFlags) -> Result<SubgraphBlob> {
        if !self.is_alive(root) {
            return Err(EcsError::NotAlive(root));
        }

        let members = if flags.contains(SerializeFlags::RECURSIVE) {
            self.descendants(root)
        } else {
            vec![root]
        };
        let keep_external = flags.contains(SerializeFlags::KEEP_EXTERNAL_REFERENCES);

        let records = members
            .iter()
            .map(|&e| {
                let mut record = self.extract_record(e);
                if !keep_external {
                    record.map_entities(&mut |r| {
                        if members.contains(&r) { r } else { Entity::null() }
                    });
                }
                record
            })
            .collect();

        Ok(SubgraphBlob { root, records })
    }

    /// Write a blob back into the world and return the new root.
    ///
    /// Blob entities receive target IDs according to `mode` and are recorded
    /// in `remap`. References are rewritten through `remap`; references it
    /// does not know are kept as they are.
    pub fn deserialize_subgraph(
        &mut self,
        blob: &SubgraphBlob,
        remap: &mut EntityRemap,
        mode: DeserializeMode,
    ) -> Result<Entity> {
        if blob.is_empty() {
            return Err(EcsError::EmptyBlob);
        }

        match mode {
            DeserializeMode::Fresh => {
                for source in blob.entities() {
                    let target = self.spawn();
                    remap.insert(source, target);
                }
            }
            DeserializeMode::Restore => {
                let targets: Vec<Entity> = blob.entities().map(|e| remap.map(e)).collect();
                if let Some(&bad) = targets.iter().find(|&&t| !self.is_retired(t)) {
                    return Err(EcsError::NotRetired(bad));
                }
                for (source, target) in blob.entities().zip(targets) {
                    self.revive(target)?;
                    remap.insert(source, target);
                }
            }
        }

        for record in &blob.records {
            let target = remap.map(record.entity);
            let mut record = record.clone();
            record.map_entities(&mut |r| remap.map(r));
            self.insert_record(target, record);
        }

        Ok(remap.map(blob.root))
    }
}

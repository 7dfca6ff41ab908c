//! Instance component
//!
//! An [`Instance`] asks for the content of a collection file to be
//! materialized under the entity that carries it (the anchor). It is
//! resolved at most once per residency; the entities it produced are
//! recorded so they can be unloaded again.

use serde::{Deserialize, Serialize};
use void_ecs::{Entity, MapEntities};

use crate::error::{LibraryError, Result};

/// How a cache miss is served
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadStrategy {
    /// Read the file and make this instance the canonical collection
    #[default]
    DirectLoad,
    /// Preload the file into a helper library instance, then clone from it
    SpawnAndPreload,
}

impl LoadStrategy {
    pub const DIRECT: u32 = 0;
    pub const INSTANTIATE: u32 = 1;
    pub const PRELOAD: u32 = 2;

    /// Decode a raw binding value; `1` and `2` both mean spawn-and-preload
    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            Self::DIRECT => Ok(Self::DirectLoad),
            Self::INSTANTIATE | Self::PRELOAD => Ok(Self::SpawnAndPreload),
            other => Err(LibraryError::invalid_argument("strategy", other)),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::DirectLoad => Self::DIRECT,
            Self::SpawnAndPreload => Self::PRELOAD,
        }
    }
}

/// Whether non-render entities are stashed on load
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceKind {
    #[default]
    Default,
    /// Only mesh and material entities stay live; everything else is stashed
    Library,
}

impl InstanceKind {
    pub const DEFAULT: u32 = 0;
    pub const LIBRARY: u32 = 1;

    pub fn from_raw(raw: u32) -> Result<Self> {
        match raw {
            Self::DEFAULT => Ok(Self::Default),
            Self::LIBRARY => Ok(Self::Library),
            other => Err(LibraryError::invalid_argument("kind", other)),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Default => Self::DEFAULT,
            Self::Library => Self::LIBRARY,
        }
    }
}

/// Request to materialize a collection file under an anchor entity.
///
/// Only `file` and `entity_name` are persisted; resolution state is rebuilt
/// at runtime.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Instance {
    /// Collection file path
    pub file: String,
    /// Optional selector; empty means the whole collection
    pub entity_name: String,
    #[serde(skip)]
    pub strategy: LoadStrategy,
    #[serde(skip)]
    pub kind: InstanceKind,
    #[serde(skip, default = "Entity::null")]
    pub(crate) collection_id: Entity,
    #[serde(skip)]
    pub(crate) entities: Vec<Entity>,
    /// Handed to the loader for the current residency
    #[serde(skip)]
    pub(crate) bound: bool,
}

impl Instance {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            collection_id: Entity::null(),
            ..Self::default()
        }
    }

    pub fn with_entity_name(mut self, name: impl Into<String>) -> Self {
        self.entity_name = name.into();
        self
    }

    pub fn with_strategy(mut self, strategy: LoadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_kind(mut self, kind: InstanceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Canonical collection this instance came from; null until resolved
    #[inline]
    pub fn collection_id(&self) -> Entity {
        self.collection_id
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        !self.collection_id.is_null()
    }

    /// Whether the instance has been handed to the loader since it was last unloaded
    #[inline]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Entities produced by the most recent resolution
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn set_strategy_raw(&mut self, raw: u32) -> Result<()> {
        self.strategy = LoadStrategy::from_raw(raw)?;
        Ok(())
    }

    pub fn set_kind_raw(&mut self, raw: u32) -> Result<()> {
        self.kind = InstanceKind::from_raw(raw)?;
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.collection_id = Entity::null();
        self.entities.clear();
        self.bound = false;
    }

    pub(crate) fn push_entity(&mut self, entity: Entity) {
        if !self.entities.contains(&entity) {
            self.entities.push(entity);
        }
    }
}

impl MapEntities for Instance {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if !self.collection_id.is_null() {
            self.collection_id = mapper(self.collection_id);
        }
        for entity in &mut self.entities {
            *entity = mapper(*entity);
        }
    }
}

//! Scene-graph components
//!
//! - [`Name`] - display name, used for name-scoped instancing
//! - [`Parent`] - structural parent link; children are derived from it
//! - [`LocalTransform`] - transform relative to the parent

use serde::{Deserialize, Serialize};

use crate::component::MapEntities;
use crate::Entity;

/// Display name of an entity
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    pub name: String,
}

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl MapEntities for Name {
    fn map_entities(&mut self, _mapper: &mut dyn FnMut(Entity) -> Entity) {}
}

/// Parent-child relationship component.
///
/// Adding this component to an entity makes it a child of the referenced
/// parent. Use [`World::attach`](crate::World::attach) rather than inserting
/// it directly so cycles are rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent {
    pub entity: Entity,
}

impl Parent {
    pub fn new(entity: Entity) -> Self {
        Self { entity }
    }
}

impl MapEntities for Parent {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        self.entity = mapper(self.entity);
    }
}

/// Local transform relative to parent (or world if no parent)
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocalTransform {
    pub translation: [f32; 3],
    /// Quaternion [x, y, z, w]
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl LocalTransform {
    pub const IDENTITY: Self = Self {
        translation: [0.0, 0.0, 0.0],
        rotation: [0.0, 0.0, 0.0, 1.0],
        scale: [1.0, 1.0, 1.0],
    };

    pub fn from_translation(translation: [f32; 3]) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl MapEntities for LocalTransform {
    fn map_entities(&mut self, _mapper: &mut dyn FnMut(Entity) -> Entity) {}
}

//! Render-data components
//!
//! [`Mesh`] and [`Material`] are the payload entities a library collection
//! keeps live; [`Renderable`] is a drawable object whose color alpha is the
//! opacity streaming fades drive.

use serde::{Deserialize, Serialize};

use crate::component::MapEntities;
use crate::Entity;

/// Mesh payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Source geometry path
    pub path: String,
    /// Material entity, null if none
    pub material: Entity,
    pub vertex_count: u32,
}

impl Mesh {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            material: Entity::null(),
            vertex_count: 0,
        }
    }

    pub fn with_material(mut self, material: Entity) -> Self {
        self.material = material;
        self
    }
}

impl MapEntities for Mesh {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if !self.material.is_null() {
            self.material = mapper(self.material);
        }
    }
}

/// Material payload
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub base_color: [f32; 4],
    pub texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            base_color: [1.0, 1.0, 1.0, 1.0],
            texture: None,
        }
    }
}

impl MapEntities for Material {
    fn map_entities(&mut self, _mapper: &mut dyn FnMut(Entity) -> Entity) {}
}

/// Drawable object instance
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Renderable {
    /// Mesh entity, null if none
    pub mesh: Entity,
    /// RGBA; alpha is the opacity
    pub color: [f32; 4],
}

impl Renderable {
    pub fn new(mesh: Entity) -> Self {
        Self {
            mesh,
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    #[inline]
    pub fn opacity(&self) -> f32 {
        self.color[3]
    }

    #[inline]
    pub fn set_opacity(&mut self, opacity: f32) {
        self.color[3] = opacity;
    }
}

impl MapEntities for Renderable {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if !self.mesh.is_null() {
            self.mesh = mapper(self.mesh);
        }
    }
}

//! # void_ecs - Scene entity store
//!
//! Entity store backing the streaming scene library:
//! - Generational entity IDs that can be retired and later revived unchanged
//! - Dense component storage with stable enumeration order
//! - Parent links with pre-order subtree traversal
//! - Subgraph capture into bincode blobs, with fresh or restoring write-back
//!
//! ## Example
//!
//! ```ignore
//! use void_ecs::prelude::*;
//!
//! let mut world = World::new();
//! let house = world.spawn_named("house");
//! let door = world.spawn_named("door");
//! world.attach(door, house)?;
//!
//! // Stash the house and bring it back under the same IDs
//! let blob = world.serialize_subgraph(
//!     house,
//!     SerializeFlags::RECURSIVE | SerializeFlags::KEEP_EXTERNAL_REFERENCES,
//! )?;
//! world.retire(house)?;
//! let mut remap = EntityRemap::identity(blob.entities());
//! world.deserialize_subgraph(&blob, &mut remap, DeserializeMode::Restore)?;
//! assert!(world.is_alive(door));
//! ```

pub mod component;
pub mod entity;
pub mod error;
pub mod hierarchy;
pub mod render_components;
pub mod serialize;
pub mod world;

pub use component::{ComponentStorage, MapEntities};
pub use entity::{Entity, EntityAllocator};
pub use error::{EcsError, Result};
pub use hierarchy::{LocalTransform, Name, Parent};
pub use render_components::{Material, Mesh, Renderable};
pub use serialize::{DeserializeMode, EntityRecord, EntityRemap, SerializeFlags, SubgraphBlob};
pub use world::{SceneComponent, World};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::component::MapEntities;
    pub use crate::entity::Entity;
    pub use crate::error::{EcsError, Result};
    pub use crate::hierarchy::{LocalTransform, Name, Parent};
    pub use crate::render_components::{Material, Mesh, Renderable};
    pub use crate::serialize::{DeserializeMode, EntityRemap, SerializeFlags, SubgraphBlob};
    pub use crate::world::World;
}

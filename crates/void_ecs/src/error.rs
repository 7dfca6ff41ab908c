//! Error types for the entity store

use crate::Entity;
use thiserror::Error;

/// Result type for entity store operations
pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors raised by the entity store
#[derive(Debug, Error)]
pub enum EcsError {
    /// Entity is not live
    #[error("Entity {0} is not alive")]
    NotAlive(Entity),

    /// Entity cannot be revived under its original ID
    #[error("Entity {0} is not retired and cannot be revived")]
    NotRetired(Entity),

    /// Attaching would create a cycle
    #[error("Attaching {child} under {parent} would create a hierarchy cycle")]
    HierarchyCycle { child: Entity, parent: Entity },

    /// Blob contains no entities
    #[error("Subgraph blob is empty")]
    EmptyBlob,

    /// Blob encoding failed
    #[error("Failed to encode subgraph: {0}")]
    Encode(String),

    /// Blob decoding failed
    #[error("Failed to decode subgraph: {0}")]
    Decode(String),
}

//! Error types for the scene library

use std::path::PathBuf;

use thiserror::Error;
use void_ecs::{EcsError, Entity};

/// Result type for library operations
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Collection file loading errors
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse collection {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// An entity refers to a name the file does not define
    #[error("Collection {path}: entity '{entity}' references unknown entity '{reference}'")]
    UnknownReference {
        path: String,
        entity: String,
        reference: String,
    },

    #[error("Collection {path}: {source}")]
    Store {
        path: String,
        #[source]
        source: EcsError,
    },
}

/// Script host errors
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Script not found: {0}")]
    NotFound(String),

    #[error("Script {file} failed to initialize: {message}")]
    Init { file: String, message: String },

    #[error("Invalid script properties: {0}")]
    Properties(String),
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Top-level library error
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] EcsError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Raw attribute value outside its enumeration
    #[error("Invalid argument for {attribute}: {value}")]
    InvalidArgument { attribute: &'static str, value: i64 },

    #[error("Entity {0} has no instance")]
    NoInstance(Entity),

    #[error("Preload of {0} produced no collection")]
    PreloadFailed(String),

    #[error("Failed to encode library state: {0}")]
    State(String),
}

impl LibraryError {
    pub fn invalid_argument(attribute: &'static str, value: impl Into<i64>) -> Self {
        Self::InvalidArgument {
            attribute,
            value: value.into(),
        }
    }
}

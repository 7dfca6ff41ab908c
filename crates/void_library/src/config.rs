//! Library configuration
//!
//! Loaded from a TOML table; every field has a default so an empty file is
//! a valid configuration.
//!
//! ```toml
//! stream_transition_time = 2.0
//! library_prefix = "LIB_"
//! asset_root = "assets/collections"
//!
//! [initial_boundary]
//! min = { x = -10.0, y = -10.0, z = -10.0 }
//! max = { x = 10.0, y = 10.0, z = 10.0 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use void_math::AABB;

use crate::error::ConfigError;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Fade progress per simulated second; 1.0 fades fully in one second
    pub stream_transition_time: f32,

    /// Name prefix of synthesized preload helper entities
    pub library_prefix: String,

    /// Directory collection file paths are resolved against
    pub asset_root: PathBuf,

    /// Stream boundary in effect before the first update
    pub initial_boundary: Option<AABB>,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            stream_transition_time: 1.0,
            library_prefix: "LIB_".to_string(),
            asset_root: PathBuf::from("."),
            initial_boundary: None,
        }
    }
}

impl LibraryConfig {
    /// Load from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.stream_transition_time.is_finite() || self.stream_transition_time < 0.0 {
            return Err(ConfigError::Invalid {
                field: "stream_transition_time",
                message: format!("must be a finite non-negative rate, got {}", self.stream_transition_time),
            });
        }
        if self.library_prefix.is_empty() {
            return Err(ConfigError::Invalid {
                field: "library_prefix",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

//! Boot Configuration
//!
//! Library settings and the demo walk, read at startup.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Command line: first positional argument is a config file
//! 2. Environment variable: `VOID_STREAM_CONFIG=path/to/boot.toml`
//! 3. Config file: `boot.toml` in the working directory
//! 4. Built-in defaults
//!
//! Environment overrides (`VOID_STREAM_FRAMES`, `VOID_STREAM_ASSETS`) apply
//! on top of whichever file was found.
//!
//! # Example Config File
//!
//! ```toml
//! [library]
//! stream_transition_time = 2.0
//! asset_root = "assets/collections"
//!
//! [demo]
//! collection = "tile.toml"   # omit to use the built-in tile
//! grid = [4, 4]
//! spacing = 10.0
//! zone_radius = 3.0
//! boundary_radius = 6.0
//! path_speed = 5.0
//! frames = 600
//! dt = 0.016
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use void_library::{ConfigError, LibraryConfig};

/// Grid of streamed tiles and the path the boundary walks over it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemoConfig {
    /// Collection file of every tile; the built-in tile when unset
    #[serde(default)]
    pub collection: Option<String>,
    /// Tiles along x and z
    #[serde(default = "default_grid")]
    pub grid: [u32; 2],
    /// Distance between tile centers
    #[serde(default = "default_spacing")]
    pub spacing: f32,
    /// Half extent of each tile's stream zone
    #[serde(default = "default_zone_radius")]
    pub zone_radius: f32,
    /// Half extent of the stream boundary around the walker
    #[serde(default = "default_boundary_radius")]
    pub boundary_radius: f32,
    /// Walker speed in units per second
    #[serde(default = "default_path_speed")]
    pub path_speed: f32,
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Simulated seconds per frame
    #[serde(default = "default_dt")]
    pub dt: f32,
}

fn default_grid() -> [u32; 2] { [4, 4] }
fn default_spacing() -> f32 { 10.0 }
fn default_zone_radius() -> f32 { 3.0 }
fn default_boundary_radius() -> f32 { 6.0 }
fn default_path_speed() -> f32 { 5.0 }
fn default_frames() -> u32 { 600 }
fn default_dt() -> f32 { 1.0 / 60.0 }

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            collection: None,
            grid: default_grid(),
            spacing: default_spacing(),
            zone_radius: default_zone_radius(),
            boundary_radius: default_boundary_radius(),
            path_speed: default_path_speed(),
            frames: default_frames(),
            dt: default_dt(),
        }
    }
}

/// Complete boot configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BootConfig {
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl BootConfig {
    /// Load boot configuration from all sources
    pub fn load() -> Result<Self, ConfigError> {
        let explicit = std::env::args()
            .skip(1)
            .find(|arg| !arg.starts_with("--"))
            .or_else(|| std::env::var("VOID_STREAM_CONFIG").ok().filter(|p| !p.is_empty()));

        let mut config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None if Path::new("boot.toml").exists() => Self::load_from_file("boot.toml")?,
            None => Self::default(),
        };

        if let Ok(frames) = std::env::var("VOID_STREAM_FRAMES") {
            match frames.parse() {
                Ok(frames) => config.demo.frames = frames,
                Err(_) => log::warn!("Ignoring VOID_STREAM_FRAMES={}", frames),
            }
        }
        if let Ok(root) = std::env::var("VOID_STREAM_ASSETS") {
            if !root.is_empty() {
                config.library.asset_root = root.into();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.config_path = Some(path.to_string());
        log::info!("Loaded boot config from {}", path);
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.library.validate()?;

        let demo = &self.demo;
        if demo.grid[0] == 0 || demo.grid[1] == 0 {
            return Err(ConfigError::Invalid {
                field: "demo.grid",
                message: "needs at least one tile per axis".to_string(),
            });
        }
        for (field, value) in [
            ("demo.spacing", demo.spacing),
            ("demo.zone_radius", demo.zone_radius),
            ("demo.boundary_radius", demo.boundary_radius),
            ("demo.dt", demo.dt),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    message: format!("must be positive, got {}", value),
                });
            }
        }
        if !demo.path_speed.is_finite() || demo.path_speed < 0.0 {
            return Err(ConfigError::Invalid {
                field: "demo.path_speed",
                message: format!("must be non-negative, got {}", demo.path_speed),
            });
        }
        Ok(())
    }

    pub fn print_summary(&self) {
        log::info!("Boot configuration:");
        log::info!("  Config file: {}", self.config_path.as_deref().unwrap_or("(defaults)"));
        log::info!("  Asset root: {}", self.library.asset_root.display());
        log::info!("  Transition rate: {}/s", self.library.stream_transition_time);
        log::info!(
            "  Collection: {}",
            self.demo.collection.as_deref().unwrap_or("(built-in tile)")
        );
        log::info!(
            "  Grid: {}x{} spaced {}, {} frames",
            self.demo.grid[0], self.demo.grid[1], self.demo.spacing, self.demo.frames
        );
    }
}

//! # void_library - Streaming scene libraries
//!
//! Large scenes are built from reusable collections: entity subgraphs
//! loaded from files. This crate
//! - loads each collection file at most once and clones it for every
//!   further instance ([`Scene::resolve_instance`])
//! - stashes subgraphs out of the live store and restores them under their
//!   original IDs ([`Scene::disable`], [`Scene::enable`])
//! - clones live or stashed subgraphs with an explicit remap table
//!   ([`Scene::clone_entity`])
//! - streams instances in and out of zones around a moving boundary, fading
//!   their opacity ([`Scene::update`])
//!
//! ## Example
//!
//! ```ignore
//! use void_library::prelude::*;
//!
//! let mut scene = Scene::with_file_loader(LibraryConfig::load("library.toml")?);
//! let tree = scene.create_instance("tree");
//! scene.instance_mut(tree).unwrap().file = "tree.toml".into();
//! scene.set_streamable(tree, true, AABB::from_center_half_extents(Vec3::ZERO, Vec3::splat(5.0)));
//!
//! scene.set_stream_boundary(camera_bounds);
//! scene.update(dt);
//! ```

pub mod api;
pub mod clone;
pub mod collection;
pub mod config;
pub mod error;
pub mod handle;
pub mod instance;
pub mod jobs;
pub mod loader;
pub mod resolve;
pub mod scene;
pub mod script;
pub mod stash;
pub mod state;
pub mod streaming;

pub use api::LibraryApi;
pub use collection::{CollectionCache, ContentKey};
pub use config::LibraryConfig;
pub use error::{ConfigError, LibraryError, LoaderError, Result, ScriptError};
pub use handle::SceneHandle;
pub use instance::{Instance, InstanceKind, LoadStrategy};
pub use jobs::JobList;
pub use loader::{CollectionLoader, LoadedCollection, MemoryLoader, SceneFileLoader};
pub use scene::{LibraryStats, Scene};
pub use script::{LoggingScriptHost, ScriptDescriptor, ScriptHost, ScriptObject, ScriptProperties, ScriptValue};
pub use stash::Disabled;
pub use state::LibraryState;
pub use streaming::{Stream, StreamPhase};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Instance, InstanceKind, LibraryApi, LibraryConfig, LibraryError, LoadStrategy, Scene, SceneHandle,
        Stream, StreamPhase,
    };
    pub use void_ecs::{Entity, EntityRemap};
    pub use void_math::{Vec3, AABB};
}

//! Streaming walk over a grid of collection tiles
//!
//! A hidden library instance keeps the tile collection cached. Every grid
//! cell is a streamed instance of the same file with its own zone, so tiles
//! are cloned from the cache as the walker's boundary reaches them and
//! faded out and unloaded behind it.

use std::collections::HashMap;
use std::sync::Arc;

use void_ecs::Entity;
use void_library::prelude::*;
use void_library::{JobList, LibraryStats, MemoryLoader, Result};

use crate::boot_config::{BootConfig, DemoConfig};

/// Collection used when no tile file is configured
pub const BUILTIN_TILE: &str = r#"
    [[entities]]
    name = "grass"
    [entities.material]
    base_color = [0.3, 0.6, 0.2, 1.0]

    [[entities]]
    name = "ground"
    [entities.mesh]
    path = "meshes/ground.obj"
    material = "grass"

    [[entities]]
    name = "lamp"
    parent = "ground"
    [entities.transform]
    position = [1.0, 0.0, 1.0]
    [entities.renderable]
    mesh = "ground"
    color = [1.0, 0.9, 0.6, 0.8]

    [[entities]]
    name = "spawn"
    [entities.transform]
    position = [0.0, 0.5, 0.0]
"#;

const BUILTIN_FILE: &str = "tile.toml";

/// Residency changes observed over a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DemoReport {
    pub frames: u32,
    pub fade_ins: usize,
    pub arrivals: usize,
    pub unloads: usize,
    pub stats: LibraryStats,
}

struct Tile {
    entity: Entity,
    cell: (u32, u32),
    phase: StreamPhase,
}

pub struct StreamDemo {
    handle: SceneHandle,
    jobs: JobList,
    config: DemoConfig,
    tiles: Vec<Tile>,
    library: Entity,
    time: f32,
}

impl StreamDemo {
    pub fn new(boot: &BootConfig) -> Result<Self> {
        let config = boot.demo.clone();
        let (scene, file) = match &config.collection {
            Some(file) => (Scene::with_file_loader(boot.library.clone()), file.clone()),
            None => {
                let loader = Arc::new(MemoryLoader::new().with_source(BUILTIN_FILE, BUILTIN_TILE));
                (Scene::new(boot.library.clone(), loader), BUILTIN_FILE.to_string())
            }
        };

        let mut demo = Self {
            handle: SceneHandle::new(scene),
            jobs: JobList::new(),
            config,
            tiles: Vec::new(),
            library: Entity::null(),
            time: 0.0,
        };
        demo.build_grid(&file)?;
        demo.warm_cache()?;
        Ok(demo)
    }

    fn build_grid(&mut self, file: &str) -> Result<()> {
        let mut scene = self.handle.lock();

        let library = scene.create_instance(format!("library_{}", file));
        if let Some(instance) = scene.instance_mut(library) {
            instance.file = file.to_string();
            instance.kind = InstanceKind::Library;
        }
        self.library = library;

        let half = Vec3::splat(self.config.zone_radius);
        for gz in 0..self.config.grid[1] {
            for gx in 0..self.config.grid[0] {
                let tile = scene.create_instance(format!("tile_{}_{}", gx, gz));
                if let Some(instance) = scene.instance_mut(tile) {
                    instance.file = file.to_string();
                    instance.strategy = LoadStrategy::SpawnAndPreload;
                }
                let center = self.cell_center(gx, gz);
                scene.set_streamable(tile, true, AABB::from_center_half_extents(center, half));
                scene.set_script(tile, true, "tile.lua");
                self.tiles.push(Tile {
                    entity: tile,
                    cell: (gx, gz),
                    phase: StreamPhase::Unloaded,
                });
            }
        }
        scene.set_stream_boundary(self.boundary_at(0.0));

        log::info!("Built {} streamed tiles of {}", self.tiles.len(), file);
        Ok(())
    }

    /// Load the shared collection off the frame loop before the walk starts
    fn warm_cache(&mut self) -> Result<()> {
        self.handle.resolve_async(self.library, &self.jobs);
        self.jobs.wait();

        let scene = self.handle.lock();
        if scene.instance(self.library).is_some_and(|i| i.is_resolved()) {
            log::info!("Collection cache warm ({} entries)", scene.collections().len());
            Ok(())
        } else {
            Err(LibraryError::PreloadFailed(format!(
                "library instance {} did not resolve",
                self.library
            )))
        }
    }

    pub fn run(&mut self) -> DemoReport {
        let mut report = DemoReport::default();
        for frame in 0..self.config.frames {
            self.step(frame, &mut report);
        }
        report.frames = self.config.frames;
        report.stats = self.handle.lock().stats();
        report
    }

    fn step(&mut self, frame: u32, report: &mut DemoReport) {
        self.time += self.config.dt;
        let boundary = self.boundary_at(self.time);

        let mut scene = self.handle.lock();
        scene.set_stream_boundary(boundary);
        scene.update(self.config.dt);

        for tile in &mut self.tiles {
            let phase = scene.stream(tile.entity).map_or(StreamPhase::Unloaded, |s| s.phase());
            if phase == tile.phase {
                continue;
            }
            match (tile.phase, phase) {
                (StreamPhase::Unloaded, StreamPhase::FadingIn | StreamPhase::Resident) => report.fade_ins += 1,
                (_, StreamPhase::Resident) => report.arrivals += 1,
                (_, StreamPhase::Unloaded) => report.unloads += 1,
                _ => {}
            }
            log::info!(
                "frame {:>5}: tile ({}, {}) {:?} -> {:?}",
                frame, tile.cell.0, tile.cell.1, tile.phase, phase
            );
            tile.phase = phase;
        }

        if frame % 60 == 0 {
            let stats = scene.stats();
            log::debug!(
                "frame {:>5}: walker at {:?}, {} resident, {} fading",
                frame,
                boundary.center(),
                stats.resident_streams,
                stats.fading_streams
            );
        }
    }

    fn cell_center(&self, gx: u32, gz: u32) -> Vec3 {
        Vec3::new(gx as f32 * self.config.spacing, 0.0, gz as f32 * self.config.spacing)
    }

    fn boundary_at(&self, time: f32) -> AABB {
        AABB::from_center_half_extents(
            walker_position(&self.config, time),
            Vec3::splat(self.config.boundary_radius),
        )
    }
}

/// Serpentine walk: along x on each row, alternating direction, stepping
/// one row in z between them and wrapping back to the first row
pub fn walker_position(config: &DemoConfig, time: f32) -> Vec3 {
    let row_len = config.grid[0].saturating_sub(1) as f32 * config.spacing;
    let segment = row_len + config.spacing;
    let travelled = config.path_speed * time;

    let row = (travelled / segment).floor() as u32 % config.grid[1];
    let offset = travelled % segment;
    let along = offset.min(row_len);
    let x = if row % 2 == 0 { along } else { row_len - along };
    let z = row as f32 * config.spacing + (offset - row_len).max(0.0);
    Vec3::new(x, 0.0, z)
}

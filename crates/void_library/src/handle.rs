//! Shared scene handle and asynchronous resolution
//!
//! [`SceneHandle`] shares a [`Scene`] between threads. Its resolve path keeps
//! file reads outside the scene lock: a per-content-key gate serializes loads
//! of the same file, while loads of different files only contend for the
//! short install step under the scene lock.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::bounded;
use log::{debug, error};
use parking_lot::{Mutex, MutexGuard};
use void_ecs::Entity;

use crate::collection::ContentKey;
use crate::error::{LibraryError, Result};
use crate::instance::{Instance, InstanceKind, LoadStrategy};
use crate::jobs::JobList;
use crate::scene::Scene;

#[derive(Clone)]
pub struct SceneHandle {
    scene: Arc<Mutex<Scene>>,
    gates: Arc<Mutex<HashMap<ContentKey, Arc<Mutex<()>>>>>,
}

/// What a locked look at an instance decided
enum Plan {
    Done,
    Miss { file: String, key: ContentKey, strategy: LoadStrategy },
}

impl SceneHandle {
    pub fn new(scene: Scene) -> Self {
        Self {
            scene: Arc::new(Mutex::new(scene)),
            gates: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Exclusive access to the scene
    pub fn lock(&self) -> MutexGuard<'_, Scene> {
        self.scene.lock()
    }

    /// Submit the resolution of `entity` to `jobs`
    pub fn resolve_async(&self, entity: Entity, jobs: &JobList) {
        let handle = self.clone();
        jobs.execute(move || {
            if let Err(e) = handle.resolve(entity) {
                error!("Async resolve of {} failed: {}", entity, e);
            }
        });
    }

    /// Resolve the instance on `entity`, reading files outside the scene lock
    pub fn resolve(&self, entity: Entity) -> Result<()> {
        let (file, key, strategy) = match self.plan(entity)? {
            Plan::Done => return Ok(()),
            Plan::Miss { file, key, strategy } => (file, key, strategy),
        };

        let gate = self.gate(key);
        let _guard = gate.lock();

        // another holder of the gate may have installed it meanwhile
        if self.lock().collections.contains(key) {
            return self.lock().resolve_instance(entity);
        }

        match strategy {
            LoadStrategy::DirectLoad => self.load_and_install(entity, &file, key),
            LoadStrategy::SpawnAndPreload => {
                self.preload(&file, key)?;
                self.lock().resolve_instance(entity)
            }
        }
    }

    /// Bind the instance and settle it under the lock when no file read is needed
    fn plan(&self, entity: Entity) -> Result<Plan> {
        let mut scene = self.lock();
        let instance = scene
            .instances
            .get_mut(entity)
            .ok_or(LibraryError::NoInstance(entity))?;
        instance.bound = true;
        if instance.is_resolved() {
            return Ok(Plan::Done);
        }

        let file = instance.file.clone();
        let strategy = instance.strategy;
        let key = ContentKey::from_path(&file);
        if scene.collections.contains(key) {
            scene.resolve_instance(entity)?;
            return Ok(Plan::Done);
        }
        Ok(Plan::Miss { file, key, strategy })
    }

    fn gate(&self, key: ContentKey) -> Arc<Mutex<()>> {
        Arc::clone(self.gates.lock().entry(key).or_default())
    }

    /// Read `file` without the scene lock, then install it under `anchor`.
    ///
    /// The caller holds the gate for `key`.
    fn load_and_install(&self, anchor: Entity, file: &str, key: ContentKey) -> Result<()> {
        let loader = self.lock().loader();
        let loaded = loader.load(file).map_err(|e| {
            error!("Failed to load collection {}: {}", file, e);
            e
        })?;

        let mut scene = self.lock();
        if scene.install_collection(anchor, key, loaded)? {
            scene.capture_opacity(anchor);
            Ok(())
        } else {
            // a synchronous resolve installed it first
            scene.resolve_instance(anchor)
        }
    }

    /// Load `file` into a library helper on a nested job list and wait for it.
    ///
    /// The caller holds the gate for `key`.
    fn preload(&self, file: &str, key: ContentKey) -> Result<()> {
        let helper = {
            let mut scene = self.lock();
            let name = format!("{}{}", scene.config.library_prefix, file);
            let helper = scene.create_instance(name);
            if let Some(instance) = scene.instances.get_mut(helper) {
                *instance = Instance::new(file)
                    .with_strategy(LoadStrategy::DirectLoad)
                    .with_kind(InstanceKind::Library);
                instance.bound = true;
            }
            helper
        };
        debug!("Preloading {} into helper {}", file, helper);

        let (result_tx, result_rx) = bounded(1);
        let preload_list = JobList::new();
        let handle = self.clone();
        let path = file.to_string();
        preload_list.execute(move || {
            let _ = result_tx.send(handle.load_and_install(helper, &path, key));
        });
        preload_list.wait();

        let result = result_rx
            .recv()
            .unwrap_or_else(|_| Err(LibraryError::PreloadFailed(file.to_string())));
        if result.is_err() {
            let mut scene = self.lock();
            scene.instances.remove(helper);
            scene.world.despawn(helper);
        }
        result
    }
}

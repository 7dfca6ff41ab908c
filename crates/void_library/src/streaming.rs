//! Zone streaming
//!
//! Every update compares each stream zone against the moving stream
//! boundary. Entering a zone resolves the instance and fades it in; leaving
//! it fades the instance out and unloads it once the fade reaches zero.
//!
//! ```text
//! Unloaded (t = 0) -> FadingIn (0 < t < 1) -> Resident (t = 1)
//!        ^                                         |
//!        +------------- FadingOut (0 < t < 1) <----+
//! ```

use std::collections::HashMap;

use log::{error, info};
use serde::{Deserialize, Serialize};
use void_ecs::{Entity, MapEntities};
use void_math::{approach, AABB};

use crate::scene::Scene;

/// Residency phase of a stream
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamPhase {
    #[default]
    Unloaded,
    FadingIn,
    Resident,
    FadingOut,
}

impl StreamPhase {
    pub fn is_fading(&self) -> bool {
        matches!(self, StreamPhase::FadingIn | StreamPhase::FadingOut)
    }
}

/// Spatial streaming record of an instance-bearing entity.
///
/// Persisted as `(substitute, zone)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stream {
    /// Stand-in entity shown while the instance is not resident
    pub substitute: Entity,
    pub zone: AABB,
    #[serde(skip)]
    pub(crate) transition: f32,
    /// Authored opacity of each tracked renderable, captured at load
    #[serde(skip)]
    pub(crate) opacity_snapshot: HashMap<Entity, f32>,
    #[serde(skip)]
    pub(crate) phase: StreamPhase,
}

impl Stream {
    pub fn new(zone: AABB) -> Self {
        Self {
            substitute: Entity::null(),
            zone,
            transition: 0.0,
            opacity_snapshot: HashMap::new(),
            phase: StreamPhase::Unloaded,
        }
    }

    /// Residency fade in [0, 1]
    #[inline]
    pub fn transition(&self) -> f32 {
        self.transition
    }

    #[inline]
    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn opacity_snapshot(&self) -> &HashMap<Entity, f32> {
        &self.opacity_snapshot
    }

    fn advance(&mut self, step: f32) {
        self.transition = approach(self.transition, 1.0, step);
        self.phase = if self.transition >= 1.0 {
            StreamPhase::Resident
        } else if self.transition > 0.0 {
            StreamPhase::FadingIn
        } else {
            StreamPhase::Unloaded
        };
    }

    fn regress(&mut self, step: f32) {
        self.transition = approach(self.transition, 0.0, step);
        self.phase = if self.transition <= 0.0 {
            StreamPhase::Unloaded
        } else {
            StreamPhase::FadingOut
        };
    }
}

impl Default for Stream {
    fn default() -> Self {
        Self::new(AABB::EMPTY)
    }
}

impl MapEntities for Stream {
    fn map_entities(&mut self, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if !self.substitute.is_null() {
            self.substitute = mapper(self.substitute);
        }
        self.opacity_snapshot = self
            .opacity_snapshot
            .drain()
            .map(|(e, opacity)| (mapper(e), opacity))
            .collect();
    }
}

impl Scene {
    /// Attach a stream record with `zone` to `entity`, or remove it.
    ///
    /// An existing record only has its zone replaced; its fade state and
    /// opacity snapshot carry over.
    pub fn set_streamable(&mut self, entity: Entity, set: bool, zone: AABB) {
        if set {
            match self.streams.get_mut(entity) {
                Some(stream) => stream.zone = zone,
                None => {
                    self.streams.insert(entity, Stream::new(zone));
                }
            }
        } else {
            self.streams.remove(entity);
        }
    }

    pub fn stream(&self, entity: Entity) -> Option<&Stream> {
        self.streams.get(entity)
    }

    #[inline]
    pub fn stream_boundary(&self) -> AABB {
        self.stream_boundary
    }

    pub fn set_stream_boundary(&mut self, boundary: AABB) {
        self.stream_boundary = boundary;
    }

    /// Run one streaming step of `dt` simulated seconds
    pub fn update(&mut self, dt: f32) {
        self.load_eager();
        self.update_streams(dt);
    }

    /// Resolve instances and start scripts that do not stream
    fn load_eager(&mut self) {
        let pending: Vec<Entity> = self
            .instances
            .iter()
            .filter(|(e, instance)| !instance.bound && !self.streams.contains(*e) && self.world.is_alive(*e))
            .map(|(e, _)| e)
            .collect();
        for entity in pending {
            self.resolve_logged(entity);
        }

        let scripts: Vec<Entity> = self
            .scripts
            .iter()
            .filter(|(e, object)| !object.initialized && !self.streams.contains(*e) && self.world.is_alive(*e))
            .map(|(e, _)| e)
            .collect();
        for entity in scripts {
            self.init_script_object(entity);
        }
    }

    fn update_streams(&mut self, dt: f32) {
        let step = dt * self.config.stream_transition_time;
        let boundary = self.stream_boundary;
        let entities: Vec<Entity> = self.streams.entities().to_vec();

        for entity in entities {
            if !self.world.is_alive(entity) {
                continue;
            }
            let Some(zone) = self.streams.get(entity).map(|s| s.zone) else {
                continue;
            };

            let before = self.streams.get(entity).map_or(0.0, |s| s.transition);
            if zone.intersects(&boundary) {
                self.stream_enter(entity, step);
            } else {
                self.stream_leave(entity, step);
            }

            self.apply_fade(entity, before);
        }
    }

    fn stream_enter(&mut self, entity: Entity, step: f32) {
        let Some(instance) = self.instances.get(entity) else {
            return;
        };
        if !instance.bound {
            self.resolve_logged(entity);
        }

        let resolved = self.instances.get(entity).is_some_and(|i| i.is_resolved());
        if !resolved {
            return;
        }

        let Some(stream) = self.streams.get_mut(entity) else {
            return;
        };
        let was_unloaded = stream.transition <= 0.0;
        stream.advance(step);
        let transition = stream.transition;

        if was_unloaded && transition > 0.0 {
            info!("Stream {} fading in", entity);
        }
        if transition > 0.0 {
            self.init_script_object(entity);
        }
    }

    fn stream_leave(&mut self, entity: Entity, step: f32) {
        let Some(stream) = self.streams.get_mut(entity) else {
            return;
        };
        stream.regress(step);
        if stream.transition > 0.0 {
            return;
        }

        let bound = self.instances.get(entity).is_some_and(|i| i.bound);
        if bound {
            self.unload_instance(entity);
            if let Some(stream) = self.streams.get_mut(entity) {
                stream.opacity_snapshot.clear();
            }
            info!("Stream {} unloaded", entity);
        }
        self.unload_script_object(entity);
    }

    /// Scale tracked opacities by the transition while fading, and once more
    /// on the frame the fade completes so authored opacity is restored
    fn apply_fade(&mut self, entity: Entity, before: f32) {
        let Some(stream) = self.streams.get(entity) else {
            return;
        };
        let transition = stream.transition;
        let fading = transition > 0.0 && transition < 1.0;
        let completed = transition >= 1.0 && before < 1.0;
        if !fading && !completed {
            return;
        }
        for (&tracked, &opacity) in &stream.opacity_snapshot {
            self.world.set_opacity(tracked, opacity * transition);
        }
    }

    fn resolve_logged(&mut self, entity: Entity) {
        if let Err(e) = self.resolve_instance(entity) {
            error!("Failed to resolve instance {}: {}", entity, e);
        }
    }
}

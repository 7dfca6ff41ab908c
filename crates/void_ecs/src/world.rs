//! World - Container for all scene entity data
//!
//! The World owns the entity allocator and one dense storage per scene
//! component kind. Structure (parent/child) is expressed purely through
//! [`Parent`] components; children are derived on demand.

use crate::component::{ComponentStorage, MapEntities};
use crate::entity::{Entity, EntityAllocator};
use crate::error::{EcsError, Result};
use crate::hierarchy::{LocalTransform, Name, Parent};
use crate::render_components::{Material, Mesh, Renderable};
use crate::serialize::{EntityRecord, EntityRemap};

/// Component kinds stored by the [`World`]
pub trait SceneComponent: MapEntities + Clone + Send + Sync + 'static {
    fn storage(world: &World) -> &ComponentStorage<Self>;
    fn storage_mut(world: &mut World) -> &mut ComponentStorage<Self>;
}

macro_rules! scene_components {
    ($($ty:ty => $field:ident),* $(,)?) => {
        $(
            impl SceneComponent for $ty {
                #[inline]
                fn storage(world: &World) -> &ComponentStorage<Self> {
                    &world.$field
                }

                #[inline]
                fn storage_mut(world: &mut World) -> &mut ComponentStorage<Self> {
                    &mut world.$field
                }
            }
        )*
    };
}

scene_components! {
    Name => names,
    Parent => parents,
    LocalTransform => transforms,
    Mesh => meshes,
    Material => materials,
    Renderable => renderables,
}

/// The scene entity store
#[derive(Default)]
pub struct World {
    entities: EntityAllocator,
    names: ComponentStorage<Name>,
    parents: ComponentStorage<Parent>,
    transforms: ComponentStorage<LocalTransform>,
    meshes: ComponentStorage<Mesh>,
    materials: ComponentStorage<Material>,
    renderables: ComponentStorage<Renderable>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Entity Management ==========

    /// Spawn a new entity without components
    pub fn spawn(&mut self) -> Entity {
        self.entities.allocate()
    }

    /// Spawn an entity carrying a [`Name`]
    pub fn spawn_named(&mut self, name: impl Into<String>) -> Entity {
        let entity = self.spawn();
        self.names.insert(entity, Name::new(name));
        entity
    }

    #[inline]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    #[inline]
    pub fn is_retired(&self, entity: Entity) -> bool {
        self.entities.is_retired(entity)
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Alive entities in index order
    pub fn iter_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter_alive()
    }

    /// Despawn an entity and all of its descendants
    pub fn despawn(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        for e in self.descendants(entity) {
            self.strip_components(e);
            self.entities.deallocate(e);
        }
        true
    }

    /// Despawn only `entity`; its children become roots
    pub fn despawn_single(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        for child in self.children_of(entity) {
            self.parents.remove(child);
        }
        self.strip_components(entity);
        self.entities.deallocate(entity)
    }

    /// Retire an entity and its descendants: components are dropped but the
    /// IDs stay reserved until revived or released
    pub fn retire(&mut self, entity: Entity) -> Result<Vec<Entity>> {
        if !self.is_alive(entity) {
            return Err(EcsError::NotAlive(entity));
        }
        let retired = self.descendants(entity);
        for &e in &retired {
            self.strip_components(e);
            self.entities.retire(e);
        }
        Ok(retired)
    }

    /// Give a retired ID back to the allocator
    pub fn release(&mut self, entity: Entity) -> bool {
        self.is_retired(entity) && self.entities.deallocate(entity)
    }

    pub(crate) fn revive(&mut self, entity: Entity) -> Result<()> {
        if self.entities.revive(entity) {
            Ok(())
        } else {
            Err(EcsError::NotRetired(entity))
        }
    }

    // ========== Components ==========

    /// Add or replace a component; returns false if the entity is not alive
    pub fn add_component<T: SceneComponent>(&mut self, entity: Entity, component: T) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        T::storage_mut(self).insert(entity, component);
        true
    }

    #[inline]
    pub fn get_component<T: SceneComponent>(&self, entity: Entity) -> Option<&T> {
        T::storage(self).get(entity)
    }

    #[inline]
    pub fn get_component_mut<T: SceneComponent>(&mut self, entity: Entity) -> Option<&mut T> {
        T::storage_mut(self).get_mut(entity)
    }

    #[inline]
    pub fn has_component<T: SceneComponent>(&self, entity: Entity) -> bool {
        T::storage(self).contains(entity)
    }

    pub fn remove_component<T: SceneComponent>(&mut self, entity: Entity) -> Option<T> {
        T::storage_mut(self).remove(entity)
    }

    /// Storage of one component kind, for enumeration
    #[inline]
    pub fn storage<T: SceneComponent>(&self) -> &ComponentStorage<T> {
        T::storage(self)
    }

    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.names.get(entity).map(Name::as_str)
    }

    /// First live entity with the given name
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.names
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(e, _)| e)
    }

    pub fn opacity(&self, entity: Entity) -> Option<f32> {
        self.renderables.get(entity).map(Renderable::opacity)
    }

    /// Set the opacity of a renderable; returns false if it has none
    pub fn set_opacity(&mut self, entity: Entity, opacity: f32) -> bool {
        match self.renderables.get_mut(entity) {
            Some(renderable) => {
                renderable.set_opacity(opacity);
                true
            }
            None => false,
        }
    }

    // ========== Hierarchy ==========

    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.parents.get(entity).map(|p| p.entity)
    }

    /// Direct children in storage order
    pub fn children_of(&self, entity: Entity) -> Vec<Entity> {
        self.parents
            .iter()
            .filter(|(_, p)| p.entity == entity)
            .map(|(e, _)| e)
            .collect()
    }

    /// `entity` followed by all of its descendants, depth-first pre-order
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = vec![entity];
        while let Some(e) = stack.pop() {
            out.push(e);
            let children = self.children_of(e);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Whether `ancestor` appears on the parent chain of `entity`
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = self.parent_of(entity);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent_of(p);
        }
        false
    }

    /// Make `child` a direct child of `parent`
    pub fn attach(&mut self, child: Entity, parent: Entity) -> Result<()> {
        if !self.is_alive(child) {
            return Err(EcsError::NotAlive(child));
        }
        if !self.is_alive(parent) {
            return Err(EcsError::NotAlive(parent));
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(EcsError::HierarchyCycle { child, parent });
        }
        self.parents.insert(child, Parent::new(parent));
        Ok(())
    }

    /// Make `child` a root
    pub fn detach(&mut self, child: Entity) -> Option<Entity> {
        self.parents.remove(child).map(|p| p.entity)
    }

    // ========== Records ==========

    /// Snapshot every component of one entity
    pub fn extract_record(&self, entity: Entity) -> EntityRecord {
        EntityRecord {
            entity,
            name: self.names.get(entity).cloned(),
            parent: self.parents.get(entity).copied(),
            transform: self.transforms.get(entity).copied(),
            mesh: self.meshes.get(entity).cloned(),
            material: self.materials.get(entity).cloned(),
            renderable: self.renderables.get(entity).cloned(),
        }
    }

    /// Install a record's components on a live entity
    pub(crate) fn insert_record(&mut self, entity: Entity, record: EntityRecord) {
        if let Some(name) = record.name {
            self.names.insert(entity, name);
        }
        if let Some(parent) = record.parent.filter(|p| !p.entity.is_null()) {
            self.parents.insert(entity, parent);
        }
        if let Some(transform) = record.transform {
            self.transforms.insert(entity, transform);
        }
        if let Some(mesh) = record.mesh {
            self.meshes.insert(entity, mesh);
        }
        if let Some(material) = record.material {
            self.materials.insert(entity, material);
        }
        if let Some(renderable) = record.renderable {
            self.renderables.insert(entity, renderable);
        }
    }

    /// Rewrite every entity reference held by the components of `entity`
    pub fn map_references(&mut self, entity: Entity, mapper: &mut dyn FnMut(Entity) -> Entity) {
        if !self.is_alive(entity) {
            return;
        }
        let mut record = self.extract_record(entity);
        record.map_entities(mapper);
        self.insert_record(entity, record);
    }

    fn strip_components(&mut self, entity: Entity) {
        self.names.remove(entity);
        self.parents.remove(entity);
        self.transforms.remove(entity);
        self.meshes.remove(entity);
        self.materials.remove(entity);
        self.renderables.remove(entity);
    }

    /// Move every entity of `other` into this world under fresh IDs.
    ///
    /// Internal references are rewritten; the returned table maps the
    /// scratch IDs to the new ones.
    pub fn merge(&mut self, other: World) -> EntityRemap {
        let mut remap = EntityRemap::new();
        let incoming: Vec<Entity> = other.iter_entities().collect();
        for &e in &incoming {
            remap.insert(e, self.spawn());
        }
        for e in incoming {
            let mut record = other.extract_record(e);
            record.map_entities(&mut |r| remap.get(r).unwrap_or_else(Entity::null));
            self.insert_record(remap.map(e), record);
        }
        remap
    }
}

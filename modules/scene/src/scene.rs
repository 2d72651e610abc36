//! Scenes hold the entities of a level together with their components and
//! the systems driving them.

use std::any::Any;
use std::iter;

use inlinable_string::InlinableString;

use lodge::errors::*;
use lodge::settings::Settings;
use lodge::utils::prelude::*;

use crate::component_set::{ComponentSet, TypedComponentSet};
use crate::system::{RenderParams, RenderPass, SceneVisitor, System};
use crate::types::prelude::*;
use crate::Entity;

/// Describes an entity to be added with `Scene::add_entity_from_desc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityDesc {
    /// The id of the new entity, or `None` to take the next one.
    #[serde(default)]
    pub id: Option<u32>,
    pub name: InlinableString,
    #[serde(default)]
    pub parent: Option<u32>,
}

impl EntityDesc {
    pub fn named<T: Into<InlinableString>>(name: T) -> Self {
        EntityDesc {
            id: None,
            name: name.into(),
            parent: None,
        }
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn parent(mut self, parent: Entity) -> Self {
        self.parent = Some(parent.id());
        self
    }
}

struct EntityInfo {
    name: InlinableString,
    parent: Option<Entity>,
}

struct SystemSlot {
    ty: SystemType,
    system: Option<Box<dyn System>>,
}

type RenderPassCallback = Box<dyn FnMut(&Scene, &RenderParams)>;

struct RenderPassSlot {
    pass: RenderPass,
    callback: Option<RenderPassCallback>,
}

/// A set of entities with their components, and the systems updating them.
///
/// Entity ids are 1-based and strictly increasing within a scene, a removed id
/// is never handed out again. The components of one type live in a single
/// sparse set keyed by entity id, created the first time the type is used.
pub struct Scene {
    entities: SparseSet<EntityInfo>,
    last_entity_id: u32,
    components: SparseSet<Box<dyn ComponentSet>>,
    systems: DynBuf<SystemSlot>,
    render_passes: DynBuf<RenderPassSlot>,
    time: f64,
    settings: Settings,
}

impl Default for Scene {
    fn default() -> Self {
        Scene::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Scene {
            entities: SparseSet::new(),
            last_entity_id: 0,
            components: SparseSet::new(),
            systems: DynBuf::new(),
            render_passes: DynBuf::new(),
            time: 0.0,
            settings: Settings::default(),
        }
    }

    /// Creates a scene whose entity and component sets use `settings`.
    pub fn with_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        Ok(Scene {
            entities: SparseSet::with_settings(settings.entities)?,
            last_entity_id: 0,
            components: SparseSet::new(),
            systems: DynBuf::new(),
            render_passes: DynBuf::new(),
            time: 0.0,
            settings: *settings,
        })
    }

    /// Get the number of entities in this scene.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The largest id handed out so far, zero for an empty scene.
    #[inline]
    pub fn last_entity_id(&self) -> u32 {
        self.last_entity_id
    }

    /// Checks if `entity` was created by this scene and has not been removed.
    #[inline]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(entity.id())
    }

    /// The time accumulated by `update`.
    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Adds an entity with default-constructed components of the given types.
    ///
    /// Without an explicit id the entity gets `last_entity_id() + 1`. An explicit
    /// id must be greater than every id handed out before. On failure the scene
    /// is left as it was, including `last_entity_id`.
    pub fn add_entity_from_desc(
        &mut self,
        types: &Types,
        desc: EntityDesc,
        components: &[ComponentType],
    ) -> Result<Entity> {
        for &ty in components {
            types.components.try_get(ty)?;
        }

        let last = self.last_entity_id;
        let entity = self.insert_entity(desc)?;
        for &ty in components {
            let added = self.add_entity_component(types, entity, ty).map(|_| ());
            if let Err(err) = added {
                // Destructs the components added so far.
                self.remove_entity(entity)?;
                self.last_entity_id = last;
                return Err(err);
            }
        }

        Ok(entity)
    }

    /// Adds a named entity without components.
    pub fn add_entity<T: Into<InlinableString>>(&mut self, name: T) -> Result<Entity> {
        self.insert_entity(EntityDesc::named(name))
    }

    /// Adds an entity with the components listed by an entity type.
    pub fn add_entity_of_type<T: Into<InlinableString>>(
        &mut self,
        types: &Types,
        ty: EntityType,
        name: T,
    ) -> Result<Entity> {
        let desc = types.entities.try_get(ty)?;
        self.add_entity_from_desc(types, EntityDesc::named(name), &desc.components)
    }

    /// Removes `entity` and destructs all of its components. Its children are
    /// kept and become roots.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<()> {
        if self.entities.remove(entity.id()).is_none() {
            return Err(Error::EntityNotFound(entity.id()));
        }

        for set in self.components.values_mut() {
            set.remove(entity);
        }

        for v in self.entities.values_mut() {
            if v.parent == Some(entity) {
                v.parent = None;
            }
        }

        trace!("Removes {} from scene.", entity);
        Ok(())
    }

    /// Adds a default-constructed component of type `ty` to `entity`, and
    /// returns it. An existing component is returned untouched.
    pub fn add_entity_component(
        &mut self,
        types: &Types,
        entity: Entity,
        ty: ComponentType,
    ) -> Result<&mut dyn Any> {
        if !self.contains(entity) {
            return Err(Error::EntityNotFound(entity.id()));
        }

        if !self.components.contains(ty.id()) {
            let set = types
                .components
                .try_get(ty)?
                .create_set(ty, self.settings.components)?;

            debug!(
                "Creates component set of '{}'.",
                types.components.name(ty).unwrap_or_default()
            );

            self.components.insert(ty.id(), set)?;
        }

        let set = self
            .components
            .get_mut(ty.id())
            .ok_or_else(|| Error::InvalidHandle(format!("{}", ty)))?;

        set.insert_default(entity)?;
        set.get_any_mut(entity)
            .ok_or_else(|| Error::ComponentTypeMismatch(format!("{}", ty)))
    }

    /// Gets the component of type `ty` of `entity`. Returns `None` if the entity
    /// has no such component, or if it is not stored as a `T`.
    pub fn get_entity_component<T: Default + Any>(
        &self,
        entity: Entity,
        ty: ComponentType,
    ) -> Option<&T> {
        self.typed_set::<T>(ty)?.get(entity)
    }

    pub fn get_entity_component_mut<T: Default + Any>(
        &mut self,
        entity: Entity,
        ty: ComponentType,
    ) -> Option<&mut T> {
        self.typed_set_mut::<T>(ty)?.get_mut(entity)
    }

    pub fn get_entity_component_any(&self, entity: Entity, ty: ComponentType) -> Option<&dyn Any> {
        self.components.get(ty.id())?.get_any(entity)
    }

    pub fn get_entity_component_any_mut(
        &mut self,
        entity: Entity,
        ty: ComponentType,
    ) -> Option<&mut dyn Any> {
        self.components.get_mut(ty.id())?.get_any_mut(entity)
    }

    #[inline]
    pub fn has_entity_component(&self, entity: Entity, ty: ComponentType) -> bool {
        self.components
            .get(ty.id())
            .map(|v| v.contains(entity))
            .unwrap_or(false)
    }

    /// Destructs the component of type `ty` of `entity`. Returns false if there
    /// was none.
    pub fn remove_entity_component(&mut self, entity: Entity, ty: ComponentType) -> bool {
        self.components
            .get_mut(ty.id())
            .map(|v| v.remove(entity))
            .unwrap_or(false)
    }

    /// Iterates over the components of type `ty` in dense order.
    pub fn components<T: Default + Any>(
        &self,
        ty: ComponentType,
    ) -> impl Iterator<Item = (Entity, &T)> {
        self.typed_set::<T>(ty).into_iter().flat_map(|v| v.iter())
    }

    pub fn components_mut<T: Default + Any>(
        &mut self,
        ty: ComponentType,
    ) -> impl Iterator<Item = (Entity, &mut T)> {
        self.typed_set_mut::<T>(ty)
            .into_iter()
            .flat_map(|v| v.iter_mut())
    }

    /// Iterates over the component types `entity` has. This visits every
    /// component set of the scene.
    pub fn entity_components(&self, entity: Entity) -> impl Iterator<Item = ComponentType> + '_ {
        self.components
            .values()
            .filter(move |v| v.contains(entity))
            .map(|v| v.component_type())
    }

    /// Iterates over the entities in dense order.
    #[inline]
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.keys().filter_map(Entity::from_id)
    }

    /// Get the name of this entity.
    #[inline]
    pub fn entity_name(&self, entity: Entity) -> Option<&str> {
        self.entities.get(entity.id()).map(|v| v.name.as_ref())
    }

    pub fn set_entity_name<T: Into<InlinableString>>(&mut self, entity: Entity, name: T) -> Result<()> {
        let info = self
            .entities
            .get_mut(entity.id())
            .ok_or(Error::EntityNotFound(entity.id()))?;

        info.name = name.into();
        Ok(())
    }

    #[inline]
    pub fn entity_parent(&self, entity: Entity) -> Option<Entity> {
        self.entities.get(entity.id()).and_then(|v| v.parent)
    }

    /// Sets the parent of `entity`. Parents only describe the hierarchy, they do
    /// not own their children.
    pub fn set_entity_parent(&mut self, entity: Entity, parent: Option<Entity>) -> Result<()> {
        if !self.contains(entity) {
            return Err(Error::EntityNotFound(entity.id()));
        }

        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(Error::EntityNotFound(parent.id()));
            }

            if parent == entity || self.ancestors(parent).any(|v| v == entity) {
                return Err(Error::CyclicParent {
                    entity: entity.id(),
                    parent: parent.id(),
                });
            }
        }

        if let Some(info) = self.entities.get_mut(entity.id()) {
            info.parent = parent;
        }

        Ok(())
    }

    /// Iterates over the parent chain of `entity`, nearest first.
    pub fn ancestors(&self, entity: Entity) -> impl Iterator<Item = Entity> + '_ {
        iter::successors(self.entity_parent(entity), move |&v| self.entity_parent(v))
    }

    /// Iterates over the direct children of `entity`.
    pub fn children(&self, entity: Entity) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .filter(move |(_, v)| v.parent == Some(entity))
            .filter_map(|(k, _)| Entity::from_id(k))
    }

    /// Iterates over the entities without parent.
    pub fn roots(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities
            .iter()
            .filter(|(_, v)| v.parent.is_none())
            .filter_map(|(k, _)| Entity::from_id(k))
    }

    /// Finds an entity by name and returns it.
    ///
    /// If name contains a '/' character, it traverses the hierarchy like a path
    /// name starting from the roots.
    pub fn find<N: AsRef<str>>(&self, name: N) -> Option<Entity> {
        let mut components = name.as_ref().split('/').filter(|v| !v.is_empty());
        let first = components.next()?;

        let mut iter = self.roots().find(|&v| self.entity_name(v) == Some(first))?;
        for component in components {
            iter = self
                .children(iter)
                .find(|&v| self.entity_name(v) == Some(component))?;
        }

        Some(iter)
    }

    /// Adds a system of type `ty`. The system constructor runs immediately and
    /// may itself modify the scene. A scene holds one system per type.
    pub fn add_system(&mut self, types: &Types, ty: SystemType) -> Result<()> {
        let desc = types.systems.try_get(ty)?;
        if self.systems.iter().any(|v| v.ty == ty) {
            return Err(Error::DuplicateName(desc.name().into()));
        }

        let system = desc.create(self);
        self.systems.append(SystemSlot {
            ty,
            system: Some(system),
        })?;

        info!("Adds system '{}' to scene.", desc.name());
        Ok(())
    }

    pub fn system<S: System>(&self, ty: SystemType) -> Option<&S> {
        let slot = self.systems.iter().find(|v| v.ty == ty)?;
        let system = slot.system.as_ref()?;
        (**system).as_any().downcast_ref::<S>()
    }

    pub fn system_mut<S: System>(&mut self, ty: SystemType) -> Option<&mut S> {
        let slot = self.systems.iter_mut().find(|v| v.ty == ty)?;
        let system = slot.system.as_mut()?;
        (**system).as_any_mut().downcast_mut::<S>()
    }

    /// Iterates over the system types of this scene in the order they were added.
    pub fn systems(&self) -> impl Iterator<Item = SystemType> + '_ {
        self.systems.iter().map(|v| v.ty)
    }

    /// Registers a callback invoked by `render` for `pass`, after every system
    /// rendered.
    pub fn add_render_pass_callback<F>(&mut self, pass: RenderPass, callback: F) -> Result<()>
    where
        F: FnMut(&Scene, &RenderParams) + 'static,
    {
        self.render_passes.append(RenderPassSlot {
            pass,
            callback: Some(Box::new(callback)),
        })?;

        Ok(())
    }

    /// Advances the scene time by `dt` and updates every system in order.
    /// Systems added during the update are updated in the same frame.
    pub fn update(&mut self, dt: f32) {
        self.time += f64::from(dt);

        let mut i = 0;
        while i < self.systems.len() {
            let ty = self.systems[i].ty;
            if let Some(mut system) = self.systems[i].system.take() {
                system.update(ty, self, dt);
                self.systems[i].system = Some(system);
            }

            i += 1;
        }
    }

    /// Renders every system in order, then invokes the callbacks registered for
    /// `params.pass`.
    pub fn render(&mut self, params: &RenderParams) {
        for i in 0..self.systems.len() {
            let ty = self.systems[i].ty;
            if let Some(mut system) = self.systems[i].system.take() {
                system.render(ty, self, params);
                self.systems[i].system = Some(system);
            }
        }

        for i in 0..self.render_passes.len() {
            if self.render_passes[i].pass != params.pass {
                continue;
            }

            if let Some(mut callback) = self.render_passes[i].callback.take() {
                callback(&*self, params);
                self.render_passes[i].callback = Some(callback);
            }
        }
    }

    /// Walks entities, their components and the systems of this scene.
    pub fn visit<V: SceneVisitor>(&self, types: &Types, visitor: &mut V) -> Result<()> {
        for (id, info) in self.entities.iter() {
            let entity = self.try_entity(id)?;
            visitor.visit_entity(entity, info.name.as_ref(), info.parent);

            for set in self.components.values() {
                if let Some(value) = set.get_any(entity) {
                    let ty = set.component_type();
                    let desc = types.components.try_get(ty)?;
                    visitor.visit_component(entity, ty, desc.name(), desc.properties(), value);
                }
            }
        }

        for slot in self.systems.iter() {
            if let Some(ref system) = slot.system {
                let desc = types.systems.try_get(slot.ty)?;
                visitor.visit_system(slot.ty, desc.name(), desc.properties(), (**system).as_any());
            }
        }

        Ok(())
    }

    fn insert_entity(&mut self, desc: EntityDesc) -> Result<Entity> {
        let last = self.last_entity_id;
        let entity = match desc.id {
            Some(id) if id > last => Entity::from_id(id),
            Some(id) => return Err(Error::EntityIdNotMonotonic { id, last }),
            None => last.checked_add(1).and_then(Entity::from_id),
        };

        let entity = entity.ok_or(Error::KeyOutOfRange {
            key: last,
            limit: self.entities.settings().key_limit(),
        })?;

        let parent = match desc.parent {
            Some(id) => Some(self.try_entity(id)?),
            None => None,
        };

        self.entities.insert(
            entity.id(),
            EntityInfo {
                name: desc.name,
                parent,
            },
        )?;

        self.last_entity_id = entity.id();
        trace!("Adds {} to scene.", entity);
        Ok(entity)
    }

    fn try_entity(&self, id: u32) -> Result<Entity> {
        Entity::from_id(id)
            .filter(|&v| self.contains(v))
            .ok_or(Error::EntityNotFound(id))
    }

    fn typed_set<T: Default + Any>(&self, ty: ComponentType) -> Option<&TypedComponentSet<T>> {
        self.components
            .get(ty.id())?
            .as_any()
            .downcast_ref::<TypedComponentSet<T>>()
    }

    fn typed_set_mut<T: Default + Any>(
        &mut self,
        ty: ComponentType,
    ) -> Option<&mut TypedComponentSet<T>> {
        self.components
            .get_mut(ty.id())?
            .as_any_mut()
            .downcast_mut::<TypedComponentSet<T>>()
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        let mut i = 0;
        while i < self.systems.len() {
            if let Some(mut system) = self.systems[i].system.take() {
                system.free(self);
            }

            i += 1;
        }

        for set in self.components.values_mut() {
            set.clear();
        }
    }
}

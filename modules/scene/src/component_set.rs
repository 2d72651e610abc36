//! Per-type component storage keyed by entity id.

use std::any::Any;

use lodge::errors::*;
use lodge::settings::SparseSetSettings;
use lodge::utils::prelude::*;

use crate::types::prelude::ComponentType;
use crate::Entity;

/// The type-erased view of the components of one type in a scene.
pub trait ComponentSet: Any {
    fn component_type(&self) -> ComponentType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, entity: Entity) -> bool;

    /// Adds a default-constructed component to `entity`. Returns false if the
    /// entity already had one, which is left untouched.
    fn insert_default(&mut self, entity: Entity) -> Result<bool>;

    /// Destructs and removes the component of `entity`.
    fn remove(&mut self, entity: Entity) -> bool;

    /// Iterates over the entities owning a component, in dense order.
    fn entities<'a>(&'a self) -> Box<dyn Iterator<Item = Entity> + 'a>;

    fn get_any(&self, entity: Entity) -> Option<&dyn Any>;

    fn get_any_mut(&mut self, entity: Entity) -> Option<&mut dyn Any>;

    /// Destructs and removes every component.
    fn clear(&mut self);

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Components of type `T`, stored densely and addressed by entity id.
pub struct TypedComponentSet<T> {
    ty: ComponentType,
    storage: SparseSet<T>,
    constructor: Option<fn(&mut T)>,
    destructor: Option<fn(&mut T)>,
}

impl<T: Default + Any> TypedComponentSet<T> {
    pub fn new(
        ty: ComponentType,
        settings: SparseSetSettings,
        constructor: Option<fn(&mut T)>,
        destructor: Option<fn(&mut T)>,
    ) -> Result<Self> {
        Ok(TypedComponentSet {
            ty,
            storage: SparseSet::with_settings(settings)?,
            constructor,
            destructor,
        })
    }

    #[inline]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.storage.get(entity.id())
    }

    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.storage.get_mut(entity.id())
    }

    /// Iterates over `(entity, component)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.storage
            .iter()
            .filter_map(|(k, v)| Entity::from_id(k).map(|e| (e, v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.storage
            .iter_mut()
            .filter_map(|(k, v)| Entity::from_id(k).map(|e| (e, v)))
    }

    /// Recovers the owning entity of a component borrowed from this set.
    #[inline]
    pub fn entity_of(&self, component: &T) -> Option<Entity> {
        self.storage.get_index(component).and_then(Entity::from_id)
    }
}

impl<T: Default + Any> ComponentSet for TypedComponentSet<T> {
    #[inline]
    fn component_type(&self) -> ComponentType {
        self.ty
    }

    #[inline]
    fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    fn contains(&self, entity: Entity) -> bool {
        self.storage.contains(entity.id())
    }

    fn insert_default(&mut self, entity: Entity) -> Result<bool> {
        if self.storage.contains(entity.id()) {
            return Ok(false);
        }

        let v = self.storage.get_or_insert_with(entity.id(), T::default)?;
        if let Some(f) = self.constructor {
            f(v);
        }

        Ok(true)
    }

    fn remove(&mut self, entity: Entity) -> bool {
        match self.storage.remove(entity.id()) {
            Some(mut v) => {
                if let Some(f) = self.destructor {
                    f(&mut v);
                }

                true
            }
            None => false,
        }
    }

    fn entities<'a>(&'a self) -> Box<dyn Iterator<Item = Entity> + 'a> {
        Box::new(self.storage.keys().filter_map(Entity::from_id))
    }

    fn get_any(&self, entity: Entity) -> Option<&dyn Any> {
        self.storage.get(entity.id()).map(|v| v as &dyn Any)
    }

    fn get_any_mut(&mut self, entity: Entity) -> Option<&mut dyn Any> {
        self.storage.get_mut(entity.id()).map(|v| v as &mut dyn Any)
    }

    fn clear(&mut self) {
        let destructor = self.destructor;
        for mut v in self.storage.drain() {
            if let Some(f) = destructor {
                f(&mut v);
            }
        }
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T> Drop for TypedComponentSet<T> {
    fn drop(&mut self) {
        if let Some(f) = self.destructor {
            for v in self.storage.values_mut() {
                f(v);
            }
        }
    }
}

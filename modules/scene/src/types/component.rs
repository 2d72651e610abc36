use std::any::{self, Any, TypeId};
use std::marker::PhantomData;
use std::mem;

use inlinable_string::{InlinableString, StringExt};
use smallvec::SmallVec;

use lodge::errors::*;
use lodge::settings::SparseSetSettings;

use super::property::Property;
use super::{ComponentTypes, TypeDesc};
use crate::component_set::{ComponentSet, TypedComponentSet};

impl_handle!(ComponentType);

/// The typed half of a component descriptor.
pub(crate) trait ComponentHooks {
    fn type_name(&self) -> &'static str;

    fn create_set(
        &self,
        ty: ComponentType,
        settings: SparseSetSettings,
    ) -> Result<Box<dyn ComponentSet>>;

    fn new_inplace(&self, dst: &mut dyn Any) -> Result<()>;

    fn free_inplace(&self, dst: &mut dyn Any) -> Result<()>;
}

struct Hooks<T> {
    constructor: Option<fn(&mut T)>,
    destructor: Option<fn(&mut T)>,
}

impl<T> Hooks<T> {
    fn downcast<'a>(&self, dst: &'a mut dyn Any) -> Result<&'a mut T>
    where
        T: Any,
    {
        dst.downcast_mut::<T>().ok_or_else(|| {
            Error::ComponentTypeMismatch(format!("expected {}", any::type_name::<T>()))
        })
    }
}

impl<T: Default + Any> ComponentHooks for Hooks<T> {
    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }

    fn create_set(
        &self,
        ty: ComponentType,
        settings: SparseSetSettings,
    ) -> Result<Box<dyn ComponentSet>> {
        let set = TypedComponentSet::<T>::new(ty, settings, self.constructor, self.destructor)?;
        Ok(Box::new(set))
    }

    fn new_inplace(&self, dst: &mut dyn Any) -> Result<()> {
        let dst = self.downcast(dst)?;
        if let Some(f) = self.constructor {
            f(dst);
        }

        Ok(())
    }

    fn free_inplace(&self, dst: &mut dyn Any) -> Result<()> {
        let dst = self.downcast(dst)?;
        if let Some(f) = self.destructor {
            f(dst);
        }

        Ok(())
    }
}

/// Describes a component type: its payload, lifecycle callbacks and
/// reflected properties.
pub struct ComponentTypeDesc {
    name: InlinableString,
    description: InlinableString,
    size: usize,
    type_id: TypeId,
    properties: SmallVec<[Property; 8]>,
    hooks: Box<dyn ComponentHooks>,
}

impl ComponentTypeDesc {
    /// Starts describing the component type `T`, stored by value in the scene.
    pub fn new<T: Default + Any>(name: &str) -> ComponentTypeBuilder<T> {
        ComponentTypeBuilder {
            name: name.into(),
            description: InlinableString::new(),
            properties: SmallVec::new(),
            constructor: None,
            destructor: None,
            _phantom: PhantomData,
        }
    }

    /// The size of the payload in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// The Rust type the component is stored as.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.hooks.type_name()
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    #[inline]
    pub(crate) fn create_set(
        &self,
        ty: ComponentType,
        settings: SparseSetSettings,
    ) -> Result<Box<dyn ComponentSet>> {
        self.hooks.create_set(ty, settings)
    }

    /// Runs the constructor on `dst`, which must be a value of the registered
    /// type. Does nothing without a constructor.
    #[inline]
    pub fn new_inplace(&self, dst: &mut dyn Any) -> Result<()> {
        self.hooks.new_inplace(dst)
    }

    /// Runs the destructor on `dst`. Does nothing without a destructor.
    #[inline]
    pub fn free_inplace(&self, dst: &mut dyn Any) -> Result<()> {
        self.hooks.free_inplace(dst)
    }
}

impl TypeDesc for ComponentTypeDesc {
    fn name(&self) -> &str {
        self.name.as_ref()
    }

    fn description(&self) -> &str {
        self.description.as_ref()
    }
}

/// Builds a `ComponentTypeDesc` for `T`.
pub struct ComponentTypeBuilder<T> {
    name: InlinableString,
    description: InlinableString,
    properties: SmallVec<[Property; 8]>,
    constructor: Option<fn(&mut T)>,
    destructor: Option<fn(&mut T)>,
    _phantom: PhantomData<T>,
}

impl<T: Default + Any> ComponentTypeBuilder<T> {
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the callback run on a freshly defaulted component.
    pub fn constructor(mut self, f: fn(&mut T)) -> Self {
        self.constructor = Some(f);
        self
    }

    /// Sets the callback run before a component is dropped.
    pub fn destructor(mut self, f: fn(&mut T)) -> Self {
        self.destructor = Some(f);
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self) -> ComponentTypeDesc {
        ComponentTypeDesc {
            name: self.name,
            description: self.description,
            size: mem::size_of::<T>(),
            type_id: TypeId::of::<T>(),
            properties: self.properties,
            hooks: Box::new(Hooks {
                constructor: self.constructor,
                destructor: self.destructor,
            }),
        }
    }
}

impl<T: Default + Any> From<ComponentTypeBuilder<T>> for ComponentTypeDesc {
    fn from(builder: ComponentTypeBuilder<T>) -> Self {
        builder.build()
    }
}

impl ComponentTypes {
    #[inline]
    pub fn size(&self, ty: ComponentType) -> Option<usize> {
        self.get(ty).map(|v| v.size())
    }

    #[inline]
    pub fn properties(&self, ty: ComponentType) -> Option<&[Property]> {
        self.get(ty).map(|v| v.properties())
    }

    /// Runs the constructor of `ty` on `dst`.
    pub fn new_inplace(&self, ty: ComponentType, dst: &mut dyn Any) -> Result<()> {
        self.try_get(ty)?.new_inplace(dst)
    }

    /// Runs the destructor of `ty` on `dst`.
    pub fn free_inplace(&self, ty: ComponentType, dst: &mut dyn Any) -> Result<()> {
        self.try_get(ty)?.free_inplace(dst)
    }
}

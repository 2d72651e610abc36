//! Registries of component, entity and system types.
//!
//! Types are registered once during startup into a `Types` value, which is then
//! passed by reference to every scene operation that needs a descriptor. There
//! is no global state, independent `Types` can coexist (one per test, say).
//!
//! Every registry holds at most `MAX_TYPES` descriptors. Handles are 1-based,
//! the first type registered gets id 1.

pub mod component;
pub mod entity;
pub mod property;
pub mod system;

pub mod prelude {
    pub use super::component::{ComponentType, ComponentTypeBuilder, ComponentTypeDesc};
    pub use super::entity::{EntityType, EntityTypeDesc};
    pub use super::property::{Property, PropertyFlags, PropertyKind};
    pub use super::system::{SystemType, SystemTypeBuilder, SystemTypeDesc};
    pub use super::{ComponentTypes, EntityTypes, SystemTypes, TypeDesc, TypeRegistry, Types};
}

use std::marker::PhantomData;

use lodge::errors::*;
use lodge::utils::prelude::*;

use self::component::{ComponentType, ComponentTypeDesc};
use self::entity::{EntityType, EntityTypeDesc};
use self::system::{SystemType, SystemTypeDesc};

/// The capacity of every type registry.
pub const MAX_TYPES: usize = 256;

/// Common behaviour of descriptors kept in a `TypeRegistry`.
pub trait TypeDesc {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Checks the descriptor before it is registered.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// A fixed-capacity table of type descriptors addressed by handles of type `H`.
pub struct TypeRegistry<D, H> {
    descs: DynBuf<D>,
    _phantom: PhantomData<H>,
}

impl<D, H> Default for TypeRegistry<D, H> {
    fn default() -> Self {
        TypeRegistry {
            descs: DynBuf::new(),
            _phantom: PhantomData,
        }
    }
}

impl<D: TypeDesc, H: HandleLike + ::std::fmt::Display> TypeRegistry<D, H> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers a descriptor and returns its handle.
    ///
    /// Names are unique within a registry.
    pub fn register<T: Into<D>>(&mut self, desc: T) -> Result<H> {
        let desc = desc.into();
        desc.validate()?;

        if self.find(desc.name()).is_some() {
            return Err(Error::DuplicateName(desc.name().into()));
        }

        if self.descs.len() >= MAX_TYPES {
            return Err(Error::RegistryFull(MAX_TYPES));
        }

        let handle = H::from_index(self.descs.len()).ok_or(Error::RegistryFull(MAX_TYPES))?;
        info!("Registers '{}' as {}.", desc.name(), handle);

        self.descs.append(desc)?;
        Ok(handle)
    }

    /// Finds a type by name.
    pub fn find(&self, name: &str) -> Option<H> {
        self.descs
            .find(|v| v.name() == name)
            .and_then(H::from_index)
    }

    #[inline]
    pub fn get(&self, handle: H) -> Option<&D> {
        self.descs.get(handle.index())
    }

    /// Gets the descriptor of `handle`, failing if it was not registered here.
    pub fn try_get(&self, handle: H) -> Result<&D> {
        self.descs
            .get(handle.index())
            .ok_or_else(|| Error::InvalidHandle(format!("{}", handle)))
    }

    #[inline]
    pub fn name(&self, handle: H) -> Option<&str> {
        self.get(handle).map(|v| v.name())
    }

    #[inline]
    pub fn description(&self, handle: H) -> Option<&str> {
        self.get(handle).map(|v| v.description())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descs.is_empty()
    }

    /// Iterates over the registered types in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (H, &D)> {
        self.descs
            .iter()
            .enumerate()
            .filter_map(|(i, v)| H::from_index(i).map(|h| (h, v)))
    }
}

pub type ComponentTypes = TypeRegistry<ComponentTypeDesc, ComponentType>;
pub type EntityTypes = TypeRegistry<EntityTypeDesc, EntityType>;
pub type SystemTypes = TypeRegistry<SystemTypeDesc, SystemType>;

/// The type registries of an application.
#[derive(Default)]
pub struct Types {
    pub components: ComponentTypes,
    pub entities: EntityTypes,
    pub systems: SystemTypes,
}

impl Types {
    pub fn new() -> Self {
        Default::default()
    }
}

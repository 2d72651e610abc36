use std::any::{self, TypeId};
use std::marker::PhantomData;
use std::mem;

use inlinable_string::{InlinableString, StringExt};
use smallvec::SmallVec;

use lodge::errors::*;

use super::property::Property;
use super::{SystemTypes, TypeDesc};
use crate::scene::Scene;
use crate::system::System;

impl_handle!(SystemType);

type SystemCtor = Box<dyn Fn(&mut Scene) -> Box<dyn System>>;

/// Describes a system type: how to construct its state and which fields of
/// that state are reflected.
pub struct SystemTypeDesc {
    name: InlinableString,
    description: InlinableString,
    size: usize,
    type_id: TypeId,
    type_name: &'static str,
    properties: SmallVec<[Property; 8]>,
    ctor: SystemCtor,
}

impl SystemTypeDesc {
    /// Starts describing the system `S`. The constructor runs when the system
    /// is added to a scene, and may add entities or render-pass callbacks.
    pub fn new<S: System>(name: &str, ctor: fn(&mut Scene) -> S) -> SystemTypeBuilder<S> {
        SystemTypeBuilder {
            name: name.into(),
            description: InlinableString::new(),
            properties: SmallVec::new(),
            ctor,
            _phantom: PhantomData,
        }
    }

    /// The size of the system state in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn is<S: System>(&self) -> bool {
        self.type_id == TypeId::of::<S>()
    }

    pub(crate) fn create(&self, scene: &mut Scene) -> Box<dyn System> {
        (self.ctor)(scene)
    }
}

impl TypeDesc for SystemTypeDesc {
    fn name(&self) -> &str {
        self.name.as_ref()
    }

    fn description(&self) -> &str {
        self.description.as_ref()
    }

    fn validate(&self) -> Result<()> {
        for (i, v) in self.properties.iter().enumerate() {
            for w in &self.properties[..i] {
                if w.name == v.name {
                    return Err(Error::InvalidProperty(format!(
                        "'{}' of system '{}' is declared twice",
                        v.name, self.name
                    )));
                }

                if w.offset == v.offset {
                    return Err(Error::InvalidProperty(format!(
                        "'{}' and '{}' of system '{}' share offset {}",
                        w.name, v.name, self.name, v.offset
                    )));
                }
            }

            if v.end() > self.size {
                return Err(Error::InvalidProperty(format!(
                    "'{}' of system '{}' ends at {}, past the state size {}",
                    v.name,
                    self.name,
                    v.end(),
                    self.size
                )));
            }
        }

        Ok(())
    }
}

/// Builds a `SystemTypeDesc` for `S`.
pub struct SystemTypeBuilder<S> {
    name: InlinableString,
    description: InlinableString,
    properties: SmallVec<[Property; 8]>,
    ctor: fn(&mut Scene) -> S,
    _phantom: PhantomData<S>,
}

impl<S: System> SystemTypeBuilder<S> {
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.into();
        self
    }

    pub fn property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn build(self) -> SystemTypeDesc {
        let ctor = self.ctor;
        SystemTypeDesc {
            name: self.name,
            description: self.description,
            size: mem::size_of::<S>(),
            type_id: TypeId::of::<S>(),
            type_name: any::type_name::<S>(),
            properties: self.properties,
            ctor: Box::new(move |scene: &mut Scene| Box::new(ctor(scene)) as Box<dyn System>),
        }
    }
}

impl<S: System> From<SystemTypeBuilder<S>> for SystemTypeDesc {
    fn from(builder: SystemTypeBuilder<S>) -> Self {
        builder.build()
    }
}

impl SystemTypes {
    #[inline]
    pub fn size(&self, ty: SystemType) -> Option<usize> {
        self.get(ty).map(|v| v.size())
    }

    #[inline]
    pub fn properties(&self, ty: SystemType) -> Option<&[Property]> {
        self.get(ty).map(|v| v.properties())
    }
}

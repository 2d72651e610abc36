//! Reflection data describing the fields of components and systems.

use std::any::Any;
use std::fmt;
use std::mem;
use std::ops::{BitOr, BitOrAssign};

use inlinable_string::InlinableString;

use lodge::res::Asset;

use crate::Entity;

/// The value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    U32,
    I32,
    F32,
    F64,
    Vec2,
    Vec3,
    Vec4,
    String,
    Asset,
    Entity,
}

impl PropertyKind {
    /// Returns the number of bytes a field of this kind occupies.
    pub fn size(self) -> usize {
        match self {
            PropertyKind::Bool => mem::size_of::<bool>(),
            PropertyKind::U32 => mem::size_of::<u32>(),
            PropertyKind::I32 => mem::size_of::<i32>(),
            PropertyKind::F32 => mem::size_of::<f32>(),
            PropertyKind::F64 => mem::size_of::<f64>(),
            PropertyKind::Vec2 => mem::size_of::<[f32; 2]>(),
            PropertyKind::Vec3 => mem::size_of::<[f32; 3]>(),
            PropertyKind::Vec4 => mem::size_of::<[f32; 4]>(),
            PropertyKind::String => mem::size_of::<String>(),
            PropertyKind::Asset => mem::size_of::<Option<Asset>>(),
            PropertyKind::Entity => mem::size_of::<Option<Entity>>(),
        }
    }
}

/// A set of `PropertyFlags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropertyFlags(u32);

impl PropertyFlags {
    pub const NONE: PropertyFlags = PropertyFlags(0);
    /// The property is not serialized.
    pub const TRANSIENT: PropertyFlags = PropertyFlags(1 << 0);
    /// The property can not be edited.
    pub const READ_ONLY: PropertyFlags = PropertyFlags(1 << 1);
    /// The property is not shown in editors.
    pub const HIDDEN: PropertyFlags = PropertyFlags(1 << 2);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if every flag of `other` is set.
    #[inline]
    pub fn contains(self, other: PropertyFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for PropertyFlags {
    type Output = PropertyFlags;

    fn bitor(self, rhs: PropertyFlags) -> PropertyFlags {
        PropertyFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyFlags {
    fn bitor_assign(&mut self, rhs: PropertyFlags) {
        self.0 |= rhs.0;
    }
}

/// A named, typed field at a byte offset of a component or system.
#[derive(Clone)]
pub struct Property {
    pub name: InlinableString,
    pub offset: usize,
    pub kind: PropertyKind,
    pub flags: PropertyFlags,
    /// Invoked with the owning value after an editor changed the property.
    pub on_modified: Option<fn(&mut dyn Any)>,
}

impl Property {
    pub fn new<T: Into<InlinableString>>(name: T, offset: usize, kind: PropertyKind) -> Self {
        Property {
            name: name.into(),
            offset,
            kind,
            flags: PropertyFlags::NONE,
            on_modified: None,
        }
    }

    pub fn flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn on_modified(mut self, f: fn(&mut dyn Any)) -> Self {
        self.on_modified = Some(f);
        self
    }

    /// The first byte past this property.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.kind.size()
    }

    /// Notifies the owner that this property was edited.
    pub fn modified(&self, owner: &mut dyn Any) {
        if let Some(f) = self.on_modified {
            f(owner);
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("on_modified", &self.on_modified.is_some())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(PropertyKind::Bool.size(), 1);
        assert_eq!(PropertyKind::F64.size(), 8);
        assert_eq!(PropertyKind::Vec3.size(), 12);
        assert_eq!(PropertyKind::Entity.size(), 4);
        assert_eq!(PropertyKind::Asset.size(), 4);
    }

    #[test]
    fn flags() {
        let flags = PropertyFlags::TRANSIENT | PropertyFlags::HIDDEN;
        assert!(flags.contains(PropertyFlags::TRANSIENT));
        assert!(flags.contains(PropertyFlags::HIDDEN));
        assert!(!flags.contains(PropertyFlags::READ_ONLY));
        assert!(flags.contains(PropertyFlags::NONE));
        assert_eq!(flags.bits(), 0b101);
    }

    #[test]
    fn modified() {
        fn bump(v: &mut dyn Any) {
            if let Some(v) = v.downcast_mut::<u32>() {
                *v += 1;
            }
        }

        let property = Property::new("speed", 0, PropertyKind::U32).on_modified(bump);
        let mut value = 1u32;
        property.modified(&mut value);
        assert_eq!(value, 2);
        assert_eq!(property.end(), 4);
    }
}

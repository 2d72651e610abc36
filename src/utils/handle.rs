//! Opaque, 1-based handles.
//!
//! A handle is a `NonZeroU32` storing `index + 1`, so the "no handle" state is
//! spelled `Option<Handle>` and costs nothing extra. Handles are only meaningful
//! to the table that produced them.

use std::fmt;
use std::num::NonZeroU32;

/// `HandleIndex` type is arbitrary. Keeping it 32-bits allows handles to be used
/// directly as sparse set keys.
pub type HandleIndex = u32;

/// Common behaviour of every handle type declared with `impl_handle!`.
pub trait HandleLike: fmt::Debug + Copy + Eq + ::std::hash::Hash + Send + Sync {
    /// Constructs a handle from the 1-based id. Returns `None` for zero.
    fn from_id(id: HandleIndex) -> Option<Self>;

    /// Returns the 1-based id.
    fn id(self) -> HandleIndex;

    /// Constructs a handle addressing the 0-based `index` of a table.
    #[inline]
    fn from_index(index: usize) -> Option<Self> {
        if index >= HandleIndex::max_value() as usize {
            return None;
        }

        Self::from_id(index as HandleIndex + 1)
    }

    /// Returns the 0-based index into the owning table.
    #[inline]
    fn index(self) -> usize {
        (self.id() - 1) as usize
    }
}

/// The untyped handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(NonZeroU32);

impl HandleLike for Handle {
    #[inline]
    fn from_id(id: HandleIndex) -> Option<Self> {
        NonZeroU32::new(id).map(Handle)
    }

    #[inline]
    fn id(self) -> HandleIndex {
        self.0.get()
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Handle ({})", self.0)
    }
}

/// Declares a type-safe handle.
#[macro_export]
macro_rules! impl_handle {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name($crate::utils::handle::Handle);

        impl From<$name> for $crate::utils::handle::Handle {
            fn from(handle: $name) -> Self {
                handle.0
            }
        }

        impl From<$crate::utils::handle::Handle> for $name {
            fn from(handle: $crate::utils::handle::Handle) -> Self {
                $name(handle)
            }
        }

        impl $crate::utils::handle::HandleLike for $name {
            #[inline]
            fn from_id(id: $crate::utils::handle::HandleIndex) -> Option<Self> {
                <$crate::utils::handle::Handle as $crate::utils::handle::HandleLike>::from_id(id)
                    .map($name)
            }

            #[inline]
            fn id(self) -> $crate::utils::handle::HandleIndex {
                $crate::utils::handle::HandleLike::id(self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(
                    f,
                    "{} ({})",
                    stringify!($name),
                    $crate::utils::handle::HandleLike::id(*self)
                )
            }
        }
    };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn basic() {
        assert!(Handle::from_id(0).is_none());

        let h = Handle::from_id(3).unwrap();
        assert_eq!(h.id(), 3);
        assert_eq!(h.index(), 2);
        assert_eq!(Handle::from_index(2), Some(h));
        assert_eq!(::std::mem::size_of::<Option<Handle>>(), 4);
    }

    #[test]
    fn container() {
        use crate::utils::hash::FastHashSet;

        let h1 = Handle::from_id(1).unwrap();
        let h2 = Handle::from_id(2).unwrap();
        let h3 = Handle::from_index(0).unwrap();

        let mut set = FastHashSet::default();
        assert_eq!(set.insert(h1), true);
        assert_eq!(set.insert(h2), true);
        assert_eq!(set.insert(h3), false);
        assert_eq!(set.len(), 2);
    }

    impl_handle!(TypeSafeHandle);

    #[test]
    fn type_safe_handle() {
        let h1 = TypeSafeHandle::from_index(4).unwrap();
        assert_eq!(h1.id(), 5);
        assert_eq!(Handle::from(h1), Handle::from_id(5).unwrap());
        assert_eq!(format!("{}", h1), "TypeSafeHandle (5)");
    }
}

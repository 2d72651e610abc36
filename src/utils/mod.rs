//! Commonly used utilities like handles, hashes and packed containers.

#[macro_use]
pub mod handle;
pub mod dynbuf;
pub mod hash;
pub mod sparse_set;

pub use self::dynbuf::DynBuf;
pub use self::handle::{Handle, HandleIndex, HandleLike};
pub use self::hash::{hash64, FastHashMap, FastHashSet, HashValue};
pub use self::sparse_set::SparseSet;

pub mod prelude {
    pub use super::dynbuf::DynBuf;
    pub use super::handle::{Handle, HandleIndex, HandleLike};
    pub use super::hash::HashValue;
    pub use super::sparse_set::SparseSet;
}

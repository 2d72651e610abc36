//! # What is This?
//!
//! `lodge` is the storage core of the lodge engine. It provides the packed
//! containers every subsystem builds on, and a registry of named assets that
//! are loaded lazily and invalidated through a listener graph.
//!
//! * [`utils::sparse_set`] maps arbitrary 32-bit keys onto a gap-free dense
//!   array, with O(1) insertion, lookup and swap-removal.
//! * [`utils::dynbuf`] is a growable array with explicit doubling growth.
//! * [`res`] holds the `AssetLibrary`, its typed `Assets<T>` registries and the
//!   `AssetLoader` contract.
//!
//! Entities, components and systems live in the `lodge-scene` module crate,
//! which is built on the containers of this crate.
//!
//! Every structure here is single-threaded and synchronous. References handed
//! out by a container are invalidated by the next insertion into it.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;
extern crate inlinable_string;
extern crate serde_json;
extern crate smallvec;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod res;
pub mod settings;

pub mod prelude {
    pub use crate::errors::{Error, Result};
    pub use crate::res::prelude::*;
    pub use crate::settings::{Settings, SparseSetSettings};
    pub use crate::utils::prelude::*;
}

//! Entities, components and systems.
//!
//! A `Scene` owns a set of entities identified by monotonic ids, one sparse
//! component set per component type that has been used in it, and the list of
//! systems that are updated and rendered every frame. Component, entity and
//! system types are described once at startup in a `Types` value.
//!
//! ```rust
//! use lodge_scene::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Health(u32);
//!
//! fn full(v: &mut Health) {
//!     v.0 = 100;
//! }
//!
//! let mut types = Types::new();
//! let health = types
//!     .components
//!     .register(ComponentTypeDesc::new::<Health>("health").constructor(full))
//!     .unwrap();
//!
//! let mut scene = Scene::new();
//! let player = scene.add_entity_from_desc(&types, EntityDesc::named("player"), &[health]).unwrap();
//! assert_eq!(scene.get_entity_component::<Health>(player, health).unwrap().0, 100);
//! ```

#[macro_use]
extern crate lodge;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

extern crate inlinable_string;
extern crate smallvec;

pub mod component_set;
pub mod scene;
pub mod system;
pub mod types;

pub mod prelude {
    pub use super::component_set::{ComponentSet, TypedComponentSet};
    pub use super::scene::{EntityDesc, Scene};
    pub use super::system::{RenderParams, RenderPass, SceneVisitor, System};
    pub use super::types::prelude::*;
    pub use super::Entity;
}

impl_handle!(Entity);

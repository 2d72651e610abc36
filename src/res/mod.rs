//! Named assets, loaded lazily and invalidated through a listener graph.
//!
//! # Registries
//!
//! Assets of one kind (shaders, textures, scene files, ...) are kept in an
//! `Assets<T>` registry. A registry is added to the `AssetLibrary` together with
//! an `AssetLoader<T>`, and is addressed by the returned `AssetsId` from then on.
//!
//! # Lifetime of an asset
//!
//! Registering a name only allocates an `Asset` handle. The payload is produced
//! by the loader the first time somebody asks for it:
//!
//! ```text
//! Registered --get--> Loaded --invalidate--> Registered --get--> Loaded ...
//! ```
//!
//! Registration is idempotent by name, registering the same name twice returns
//! the same handle. A failed load is not cached, the next `get` tries again.
//!
//! # Listeners
//!
//! Any asset can listen on any other asset, across registries. Invalidating an
//! asset (or replacing its payload with `set`) invalidates every asset listening
//! on it, transitively. Listener cycles are allowed, every payload is freed at
//! most once per invalidation.
//!
//! ```rust
//! use lodge::res::prelude::*;
//!
//! let mut library = AssetLibrary::new();
//! let sources = library
//!     .add_registry_with("sources", |ctx| Ok(format!("// {}", ctx.name())))
//!     .unwrap();
//!
//! let asset = library.register(sources, "foo.glsl").unwrap();
//! assert_eq!(library.register(sources, "foo.glsl").unwrap(), asset);
//! assert_eq!(*library.get::<String>(sources, asset).unwrap(), "// foo.glsl");
//! ```

pub mod assets;
pub mod library;
pub mod loader;

pub mod prelude {
    pub use super::assets::{AssetInfo, Assets};
    pub use super::library::AssetLibrary;
    pub use super::loader::{AssetLoader, LoadContext};
    pub use super::{Asset, AssetsId};
}

/// The number of userdata slots every registry carries.
pub const MAX_USERDATA: usize = 16;

impl_handle!(Asset);
impl_handle!(AssetsId);

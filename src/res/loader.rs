use std::any::Any;
use std::cell::Ref;

use failure::Error;

use super::library::AssetLibrary;
use super::{Asset, AssetsId, MAX_USERDATA};

/// The environment a loader runs in.
///
/// The registry that owns the asset being loaded is borrowed for the duration of
/// the call. Reaching into that same registry through `library()` fails with
/// `Error::Reentrant`, every other registry is available.
pub struct LoadContext<'a> {
    pub(crate) library: &'a AssetLibrary,
    pub(crate) id: AssetsId,
    pub(crate) asset: Asset,
    pub(crate) name: &'a str,
    pub(crate) userdata: &'a [Option<Box<dyn Any>>; MAX_USERDATA],
}

impl<'a> LoadContext<'a> {
    /// The registered name of the asset, used as the load key.
    #[inline]
    pub fn name(&self) -> &str {
        self.name
    }

    #[inline]
    pub fn asset(&self) -> Asset {
        self.asset
    }

    /// The registry the asset belongs to.
    #[inline]
    pub fn id(&self) -> AssetsId {
        self.id
    }

    #[inline]
    pub fn library(&self) -> &'a AssetLibrary {
        self.library
    }

    /// Gets the userdata stored at `slot` of the loading registry.
    pub fn userdata<U: Any>(&self, slot: usize) -> Option<&U> {
        self.userdata
            .get(slot)
            .and_then(|v| v.as_ref())
            .and_then(|v| v.downcast_ref::<U>())
    }

    /// Makes the asset being loaded listen on `asset` of registry `id`, so it is
    /// invalidated together with it.
    ///
    /// `id` must be another registry. The loading registry is borrowed, so
    /// depending on one of its own assets fails with `Error::Reentrant`. Such
    /// links are added with `AssetLibrary::add_listener` once the load returned.
    pub fn depends_on(&self, id: AssetsId, asset: Asset) -> crate::errors::Result<()> {
        self.library.add_listener(id, asset, self.id, self.asset)
    }

    /// Loads a dependency from another registry and records the dependency.
    pub fn load_dependency<T: Any>(
        &self,
        id: AssetsId,
        asset: Asset,
    ) -> crate::errors::Result<Ref<'a, T>> {
        self.depends_on(id, asset)?;
        self.library.try_get::<T>(id, asset)
    }
}

/// Produces and releases the payloads of one asset registry.
pub trait AssetLoader<T>: 'static {
    /// Materializes the payload of `ctx.name()`.
    fn load(&mut self, ctx: &LoadContext) -> Result<T, Error>;

    /// Materializes a placeholder payload for `AssetLibrary::make_default`.
    /// Returns `None` if this loader has no dedicated placeholder, in which
    /// case `load` is used.
    fn load_default(&mut self, _: &LoadContext) -> Option<Result<T, Error>> {
        None
    }

    /// Refreshes a loaded payload in place.
    fn reload(&mut self, ctx: &LoadContext, value: &mut T) -> Result<(), Error> {
        *value = self.load(ctx)?;
        Ok(())
    }

    /// Releases a payload that is being invalidated.
    fn free(&mut self, value: T) {
        drop(value);
    }
}

impl<T, F> AssetLoader<T> for F
where
    F: FnMut(&LoadContext) -> Result<T, Error> + 'static,
{
    fn load(&mut self, ctx: &LoadContext) -> Result<T, Error> {
        (self)(ctx)
    }
}

//! The `AssetLibrary` owns every asset registry and routes invalidation across
//! them.

use std::any::{self, Any};
use std::cell::{Ref, RefCell, RefMut};

use inlinable_string::InlinableString;
use smallvec::SmallVec;

use crate::errors::*;
use crate::settings::{Settings, SparseSetSettings};
use crate::utils::prelude::*;
use crate::utils::FastHashSet;

use super::assets::{Assets, ErasedAssets};
use super::loader::{AssetLoader, LoadContext};
use super::{Asset, AssetsId};

struct Registry {
    name: InlinableString,
    assets: RefCell<Box<dyn ErasedAssets>>,
}

impl Registry {
    #[inline]
    fn name(&self) -> &str {
        self.name.as_ref()
    }

    fn borrow(&self) -> Result<Ref<Box<dyn ErasedAssets>>> {
        self.assets
            .try_borrow()
            .map_err(|_| Error::Reentrant(self.name.to_string()))
    }

    fn borrow_mut(&self) -> Result<RefMut<Box<dyn ErasedAssets>>> {
        self.assets
            .try_borrow_mut()
            .map_err(|_| Error::Reentrant(self.name.to_string()))
    }

    fn typed<T: 'static>(&self) -> Result<Ref<Assets<T>>> {
        Ref::filter_map(self.borrow()?, |v| v.as_any().downcast_ref::<Assets<T>>())
            .map_err(|_| self.mismatch::<T>())
    }

    fn typed_mut<T: 'static>(&self) -> Result<RefMut<Assets<T>>> {
        RefMut::filter_map(self.borrow_mut()?, |v| {
            v.as_any_mut().downcast_mut::<Assets<T>>()
        })
        .map_err(|_| self.mismatch::<T>())
    }

    fn mismatch<T: 'static>(&self) -> Error {
        Error::AssetTypeMismatch {
            name: self.name.to_string(),
            expected: any::type_name::<T>(),
        }
    }
}

/// The set of asset registries of an application.
///
/// Every operation takes `&self`: a loader receives the library through its
/// `LoadContext` and may register, load or listen on assets of other registries
/// while it runs.
pub struct AssetLibrary {
    registries: DynBuf<Registry>,
    settings: SparseSetSettings,
}

impl Default for AssetLibrary {
    fn default() -> Self {
        AssetLibrary::new()
    }
}

impl AssetLibrary {
    /// Creates a new and empty `AssetLibrary`.
    pub fn new() -> Self {
        AssetLibrary::with_settings(&Settings::default())
    }

    /// Creates a library whose registries lay their payloads out with
    /// `settings.assets`.
    pub fn with_settings(settings: &Settings) -> Self {
        AssetLibrary {
            registries: DynBuf::new(),
            settings: settings.assets,
        }
    }

    /// Adds a registry of `T` with the given loader.
    pub fn add_registry<T, L>(&mut self, name: &str, loader: L) -> Result<AssetsId>
    where
        T: 'static,
        L: AssetLoader<T>,
    {
        self.insert_registry::<T>(name, Some(Box::new(loader)))
    }

    /// Adds a registry of `T` loading its payloads with the closure `f`.
    pub fn add_registry_with<T, F>(&mut self, name: &str, f: F) -> Result<AssetsId>
    where
        T: 'static,
        F: FnMut(&LoadContext) -> ::std::result::Result<T, failure::Error> + 'static,
    {
        self.insert_registry::<T>(name, Some(Box::new(f)))
    }

    /// Adds a registry of `T` whose payloads can only be provided with `set`.
    pub fn add_registry_without_loader<T: 'static>(&mut self, name: &str) -> Result<AssetsId> {
        self.insert_registry::<T>(name, None)
    }

    fn insert_registry<T: 'static>(
        &mut self,
        name: &str,
        loader: Option<Box<dyn AssetLoader<T>>>,
    ) -> Result<AssetsId> {
        if self.find_registry(name).is_some() {
            return Err(Error::DuplicateName(name.into()));
        }

        let id = AssetsId::from_index(self.registries.len())
            .ok_or_else(|| Error::RegistryFull(self.registries.len()))?;

        let assets = Assets::<T>::new(id, name, self.settings, loader)?;
        self.registries.append(Registry {
            name: name.into(),
            assets: RefCell::new(Box::new(assets)),
        })?;

        info!("Adds asset registry '{}' as {}.", name, id);
        Ok(id)
    }

    /// Finds a registry by name.
    pub fn find_registry(&self, name: &str) -> Option<AssetsId> {
        self.registries
            .find(|v| v.name() == name)
            .and_then(AssetsId::from_index)
    }

    #[inline]
    pub fn registry_name(&self, id: AssetsId) -> Option<&str> {
        self.registries.get(id.index()).map(|v| v.name())
    }

    /// Returns the number of registries.
    #[inline]
    pub fn registry_count(&self) -> usize {
        self.registries.len()
    }

    /// Borrows the typed registry `id`.
    pub fn assets<T: 'static>(&self, id: AssetsId) -> Result<Ref<Assets<T>>> {
        self.registry(id)?.typed::<T>()
    }

    /// Registers `name` in registry `id`. Registering a name that is known
    /// already returns the same handle and leaves the registry untouched.
    pub fn register(&self, id: AssetsId, name: &str) -> Result<Asset> {
        self.registry(id)?.borrow_mut()?.table_mut().register(name)
    }

    pub fn find_by_name(&self, id: AssetsId, name: &str) -> Option<Asset> {
        let assets = self.registry(id).ok()?.borrow().ok()?;
        assets.table().find_by_name(name)
    }

    /// Finds an asset by the hash of its name, without hashing a string.
    pub fn find_by_name_hash(&self, id: AssetsId, hash: HashValue<str>) -> Option<Asset> {
        let assets = self.registry(id).ok()?.borrow().ok()?;
        assets.table().find_by_name_hash(hash)
    }

    pub fn name(&self, id: AssetsId, asset: Asset) -> Option<String> {
        let assets = self.registry(id).ok()?.borrow().ok()?;
        assets.table().info(asset).map(|v| v.name().to_owned())
    }

    pub fn name_hash(&self, id: AssetsId, asset: Asset) -> Option<HashValue<str>> {
        let assets = self.registry(id).ok()?.borrow().ok()?;
        assets.table().info(asset).map(|v| v.hash())
    }

    /// Returns true if the payload of `asset` is materialized.
    pub fn is_loaded(&self, id: AssetsId, asset: Asset) -> bool {
        self.registry(id)
            .and_then(|v| v.borrow().map(|v| v.is_loaded(asset)))
            .unwrap_or(false)
    }

    /// Returns the number of assets registered in `id`.
    pub fn len(&self, id: AssetsId) -> usize {
        self.registry(id)
            .and_then(|v| v.borrow().map(|v| v.table().len()))
            .unwrap_or(0)
    }

    /// Gets the payload of `asset`, loading it first if needed.
    ///
    /// A load failure is logged and yields `None`. It is not remembered, the
    /// next call tries to load again.
    pub fn get<T: 'static>(&self, id: AssetsId, asset: Asset) -> Option<Ref<T>> {
        match self.try_get::<T>(id, asset) {
            Ok(v) => Some(v),
            Err(err) => {
                warn!("Failed to get {} of {}: {}", asset, id, err);
                None
            }
        }
    }

    /// Gets the payload of `asset`, loading it first if needed.
    pub fn try_get<T: 'static>(&self, id: AssetsId, asset: Asset) -> Result<Ref<T>> {
        let registry = self.registry(id)?;

        let loaded = {
            let assets = registry.borrow()?;
            assets.table().try_info(asset)?;
            assets.is_loaded(asset)
        };

        // Listeners are not invalidated by a first load. Whoever misses here is
        // usually the listener about to consume the fresh payload.
        if !loaded {
            registry.typed_mut::<T>()?.load(self, asset)?;
        }

        Ref::filter_map(registry.typed::<T>()?, |v| v.get(asset))
            .map_err(|_| Error::InvalidHandle(format!("{} of {}", asset, id)))
    }

    /// Materializes `asset` without borrowing its payload.
    pub fn load(&self, id: AssetsId, asset: Asset) -> Result<()> {
        let registry = self.registry(id)?;
        let mut assets = registry.borrow_mut()?;
        assets.load(self, asset)
    }

    /// Registers a placeholder asset named "Unnamed N" and materializes it with
    /// `AssetLoader::load_default`, falling back to `AssetLoader::load`.
    pub fn make_default(&self, id: AssetsId) -> Result<Asset> {
        let registry = self.registry(id)?;
        let mut assets = registry.borrow_mut()?;
        assets.make_default(self)
    }

    /// Replaces the payload of `asset` and invalidates every asset listening on
    /// it. The previous payload is dropped, not freed through the loader.
    pub fn set<T: 'static>(&self, id: AssetsId, asset: Asset, value: T) -> Result<()> {
        let previous = self.registry(id)?.typed_mut::<T>()?.replace(asset, value)?;
        drop(previous);

        debug!("Sets {} of {}.", asset, id);
        self.propagate(id, asset, false)
    }

    /// Edits the payload of `asset` in place, loading it first if needed, then
    /// invalidates every asset listening on it.
    pub fn modify<T, F>(&self, id: AssetsId, asset: Asset, f: F) -> Result<()>
    where
        T: 'static,
        F: FnOnce(&mut T),
    {
        {
            let mut assets = self.registry(id)?.typed_mut::<T>()?;
            assets.load(self, asset)?;

            if let Some(v) = assets.get_mut(asset) {
                f(v);
            }
        }

        self.propagate(id, asset, false)
    }

    /// Refreshes the payload of `asset` with `AssetLoader::reload` and
    /// invalidates every asset listening on it.
    pub fn reload(&self, id: AssetsId, asset: Asset) -> Result<()> {
        {
            let registry = self.registry(id)?;
            let mut assets = registry.borrow_mut()?;
            assets.reload(self, asset)?;
        }

        debug!("Reloads {} of {}.", asset, id);
        self.propagate(id, asset, false)
    }

    /// Frees the payload of `asset` if it is materialized, then frees every
    /// asset listening on it, transitively.
    pub fn invalidate(&self, id: AssetsId, asset: Asset) -> Result<()> {
        self.propagate(id, asset, true)
    }

    /// Makes `listener` of registry `listener_id` listen on `asset`.
    ///
    /// The listener asset itself is not checked, it may belong to a registry
    /// that is busy loading it.
    pub fn add_listener(
        &self,
        id: AssetsId,
        asset: Asset,
        listener_id: AssetsId,
        listener: Asset,
    ) -> Result<()> {
        self.registry(listener_id)?;
        self.registry(id)?
            .borrow_mut()?
            .table_mut()
            .add_listener(asset, (listener_id, listener))
    }

    /// Stops `listener` listening on `asset`. Returns false if it was not.
    pub fn remove_listener(
        &self,
        id: AssetsId,
        asset: Asset,
        listener_id: AssetsId,
        listener: Asset,
    ) -> Result<bool> {
        self.registry(id)?
            .borrow_mut()?
            .table_mut()
            .remove_listener(asset, (listener_id, listener))
    }

    /// Stops the asset named `listener` of registry `listener_id` listening on
    /// `asset`.
    pub fn remove_listener_by_name(
        &self,
        id: AssetsId,
        asset: Asset,
        listener_id: AssetsId,
        listener: &str,
    ) -> Result<bool> {
        let found = self.registry(listener_id)?.borrow()?.table().find_by_name(listener);

        match found {
            Some(listener) => self.remove_listener(id, asset, listener_id, listener),
            None => Ok(false),
        }
    }

    /// Returns the assets listening on `asset`.
    pub fn listeners(&self, id: AssetsId, asset: Asset) -> Result<Vec<(AssetsId, Asset)>> {
        let assets = self.registry(id)?.borrow()?;
        let info = assets.table().try_info(asset)?;
        Ok(info.listeners().to_vec())
    }

    /// Stores `value` in userdata `slot` of registry `id`, returning the value
    /// it replaces.
    pub fn set_userdata(
        &self,
        id: AssetsId,
        slot: usize,
        value: Box<dyn Any>,
    ) -> Result<Option<Box<dyn Any>>> {
        self.registry(id)?
            .borrow_mut()?
            .table_mut()
            .set_userdata(slot, value)
    }

    /// Borrows userdata `slot` of registry `id` if it holds a `U`.
    pub fn userdata<U: Any>(&self, id: AssetsId, slot: usize) -> Option<Ref<U>> {
        let assets = self.registry(id).ok()?.borrow().ok()?;
        Ref::filter_map(assets, |v| {
            v.table()
                .userdata(slot)
                .and_then(|v| v.downcast_ref::<U>())
        })
        .ok()
    }

    fn registry(&self, id: AssetsId) -> Result<&Registry> {
        self.registries
            .get(id.index())
            .ok_or_else(|| Error::InvalidHandle(format!("{}", id)))
    }

    /// Walks the listener graph from `(id, asset)` and frees every payload on
    /// the way. The origin itself is freed only if `free_origin` is set.
    fn propagate(&self, id: AssetsId, asset: Asset, free_origin: bool) -> Result<()> {
        let mut visited = FastHashSet::default();
        let mut worklist: SmallVec<[(AssetsId, Asset); 16]> = SmallVec::new();

        {
            let registry = self.registry(id)?;
            let mut assets = registry.borrow_mut()?;
            worklist.extend(assets.table().try_info(asset)?.listeners().iter().cloned());

            if free_origin && assets.free(asset) {
                debug!("Invalidates {} of '{}'.", asset, registry.name());
            }
        }

        visited.insert((id, asset));

        while let Some(next) = worklist.pop() {
            if !visited.insert(next) {
                continue;
            }

            let (id, asset) = next;
            let registry = match self.registry(id) {
                Ok(registry) => registry,
                Err(_) => {
                    warn!("Skips listener {} of unknown registry {}.", asset, id);
                    continue;
                }
            };

            let mut assets = registry.borrow_mut()?;
            match assets.table().info(asset) {
                Some(info) => worklist.extend(
                    info.listeners()
                        .iter()
                        .filter(|v| !visited.contains(*v))
                        .cloned(),
                ),
                None => {
                    warn!("Skips unknown listener {} of '{}'.", asset, registry.name());
                    continue;
                }
            }

            if assets.free(asset) {
                trace!("Invalidates listener {} of '{}'.", asset, registry.name());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registries() {
        let mut library = AssetLibrary::new();
        let a = library.add_registry_without_loader::<u32>("a").unwrap();
        let b = library.add_registry_without_loader::<String>("b").unwrap();

        assert_eq!(library.find_registry("a"), Some(a));
        assert_eq!(library.find_registry("b"), Some(b));
        assert_eq!(library.find_registry("c"), None);
        assert_eq!(library.registry_name(b), Some("b"));
        assert_eq!(library.registry_count(), 2);

        match library.add_registry_without_loader::<u32>("a") {
            Err(Error::DuplicateName(_)) => {}
            _ => panic!("registry names are unique"),
        }
    }

    #[test]
    fn type_mismatch() {
        let mut library = AssetLibrary::new();
        let id = library.add_registry_without_loader::<u32>("numbers").unwrap();
        let asset = library.register(id, "one").unwrap();
        library.set(id, asset, 1u32).unwrap();

        assert_eq!(*library.get::<u32>(id, asset).unwrap(), 1);
        assert!(library.get::<String>(id, asset).is_none());

        match library.set(id, asset, "one".to_owned()) {
            Err(Error::AssetTypeMismatch { .. }) => {}
            _ => panic!("registry holds u32"),
        }
    }

    #[test]
    fn no_loader() {
        let mut library = AssetLibrary::new();
        let id = library.add_registry_without_loader::<u32>("numbers").unwrap();
        let asset = library.register(id, "one").unwrap();

        match library.try_get::<u32>(id, asset) {
            Err(Error::NoLoader(_)) => {}
            _ => panic!("nothing can load the asset"),
        }

        assert!(library.make_default(id).is_err());
    }

    #[test]
    fn invalid_handles() {
        let mut library = AssetLibrary::new();
        let id = library.add_registry_without_loader::<u32>("numbers").unwrap();
        let unknown = Asset::from_id(9).unwrap();

        assert!(library.try_get::<u32>(id, unknown).is_err());
        assert!(library.invalidate(id, unknown).is_err());
        assert!(library.listeners(id, unknown).is_err());
        assert_eq!(library.name(id, unknown), None);
        assert_eq!(library.len(AssetsId::from_id(5).unwrap()), 0);
    }
}

//! Typed storage of one asset registry.

use std::any::Any;
use std::fmt;

use inlinable_string::InlinableString;

use crate::errors::*;
use crate::settings::SparseSetSettings;
use crate::utils::prelude::*;

use super::library::AssetLibrary;
use super::loader::{AssetLoader, LoadContext};
use super::{Asset, AssetsId, MAX_USERDATA};

/// The bookkeeping of a registered asset, kept whether or not it is loaded.
#[derive(Debug, Clone)]
pub struct AssetInfo {
    name: InlinableString,
    hash: HashValue<str>,
    listeners: DynBuf<(AssetsId, Asset)>,
}

impl AssetInfo {
    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    #[inline]
    pub fn hash(&self) -> HashValue<str> {
        self.hash
    }

    /// The assets invalidated together with this one.
    #[inline]
    pub fn listeners(&self) -> &[(AssetsId, Asset)] {
        &self.listeners
    }
}

/// The part of a registry that does not depend on the payload type.
pub(crate) struct AssetTable {
    id: AssetsId,
    name: InlinableString,
    infos: DynBuf<AssetInfo>,
    userdata: [Option<Box<dyn Any>>; MAX_USERDATA],
    limit: u64,
    unnamed: u32,
}

impl AssetTable {
    #[inline]
    pub fn id(&self) -> AssetsId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Registers `name`, or returns the handle it was registered with before.
    pub fn register(&mut self, name: &str) -> Result<Asset> {
        if let Some(asset) = self.find_by_name(name) {
            return Ok(asset);
        }

        if self.infos.len() as u64 >= self.limit {
            return Err(Error::RegistryFull(self.limit as usize));
        }

        let asset = Asset::from_index(self.infos.len())
            .ok_or_else(|| Error::RegistryFull(self.infos.len()))?;

        self.infos.append(AssetInfo {
            name: name.into(),
            hash: name.into(),
            listeners: DynBuf::new(),
        })?;

        trace!("Registers asset '{}' in '{}' as {}.", name, self.name, asset);
        Ok(asset)
    }

    pub fn find_by_name(&self, name: &str) -> Option<Asset> {
        let hash = HashValue::<str>::from(name);
        self.infos
            .find(|v| v.hash == hash && v.name() == name)
            .and_then(Asset::from_index)
    }

    pub fn find_by_name_hash(&self, hash: HashValue<str>) -> Option<Asset> {
        self.infos
            .find(|v| v.hash == hash)
            .and_then(Asset::from_index)
    }

    #[inline]
    pub fn info(&self, asset: Asset) -> Option<&AssetInfo> {
        self.infos.get(asset.index())
    }

    pub fn try_info(&self, asset: Asset) -> Result<&AssetInfo> {
        self.infos.get(asset.index()).ok_or_else(|| self.invalid(asset))
    }

    /// Appends a listener unless it is already listening.
    pub fn add_listener(&mut self, asset: Asset, listener: (AssetsId, Asset)) -> Result<()> {
        let invalid = self.invalid(asset);
        let info = self.infos.get_mut(asset.index()).ok_or(invalid)?;

        if info.listeners.position(&listener).is_none() {
            info.listeners.append(listener)?;
        }

        Ok(())
    }

    pub fn remove_listener(&mut self, asset: Asset, listener: (AssetsId, Asset)) -> Result<bool> {
        let invalid = self.invalid(asset);
        let info = self.infos.get_mut(asset.index()).ok_or(invalid)?;

        match info.listeners.position(&listener) {
            Some(index) => {
                info.listeners.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn userdata(&self, slot: usize) -> Option<&dyn Any> {
        self.userdata
            .get(slot)
            .and_then(|v| v.as_ref())
            .map(|v| &**v)
    }

    pub fn set_userdata(&mut self, slot: usize, value: Box<dyn Any>) -> Result<Option<Box<dyn Any>>> {
        match self.userdata.get_mut(slot) {
            Some(v) => Ok(v.replace(value)),
            None => Err(Error::KeyOutOfRange {
                key: slot as u32,
                limit: MAX_USERDATA as u64,
            }),
        }
    }

    /// Picks the next "Unnamed N" that is not registered yet.
    fn next_unnamed(&mut self) -> String {
        loop {
            self.unnamed += 1;
            let name = format!("Unnamed {}", self.unnamed);
            if self.find_by_name(&name).is_none() {
                return name;
            }
        }
    }

    fn invalid(&self, asset: Asset) -> Error {
        Error::InvalidHandle(format!("{} of '{}'", asset, self.name))
    }
}

/// The registry of assets of type `T`.
pub struct Assets<T: 'static> {
    table: AssetTable,
    payloads: SparseSet<T>,
    loader: Option<Box<dyn AssetLoader<T>>>,
}

impl<T: 'static> Assets<T> {
    pub(crate) fn new(
        id: AssetsId,
        name: &str,
        settings: SparseSetSettings,
        loader: Option<Box<dyn AssetLoader<T>>>,
    ) -> Result<Self> {
        let payloads = SparseSet::with_settings(settings)?;

        Ok(Assets {
            table: AssetTable {
                id,
                name: name.into(),
                infos: DynBuf::new(),
                userdata: Default::default(),
                limit: settings.key_limit(),
                unnamed: 0,
            },
            payloads,
            loader,
        })
    }

    #[inline]
    pub fn id(&self) -> AssetsId {
        self.table.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.table.name()
    }

    /// Returns the number of registered assets, loaded or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    /// Returns the number of materialized payloads.
    #[inline]
    pub fn loaded(&self) -> usize {
        self.payloads.len()
    }

    #[inline]
    pub fn info(&self, asset: Asset) -> Option<&AssetInfo> {
        self.table.info(asset)
    }

    /// Gets the payload of `asset` if it is materialized. Never loads.
    #[inline]
    pub fn get(&self, asset: Asset) -> Option<&T> {
        self.payloads.get(asset.index() as u32)
    }

    /// Iterates over the materialized payloads.
    pub fn iter(&self) -> impl Iterator<Item = (Asset, &T)> {
        self.payloads
            .iter()
            .filter_map(|(key, v)| Asset::from_index(key as usize).map(|asset| (asset, v)))
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, asset: Asset) -> Option<&mut T> {
        self.payloads.get_mut(asset.index() as u32)
    }

    /// Materializes `asset` with the loader unless it is loaded already.
    pub(crate) fn load(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()> {
        self.table.try_info(asset)?;
        if self.payloads.contains(asset.index() as u32) {
            return Ok(());
        }

        let value = self.produce(library, asset, false)?;
        self.payloads.insert(asset.index() as u32, value)?;
        Ok(())
    }

    /// Registers a new "Unnamed N" asset and materializes a placeholder for it.
    pub(crate) fn make_default(&mut self, library: &AssetLibrary) -> Result<Asset> {
        if self.loader.is_none() {
            return Err(Error::NoLoader(self.table.name.to_string()));
        }

        let name = self.table.next_unnamed();
        let asset = self.table.register(&name)?;

        let value = self.produce(library, asset, true)?;
        self.payloads.insert(asset.index() as u32, value)?;

        debug!("Makes default asset '{}' in '{}'.", name, self.table.name);
        Ok(asset)
    }

    /// Refreshes `asset` in place, or loads it if it was not materialized.
    pub(crate) fn reload(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()> {
        if !self.payloads.contains(asset.index() as u32) {
            return self.load(library, asset);
        }

        let info = self.table.try_info(asset)?;
        let loader = match self.loader.as_mut() {
            Some(loader) => loader,
            None => return Err(Error::NoLoader(self.table.name.to_string())),
        };

        let ctx = LoadContext {
            library,
            id: self.table.id,
            asset,
            name: info.name(),
            userdata: &self.table.userdata,
        };

        match self.payloads.get_mut(asset.index() as u32) {
            Some(value) => loader.reload(&ctx, value).map_err(|cause| Error::LoadFailed {
                name: info.name.to_string(),
                cause,
            }),
            None => Ok(()),
        }
    }

    /// Replaces the payload of `asset`. The previous payload is dropped without
    /// passing through the loader.
    pub(crate) fn replace(&mut self, asset: Asset, value: T) -> Result<Option<T>> {
        self.table.try_info(asset)?;

        let key = asset.index() as u32;
        match self.payloads.get_mut(key) {
            Some(v) => Ok(Some(::std::mem::replace(v, value))),
            None => {
                self.payloads.insert(key, value)?;
                Ok(None)
            }
        }
    }

    fn produce(&mut self, library: &AssetLibrary, asset: Asset, default: bool) -> Result<T> {
        let info = self.table.try_info(asset)?;

        let loader = match self.loader.as_mut() {
            Some(loader) => loader,
            None => return Err(Error::NoLoader(self.table.name.to_string())),
        };

        let ctx = LoadContext {
            library,
            id: self.table.id,
            asset,
            name: info.name(),
            userdata: &self.table.userdata,
        };

        let loaded = if default {
            match loader.load_default(&ctx) {
                Some(v) => v,
                None => loader.load(&ctx),
            }
        } else {
            loader.load(&ctx)
        };

        loaded.map_err(|cause| Error::LoadFailed {
            name: info.name.to_string(),
            cause,
        })
    }
}

impl<T: 'static> Drop for Assets<T> {
    fn drop(&mut self) {
        let payloads: Vec<T> = self.payloads.drain().collect();
        if let Some(loader) = self.loader.as_mut() {
            for v in payloads {
                loader.free(v);
            }
        }
    }
}

impl<T: 'static> fmt::Debug for Assets<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Assets")
            .field("id", &self.table.id)
            .field("name", &self.table.name)
            .field("len", &self.table.len())
            .field("loaded", &self.payloads.len())
            .finish()
    }
}

/// Type-erased access to a registry, used by the library for everything that
/// does not touch a payload by value.
pub(crate) trait ErasedAssets: Any {
    fn table(&self) -> &AssetTable;

    fn table_mut(&mut self) -> &mut AssetTable;

    fn is_loaded(&self, asset: Asset) -> bool;

    fn load(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()>;

    fn reload(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()>;

    fn make_default(&mut self, library: &AssetLibrary) -> Result<Asset>;

    /// Frees the payload of `asset` through the loader. Returns false if it was
    /// not materialized.
    fn free(&mut self, asset: Asset) -> bool;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> ErasedAssets for Assets<T> {
    #[inline]
    fn table(&self) -> &AssetTable {
        &self.table
    }

    #[inline]
    fn table_mut(&mut self) -> &mut AssetTable {
        &mut self.table
    }

    #[inline]
    fn is_loaded(&self, asset: Asset) -> bool {
        self.payloads.contains(asset.index() as u32)
    }

    #[inline]
    fn load(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()> {
        Assets::load(self, library, asset)
    }

    #[inline]
    fn reload(&mut self, library: &AssetLibrary, asset: Asset) -> Result<()> {
        Assets::reload(self, library, asset)
    }

    #[inline]
    fn make_default(&mut self, library: &AssetLibrary) -> Result<Asset> {
        Assets::make_default(self, library)
    }

    fn free(&mut self, asset: Asset) -> bool {
        match self.payloads.remove(asset.index() as u32) {
            Some(value) => {
                if let Some(loader) = self.loader.as_mut() {
                    loader.free(value);
                }

                true
            }
            None => false,
        }
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//! Packed storage addressed through a paged sparse index.
//!
//! A `SparseSet<T>` maps arbitrary 32-bit keys to values stored contiguously in a
//! dense array, with O(1) insertion, lookup and removal:
//!
//! * `dense` holds the values without gaps, `reverse[d]` holds the key owning
//!   `dense[d]`.
//! * The sparse index is split into pages of `indices_per_page` slots. A page is
//!   allocated the first time one of its keys is used and is kept until the set
//!   is dropped. A slot value of `0` means "vacant", any other value `v` points at
//!   `dense[v - 1]`.
//!
//! Removal swaps the last dense value into the hole, so iteration order is the
//! insertion order only until the first removal. References returned by the set
//! must not be kept across insertions: growing the dense array moves every value.

use std::mem;

use crate::errors::*;
use crate::settings::SparseSetSettings;

const VACANT: u32 = 0;

/// Packed storage addressed through a paged sparse index.
pub struct SparseSet<T> {
    dense: Vec<T>,
    reverse: Vec<u32>,
    pages: Vec<Option<Box<[u32]>>>,
    settings: SparseSetSettings,
}

impl<T> Default for SparseSet<T> {
    fn default() -> Self {
        SparseSet::new()
    }
}

impl<T> SparseSet<T> {
    /// Constructs a new `SparseSet` with the default settings.
    pub fn new() -> Self {
        let settings = SparseSetSettings::default();
        SparseSet {
            dense: Vec::with_capacity(settings.initial_capacity),
            reverse: Vec::with_capacity(settings.initial_capacity),
            pages: Vec::new(),
            settings,
        }
    }

    /// Constructs a new `SparseSet` with the given page layout and initial dense
    /// capacity. No sparse page is allocated up front.
    pub fn with_settings(settings: SparseSetSettings) -> Result<Self> {
        settings.validate()?;

        let mut dense = Vec::new();
        dense
            .try_reserve_exact(settings.initial_capacity)
            .map_err(Error::oom("sparse set dense array"))?;

        let mut reverse = Vec::new();
        reverse
            .try_reserve_exact(settings.initial_capacity)
            .map_err(Error::oom("sparse set reverse table"))?;

        Ok(SparseSet {
            dense,
            reverse,
            pages: Vec::new(),
            settings,
        })
    }

    /// Returns the layout this set was created with.
    #[inline]
    pub fn settings(&self) -> &SparseSetSettings {
        &self.settings
    }

    /// Returns the number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Checks if the set holds no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns the number of values the dense array holds before it has to grow.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.dense.capacity()
    }

    /// Returns the number of sparse pages allocated so far.
    pub fn allocated_pages(&self) -> usize {
        self.pages.iter().filter(|v| v.is_some()).count()
    }

    /// Returns true if `key` has a value.
    #[inline]
    pub fn contains(&self, key: u32) -> bool {
        self.dense_index(key).is_some()
    }

    /// Returns the dense position currently holding the value of `key`.
    #[inline]
    pub fn dense_index(&self, key: u32) -> Option<usize> {
        let (page, offset) = self.locate(key)?;
        let slot = self.pages.get(page)?.as_ref()?[offset];

        if slot == VACANT {
            None
        } else {
            Some((slot - 1) as usize)
        }
    }

    /// Returns the key owning the value at dense position `index`.
    #[inline]
    pub fn key_at(&self, index: usize) -> Option<u32> {
        self.reverse.get(index).cloned()
    }

    /// Returns a reference to the value of `key`.
    #[inline]
    pub fn get(&self, key: u32) -> Option<&T> {
        let index = self.dense_index(key)?;
        self.dense.get(index)
    }

    /// Returns a mutable reference to the value of `key`.
    #[inline]
    pub fn get_mut(&mut self, key: u32) -> Option<&mut T> {
        let index = self.dense_index(key)?;
        self.dense.get_mut(index)
    }

    /// Returns the value of `key`, creating it with `f` if the key is vacant.
    ///
    /// An existing value is returned untouched and `f` is not called.
    pub fn get_or_insert_with<F>(&mut self, key: u32, f: F) -> Result<&mut T>
    where
        F: FnOnce() -> T,
    {
        let (page, offset) = self.locate(key).ok_or(Error::KeyOutOfRange {
            key,
            limit: self.settings.key_limit(),
        })?;

        if let Some(index) = self.dense_index(key) {
            return Ok(&mut self.dense[index]);
        }

        // Every allocation happens before the first write, a failure leaves the
        // set untouched.
        self.reserve_dense()?;
        self.ensure_page(page)?;

        let index = self.dense.len();
        self.dense.push(f());
        self.reverse.push(key);

        if let Some(slots) = self.pages[page].as_mut() {
            slots[offset] = index as u32 + 1;
        }

        Ok(&mut self.dense[index])
    }

    /// Sets the value of `key`, overwriting any previous value.
    pub fn insert(&mut self, key: u32, value: T) -> Result<&mut T> {
        if let Some(index) = self.dense_index(key) {
            self.dense[index] = value;
            return Ok(&mut self.dense[index]);
        }

        self.get_or_insert_with(key, move || value)
    }

    /// Sets the value of `key` to `T::default()`, overwriting any previous value.
    pub fn insert_default(&mut self, key: u32) -> Result<&mut T>
    where
        T: Default,
    {
        self.insert(key, T::default())
    }

    /// Removes the value of `key`, moving the last dense value into its place.
    pub fn remove(&mut self, key: u32) -> Option<T> {
        let index = self.dense_index(key)?;
        let last = self.dense.len() - 1;

        self.set_slot(key, VACANT);
        if index != last {
            let moved = self.reverse[last];
            self.set_slot(moved, index as u32 + 1);
        }

        self.reverse.swap_remove(index);
        Some(self.dense.swap_remove(index))
    }

    /// Recovers the key of a value from a reference previously handed out by this
    /// set.
    ///
    /// Returns `None` if `value` does not point into the dense array, or if `T` is
    /// zero-sized and positions can not be told apart.
    pub fn get_index(&self, value: &T) -> Option<u32> {
        let size = mem::size_of::<T>();
        if size == 0 {
            return None;
        }

        let base = self.dense.as_ptr() as usize;
        let ptr = value as *const T as usize;
        if ptr < base || (ptr - base) % size != 0 {
            return None;
        }

        self.key_at((ptr - base) / size)
    }

    /// Removes every value. Allocated pages are kept and cleared.
    pub fn clear(&mut self) {
        self.dense.clear();
        self.reverse.clear();

        for slots in self.pages.iter_mut().filter_map(|v| v.as_mut()) {
            for v in slots.iter_mut() {
                *v = VACANT;
            }
        }
    }

    /// Removes every value, yielding them in dense order.
    pub fn drain(&mut self) -> ::std::vec::Drain<T> {
        let per_page = self.settings.indices_per_page;
        for key in self.reverse.drain(..) {
            let key = key as usize;
            if let Some(Some(slots)) = self.pages.get_mut(key / per_page) {
                slots[key % per_page] = VACANT;
            }
        }

        self.dense.drain(..)
    }

    /// Iterates over the keys in dense order.
    #[inline]
    pub fn keys(&self) -> impl Iterator<Item = u32> + '_ {
        self.reverse.iter().cloned()
    }

    /// Iterates over the values in dense order.
    #[inline]
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.dense.iter()
    }

    /// Iterates mutably over the values in dense order.
    #[inline]
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.dense.iter_mut()
    }

    /// Iterates over `(key, value)` pairs in dense order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.reverse.iter().cloned().zip(self.dense.iter())
    }

    /// Iterates mutably over `(key, value)` pairs in dense order.
    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u32, &mut T)> {
        self.reverse.iter().cloned().zip(self.dense.iter_mut())
    }

    /// Returns the dense values as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.dense
    }

    #[inline]
    fn locate(&self, key: u32) -> Option<(usize, usize)> {
        let key = key as usize;
        let page = key / self.settings.indices_per_page;

        if page < self.settings.max_pages {
            Some((page, key % self.settings.indices_per_page))
        } else {
            None
        }
    }

    fn set_slot(&mut self, key: u32, value: u32) {
        if let Some((page, offset)) = self.locate(key) {
            if let Some(Some(slots)) = self.pages.get_mut(page) {
                slots[offset] = value;
            }
        }
    }

    fn reserve_dense(&mut self) -> Result<()> {
        let len = self.dense.len();
        let capacity = self.dense.capacity();

        if len < capacity && len < self.reverse.capacity() {
            return Ok(());
        }

        let grown = if capacity == 0 { 1 } else { capacity * 2 };
        self.dense
            .try_reserve_exact(grown - len)
            .map_err(Error::oom("sparse set dense array"))?;
        self.reverse
            .try_reserve_exact(grown - len)
            .map_err(Error::oom("sparse set reverse table"))?;

        Ok(())
    }

    fn ensure_page(&mut self, page: usize) -> Result<()> {
        if self.pages.len() <= page {
            let additional = page + 1 - self.pages.len();
            self.pages
                .try_reserve_exact(additional)
                .map_err(Error::oom("sparse page table"))?;
            self.pages.resize_with(page + 1, || None);
        }

        if self.pages[page].is_none() {
            let mut slots = Vec::new();
            slots
                .try_reserve_exact(self.settings.indices_per_page)
                .map_err(Error::oom("sparse page"))?;
            slots.resize(self.settings.indices_per_page, VACANT);

            trace!("Allocates sparse page {}.", page);
            self.pages[page] = Some(slots.into_boxed_slice());
        }

        Ok(())
    }
}

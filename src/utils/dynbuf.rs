//! A growable array with explicit, doubling growth.
//!
//! `DynBuf` backs the small append-mostly lists of the engine: type tables,
//! system lists, listener lists and render-pass callbacks. Unlike `Vec::push`,
//! running out of memory is reported through `Error::OutOfMemory` instead of
//! aborting the process.

use std::ops::{Deref, DerefMut};
use std::slice;

use crate::errors::*;

/// A growable array whose capacity doubles whenever an append would exceed it.
#[derive(Debug, Clone)]
pub struct DynBuf<T> {
    elements: Vec<T>,
}

impl<T> Default for DynBuf<T> {
    fn default() -> Self {
        DynBuf::new()
    }
}

impl<T> DynBuf<T> {
    /// Constructs a new, empty `DynBuf` without allocating.
    pub fn new() -> Self {
        DynBuf {
            elements: Vec::new(),
        }
    }

    /// Constructs a new `DynBuf` with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let mut elements = Vec::new();
        elements
            .try_reserve_exact(capacity)
            .map_err(Error::oom("dynamic buffer"))?;

        Ok(DynBuf { elements })
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Checks if the buffer holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the number of elements the buffer can hold without growing.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.elements.capacity()
    }

    /// Appends an element to the back, returning its index.
    pub fn append(&mut self, value: T) -> Result<usize> {
        self.reserve_one()?;

        let index = self.elements.len();
        self.elements.push(value);
        Ok(index)
    }

    /// Removes the element at `index`, shifting every later element down.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }

    /// Removes the element at `index`, filling the hole with the last element.
    pub fn swap_remove(&mut self, index: usize) -> Option<T> {
        if index < self.elements.len() {
            Some(self.elements.swap_remove(index))
        } else {
            None
        }
    }

    /// Returns the index of the first element matching `predicate`.
    #[inline]
    pub fn find<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.elements.iter().position(predicate)
    }

    /// Keeps only the elements matching `predicate`, preserving their order.
    pub fn retain<P>(&mut self, predicate: P)
    where
        P: FnMut(&T) -> bool,
    {
        self.elements.retain(predicate);
    }

    /// Removes every element. The capacity is kept.
    #[inline]
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.elements.get(index)
    }

    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.elements.get_mut(index)
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<T> {
        self.elements.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> slice::IterMut<T> {
        self.elements.iter_mut()
    }

    fn reserve_one(&mut self) -> Result<()> {
        let len = self.elements.len();
        let capacity = self.elements.capacity();

        if len < capacity {
            return Ok(());
        }

        let grown = if capacity == 0 { 4 } else { capacity * 2 };
        self.elements
            .try_reserve_exact(grown - len)
            .map_err(Error::oom("dynamic buffer"))
    }
}

impl<T: PartialEq> DynBuf<T> {
    /// Returns the index of the first element equal to `value`.
    #[inline]
    pub fn position(&self, value: &T) -> Option<usize> {
        self.find(|v| v == value)
    }
}

impl<T> Deref for DynBuf<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        &self.elements
    }
}

impl<T> DerefMut for DynBuf<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.elements
    }
}

impl<'a, T> IntoIterator for &'a DynBuf<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T> IntoIterator for DynBuf<T> {
    type Item = T;
    type IntoIter = ::std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn doubling() {
        let mut buf = DynBuf::new();
        assert_eq!(buf.capacity(), 0);

        buf.append(1).unwrap();
        assert!(buf.capacity() >= 4);
        let first = buf.capacity();

        for i in 0..first {
            buf.append(i).unwrap();
        }

        assert!(buf.capacity() >= first * 2);
        assert!(buf.len() <= buf.capacity());
    }

    #[test]
    fn remove_keeps_order() {
        let mut buf = DynBuf::new();
        for i in 0..5 {
            buf.append(i).unwrap();
        }

        assert_eq!(buf.remove(1), Some(1));
        assert_eq!(&buf[..], &[0, 2, 3, 4]);
        assert_eq!(buf.remove(10), None);

        assert_eq!(buf.swap_remove(0), Some(0));
        assert_eq!(&buf[..], &[4, 2, 3]);
    }

    #[test]
    fn find_and_clear() {
        let mut buf = DynBuf::with_capacity(2).unwrap();
        buf.append("a").unwrap();
        buf.append("b").unwrap();

        assert_eq!(buf.position(&"b"), Some(1));
        assert_eq!(buf.find(|v| *v == "c"), None);

        let capacity = buf.capacity();
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), capacity);
    }
}

//! Hashing helpers for names and small keys.

use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::marker::PhantomData;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Hashes a string with 64-bit FNV-1a. The result is stable across runs and
/// platforms, so it may be persisted alongside names.
pub fn hash64<T: AsRef<str> + ?Sized>(v: &T) -> u64 {
    v.as_ref().bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// A fast, non-cryptographic hasher for integer-like keys (handles, indices).
#[derive(Default, Clone, Copy)]
pub struct FastHasher {
    hash: u64,
}

const SEED: u64 = 0x51_7c_c1_b7_27_22_0a_95;

impl Hasher for FastHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.write_u8(byte);
        }
    }

    #[inline]
    fn write_u8(&mut self, i: u8) {
        self.write_u64(u64::from(i));
    }

    #[inline]
    fn write_u32(&mut self, i: u32) {
        self.write_u64(u64::from(i));
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.hash = (self.hash.rotate_left(5) ^ i).wrapping_mul(SEED);
    }

    #[inline]
    fn write_usize(&mut self, i: usize) {
        self.write_u64(i as u64);
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.hash
    }
}

pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<FastHasher>>;
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<FastHasher>>;

/// A precomputed hash of a `T`, used to avoid re-hashing names on every lookup.
#[derive(Debug, Eq)]
pub struct HashValue<T>(u64, PhantomData<T>)
where
    T: ?Sized;

impl<T: ?Sized> HashValue<T> {
    /// Returns the raw 64-bit hash.
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl<T: ?Sized> Clone for HashValue<T> {
    fn clone(&self) -> Self {
        HashValue(self.0, PhantomData)
    }
}

impl<T: ?Sized> Copy for HashValue<T> {}

impl<T: ?Sized> PartialEq for HashValue<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}

impl<T: ?Sized> Hash for HashValue<T> {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        self.0.hash(state);
    }
}

impl<F> From<F> for HashValue<str>
where
    F: AsRef<str>,
{
    fn from(v: F) -> Self {
        HashValue(hash64(v.as_ref()), PhantomData)
    }
}

impl<T> PartialEq<T> for HashValue<str>
where
    T: AsRef<str>,
{
    fn eq(&self, other: &T) -> bool {
        self.0.eq(&hash64(other.as_ref()))
    }
}

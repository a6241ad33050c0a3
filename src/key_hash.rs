//! Hashing capabilities.
//!
//! The table does not require `K: Hash`. Instead it asks a [`KeyHash`]
//! implementation for a signed 64-bit hash, so that tests and differential
//! runs can pin slot placement exactly.

use alloc::string::String;
use alloc::vec::Vec;
use core::hash::BuildHasher;
use core::hash::Hash;

/// Computes a stable signed 64-bit hash for keys of type `K`.
///
/// The hash of a stored key must not change while it is in a table.
///
/// Any `Fn(&K) -> i64` closure is a `KeyHash<K>`, which is convenient for
/// deterministic stand-ins:
///
/// ```rust
/// use probe_table::key_hash::KeyHash;
///
/// let identity = |k: &i64| *k;
/// assert_eq!(identity.hash_key(&-7), -7);
/// ```
pub trait KeyHash<K: ?Sized> {
    /// Returns the hash of `key`.
    fn hash_key(&self, key: &K) -> i64;
}

impl<K, F> KeyHash<K> for F
where
    K: ?Sized,
    F: Fn(&K) -> i64,
{
    #[inline]
    fn hash_key(&self, key: &K) -> i64 {
        self(key)
    }
}

/// Adapts any [`BuildHasher`] into a [`KeyHash`] by reinterpreting its `u64`
/// output as signed.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildHasherKeyHash<S>(pub S);

impl<K, S> KeyHash<K> for BuildHasherKeyHash<S>
where
    K: Hash + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn hash_key(&self, key: &K) -> i64 {
        self.0.hash_one(key) as i64
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hashing capability used by [`HashTable::new`](crate::HashTable::new).
        pub type DefaultKeyHash = BuildHasherKeyHash<foldhash::fast::RandomState>;
    } else if #[cfg(feature = "std")] {
        /// The hashing capability used by [`HashTable::new`](crate::HashTable::new).
        pub type DefaultKeyHash = BuildHasherKeyHash<std::hash::RandomState>;
    } else {
        /// The hashing capability used by [`HashTable::new`](crate::HashTable::new).
        pub type DefaultKeyHash = PyHash;
    }
}

/// `2^61 - 1`, the modulus integer hashes are reduced by.
const INT_MODULUS: u64 = (1 << 61) - 1;

const STRING_MULTIPLIER: u64 = 1_000_003;

/// Deterministic hashes matching the classic 64-bit interpreter's `hash()`
/// for integers and strings, which is what a reference dict uses to place
/// keys. No per-process seed is involved.
///
/// ```rust
/// use probe_table::key_hash::KeyHash;
/// use probe_table::key_hash::PyHash;
///
/// assert_eq!(PyHash.hash_key(&42i64), 42);
/// assert_eq!(PyHash.hash_key(&-1i64), -2);
/// assert_eq!(PyHash.hash_key("hello"), 840651671246116861);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PyHash;

/// Key types [`PyHash`] knows how to hash.
pub trait PyHashable {
    /// Returns the interpreter-compatible hash of `self`.
    fn py_hash(&self) -> i64;
}

impl<K: PyHashable + ?Sized> KeyHash<K> for PyHash {
    #[inline]
    fn hash_key(&self, key: &K) -> i64 {
        key.py_hash()
    }
}

/// `-1` is reserved as an error marker by the interpreter, so it is
/// remapped.
#[inline(always)]
fn avoid_minus_one(hash: i64) -> i64 {
    if hash == -1 { -2 } else { hash }
}

/// Reduces `|n|` modulo `2^61 - 1` and reapplies the sign.
#[inline]
fn hash_integer(negative: bool, magnitude: u64) -> i64 {
    let reduced = (magnitude % INT_MODULUS) as i64;
    avoid_minus_one(if negative { -reduced } else { reduced })
}

/// The multiplicative string hash over a sequence of code units.
fn hash_units(units: impl IntoIterator<Item = u64>) -> i64 {
    let mut units = units.into_iter().peekable();
    let Some(&first) = units.peek() else {
        return 0;
    };

    let mut hash = first << 7;
    let mut len = 0u64;
    for unit in units {
        hash = hash.wrapping_mul(STRING_MULTIPLIER) ^ unit;
        len += 1;
    }
    hash ^= len;

    avoid_minus_one(hash as i64)
}

macro_rules! impl_py_hashable_signed {
    ($($ty:ty),*) => {
        $(
            impl PyHashable for $ty {
                #[inline]
                fn py_hash(&self) -> i64 {
                    hash_integer(*self < 0, (*self as i64).unsigned_abs())
                }
            }
        )*
    };
}

macro_rules! impl_py_hashable_unsigned {
    ($($ty:ty),*) => {
        $(
            impl PyHashable for $ty {
                #[inline]
                fn py_hash(&self) -> i64 {
                    hash_integer(false, *self as u64)
                }
            }
        )*
    };
}

impl_py_hashable_signed!(i8, i16, i32, i64, isize);
impl_py_hashable_unsigned!(u8, u16, u32, u64, usize);

impl PyHashable for bool {
    #[inline]
    fn py_hash(&self) -> i64 {
        *self as i64
    }
}

impl PyHashable for str {
    fn py_hash(&self) -> i64 {
        hash_units(self.chars().map(|c| c as u64))
    }
}

impl PyHashable for String {
    #[inline]
    fn py_hash(&self) -> i64 {
        self.as_str().py_hash()
    }
}

impl PyHashable for [u8] {
    fn py_hash(&self) -> i64 {
        hash_units(self.iter().map(|&b| b as u64))
    }
}

impl PyHashable for Vec<u8> {
    #[inline]
    fn py_hash(&self) -> i64 {
        self.as_slice().py_hash()
    }
}

impl<T: PyHashable + ?Sized> PyHashable for &T {
    #[inline]
    fn py_hash(&self) -> i64 {
        (**self).py_hash()
    }
}

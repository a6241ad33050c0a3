use alloc::vec::Vec;
use core::fmt::Debug;

/// One cell of the table.
///
/// A tombstone keeps the hash of the key it replaced. The engine never reads
/// it, but snapshots report it so they line up with the reference table,
/// which only swaps the key for a dummy marker on deletion.
#[derive(Clone, PartialEq, Eq)]
pub enum Slot<K, V> {
    /// Never written since the last rebuild. Terminates every probe walk.
    Empty,
    /// Held a key that was deleted. Probe walks step over it.
    Tombstone {
        /// Hash of the deleted key.
        hash: i64,
    },
    /// Holds a live entry.
    Occupied {
        /// Hash of `key` at insertion time.
        hash: i64,
        /// The stored key.
        key: K,
        /// The stored value.
        value: V,
    },
}

impl<K, V> Slot<K, V> {
    /// Returns `true` for [`Slot::Empty`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    /// Returns `true` for [`Slot::Tombstone`].
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone { .. })
    }

    /// Returns `true` for [`Slot::Occupied`].
    #[inline]
    pub fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied { .. })
    }
}

impl<K: Debug, V: Debug> Debug for Slot<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Slot::Empty => f.write_str(".."),
            Slot::Tombstone { hash } => write!(f, "{hash}:<DUMMY>"),
            Slot::Occupied { hash, key, value } => write!(f, "{hash}:{key:?}={value:?}"),
        }
    }
}

/// The backing slot array together with its `fill` and `used` counters.
///
/// Every mutation goes through a method that keeps the counters in step with
/// the slot states, so `used <= fill <= size` holds at all times.
#[derive(Clone)]
pub(crate) struct SlotStore<K, V> {
    slots: Vec<Slot<K, V>>,
    fill: usize,
    used: usize,
}

impl<K, V> SlotStore<K, V> {
    /// Allocates `size` empty slots.
    pub(crate) fn with_size(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());

        let mut slots = Vec::with_capacity(size);
        slots.resize_with(size, || Slot::Empty);
        Self {
            slots,
            fill: 0,
            used: 0,
        }
    }

    #[inline]
    pub(crate) fn size(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub(crate) fn fill(&self) -> usize {
        self.fill
    }

    #[inline]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[inline]
    pub(crate) fn slots(&self) -> &[Slot<K, V>] {
        &self.slots
    }

    #[inline]
    pub(crate) fn get(&self, index: usize) -> &Slot<K, V> {
        &self.slots[index]
    }

    /// Writes a new entry into an empty or tombstoned slot.
    ///
    /// Landing on `Empty` bumps both counters; landing on a tombstone only
    /// bumps `used`, since the slot already counted towards `fill`.
    pub(crate) fn occupy(&mut self, index: usize, hash: i64, key: K, value: V) {
        let slot = &mut self.slots[index];
        match slot {
            Slot::Empty => {
                self.fill += 1;
                self.used += 1;
            }
            Slot::Tombstone { .. } => {
                self.used += 1;
            }
            Slot::Occupied { .. } => {
                unreachable!("occupy called on an occupied slot {index}")
            }
        }
        *slot = Slot::Occupied { hash, key, value };

        debug_assert!(self.used <= self.fill && self.fill <= self.slots.len());
    }

    /// Swaps the value of an occupied slot, leaving hash, key and counters
    /// untouched.
    pub(crate) fn replace_value(&mut self, index: usize, value: V) -> V {
        match &mut self.slots[index] {
            Slot::Occupied { value: old, .. } => core::mem::replace(old, value),
            _ => unreachable!("replace_value called on a vacant slot {index}"),
        }
    }

    /// Returns a mutable reference to the value of an occupied slot.
    pub(crate) fn value_mut(&mut self, index: usize) -> &mut V {
        match &mut self.slots[index] {
            Slot::Occupied { value, .. } => value,
            _ => unreachable!("value_mut called on a vacant slot {index}"),
        }
    }

    /// Turns an occupied slot into a tombstone and hands back its entry.
    ///
    /// `fill` is unchanged: the tombstone still occupies the slot as far as
    /// probing and the load factor are concerned.
    pub(crate) fn bury(&mut self, index: usize) -> (K, V) {
        let slot = &mut self.slots[index];
        let hash = match slot {
            Slot::Occupied { hash, .. } => *hash,
            _ => unreachable!("bury called on a vacant slot {index}"),
        };

        match core::mem::replace(slot, Slot::Tombstone { hash }) {
            Slot::Occupied { key, value, .. } => {
                self.used -= 1;
                (key, value)
            }
            _ => unreachable!(),
        }
    }

    /// Consumes the store, yielding every live entry in slot order.
    pub(crate) fn into_occupied(self) -> impl Iterator<Item = (i64, K, V)> {
        self.slots.into_iter().filter_map(|slot| match slot {
            Slot::Occupied { hash, key, value } => Some((hash, key, value)),
            _ => None,
        })
    }
}

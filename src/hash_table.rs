use alloc::vec::Vec;
use core::fmt::Debug;

use log::debug;
use log::trace;

use crate::config::RecyclingPolicy;
use crate::config::TableConfig;
use crate::error::ConfigError;
use crate::error::DumpMismatch;
use crate::error::TableError;
use crate::key_hash::DefaultKeyHash;
use crate::key_hash::KeyHash;
use crate::probe::ProbeStrategy;
use crate::resize::MIN_SIZE;
use crate::resize::nearest_size;
use crate::resize::should_grow;
use crate::slot::Slot;
use crate::slot::SlotStore;

/// Where an insert walk ended.
enum Landing {
    /// The key is already stored at this index.
    Existing(usize),
    /// The key is absent and should be written at this index.
    Vacant(usize),
}

/// An open-addressing hash table with configurable probing, tombstone
/// recycling and growth.
///
/// `HashTable<K, V, H>` stores key-value pairs in a power-of-two array of
/// [`Slot`]s. Keys are hashed by a [`KeyHash`] capability `H` into signed
/// 64-bit hashes, and collisions are resolved by walking the
/// [`ProbeStrategy`] chosen in the table's [`TableConfig`]. Deleted entries
/// leave tombstones behind so that probe walks for other keys still reach
/// them. Once non-empty slots reach two thirds of the table, the next insert
/// rebuilds it into a larger array, dropping every tombstone.
///
/// The layout is fully deterministic for a given hash function, which makes
/// [`dump`](Self::dump) comparable slot for slot with a reference table.
///
/// ## Example
///
/// ```rust
/// use probe_table::HashTable;
/// use probe_table::TableError;
/// use probe_table::config::TableConfig;
/// use probe_table::key_hash::PyHash;
///
/// let mut table = HashTable::with_config_and_hasher(TableConfig::cpython32(), PyHash).unwrap();
/// table.set("hello", 1);
/// table.set("world", 2);
/// assert_eq!(table.get(&"hello"), Ok(&1));
///
/// assert_eq!(table.delete(&"hello"), Ok(1));
/// assert_eq!(table.get(&"hello"), Err(TableError::NotFound));
/// assert_eq!((table.fill(), table.used()), (2, 1));
/// ```
#[derive(Clone)]
pub struct HashTable<K, V, H = DefaultKeyHash> {
    store: SlotStore<K, V>,
    config: TableConfig,
    hasher: H,
}

impl<K, V, H> Debug for HashTable<K, V, H>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HashTable")
            .field("slots", &self.store.slots())
            .field("size", &self.store.size())
            .field("fill", &self.store.fill())
            .field("used", &self.store.used())
            .field("config", &self.config)
            .finish()
    }
}

impl<K, V, H> HashTable<K, V, H> {
    /// Returns the number of live entries. Same as [`used`](Self::used).
    #[inline]
    pub fn len(&self) -> usize {
        self.store.used()
    }

    /// Returns `true` if the table holds no live entries.
    ///
    /// Tombstones do not count: a table whose every entry was deleted is
    /// empty even though its `fill` is not zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.store.used() == 0
    }

    /// Returns the number of slots. Always a power of two, at least 8.
    #[inline]
    pub fn size(&self) -> usize {
        self.store.size()
    }

    /// Returns the number of non-empty slots: live entries plus tombstones.
    #[inline]
    pub fn fill(&self) -> usize {
        self.store.fill()
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn used(&self) -> usize {
        self.store.used()
    }

    /// Returns the configuration the table was built with.
    #[inline]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns the hashing capability.
    #[inline]
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Returns the raw slot array in slot order.
    #[inline]
    pub fn slots(&self) -> &[Slot<K, V>] {
        self.store.slots()
    }

    /// Iterates over live entries in raw slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.store.slots().iter().filter_map(|slot| match slot {
            Slot::Occupied { key, value, .. } => Some((key, value)),
            _ => None,
        })
    }

    /// Snapshots the table slot by slot.
    ///
    /// Empty slots show [`DumpEntry::Empty`] in all three columns. A
    /// tombstone keeps the hash of the key it replaced, with
    /// [`DumpEntry::Dummy`] as key and [`DumpEntry::Empty`] as value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::DumpEntry;
    /// use probe_table::HashTable;
    /// use probe_table::config::TableConfig;
    ///
    /// let identity = |k: &i64| *k;
    /// let mut table = HashTable::with_config_and_hasher(TableConfig::cpython32(), identity).unwrap();
    /// table.set(3, "three");
    /// table.set(4, "four");
    /// table.delete(&4).unwrap();
    ///
    /// let dump = table.dump();
    /// assert_eq!(dump.keys[3], DumpEntry::Present(3));
    /// assert_eq!(dump.hashes[4], DumpEntry::Present(4));
    /// assert_eq!(dump.keys[4], DumpEntry::Dummy);
    /// assert_eq!(dump.values[4], DumpEntry::Empty);
    /// assert_eq!(dump.keys[5], DumpEntry::Empty);
    /// assert_eq!((dump.fill, dump.used), (2, 1));
    /// ```
    pub fn dump(&self) -> Dump<K, V>
    where
        K: Clone,
        V: Clone,
    {
        let size = self.store.size();
        let mut dump = Dump {
            hashes: Vec::with_capacity(size),
            keys: Vec::with_capacity(size),
            values: Vec::with_capacity(size),
            fill: self.store.fill(),
            used: self.store.used(),
        };

        for slot in self.store.slots() {
            let (hash, key, value) = match slot {
                Slot::Empty => (DumpEntry::Empty, DumpEntry::Empty, DumpEntry::Empty),
                Slot::Tombstone { hash } => {
                    (DumpEntry::Present(*hash), DumpEntry::Dummy, DumpEntry::Empty)
                }
                Slot::Occupied { hash, key, value } => (
                    DumpEntry::Present(*hash),
                    DumpEntry::Present(key.clone()),
                    DumpEntry::Present(value.clone()),
                ),
            };
            dump.hashes.push(hash);
            dump.keys.push(key);
            dump.values.push(value);
        }

        dump
    }
}

impl<K, V, H> HashTable<K, V, H>
where
    K: Eq,
    H: KeyHash<K> + Default,
{
    /// Creates an empty table with the default configuration and hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    ///
    /// let mut table: HashTable<u64, &str> = HashTable::new();
    /// assert_eq!(table.size(), 8);
    /// table.set(1, "one");
    /// assert_eq!(table.get(&1), Ok(&"one"));
    /// ```
    pub fn new() -> Self {
        Self::from_validated(TableConfig::default(), H::default(), MIN_SIZE)
    }

    /// Creates an empty table with the given configuration and the default
    /// hasher.
    pub fn with_config(config: TableConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, H::default())
    }
}

impl<K, V, H> Default for HashTable<K, V, H>
where
    K: Eq,
    H: KeyHash<K> + Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, H> HashTable<K, V, H>
where
    K: Eq,
    H: KeyHash<K>,
{
    /// Creates an empty 8-slot table with the given configuration and hasher.
    ///
    /// Fails if the configuration cannot keep the load factor bounded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    /// use probe_table::config::RecyclingPolicy;
    /// use probe_table::config::TableConfig;
    /// use probe_table::key_hash::PyHash;
    /// use probe_table::resize::GrowthPolicy;
    ///
    /// let table: HashTable<i64, i64, _> =
    ///     HashTable::with_config_and_hasher(TableConfig::linear(RecyclingPolicy::Recycling), PyHash)
    ///         .unwrap();
    /// assert_eq!((table.size(), table.fill(), table.used()), (8, 0, 0));
    ///
    /// let bad = TableConfig::cpython32().with_growth(GrowthPolicy::Fixed(1));
    /// assert!(HashTable::<i64, i64, _>::with_config_and_hasher(bad, PyHash).is_err());
    /// ```
    pub fn with_config_and_hasher(config: TableConfig, hasher: H) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_validated(config, hasher, MIN_SIZE))
    }

    /// Builds a table from `pairs`, inserted in order.
    ///
    /// With [`TableConfig::presize`] set, the table starts at the smallest
    /// power of two strictly greater than the number of pairs (at least 8).
    /// Otherwise it starts at 8. Either way it grows as usual while the pairs
    /// are inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    /// use probe_table::config::TableConfig;
    /// use probe_table::key_hash::PyHash;
    ///
    /// let pairs = (0..10i64).map(|i| (i, i * i));
    /// let table = HashTable::from_pairs(TableConfig::cpython32(), PyHash, pairs).unwrap();
    /// assert_eq!(table.size(), 16);
    /// assert_eq!(table.get(&9), Ok(&81));
    /// ```
    pub fn from_pairs(
        config: TableConfig,
        hasher: H,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let pairs: Vec<(K, V)> = pairs.into_iter().collect();
        let size = if config.presize {
            nearest_size(pairs.len())
        } else {
            MIN_SIZE
        };
        let mut table = Self::from_validated(config, hasher, size);
        for (key, value) in pairs {
            table.set(key, value);
        }
        Ok(table)
    }

    fn from_validated(config: TableConfig, hasher: H, size: usize) -> Self {
        Self {
            store: SlotStore::with_size(size),
            config,
            hasher,
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    /// use probe_table::TableError;
    /// use probe_table::config::TableConfig;
    /// use probe_table::key_hash::PyHash;
    ///
    /// let mut table = HashTable::with_config_and_hasher(TableConfig::cpython32(), PyHash).unwrap();
    /// table.set(7i64, "seven");
    /// assert_eq!(table.get(&7), Ok(&"seven"));
    /// assert_eq!(table.get(&8), Err(TableError::NotFound));
    /// ```
    pub fn get(&self, key: &K) -> Result<&V, TableError> {
        let hash = self.hasher.hash_key(key);
        let index = self.lookup(hash, key).ok_or(TableError::NotFound)?;
        match self.store.get(index) {
            Slot::Occupied { value, .. } => Ok(value),
            _ => unreachable!("lookup returned a vacant slot {index}"),
        }
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, TableError> {
        let hash = self.hasher.hash_key(key);
        let index = self.lookup(hash, key).ok_or(TableError::NotFound)?;
        Ok(self.store.value_mut(index))
    }

    /// Returns `true` if `key` is stored in the table.
    pub fn contains_key(&self, key: &K) -> bool {
        let hash = self.hasher.hash_key(key);
        self.lookup(hash, key).is_some()
    }

    /// Inserts `value` under `key`, returning the value it replaced.
    ///
    /// An existing key only has its value swapped. A new key lands on the
    /// first tombstone of its probe walk when recycling is enabled, otherwise
    /// on the empty slot that ended the walk. If the insert brings `fill` to
    /// two thirds of the table, the table is rebuilt before returning.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    /// use probe_table::config::TableConfig;
    /// use probe_table::key_hash::PyHash;
    ///
    /// let mut table = HashTable::with_config_and_hasher(TableConfig::cpython32(), PyHash).unwrap();
    /// assert_eq!(table.set(1i64, 'a'), None);
    /// assert_eq!(table.set(1, 'b'), Some('a'));
    /// assert_eq!(table.len(), 1);
    ///
    /// // The sixth key pushes fill to 6 of 8 slots, and the table quadruples.
    /// for k in 2..=6 {
    ///     table.set(k, 'x');
    /// }
    /// assert_eq!(table.size(), 32);
    /// assert_eq!(table.fill(), table.used());
    /// ```
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        let hash = self.hasher.hash_key(&key);
        match self.landing(hash, &key) {
            Landing::Existing(index) => Some(self.store.replace_value(index, value)),
            Landing::Vacant(index) => {
                self.store.occupy(index, hash, key, value);
                if should_grow(self.store.fill(), self.store.size()) {
                    self.resize();
                }
                None
            }
        }
    }

    /// Removes `key`, returning its value.
    ///
    /// The slot becomes a tombstone: `used` drops by one, `fill` is
    /// unchanged, and the table never shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use probe_table::HashTable;
    /// use probe_table::TableError;
    /// use probe_table::config::TableConfig;
    /// use probe_table::key_hash::PyHash;
    ///
    /// let mut table = HashTable::with_config_and_hasher(TableConfig::cpython32(), PyHash).unwrap();
    /// table.set("k", 1);
    /// assert_eq!(table.delete(&"k"), Ok(1));
    /// assert_eq!(table.delete(&"k"), Err(TableError::NotFound));
    /// assert_eq!((table.fill(), table.used()), (1, 0));
    /// ```
    pub fn delete(&mut self, key: &K) -> Result<V, TableError> {
        let hash = self.hasher.hash_key(key);
        let index = self.lookup(hash, key).ok_or(TableError::NotFound)?;
        let (_, value) = self.store.bury(index);
        Ok(value)
    }

    /// Finds the slot holding `key`, stopping at the first empty slot.
    fn lookup(&self, hash: i64, key: &K) -> Option<usize> {
        let size = self.store.size();
        for index in self.config.probe.probe(hash, size) {
            match self.store.get(index) {
                Slot::Empty => return None,
                Slot::Occupied {
                    hash: stored_hash,
                    key: stored_key,
                    ..
                } if *stored_hash == hash && stored_key == key => return Some(index),
                _ => {}
            }
        }

        self.probe_exhausted(hash)
    }

    /// Finds where an insert of `key` should write.
    fn landing(&self, hash: i64, key: &K) -> Landing {
        let recycling = self.config.recycling == RecyclingPolicy::Recycling;
        let size = self.store.size();

        let mut first_tombstone = None;
        for index in self.config.probe.probe(hash, size) {
            match self.store.get(index) {
                Slot::Empty => {
                    if let Some(tombstone) = first_tombstone {
                        trace!("recycling tombstone at {tombstone} for hash {hash}");
                        return Landing::Vacant(tombstone);
                    }
                    return Landing::Vacant(index);
                }
                Slot::Occupied {
                    hash: stored_hash,
                    key: stored_key,
                    ..
                } if *stored_hash == hash && stored_key == key => {
                    return Landing::Existing(index);
                }
                Slot::Tombstone { .. } if recycling && first_tombstone.is_none() => {
                    first_tombstone = Some(index);
                }
                _ => {}
            }
        }

        self.probe_exhausted(hash)
    }

    #[cold]
    #[inline(never)]
    fn probe_exhausted(&self, hash: i64) -> ! {
        panic!(
            "probe sequence for hash {hash} exhausted without reaching an empty slot \
             (size={}, fill={}, used={}); the growth policy let the table fill up",
            self.store.size(),
            self.store.fill(),
            self.store.used()
        )
    }

    /// Rebuilds the table at the size chosen by the growth policy, dropping
    /// every tombstone. The new size follows `used` alone, so a table full of
    /// tombstones can come out smaller than it went in.
    #[cold]
    fn resize(&mut self) {
        let used = self.store.used();
        let new_size = self.config.growth.next_size(used);
        debug!(
            "resizing table from {} to {new_size} slots (fill={}, used={used})",
            self.store.size(),
            self.store.fill()
        );

        let old = core::mem::replace(&mut self.store, SlotStore::with_size(new_size));
        for (hash, key, value) in old.into_occupied() {
            let index = Self::clean_slot(&self.store, self.config.probe, hash);
            self.store.occupy(index, hash, key, value);
        }

        debug_assert_eq!(self.store.fill(), used);
        debug_assert_eq!(self.store.used(), used);
    }

    /// First empty slot on the probe walk of `hash`.
    ///
    /// Only valid while rebuilding: the fresh store has no tombstones and
    /// cannot already contain the key, so no comparisons are needed.
    fn clean_slot(store: &SlotStore<K, V>, probe: ProbeStrategy, hash: i64) -> usize {
        probe
            .probe(hash, store.size())
            .find(|&index| store.get(index).is_empty())
            .unwrap_or_else(|| unreachable!("rebuilt table has no empty slot for hash {hash}"))
    }
}

/// One cell of a [`Dump`] column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DumpEntry<T> {
    /// The slot has never been written.
    Empty,
    /// The slot holds a tombstone.
    Dummy,
    /// A real hash, key or value.
    Present(T),
}

impl<T> DumpEntry<T> {
    /// Returns the stored data, if any.
    pub fn present(&self) -> Option<&T> {
        match self {
            DumpEntry::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// A verbatim, slot-order snapshot of a table, as produced by
/// [`HashTable::dump`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dump<K, V> {
    /// Per-slot hashes.
    pub hashes: Vec<DumpEntry<i64>>,
    /// Per-slot keys.
    pub keys: Vec<DumpEntry<K>>,
    /// Per-slot values.
    pub values: Vec<DumpEntry<V>>,
    /// Non-empty slot count.
    pub fill: usize,
    /// Live entry count.
    pub used: usize,
}

impl<K, V> Dump<K, V> {
    /// Number of slots in the snapshot.
    pub fn size(&self) -> usize {
        self.keys.len()
    }

    /// Reports the first difference between `self` and `other`, checking
    /// size, then slots in order, then counters.
    pub fn first_mismatch(&self, other: &Self) -> Option<DumpMismatch>
    where
        K: PartialEq,
        V: PartialEq,
    {
        if self.size() != other.size() {
            return Some(DumpMismatch::Size {
                ours: self.size(),
                theirs: other.size(),
            });
        }

        for index in 0..self.size() {
            if self.hashes[index] != other.hashes[index]
                || self.keys[index] != other.keys[index]
                || self.values[index] != other.values[index]
            {
                return Some(DumpMismatch::Slot(index));
            }
        }

        if (self.fill, self.used) != (other.fill, other.used) {
            return Some(DumpMismatch::Counters {
                ours: (self.fill, self.used),
                theirs: (other.fill, other.used),
            });
        }

        None
    }
}

use probe_table::Dump;
use probe_table::DumpEntry;
use probe_table::HashTable;
use probe_table::TableError;
use probe_table::config::RecyclingPolicy;
use probe_table::config::TableConfig;
use probe_table::key_hash::KeyHash;
use probe_table::key_hash::PyHash;
use probe_table::oracle::Op;
use probe_table::oracle::Oracle;
use probe_table::oracle::replay;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

/// A straightforward dict in the shape of the classic reference
/// implementation: three parallel columns plus counters, with `DUMMY` keys
/// marking deleted slots. Arithmetic is done in `u128` so that the
/// perturbation recurrence never wraps.
struct ReferenceDict<K, V> {
    hashes: Vec<DumpEntry<i64>>,
    keys: Vec<DumpEntry<K>>,
    values: Vec<DumpEntry<V>>,
    fill: usize,
    used: usize,
    linear: bool,
    recycling: bool,
}

impl<K: Clone + PartialEq, V: Clone> ReferenceDict<K, V> {
    fn cpython32() -> Self {
        Self::with_size(8, false, true)
    }

    fn linear(recycling: bool) -> Self {
        Self::with_size(8, true, recycling)
    }

    fn with_size(size: usize, linear: bool, recycling: bool) -> Self {
        Self {
            hashes: vec![DumpEntry::Empty; size],
            keys: vec![DumpEntry::Empty; size],
            values: vec![DumpEntry::Empty; size],
            fill: 0,
            used: 0,
            linear,
            recycling,
        }
    }

    fn size(&self) -> usize {
        self.keys.len()
    }

    fn next_index(&self, idx: u128, perturb: u128) -> u128 {
        let size = self.size() as u128;
        if self.linear {
            (idx + 1) % size
        } else {
            (idx * 5 + perturb + 1) % size
        }
    }

    /// Index of `key` if present, else where an insert should write.
    fn lookdict(&self, key: &K, hash: i64) -> usize {
        let size = self.size() as i128;
        let mut idx = (hash as i128).rem_euclid(size) as u128;
        let mut perturb = if hash < 0 {
            (hash as i128 + (1i128 << 64)) as u128
        } else {
            hash as u128
        };

        let mut target = None;
        while self.keys[idx as usize] != DumpEntry::Empty {
            if self.hashes[idx as usize] == DumpEntry::Present(hash)
                && self.keys[idx as usize] == DumpEntry::Present(key.clone())
            {
                return idx as usize;
            }
            if self.recycling && target.is_none() && self.keys[idx as usize] == DumpEntry::Dummy {
                target = Some(idx as usize);
            }
            idx = self.next_index(idx, perturb);
            if !self.linear {
                perturb >>= 5;
            }
        }

        target.unwrap_or(idx as usize)
    }

    fn insert(&mut self, key: K, hash: i64, value: V) {
        let idx = self.lookdict(&key, hash);
        match self.keys[idx] {
            DumpEntry::Empty => {
                self.fill += 1;
                self.used += 1;
            }
            DumpEntry::Dummy => self.used += 1,
            DumpEntry::Present(_) => {}
        }
        self.hashes[idx] = DumpEntry::Present(hash);
        self.keys[idx] = DumpEntry::Present(key);
        self.values[idx] = DumpEntry::Present(value);

        if self.fill * 3 >= self.size() * 2 {
            self.resize();
        }
    }

    fn resize(&mut self) {
        let quotient = if self.linear || self.used > 50_000 { 2 } else { 4 };
        let mut new_size = 8;
        while new_size <= quotient * self.used {
            new_size *= 2;
        }

        let fresh = Self::with_size(new_size, self.linear, self.recycling);
        let old = std::mem::replace(self, fresh);
        for ((hash, key), value) in old.hashes.into_iter().zip(old.keys).zip(old.values) {
            if let (DumpEntry::Present(hash), DumpEntry::Present(key), DumpEntry::Present(value)) =
                (hash, key, value)
            {
                self.insert(key, hash, value);
            }
        }
    }

    fn remove(&mut self, key: &K, hash: i64) -> Result<(), TableError> {
        let idx = self.lookdict(key, hash);
        if self.keys[idx] != DumpEntry::Present(key.clone()) {
            return Err(TableError::NotFound);
        }
        self.keys[idx] = DumpEntry::Dummy;
        self.values[idx] = DumpEntry::Empty;
        self.used -= 1;
        Ok(())
    }
}

impl<K, V> Oracle<K, V> for ReferenceDict<K, V>
where
    K: Clone + PartialEq,
    V: Clone,
    PyHash: KeyHash<K>,
{
    fn set(&mut self, key: K, value: V) {
        let hash = PyHash.hash_key(&key);
        self.insert(key, hash, value);
    }

    fn delete(&mut self, key: &K) -> Result<(), TableError> {
        self.remove(key, PyHash.hash_key(key))
    }

    fn dump(&self) -> Dump<K, V> {
        Dump {
            hashes: self.hashes.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
            fill: self.fill,
            used: self.used,
        }
    }
}

fn engine<K, V>(config: TableConfig) -> HashTable<K, V, PyHash>
where
    K: Eq,
    PyHash: KeyHash<K>,
{
    HashTable::with_config_and_hasher(config, PyHash).unwrap()
}

fn random_int_ops(seed: u64, count: usize, keys: std::ops::Range<i64>) -> Vec<Op<i64, u32>> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..count)
        .map(|i| {
            let key = rng.random_range(keys.clone());
            if rng.random_bool(0.3) {
                Op::Delete(key)
            } else {
                Op::Set(key, i as u32)
            }
        })
        .collect()
}

fn random_word(rng: &mut SmallRng) -> String {
    let len = rng.random_range(0..6);
    (0..len).map(|_| rng.random_range('a'..='e')).collect()
}

/// Builds the dump a table should have, from its non-empty slots.
fn layout<V: Clone>(
    size: usize,
    fill: usize,
    used: usize,
    slots: &[(usize, i64, DumpEntry<i64>, DumpEntry<V>)],
) -> Dump<i64, V> {
    let mut dump = Dump {
        hashes: vec![DumpEntry::Empty; size],
        keys: vec![DumpEntry::Empty; size],
        values: vec![DumpEntry::Empty; size],
        fill,
        used,
    };
    for (idx, hash, key, value) in slots.iter().cloned() {
        dump.hashes[idx] = DumpEntry::Present(hash);
        dump.keys[idx] = key;
        dump.values[idx] = value;
    }
    dump
}

fn live<V>(idx: usize, key: i64, value: V) -> (usize, i64, DumpEntry<i64>, DumpEntry<V>) {
    (idx, key, DumpEntry::Present(key), DumpEntry::Present(value))
}

fn buried<V>(idx: usize, hash: i64) -> (usize, i64, DumpEntry<i64>, DumpEntry<V>) {
    (idx, hash, DumpEntry::Dummy, DumpEntry::Empty)
}

/// Colliding sets and deletes, valued by their position in the stream.
fn collision_ops() -> Vec<Op<i64, u32>> {
    let ops = [
        Op::Set(5, ()),
        Op::Set(13, ()),
        Op::Set(21, ()),
        Op::Set(-3, ()),
        Op::Set(29, ()),
        Op::Delete(13),
        Op::Delete(-3),
        Op::Set(37, ()),
        Op::Set(-11, ()),
        Op::Set(13, ()),
        Op::Delete(21),
        Op::Set(45, ()),
        Op::Set(2, ()),
        Op::Set(10, ()),
    ];
    ops.into_iter()
        .enumerate()
        .map(|(i, op)| match op {
            Op::Set(key, ()) => Op::Set(key, i as u32),
            Op::Delete(key) => Op::Delete(key),
        })
        .collect()
}

fn run_collision_ops(config: TableConfig) -> HashTable<i64, u32, PyHash> {
    let mut table = engine(config);
    for op in collision_ops() {
        match op {
            Op::Set(key, value) => {
                table.set(key, value);
            }
            Op::Delete(key) => {
                table.delete(&key).unwrap();
            }
        }
    }
    table
}

#[test]
fn collision_layout_cpython32() {
    let table = run_collision_ops(TableConfig::cpython32());
    let expected = layout(
        32,
        9,
        8,
        &[
            live(2, 2, 12),
            live(5, 5, 0),
            live(10, 10, 13),
            live(13, 13, 9),
            live(15, 45, 11),
            live(18, 37, 7),
            live(21, -11, 8),
            live(29, 29, 4),
            buried(31, 21),
        ],
    );
    assert_eq!(table.dump().first_mismatch(&expected), None);
    assert_eq!(table.dump(), expected);
}

#[test]
fn collision_layout_linear_recycling() {
    let table = run_collision_ops(TableConfig::linear(RecyclingPolicy::Recycling));
    let expected = layout(
        16,
        9,
        8,
        &[
            live(2, 2, 12),
            live(5, -11, 8),
            live(6, 5, 0),
            live(7, 37, 7),
            buried(8, 21),
            live(10, 10, 13),
            live(13, 29, 4),
            live(14, 13, 9),
            live(15, 45, 11),
        ],
    );
    assert_eq!(table.dump().first_mismatch(&expected), None);
    assert_eq!(table.dump(), expected);
}

#[test]
fn collision_layout_linear_no_recycling() {
    let table = run_collision_ops(TableConfig::linear(RecyclingPolicy::NoRecycling));
    let expected = layout(
        16,
        9,
        8,
        &[
            live(2, 2, 12),
            live(5, 37, 7),
            live(6, 5, 0),
            buried(7, 21),
            live(8, -11, 8),
            live(10, 10, 13),
            live(13, 29, 4),
            live(14, 13, 9),
            live(15, 45, 11),
        ],
    );
    assert_eq!(table.dump().first_mismatch(&expected), None);
    assert_eq!(table.dump(), expected);
}

fn colliding_pairs() -> Vec<(i64, i64)> {
    [0, 8, 16, 1, 9, 17, 2, 10]
        .into_iter()
        .map(|k| (k, k * 10))
        .collect()
}

#[test]
fn from_pairs_layout_presized() {
    let table = HashTable::from_pairs(TableConfig::cpython32(), PyHash, colliding_pairs()).unwrap();
    let expected = layout(
        16,
        8,
        8,
        &[
            live(0, 0, 0),
            live(1, 16, 160),
            live(2, 2, 20),
            live(4, 17, 170),
            live(7, 1, 10),
            live(8, 8, 80),
            live(9, 9, 90),
            live(10, 10, 100),
        ],
    );
    assert_eq!(table.dump(), expected);
}

#[test]
fn from_pairs_layout_grown_from_eight() {
    let table = HashTable::from_pairs(
        TableConfig::linear(RecyclingPolicy::Recycling),
        PyHash,
        colliding_pairs(),
    )
    .unwrap();
    let expected = layout(
        16,
        8,
        8,
        &[
            live(0, 0, 0),
            live(1, 16, 160),
            live(2, 1, 10),
            live(3, 17, 170),
            live(4, 2, 20),
            live(8, 8, 80),
            live(9, 9, 90),
            live(10, 10, 100),
        ],
    );
    assert_eq!(table.dump(), expected);
}

#[test]
fn hand_computed_layout() {
    let mut table = engine::<i64, char>(TableConfig::cpython32());
    table.set(1, 'a');
    // 9 starts at 1, then (1*5 + 9 + 1) % 8 == 7.
    table.set(9, 'b');
    // 17 starts at 1, then 7, then with perturb 0: (7*5 + 1) % 8 == 4.
    table.set(17, 'c');
    table.delete(&9).unwrap();

    let dump = table.dump();
    assert_eq!(dump.hashes[7], DumpEntry::Present(9));
    assert_eq!(dump.keys[7], DumpEntry::Dummy);
    assert_eq!(dump.values[7], DumpEntry::Empty);
    assert_eq!((dump.fill, dump.used), (3, 2));

    // 25 walks 1, 7 (tombstone, remembered), 4, 5 (empty) and lands on 7.
    table.set(25, 'd');

    let mut expected = Dump {
        hashes: vec![DumpEntry::Empty; 8],
        keys: vec![DumpEntry::Empty; 8],
        values: vec![DumpEntry::Empty; 8],
        fill: 3,
        used: 3,
    };
    for (idx, key, value) in [(1, 1, 'a'), (4, 17, 'c'), (7, 25, 'd')] {
        expected.hashes[idx] = DumpEntry::Present(key);
        expected.keys[idx] = DumpEntry::Present(key);
        expected.values[idx] = DumpEntry::Present(value);
    }
    assert_eq!(table.dump(), expected);
}

#[test]
fn fixed_string_scenario_matches_reference() {
    let words = [
        "abde",
        "cdef",
        "world",
        "hmmm",
        "hello",
        "xxx",
        "ya",
        "hello,world!",
        "well",
        "meh",
    ];

    let mut ops = Vec::new();
    for (i, word) in words.iter().enumerate() {
        ops.push(Op::Set(word.to_string(), i as u32));
    }
    ops.push(Op::Delete("hello".to_string()));
    ops.push(Op::Delete("xxx".to_string()));
    ops.push(Op::Set("ya".to_string(), 100));
    ops.push(Op::Set("xxx".to_string(), 101));
    ops.push(Op::Delete("missing".to_string()));
    for (i, word) in words.iter().enumerate().rev() {
        ops.push(Op::Set(word.to_string(), 200 + i as u32));
    }

    let mut table = engine(TableConfig::cpython32());
    let mut reference = ReferenceDict::cpython32();
    assert_eq!(replay(&mut table, &mut reference, ops), Ok(()));
    assert_eq!(table.get(&"hello".to_string()), Ok(&204));
}

#[test]
fn random_ints_match_reference() {
    for seed in 0..8 {
        let mut table = engine(TableConfig::cpython32());
        let mut reference = ReferenceDict::cpython32();
        let ops = random_int_ops(seed, 4000, 0..300);
        assert_eq!(replay(&mut table, &mut reference, ops), Ok(()), "seed {seed}");
    }
}

#[test]
fn negative_ints_match_reference() {
    let mut table = engine(TableConfig::cpython32());
    let mut reference = ReferenceDict::cpython32();
    let ops = random_int_ops(99, 4000, -500..500);
    assert_eq!(replay(&mut table, &mut reference, ops), Ok(()));

    let mut table = engine(TableConfig::cpython32());
    let mut reference = ReferenceDict::cpython32();
    let extremes = [i64::MIN, i64::MIN + 1, -1, -2, i64::MAX, 1 << 61, -(1 << 61)];
    let ops = extremes
        .iter()
        .enumerate()
        .map(|(i, &k)| Op::Set(k, i as u32))
        .chain(extremes.iter().step_by(2).map(|&k| Op::Delete(k)));
    assert_eq!(replay(&mut table, &mut reference, ops), Ok(()));
}

#[test]
fn random_strings_match_reference() {
    let mut rng = SmallRng::seed_from_u64(0x57);
    let ops = (0..3000u32)
        .map(|i| {
            let word = random_word(&mut rng);
            if rng.random_bool(0.25) {
                Op::Delete(word)
            } else {
                Op::Set(word, i)
            }
        })
        .collect::<Vec<_>>();

    let mut table = engine(TableConfig::cpython32());
    let mut reference = ReferenceDict::cpython32();
    assert_eq!(replay(&mut table, &mut reference, ops), Ok(()));
}

#[test]
fn linear_variants_match_reference() {
    for recycling in [true, false] {
        let policy = if recycling {
            RecyclingPolicy::Recycling
        } else {
            RecyclingPolicy::NoRecycling
        };
        for seed in 0..4 {
            let mut table = engine(TableConfig::linear(policy));
            let mut reference = ReferenceDict::linear(recycling);
            let ops = random_int_ops(seed, 3000, 0..200);
            assert_eq!(
                replay(&mut table, &mut reference, ops),
                Ok(()),
                "recycling={recycling} seed={seed}"
            );
        }
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn adaptive_threshold_matches_reference() {
    let mut table = engine::<i64, i64>(TableConfig::cpython32());
    let mut reference = ReferenceDict::cpython32();
    for k in 0..60_000i64 {
        let key = k.wrapping_mul(0x9E37_79B9);
        table.set(key, k);
        reference.set(key, k);
    }
    for k in (0..60_000i64).step_by(3) {
        let key = k.wrapping_mul(0x9E37_79B9);
        assert_eq!(table.delete(&key).is_ok(), reference.delete(&key).is_ok());
    }

    assert_eq!(table.dump().first_mismatch(&reference.dump()), None);
    assert!(table.size() > 100_000);
}

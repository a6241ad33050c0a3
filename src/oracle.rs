//! Differential replay against a reference table.
//!
//! Two implementations that agree on hash function, probe strategy, recycling
//! and growth must produce identical slot layouts after every operation.
//! [`replay`] drives both through the same operations and reports the first
//! point at which their [`Dump`]s disagree.

use crate::error::DumpMismatch;
use crate::error::Divergence;
use crate::error::TableError;
use crate::hash_table::Dump;
use crate::hash_table::HashTable;
use crate::key_hash::KeyHash;

/// A table that can be driven by [`replay`] and compared slot for slot.
pub trait Oracle<K, V> {
    /// Inserts or replaces `key`.
    fn set(&mut self, key: K, value: V);

    /// Removes `key`.
    fn delete(&mut self, key: &K) -> Result<(), TableError>;

    /// Snapshots the slot layout and counters.
    fn dump(&self) -> Dump<K, V>;
}

impl<K, V, H> Oracle<K, V> for HashTable<K, V, H>
where
    K: Eq + Clone,
    V: Clone,
    H: KeyHash<K>,
{
    fn set(&mut self, key: K, value: V) {
        HashTable::set(self, key, value);
    }

    fn delete(&mut self, key: &K) -> Result<(), TableError> {
        HashTable::delete(self, key).map(drop)
    }

    fn dump(&self) -> Dump<K, V> {
        HashTable::dump(self)
    }
}

/// One mutating operation of a replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op<K, V> {
    /// Insert or replace.
    Set(K, V),
    /// Remove; a missing key is not an error, but both sides must agree on
    /// whether it was found.
    Delete(K),
}

/// Applies `ops` to `table` and `oracle` in lockstep, comparing dumps after
/// every operation.
///
/// # Examples
///
/// ```rust
/// use probe_table::HashTable;
/// use probe_table::config::RecyclingPolicy;
/// use probe_table::config::TableConfig;
/// use probe_table::error::DumpMismatch;
/// use probe_table::key_hash::PyHash;
/// use probe_table::oracle::Op;
/// use probe_table::oracle::replay;
///
/// let ops = [Op::Set(1i64, 'a'), Op::Delete(1), Op::Set(9, 'b')];
///
/// let mut recycling =
///     HashTable::with_config_and_hasher(TableConfig::linear(RecyclingPolicy::Recycling), PyHash)
///         .unwrap();
/// let mut stepping_over =
///     HashTable::with_config_and_hasher(TableConfig::linear(RecyclingPolicy::NoRecycling), PyHash)
///         .unwrap();
///
/// let divergence = replay(&mut recycling, &mut stepping_over, ops).unwrap_err();
/// assert_eq!(divergence.step, 2);
/// assert_eq!(divergence.mismatch, DumpMismatch::Slot(1));
/// ```
pub fn replay<K, V, T, O>(
    table: &mut T,
    oracle: &mut O,
    ops: impl IntoIterator<Item = Op<K, V>>,
) -> Result<(), Divergence>
where
    K: Clone + PartialEq,
    V: Clone + PartialEq,
    T: Oracle<K, V> + ?Sized,
    O: Oracle<K, V> + ?Sized,
{
    for (step, op) in ops.into_iter().enumerate() {
        match op {
            Op::Set(key, value) => {
                oracle.set(key.clone(), value.clone());
                table.set(key, value);
            }
            Op::Delete(key) => {
                let ours = table.delete(&key).is_ok();
                let theirs = oracle.delete(&key).is_ok();
                if ours != theirs {
                    return Err(Divergence {
                        step,
                        mismatch: DumpMismatch::DeleteOutcome { ours, theirs },
                    });
                }
            }
        }

        if let Some(mismatch) = table.dump().first_mismatch(&oracle.dump()) {
            return Err(Divergence { step, mismatch });
        }
    }

    Ok(())
}

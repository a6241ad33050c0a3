//! Occupancy and probe-length statistics.
//!
//! Compiled for tests and with the `stats` feature.

use alloc::vec;
use alloc::vec::Vec;

use crate::hash_table::HashTable;
use crate::slot::Slot;

/// Occupancy snapshot of a [`HashTable`].
#[derive(Debug, Clone, PartialEq)]
pub struct DebugStats {
    /// Number of slots
    pub size: usize,
    /// Non-empty slots (live entries plus tombstones)
    pub fill: usize,
    /// Live entries
    pub used: usize,
    /// Tombstones, i.e. `fill - used`
    pub tombstones: usize,
    /// fill / size; a rebuild triggers once this reaches 2/3
    pub load_factor: f64,
    /// used / size
    pub utilization: f64,
    /// Bytes held by the slot array
    pub total_bytes: usize,
}

impl DebugStats {
    /// Pretty-print the statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Fill: {}/{} ({:.2}% load factor)",
            self.fill,
            self.size,
            self.load_factor * 100.0
        );
        println!(
            "Used: {}/{} ({:.2}% utilization)",
            self.used,
            self.size,
            self.utilization * 100.0
        );
        println!("Tombstones: {}", self.tombstones);
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Counts of live entries by probe length.
///
/// `bins[n]` is the number of entries found `n` steps after their start
/// index; `bins[0]` counts entries sitting on their start index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// Entry counts per probe length.
    pub bins: Vec<usize>,
}

impl ProbeHistogram {
    /// Total number of entries counted.
    pub fn total(&self) -> usize {
        self.bins.iter().sum()
    }

    /// Longest probe length with at least one entry.
    pub fn max_probe_length(&self) -> Option<usize> {
        self.bins.iter().rposition(|&count| count != 0)
    }

    /// Mean probe length over all entries, or 0 for an empty table.
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self.bins.iter().enumerate().map(|(n, &c)| n * c).sum();
        weighted as f64 / total as f64
    }

    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries, mean {:.3}):",
            self.total(),
            self.mean()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                0 => None,
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                _ => Some('▉'),
            };
            bar.extend(partial);
            bar
        };

        for (length, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", length, make_bar(count), count);
        }
    }
}

impl<K, V, H> HashTable<K, V, H>
where
    K: Eq,
    H: crate::key_hash::KeyHash<K>,
{
    /// Returns occupancy statistics for the current table state.
    pub fn debug_stats(&self) -> DebugStats {
        let size = self.size();
        let ratio = |n: usize| n as f64 / size as f64;

        DebugStats {
            size,
            fill: self.fill(),
            used: self.used(),
            tombstones: self.fill() - self.used(),
            load_factor: ratio(self.fill()),
            utilization: ratio(self.used()),
            total_bytes: size * core::mem::size_of::<Slot<K, V>>(),
        }
    }

    /// Computes a histogram of probe lengths for the current table state.
    ///
    /// The probe length of an entry is the number of slots its probe walk
    /// visits before reaching it. Tombstones are not counted.
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let size = self.size();
        let mut bins = vec![0usize; 1];

        for (index, slot) in self.slots().iter().enumerate() {
            let Slot::Occupied { hash, .. } = slot else {
                continue;
            };
            let length = self
                .config()
                .probe
                .probe(*hash, size)
                .position(|visited| visited == index)
                .unwrap_or_else(|| unreachable!("entry at {index} is off its own probe walk"));
            if bins.len() <= length {
                bins.resize(length + 1, 0);
            }
            bins[length] += 1;
        }

        ProbeHistogram { bins }
    }

    /// Pretty-prints the probe-length histogram using stdout.
    #[cfg(feature = "std")]
    pub fn print_probe_histogram(&self) {
        self.probe_histogram().print();
    }
}

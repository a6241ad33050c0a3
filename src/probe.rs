//! Probe sequences: the order in which candidate slots are visited.
//!
//! Both strategies rely on the table size being a power of two. Linear
//! probing trivially visits every index once per lap. The perturbation scheme
//! folds the upper bits of the hash into the first few steps, and once the
//! perturbation has been shifted down to zero it degenerates into the
//! recurrence `i = 5*i + 1 (mod 2^k)`, which is a full-period generator and
//! so visits every index once per lap as well.

use alloc::vec;
use alloc::vec::Vec;

/// Number of bits the perturbation is shifted right after every step.
pub const PERTURB_SHIFT: u32 = 5;

/// Upper bound on steps taken before the perturbation of any 64-bit hash
/// reaches zero.
const PERTURB_STEPS: usize = (u64::BITS as usize).div_ceil(PERTURB_SHIFT as usize);

/// Collision resolution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProbeStrategy {
    /// `next = (idx + 1) mod size`.
    Linear,
    /// `next = (idx * 5 + perturb + 1) mod size`, with `perturb` starting as
    /// the hash reinterpreted as unsigned and shifted right by
    /// [`PERTURB_SHIFT`] after every step.
    #[default]
    Perturbation,
}

/// Computes the first slot visited for `hash` in a table of `size` slots.
///
/// Uses Euclidean remainder, so negative hashes still land in `0..size`.
#[inline]
pub fn start_index(hash: i64, size: usize) -> usize {
    debug_assert!(size.is_power_of_two());
    hash.rem_euclid(size as i64) as usize
}

/// Reinterprets a signed hash as the unsigned perturbation seed, i.e. adds
/// `2^64` to negative hashes.
#[inline]
pub fn initial_perturb(hash: i64) -> u64 {
    hash as u64
}

impl ProbeStrategy {
    /// Starts a probe walk for `hash` in a table of `size` slots.
    pub fn probe(self, hash: i64, size: usize) -> Probe {
        Probe::new(self, start_index(hash, size), initial_perturb(hash), size)
    }

    /// Records the full probe graph of `hash` in a table of `size` slots.
    ///
    /// The walk continues until every index has been visited at least once,
    /// recording each step taken from each index.
    pub fn trace(self, hash: i64, size: usize) -> ProbeTrace {
        let start = start_index(hash, size);
        let mut links = vec![Vec::new(); size];
        let mut visited = vec![false; size];
        let mut remaining = size;

        let mut idx = start;
        let mut perturb = initial_perturb(hash);
        while remaining > 0 {
            if !visited[idx] {
                visited[idx] = true;
                remaining -= 1;
            }

            let next = self.step(idx, perturb, size);
            links[idx].push(ProbeLink {
                next,
                perturbed: self == ProbeStrategy::Perturbation && perturb != 0,
            });
            idx = next;
            perturb >>= PERTURB_SHIFT;
        }

        ProbeTrace { start, links }
    }

    /// Maximum number of indices a walk yields before it is considered
    /// exhausted.
    #[inline]
    pub fn step_limit(self, size: usize) -> usize {
        match self {
            ProbeStrategy::Linear => size,
            ProbeStrategy::Perturbation => size + PERTURB_STEPS,
        }
    }

    #[inline(always)]
    fn step(self, idx: usize, perturb: u64, size: usize) -> usize {
        let mask = size as u64 - 1;
        match self {
            ProbeStrategy::Linear => ((idx as u64 + 1) & mask) as usize,
            // `size` divides 2^64, so reducing the wrapped sum is exact.
            ProbeStrategy::Perturbation => {
                ((idx as u64).wrapping_mul(5).wrapping_add(perturb).wrapping_add(1) & mask) as usize
            }
        }
    }
}

/// An iterator over the slot indices visited for one key.
///
/// Yields the start index first. Stops after
/// [`ProbeStrategy::step_limit`] indices; a caller that runs a walk to
/// completion without finding an empty slot has hit a table that is
/// completely full.
#[derive(Debug, Clone)]
pub struct Probe {
    strategy: ProbeStrategy,
    next: usize,
    perturb: u64,
    size: usize,
    remaining: usize,
}

impl Probe {
    /// Starts a walk at `start` with an explicit perturbation value.
    pub fn new(strategy: ProbeStrategy, start: usize, perturb: u64, size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        debug_assert!(start < size);

        Self {
            strategy,
            next: start,
            perturb,
            size,
            remaining: strategy.step_limit(size),
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;

        let current = self.next;
        self.next = self.strategy.step(current, self.perturb, self.size);
        if self.strategy == ProbeStrategy::Perturbation {
            self.perturb >>= PERTURB_SHIFT;
        }

        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}

/// One edge of a [`ProbeTrace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeLink {
    /// The index probed next.
    pub next: usize,
    /// Whether a non-zero perturbation contributed to this step.
    pub perturbed: bool,
}

/// The probe graph of a single hash, as produced by
/// [`ProbeStrategy::trace`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTrace {
    /// The first index visited.
    pub start: usize,
    /// `links[i]` holds every step taken out of index `i`, in order.
    pub links: Vec<Vec<ProbeLink>>,
}

impl ProbeTrace {
    /// Returns the visit order, starting at [`start`](Self::start) and
    /// following the recorded links.
    pub fn path(&self) -> Vec<usize> {
        let mut cursor = vec![0usize; self.links.len()];
        let mut path = vec![self.start];
        let mut idx = self.start;
        while let Some(link) = self.links[idx].get(cursor[idx]) {
            cursor[idx] += 1;
            idx = link.next;
            path.push(idx);
        }
        path
    }
}

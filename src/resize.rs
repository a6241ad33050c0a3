use crate::error::ConfigError;

/// Number of slots in a freshly created table, and the smallest size any
/// rebuild produces.
pub const MIN_SIZE: usize = 8;

/// Used-count threshold at which the classic adaptive policy switches from
/// quadrupling to doubling.
pub const ADAPTIVE_THRESHOLD: usize = 50_000;

/// Returns `true` once `fill` has reached two thirds of `size`.
#[inline(always)]
pub fn should_grow(fill: usize, size: usize) -> bool {
    fill.saturating_mul(3) >= size.saturating_mul(2)
}

/// Smallest power of two strictly greater than `min_used`, never below
/// [`MIN_SIZE`].
///
/// # Panics
///
/// Panics if the result does not fit in a `usize`.
#[inline]
pub fn nearest_size(min_used: usize) -> usize {
    min_used
        .checked_add(1)
        .and_then(usize::checked_next_power_of_two)
        .expect("capacity overflow")
        .max(MIN_SIZE)
}

/// How much the table grows when the load factor trips.
///
/// The new size is the smallest power of two strictly greater than
/// `quotient * used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrowthPolicy {
    /// Always use the same quotient.
    Fixed(usize),
    /// Use `small` while `used <= threshold`, `large` above it.
    Adaptive {
        /// Quotient for small tables.
        small: usize,
        /// Quotient once `used` exceeds `threshold`.
        large: usize,
        /// Inclusive upper bound on `used` for the small quotient.
        threshold: usize,
    },
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        Self::adaptive()
    }
}

impl GrowthPolicy {
    /// The classic dict curve: quadruple up to 50000 live entries, double
    /// beyond.
    pub const fn adaptive() -> Self {
        GrowthPolicy::Adaptive {
            small: 4,
            large: 2,
            threshold: ADAPTIVE_THRESHOLD,
        }
    }

    /// The quotient applied when the table holds `used` live entries.
    #[inline]
    pub fn quotient(&self, used: usize) -> usize {
        match *self {
            GrowthPolicy::Fixed(quotient) => quotient,
            GrowthPolicy::Adaptive {
                small,
                large,
                threshold,
            } => {
                if used <= threshold {
                    small
                } else {
                    large
                }
            }
        }
    }

    /// Size of the table to rebuild into when the table holds `used` live
    /// entries.
    ///
    /// # Panics
    ///
    /// Panics if the result does not fit in a `usize`.
    pub fn next_size(&self, used: usize) -> usize {
        let min_used = self
            .quotient(used)
            .checked_mul(used)
            .expect("capacity overflow");
        nearest_size(min_used)
    }

    /// Rejects quotients below 2.
    ///
    /// After a rebuild `fill == used` and the new size exceeds
    /// `quotient * used`, so a quotient of at least 2 guarantees
    /// `fill * 3 < size * 2` again. Anything smaller can leave the table over
    /// the threshold, or completely full.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let smallest = match *self {
            GrowthPolicy::Fixed(quotient) => quotient,
            GrowthPolicy::Adaptive { small, large, .. } => small.min(large),
        };
        if smallest < 2 {
            return Err(ConfigError::QuotientTooSmall(smallest));
        }
        Ok(())
    }
}

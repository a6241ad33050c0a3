use crate::error::ConfigError;
use crate::probe::ProbeStrategy;
use crate::resize::GrowthPolicy;

/// Whether inserts may land on tombstones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecyclingPolicy {
    /// Insert into the first tombstone seen on the probe walk when the key is
    /// not already present.
    #[default]
    Recycling,
    /// Step over tombstones like any other foreign key. Tombstones are only
    /// reclaimed by a rebuild, so `fill` can climb much faster than `used`.
    NoRecycling,
}

/// The knobs of a [`HashTable`](crate::HashTable).
///
/// # Examples
///
/// ```rust
/// use probe_table::config::RecyclingPolicy;
/// use probe_table::config::TableConfig;
/// use probe_table::probe::ProbeStrategy;
/// use probe_table::resize::GrowthPolicy;
///
/// let config = TableConfig::cpython32()
///     .with_probe(ProbeStrategy::Linear)
///     .with_recycling(RecyclingPolicy::NoRecycling)
///     .with_growth(GrowthPolicy::Fixed(2));
/// assert!(config.validate().is_ok());
///
/// assert!(config.with_growth(GrowthPolicy::Fixed(1)).validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TableConfig {
    /// Collision resolution strategy.
    pub probe: ProbeStrategy,
    /// Tombstone reuse on insert.
    pub recycling: RecyclingPolicy,
    /// Growth quotient curve.
    pub growth: GrowthPolicy,
    /// Whether [`HashTable::from_pairs`](crate::HashTable::from_pairs) starts
    /// at the smallest size above the pair count instead of at 8 slots.
    pub presize: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self::cpython32()
    }
}

impl TableConfig {
    /// Perturbation probing, tombstone recycling, and adaptive 4/2 growth:
    /// the layout of the classic 64-bit dict.
    pub const fn cpython32() -> Self {
        Self {
            probe: ProbeStrategy::Perturbation,
            recycling: RecyclingPolicy::Recycling,
            growth: GrowthPolicy::adaptive(),
            presize: true,
        }
    }

    /// Linear probing with a fixed growth quotient of 2. Tables built from
    /// pairs start at 8 slots and grow as the pairs go in.
    pub const fn linear(recycling: RecyclingPolicy) -> Self {
        Self {
            probe: ProbeStrategy::Linear,
            recycling,
            growth: GrowthPolicy::Fixed(2),
            presize: false,
        }
    }

    /// Replaces the probe strategy.
    pub const fn with_probe(mut self, probe: ProbeStrategy) -> Self {
        self.probe = probe;
        self
    }

    /// Replaces the recycling policy.
    pub const fn with_recycling(mut self, recycling: RecyclingPolicy) -> Self {
        self.recycling = recycling;
        self
    }

    /// Replaces the growth policy.
    pub const fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Replaces the presizing behavior of `from_pairs`.
    pub const fn with_presize(mut self, presize: bool) -> Self {
        self.presize = presize;
        self
    }

    /// Checks that the configuration can uphold the load factor bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.growth.validate()
    }
}

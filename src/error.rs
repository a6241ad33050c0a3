use thiserror::Error;

/// Errors surfaced by table lookups and deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TableError {
    /// The key is not present in the table.
    #[error("key not found")]
    NotFound,
}

/// Errors produced when validating a [`TableConfig`](crate::config::TableConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A growth quotient below 2 cannot bring the load factor back under 2/3
    /// after a rebuild, so the table would fill up completely.
    #[error("growth quotient {0} is too small, it must be at least 2")]
    QuotientTooSmall(usize),
}

/// Where two table snapshots first disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DumpMismatch {
    /// The snapshots have a different number of slots.
    #[error("size differs: {ours} vs {theirs}")]
    Size {
        /// Slot count of the table under test.
        ours: usize,
        /// Slot count of the oracle.
        theirs: usize,
    },
    /// The `fill`/`used` counters differ.
    #[error("counters differ: fill/used {ours:?} vs {theirs:?}")]
    Counters {
        /// `(fill, used)` of the table under test.
        ours: (usize, usize),
        /// `(fill, used)` of the oracle.
        theirs: (usize, usize),
    },
    /// The first slot whose hash, key or value differs.
    #[error("slot {0} differs")]
    Slot(usize),
    /// A delete succeeded on one side and failed on the other.
    #[error("delete outcome differs: table found={ours}, oracle found={theirs}")]
    DeleteOutcome {
        /// Whether the table under test found the key.
        ours: bool,
        /// Whether the oracle found the key.
        theirs: bool,
    },
}

/// A differential replay diverged from its oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("diverged from oracle after step {step}: {mismatch}")]
pub struct Divergence {
    /// Zero-based index of the operation after which the snapshots differed.
    pub step: usize,
    /// The first difference found.
    pub mismatch: DumpMismatch,
}

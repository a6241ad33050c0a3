#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

/// Table configuration presets and builders.
pub mod config;

/// Error types for lookups, configuration and differential replays.
pub mod error;

/// The table engine and its slot-order snapshots.
pub mod hash_table;

pub mod key_hash;

pub mod oracle;

pub mod probe;

/// Load-factor trigger and growth sizing.
pub mod resize;

mod slot;

#[cfg(any(test, feature = "stats"))]
pub mod stats;

pub use error::TableError;
pub use hash_table::Dump;
pub use hash_table::DumpEntry;
pub use hash_table::HashTable;
pub use slot::Slot;

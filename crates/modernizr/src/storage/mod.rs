//! Storage backends and decorators.
//!
//! - [`dual_write`]: per-entity wrappers that mirror writes and route reads
//! - [`inmemory`]: in-memory adapters standing in for both stores
//! - [`journal`]: replication counters and the failed-write log

pub mod dual_write;
pub mod inmemory;
pub mod journal;

pub use dual_write::{DualStore, DualStoreSettings, MirrorQueue, RepositoryPair};
pub use inmemory::{InMemoryAdapters, InMemoryRepository};
pub use journal::{FailedWrite, JournalStats, ReplicationJournal};

//! Storage layer for Linkage
//!
//! This crate implements the in-memory contact store:
//! - MemoryStore: BTreeMap of contact rows behind a `parking_lot::RwLock`
//! - LookupIndex: email → ids and phone → ids secondary indices
//! - Per-row and per-lookup-key versions for commit-time validation
//! - Monotonic id allocation with AtomicU64

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod memory;

pub use index::LookupIndex;
pub use memory::MemoryStore;

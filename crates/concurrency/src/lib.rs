//! Concurrency layer for Linkage
//!
//! This crate implements optimistic concurrency control (OCC) with:
//! - TransactionContext: Read-set tracking and buffered writes
//! - Lookup-key validation so concurrent inserts are caught, not just updates
//! - Conflict detection at commit time (first-committer-wins)
//! - TransactionManager: Commit lock, version allocation, atomic apply
//!
//! A transaction never writes to the store before commit. A failed
//! validation discards the buffered writes and surfaces as a retryable
//! `ConcurrentConflict`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod manager;
pub mod transaction;
pub mod validation;

pub use manager::TransactionManager;
pub use transaction::{CommitError, PendingOperations, TransactionContext, TransactionStatus};
pub use validation::{validate_read_set, ConflictType, ValidationResult};

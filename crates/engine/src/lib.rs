//! Identity resolution engine for Linkage
//!
//! This crate orchestrates all lower layers:
//! - Database: store ownership, transaction API, conflict retry, shutdown
//! - TransactionCoordinator: commit protocol plus transaction metrics
//! - Resolution: closure discovery, primary election, novelty gate and
//!   response projection
//! - IdentityService: the request-level entry point
//!
//! The engine is the only component that knows how a request maps onto a
//! unit of work.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;
pub mod identity;
pub mod resolution;

pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{Database, LinkageConfig, RetryConfig, CONFIG_FILE_NAME};
pub use identity::IdentityService;
pub use resolution::{resolve, Closure, Resolution};

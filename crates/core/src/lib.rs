//! Core types and traits for Linkage
//!
//! This crate defines the foundational types used throughout the system:
//! - ContactId: Store-assigned, monotonically increasing contact identifier
//! - Contact / NewContact: Persisted and not-yet-persisted contact records
//! - Precedence: Primary or secondary standing of a contact
//! - StoreKey: Versioned units of the store (rows and lookup keys)
//! - Timestamp: Microsecond-precision creation/update times
//! - Error: LinkageError hierarchy
//! - Traits: ContactStore (backend) and ContactRepository (transactional view)
//! - Contract: Inbound request and outbound response shapes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod contract;
pub mod error;
pub mod timestamp;
pub mod traits;
pub mod types;

pub use contract::{IdentifyRequest, IdentifyResponse, IdentityView};
pub use error::{LinkageError, LinkageResult};
pub use timestamp::Timestamp;
pub use traits::{ContactRepository, ContactStore, LookupSnapshot};
pub use types::{Contact, ContactId, NewContact, Precedence, StoreKey, VersionedContact};

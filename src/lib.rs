//! Linkage - contact identity resolution
//!
//! Linkage unifies contact records that share an email address or a phone
//! number under a single primary identity. Every sighting of new contact
//! information is kept as a secondary record linked to that primary.
//!
//! # Quick Start
//!
//! ```
//! use linkage::{Database, IdentifyRequest, IdentityService};
//!
//! let db = Database::ephemeral();
//! let service = IdentityService::new(db);
//!
//! let first = service
//!     .identify(&IdentifyRequest::new(Some("a@x.com"), Some("100")))
//!     .unwrap();
//! let second = service
//!     .identify(&IdentifyRequest::new(Some("a@x.com"), Some("200")))
//!     .unwrap();
//!
//! assert_eq!(first.contact.primary_contact_id, second.contact.primary_contact_id);
//! assert_eq!(second.contact.phone_numbers, vec!["100", "200"]);
//! ```
//!
//! # Architecture
//!
//! Requests go through [`IdentityService`], which runs the resolution
//! pipeline inside one optimistic transaction of a [`Database`]. Conflicting
//! concurrent resolutions are detected at commit time and retried from
//! scratch.

pub use linkage_core::{
    Contact, ContactId, IdentifyRequest, IdentifyResponse, IdentityView, LinkageError,
    LinkageResult, NewContact, Precedence, Timestamp,
};
pub use linkage_engine::{
    Database, IdentityService, LinkageConfig, RetryConfig, TransactionMetrics,
};
pub use linkage_storage::MemoryStore;

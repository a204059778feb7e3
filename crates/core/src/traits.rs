//! Core traits for contact storage
//!
//! Two seams separate the resolution algorithm from storage:
//!
//! - [`ContactStore`]: the shared backend. Versioned reads, id allocation and
//!   atomic application of a committed write set. Implementations must be
//!   safe to call from many threads.
//! - [`ContactRepository`]: the view one unit of work has of the store.
//!   Lookups, inserts and updates with read-your-writes. The transaction
//!   context implements it; the resolution stages only ever see this trait.

use crate::error::LinkageResult;
use crate::types::{Contact, ContactId, NewContact, StoreKey, VersionedContact};

/// Rows returned by a lookup together with the lookup-key versions observed
///
/// Both are read under the same store lock so a transaction can validate
/// the lookup as a whole at commit time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupSnapshot {
    /// Matching contacts, ascending by id
    pub contacts: Vec<VersionedContact>,
    /// Version of each lookup key consulted (0 if never written)
    pub key_versions: Vec<(StoreKey, u64)>,
}

/// Shared contact storage backend
///
/// Thread safety: all methods must be safe to call concurrently.
pub trait ContactStore: Send + Sync {
    /// Get a contact by id with its row version
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be read.
    fn get(&self, id: ContactId) -> LinkageResult<Option<VersionedContact>>;

    /// Find contacts whose email equals `email` or whose phone equals `phone`
    ///
    /// Absent arguments never match. Returns an empty snapshot when both are
    /// absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be read.
    fn lookup(&self, email: Option<&str>, phone: Option<&str>) -> LinkageResult<LookupSnapshot>;

    /// Current version of a store key (0 if never written)
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be read.
    fn key_version(&self, key: &StoreKey) -> LinkageResult<u64>;

    /// Latest commit version applied to the store
    fn current_version(&self) -> u64;

    /// Allocate the next contact id
    ///
    /// Ids are never reused, even when the transaction that allocated one
    /// aborts.
    fn allocate_id(&self) -> ContactId;

    /// Apply a committed write set at `commit_version`
    ///
    /// Each contact replaces the row with the same id (or creates it) and
    /// bumps every lookup key it was or is reachable through. The whole set
    /// becomes visible at once.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be written.
    fn apply(&self, writes: &[Contact], commit_version: u64) -> LinkageResult<()>;

    /// All committed contacts, ascending by id
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the backend cannot be read.
    fn contacts(&self) -> LinkageResult<Vec<Contact>>;
}

/// Transactional view of the contact store
///
/// Reads take `&mut self` because every read is recorded for commit-time
/// validation.
pub trait ContactRepository {
    /// Find contacts matching `email` or `phone`, ascending by id
    ///
    /// Returns nothing if both arguments are absent.
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> LinkageResult<Vec<Contact>>;

    /// Get a contact by id
    fn get(&mut self, id: ContactId) -> LinkageResult<Option<Contact>>;

    /// Insert a new contact, returning it with its assigned id
    fn insert(&mut self, contact: NewContact) -> LinkageResult<Contact>;

    /// Persist changes to an existing contact
    fn update(&mut self, contact: &Contact) -> LinkageResult<()>;
}

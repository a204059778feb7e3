//! Transaction context for OCC
//!
//! TransactionContext tracks every read and buffers every write of one unit
//! of work. It implements [`ContactRepository`], so the resolution stages run
//! against it directly and see their own writes.
//!
//! Read-set entries:
//! - `StoreKey::Contact(id)` for every committed row returned to the caller
//! - `StoreKey::Email(e)` / `StoreKey::Phone(p)` for every lookup issued
//!
//! Reads of contacts this transaction wrote are served from the write set and
//! are not tracked.

use linkage_core::{
    Contact, ContactId, ContactRepository, ContactStore, LinkageError, LinkageResult, NewContact,
    StoreKey, Timestamp,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::validation::{validate_read_set, ValidationResult};

/// Error type for commit failures
///
/// All-or-nothing commit: a transaction either applies its whole write set
/// or nothing.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CommitError {
    /// Transaction aborted due to validation conflicts
    #[error("Commit failed: {} conflict(s)", .0.conflict_count())]
    ValidationFailed(ValidationResult),

    /// Transaction was not in correct state for commit
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The store failed while validating or applying
    #[error("Store error: {0}")]
    Store(LinkageError),
}

impl From<CommitError> for LinkageError {
    fn from(e: CommitError) -> Self {
        match e {
            CommitError::ValidationFailed(result) => LinkageError::conflict(result.summary()),
            CommitError::InvalidState(msg) => LinkageError::internal(msg),
            CommitError::Store(inner) => inner,
        }
    }
}

/// Summary of buffered operations that would be discarded on abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingOperations {
    /// Number of new contacts
    pub inserts: usize,
    /// Number of changed existing contacts
    pub updates: usize,
}

impl PendingOperations {
    /// Total number of pending operations
    pub fn total(&self) -> usize {
        self.inserts + self.updates
    }

    /// Check if there are no pending operations
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Status of a transaction in its lifecycle
///
/// State transitions:
/// - `Active` → `Validating` (begin commit)
/// - `Validating` → `Committed` (validation passed)
/// - `Validating` → `Aborted` (conflict detected)
/// - `Active` → `Aborted` (caller error)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Transaction is executing, can read/write
    Active,
    /// Transaction is being validated for conflicts
    Validating,
    /// Transaction committed successfully
    Committed,
    /// Transaction was aborted
    Aborted {
        /// Human-readable reason for abort
        reason: String,
    },
}

/// One unit of work against the contact store
pub struct TransactionContext {
    /// Unique transaction identifier
    pub txn_id: u64,
    /// Store version when the transaction began
    pub start_version: u64,
    /// Current lifecycle state
    pub status: TransactionStatus,

    store: Arc<dyn ContactStore>,
    /// First version observed for each key read from the store
    read_set: BTreeMap<StoreKey, u64>,
    /// Buffered contacts, inserts and updates alike
    write_set: BTreeMap<ContactId, Contact>,
    /// Ids allocated by this transaction's inserts
    inserted: BTreeSet<ContactId>,

    start_time: Instant,
}

impl std::fmt::Debug for TransactionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionContext")
            .field("txn_id", &self.txn_id)
            .field("start_version", &self.start_version)
            .field("status", &self.status)
            .field("reads", &self.read_set.len())
            .field("writes", &self.write_set.len())
            .finish()
    }
}

impl TransactionContext {
    /// Begin a transaction against `store`
    pub fn new(txn_id: u64, store: Arc<dyn ContactStore>) -> Self {
        let start_version = store.current_version();
        TransactionContext {
            txn_id,
            start_version,
            status: TransactionStatus::Active,
            store,
            read_set: BTreeMap::new(),
            write_set: BTreeMap::new(),
            inserted: BTreeSet::new(),
            start_time: Instant::now(),
        }
    }

    fn record_read(&mut self, key: StoreKey, version: u64) {
        self.read_set.entry(key).or_insert(version);
    }

    /// Version recorded for a key, if it was read
    pub fn get_read_version(&self, key: &StoreKey) -> Option<u64> {
        self.read_set.get(key).copied()
    }

    // === State Management ===

    /// Check if transaction is active
    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }

    /// Check if transaction committed
    pub fn is_committed(&self) -> bool {
        self.status == TransactionStatus::Committed
    }

    /// Check if transaction aborted
    pub fn is_aborted(&self) -> bool {
        matches!(self.status, TransactionStatus::Aborted { .. })
    }

    /// Reason for abort, if aborted
    pub fn abort_reason(&self) -> Option<&str> {
        match &self.status {
            TransactionStatus::Aborted { reason } => Some(reason),
            _ => None,
        }
    }

    /// Time since the transaction began
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Ensure the transaction accepts operations
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the transaction is not active.
    pub fn ensure_active(&self) -> LinkageResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(LinkageError::internal(format!(
                "transaction {} is not active: {:?}",
                self.txn_id, self.status
            )))
        }
    }

    /// Abort an active transaction, discarding buffered writes
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the transaction already committed or aborted.
    pub fn mark_aborted(&mut self, reason: String) -> LinkageResult<()> {
        match self.status {
            TransactionStatus::Active | TransactionStatus::Validating => {
                self.write_set.clear();
                self.inserted.clear();
                self.status = TransactionStatus::Aborted { reason };
                Ok(())
            }
            _ => Err(LinkageError::internal(format!(
                "cannot abort transaction {} in {:?} state",
                self.txn_id, self.status
            ))),
        }
    }

    // === Introspection ===

    /// Number of keys in the read set
    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }

    /// Number of buffered contacts
    pub fn write_count(&self) -> usize {
        self.write_set.len()
    }

    /// Check if nothing was written
    pub fn is_read_only(&self) -> bool {
        self.write_set.is_empty()
    }

    /// Buffered inserts and updates
    pub fn pending_operations(&self) -> PendingOperations {
        PendingOperations {
            inserts: self.inserted.len(),
            updates: self.write_set.len() - self.inserted.len(),
        }
    }

    /// Ids of contacts this transaction inserted, ascending
    pub fn inserted_ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.inserted.iter().copied()
    }

    // === Commit ===

    /// Validate the read set and transition to Committed
    ///
    /// Performs validation and state transitions only; the manager applies
    /// the writes once this returns `Ok`.
    pub fn commit(&mut self, store: &dyn ContactStore) -> Result<(), CommitError> {
        if !self.is_active() {
            return Err(CommitError::InvalidState(format!(
                "Cannot commit transaction {} from {:?} state - must be Active",
                self.txn_id, self.status
            )));
        }
        self.status = TransactionStatus::Validating;

        let validation_result = match validate_read_set(&self.read_set, store) {
            Ok(result) => result,
            Err(e) => {
                self.status = TransactionStatus::Aborted {
                    reason: format!("validation failed: {}", e),
                };
                return Err(CommitError::Store(e));
            }
        };

        if !validation_result.is_valid() {
            self.status = TransactionStatus::Aborted {
                reason: format!(
                    "Commit failed: {} conflict(s) detected",
                    validation_result.conflict_count()
                ),
            };
            return Err(CommitError::ValidationFailed(validation_result));
        }

        self.status = TransactionStatus::Committed;
        Ok(())
    }

    /// Apply all buffered writes at `commit_version`
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the transaction is not committed, or the store's
    /// error if applying fails.
    pub fn apply_writes(&self, store: &dyn ContactStore, commit_version: u64) -> LinkageResult<usize> {
        if !self.is_committed() {
            return Err(LinkageError::internal(format!(
                "Cannot apply writes: transaction {} is {:?}, must be Committed",
                self.txn_id, self.status
            )));
        }
        let writes: Vec<Contact> = self.write_set.values().cloned().collect();
        store.apply(&writes, commit_version)?;
        Ok(writes.len())
    }
}

impl ContactRepository for TransactionContext {
    fn find_by_email_or_phone(
        &mut self,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> LinkageResult<Vec<Contact>> {
        self.ensure_active()?;
        if email.is_none() && phone.is_none() {
            return Ok(Vec::new());
        }

        let snapshot = self.store.lookup(email, phone)?;
        for (key, version) in snapshot.key_versions {
            self.record_read(key, version);
        }

        let mut found: BTreeMap<ContactId, Contact> = BTreeMap::new();
        for row in snapshot.contacts {
            let id = row.contact.id;
            self.record_read(StoreKey::Contact(id), row.version);
            // Our own buffered version wins; it may no longer match
            let contact = self.write_set.get(&id).cloned().unwrap_or(row.contact);
            if contact.matches_either(email, phone) {
                found.insert(id, contact);
            }
        }
        for (id, contact) in &self.write_set {
            if contact.matches_either(email, phone) {
                found.entry(*id).or_insert_with(|| contact.clone());
            }
        }

        Ok(found.into_values().collect())
    }

    fn get(&mut self, id: ContactId) -> LinkageResult<Option<Contact>> {
        self.ensure_active()?;
        if let Some(contact) = self.write_set.get(&id) {
            return Ok(Some(contact.clone()));
        }
        let row = self.store.get(id)?;
        self.record_read(
            StoreKey::Contact(id),
            row.as_ref().map(|r| r.version).unwrap_or(0),
        );
        Ok(row.map(|r| r.contact))
    }

    fn insert(&mut self, contact: NewContact) -> LinkageResult<Contact> {
        self.ensure_active()?;
        contact.validate()?;

        let id = self.store.allocate_id();
        let contact = contact.into_contact(id, Timestamp::now());
        self.inserted.insert(id);
        self.write_set.insert(id, contact.clone());
        Ok(contact)
    }

    fn update(&mut self, contact: &Contact) -> LinkageResult<()> {
        self.ensure_active()?;

        let existing = match self.write_set.get(&contact.id) {
            Some(buffered) => Some(buffered.clone()),
            None => self.get(contact.id)?,
        };
        let Some(existing) = existing else {
            return Err(LinkageError::internal(format!(
                "cannot update unknown contact {}",
                contact.id
            )));
        };
        if existing.created_at != contact.created_at {
            return Err(LinkageError::internal(format!(
                "created_at of contact {} is immutable",
                contact.id
            )));
        }
        NewContact {
            email: contact.email.clone(),
            phone: contact.phone.clone(),
            precedence: contact.precedence,
            linked_primary_id: contact.linked_primary_id,
        }
        .validate()?;

        self.write_set.insert(contact.id, contact.clone());
        Ok(())
    }
}

//! MemoryStore: in-memory contact store with versioned rows and lookup keys
//!
//! This module implements the ContactStore trait using:
//! - `BTreeMap<ContactId, VersionedContact>` for rows ordered by id
//! - `LookupIndex` for email/phone → ids
//! - `FxHashMap<StoreKey, u64>` for lookup-key versions
//! - `parking_lot::RwLock` around all three, so a write set and its index
//!   updates become visible together
//! - `AtomicU64` counters for ids and commit versions
//!
//! # Lookup-key versions
//!
//! Row versions alone cannot detect a concurrent insert: a transaction that
//! looked up `email:a@x.com` and found nothing has no row to re-check. Every
//! applied write therefore bumps the version of each email/phone the contact
//! held before and after the write. A transaction validates its lookups by
//! comparing those versions at commit time.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use linkage_core::{
    Contact, ContactId, ContactStore, LinkageError, LinkageResult, LookupSnapshot, NewContact,
    StoreKey, VersionedContact,
};

use crate::index::LookupIndex;

#[derive(Debug, Default)]
struct StoreState {
    rows: BTreeMap<ContactId, VersionedContact>,
    index: LookupIndex,
    key_versions: FxHashMap<StoreKey, u64>,
}

impl StoreState {
    fn bump_lookup_keys(&mut self, contact: &Contact, version: u64) {
        for key in contact.lookup_keys() {
            self.key_versions.insert(key, version);
        }
    }

    fn put(&mut self, contact: Contact, version: u64) {
        if let Some(old) = self.rows.remove(&contact.id) {
            self.index.remove(&old.contact);
            self.bump_lookup_keys(&old.contact, version);
        }
        self.index.insert(&contact);
        self.bump_lookup_keys(&contact, version);
        self.rows
            .insert(contact.id, VersionedContact { contact, version });
    }
}

/// In-memory contact store
///
/// Thread-safe through `parking_lot::RwLock` and `AtomicU64`. Writes only
/// arrive through [`ContactStore::apply`] (called by the commit path under
/// the commit lock) or [`MemoryStore::seed`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    /// Last allocated contact id (0 = none yet)
    next_id: AtomicU64,
    /// Latest applied commit version
    version: AtomicU64,
}

impl MemoryStore {
    /// Create a new empty store
    ///
    /// The first allocated id is 1 and the initial version is 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with historical contacts
    ///
    /// # Errors
    ///
    /// See [`MemoryStore::seed`].
    pub fn with_contacts(contacts: Vec<Contact>) -> LinkageResult<Self> {
        let store = Self::new();
        store.seed(contacts)?;
        Ok(store)
    }

    /// Load historical contacts as one commit, keeping their ids and times
    ///
    /// Subsequent id allocation continues after the highest seeded id.
    /// Returns the commit version assigned to the seeded rows.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if a contact has neither email nor phone, if
    /// its precedence and link disagree, or if its id is already taken.
    pub fn seed(&self, contacts: Vec<Contact>) -> LinkageResult<u64> {
        let mut state = self.state.write();

        for contact in &contacts {
            let shape = NewContact {
                email: contact.email.clone(),
                phone: contact.phone.clone(),
                precedence: contact.precedence,
                linked_primary_id: contact.linked_primary_id,
            };
            shape.validate().map_err(|e| {
                LinkageError::invalid_request(format!("seed contact {}: {}", contact.id, e))
            })?;
            if state.rows.contains_key(&contact.id) {
                return Err(LinkageError::invalid_request(format!(
                    "seed contact {} already exists",
                    contact.id
                )));
            }
        }

        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        let count = contacts.len();
        for contact in contacts {
            self.next_id.fetch_max(contact.id.as_u64(), Ordering::SeqCst);
            state.put(contact, version);
        }

        debug!(target: "linkage::store", count, version, "Seeded contacts");
        Ok(version)
    }

    /// Number of stored contacts
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    /// Check if the store holds no contacts
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ContactStore for MemoryStore {
    fn get(&self, id: ContactId) -> LinkageResult<Option<VersionedContact>> {
        Ok(self.state.read().rows.get(&id).cloned())
    }

    fn lookup(&self, email: Option<&str>, phone: Option<&str>) -> LinkageResult<LookupSnapshot> {
        let state = self.state.read();

        let contacts = state
            .index
            .matching(email, phone)
            .into_iter()
            .filter_map(|id| state.rows.get(&id).cloned())
            .collect();

        let keys = email
            .map(|e| StoreKey::Email(e.to_string()))
            .into_iter()
            .chain(phone.map(|p| StoreKey::Phone(p.to_string())));
        let key_versions = keys
            .map(|key| {
                let version = state.key_versions.get(&key).copied().unwrap_or(0);
                (key, version)
            })
            .collect();

        Ok(LookupSnapshot {
            contacts,
            key_versions,
        })
    }

    fn key_version(&self, key: &StoreKey) -> LinkageResult<u64> {
        let state = self.state.read();
        let version = match key {
            StoreKey::Contact(id) => state.rows.get(id).map(|row| row.version),
            lookup => state.key_versions.get(lookup).copied(),
        };
        Ok(version.unwrap_or(0))
    }

    fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    fn allocate_id(&self) -> ContactId {
        ContactId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn apply(&self, writes: &[Contact], commit_version: u64) -> LinkageResult<()> {
        let mut state = self.state.write();
        for contact in writes {
            self.next_id
                .fetch_max(contact.id.as_u64(), Ordering::SeqCst);
            state.put(contact.clone(), commit_version);
        }
        self.version.fetch_max(commit_version, Ordering::SeqCst);
        Ok(())
    }

    fn contacts(&self) -> LinkageResult<Vec<Contact>> {
        Ok(self
            .state
            .read()
            .rows
            .values()
            .map(|row| row.contact.clone())
            .collect())
    }
}

//! Secondary indices for email and phone lookups
//!
//! Lookups by email or phone are the only query the resolver issues, so the
//! store keeps one index per field instead of scanning every row:
//! - emails: email → set of contact ids
//! - phones: phone → set of contact ids
//!
//! Id sets are ordered so lookup results come back ascending by id.

use linkage_core::{Contact, ContactId};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Secondary index: field value → contact ids
#[derive(Debug, Default)]
pub struct LookupIndex {
    emails: FxHashMap<String, BTreeSet<ContactId>>,
    phones: FxHashMap<String, BTreeSet<ContactId>>,
}

impl LookupIndex {
    /// Create a new empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a contact under its email and phone
    pub fn insert(&mut self, contact: &Contact) {
        if let Some(email) = &contact.email {
            self.emails
                .entry(email.clone())
                .or_default()
                .insert(contact.id);
        }
        if let Some(phone) = &contact.phone {
            self.phones
                .entry(phone.clone())
                .or_default()
                .insert(contact.id);
        }
    }

    /// Remove a contact from the index
    ///
    /// Empty id sets are dropped so the maps don't accumulate dead entries.
    pub fn remove(&mut self, contact: &Contact) {
        if let Some(email) = &contact.email {
            Self::remove_from(&mut self.emails, email, contact.id);
        }
        if let Some(phone) = &contact.phone {
            Self::remove_from(&mut self.phones, phone, contact.id);
        }
    }

    fn remove_from(map: &mut FxHashMap<String, BTreeSet<ContactId>>, value: &str, id: ContactId) {
        if let Some(ids) = map.get_mut(value) {
            ids.remove(&id);
            if ids.is_empty() {
                map.remove(value);
            }
        }
    }

    /// Ids of contacts matching `email` or `phone`, ascending
    ///
    /// Absent arguments match nothing.
    pub fn matching(&self, email: Option<&str>, phone: Option<&str>) -> BTreeSet<ContactId> {
        let mut ids = BTreeSet::new();
        if let Some(found) = email.and_then(|e| self.emails.get(e)) {
            ids.extend(found.iter().copied());
        }
        if let Some(found) = phone.and_then(|p| self.phones.get(p)) {
            ids.extend(found.iter().copied());
        }
        ids
    }

    /// Number of distinct emails indexed
    pub fn email_count(&self) -> usize {
        self.emails.len()
    }

    /// Number of distinct phone numbers indexed
    pub fn phone_count(&self) -> usize {
        self.phones.len()
    }
}

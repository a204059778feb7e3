//! Contact data model
//!
//! A [`Contact`] is the only entity in the system. Contacts that share an
//! email or a phone number belong to the same identity; exactly one of them
//! is the primary and every other one is a secondary linked directly to it.
//!
//! Contacts that have not been persisted yet are represented by
//! [`NewContact`], which has no id. The store assigns ids on insert, so an
//! unsaved contact can never be the target of a link.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LinkageError, LinkageResult};
use crate::timestamp::Timestamp;

/// Store-assigned contact identifier
///
/// Ids increase monotonically in creation order and break ties between
/// contacts created in the same microsecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(u64);

impl ContactId {
    /// Wrap a raw id
    pub const fn new(id: u64) -> Self {
        ContactId(id)
    }

    /// Raw id value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ContactId {
    fn from(id: u64) -> Self {
        ContactId(id)
    }
}

/// Standing of a contact within its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precedence {
    /// Canonical contact of an identity
    Primary,
    /// Alternate sighting linked to a primary
    Secondary,
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precedence::Primary => write!(f, "primary"),
            Precedence::Secondary => write!(f, "secondary"),
        }
    }
}

/// A persisted contact record
///
/// `linked_primary_id` is `Some` if and only if `precedence` is
/// [`Precedence::Secondary`]. Use [`Contact::link_to`] to change standing so
/// both fields move together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Store-assigned id
    pub id: ContactId,
    /// Email address, if known
    pub email: Option<String>,
    /// Phone number, if known
    pub phone: Option<String>,
    /// Primary or secondary standing
    pub precedence: Precedence,
    /// Primary this contact is linked to (secondaries only)
    pub linked_primary_id: Option<ContactId>,
    /// Creation time, immutable
    pub created_at: Timestamp,
    /// Time of the last mutation
    pub updated_at: Timestamp,
}

impl Contact {
    /// Check if this contact is a primary
    pub fn is_primary(&self) -> bool {
        self.precedence == Precedence::Primary
    }

    /// Election key: older contacts win, lower id breaks ties
    pub fn seniority(&self) -> (Timestamp, ContactId) {
        (self.created_at, self.id)
    }

    /// Check if this contact holds exactly the given pair
    ///
    /// Both fields are compared, including absence: `(a, None)` only matches
    /// a contact without a phone.
    pub fn holds_pair(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        self.email.as_deref() == email && self.phone.as_deref() == phone
    }

    /// Check if this contact matches a lookup on email or phone
    ///
    /// Absent values never match: a contact without a phone is not found by
    /// a lookup without a phone.
    pub fn matches_either(&self, email: Option<&str>, phone: Option<&str>) -> bool {
        let email_hit = email.is_some() && self.email.as_deref() == email;
        let phone_hit = phone.is_some() && self.phone.as_deref() == phone;
        email_hit || phone_hit
    }

    /// Check if this contact is already a secondary of `primary`
    pub fn is_linked_to(&self, primary: ContactId) -> bool {
        self.precedence == Precedence::Secondary && self.linked_primary_id == Some(primary)
    }

    /// Make this contact a secondary of `primary`, bumping `updated_at`
    ///
    /// Returns `false` without touching anything if the contact is already
    /// linked to `primary`.
    pub fn link_to(&mut self, primary: ContactId, now: Timestamp) -> bool {
        if self.is_linked_to(primary) {
            return false;
        }
        self.precedence = Precedence::Secondary;
        self.linked_primary_id = Some(primary);
        self.updated_at = now.max(self.updated_at);
        true
    }

    /// Lookup keys this contact is reachable through
    pub fn lookup_keys(&self) -> impl Iterator<Item = StoreKey> + '_ {
        let email = self.email.as_ref().map(|e| StoreKey::Email(e.clone()));
        let phone = self.phone.as_ref().map(|p| StoreKey::Phone(p.clone()));
        email.into_iter().chain(phone)
    }
}

/// A contact that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    /// Email address, if known
    pub email: Option<String>,
    /// Phone number, if known
    pub phone: Option<String>,
    /// Primary or secondary standing
    pub precedence: Precedence,
    /// Primary this contact will be linked to (secondaries only)
    pub linked_primary_id: Option<ContactId>,
}

impl NewContact {
    /// A fresh primary for a first sighting
    pub fn primary(email: Option<String>, phone: Option<String>) -> Self {
        Self {
            email,
            phone,
            precedence: Precedence::Primary,
            linked_primary_id: None,
        }
    }

    /// A secondary carrying new information for an existing identity
    pub fn secondary(email: Option<String>, phone: Option<String>, primary: ContactId) -> Self {
        Self {
            email,
            phone,
            precedence: Precedence::Secondary,
            linked_primary_id: Some(primary),
        }
    }

    /// Check record-level invariants before insertion
    pub fn validate(&self) -> LinkageResult<()> {
        if self.email.is_none() && self.phone.is_none() {
            return Err(LinkageError::invalid_request(
                "contact must have an email or a phone number",
            ));
        }
        match (self.precedence, self.linked_primary_id) {
            (Precedence::Primary, None) | (Precedence::Secondary, Some(_)) => Ok(()),
            (Precedence::Primary, Some(id)) => Err(LinkageError::internal(format!(
                "primary contact cannot link to {}",
                id
            ))),
            (Precedence::Secondary, None) => Err(LinkageError::internal(
                "secondary contact requires a linked primary",
            )),
        }
    }

    /// Materialize with a store-assigned id and creation time
    pub fn into_contact(self, id: ContactId, now: Timestamp) -> Contact {
        Contact {
            id,
            email: self.email,
            phone: self.phone,
            precedence: self.precedence,
            linked_primary_id: self.linked_primary_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A versioned unit of the contact store
///
/// Rows are versioned by id. Lookup keys are versioned by value: any commit
/// that inserts or changes a contact holding email `e` bumps
/// `StoreKey::Email(e)`, which is how a transaction notices that a lookup it
/// ran would now return a different set of rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// A contact row
    Contact(ContactId),
    /// All contacts holding this email
    Email(String),
    /// All contacts holding this phone number
    Phone(String),
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKey::Contact(id) => write!(f, "contact:{}", id),
            StoreKey::Email(email) => write!(f, "email:{}", email),
            StoreKey::Phone(phone) => write!(f, "phone:{}", phone),
        }
    }
}

/// A contact together with the commit version that last wrote it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedContact {
    /// The contact as committed
    pub contact: Contact,
    /// Commit version of the last write to this row
    pub version: u64,
}

//! Identity resolution pipeline
//!
//! One request runs four stages against a single [`ContactRepository`]:
//!
//! ```text
//! closure   : discover every contact connected by shared email or phone
//! arbiter   : elect the oldest primary, demote other primaries, relink strays
//! novelty   : append a contact if the exact (email, phone) pair is unseen
//! projector : aggregate the final closure into the response
//! ```
//!
//! The [`Closure`] is the working set of the unit of work. It is built once,
//! then passed by `&mut` to each stage so the projector sees the final state.
//! Nothing survives the call: a retried transaction rebuilds it from scratch.

pub mod arbiter;
pub mod closure;
pub mod novelty;
pub mod projector;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::BTreeMap;

use linkage_core::{
    Contact, ContactId, ContactRepository, IdentifyRequest, IdentifyResponse, LinkageError,
    LinkageResult,
};
use tracing::debug;

pub use arbiter::{demote_losers, elect_primary, Demotions};
pub use closure::resolve_closure;
pub use novelty::{ensure_represented, Representation};
pub use projector::project;

/// The set of contacts reachable from a request, keyed by id
///
/// Iteration is always ascending by id, so stages that walk the closure do
/// so in a fixed order regardless of discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Closure {
    members: BTreeMap<ContactId, Contact>,
}

impl Closure {
    /// Create an empty closure
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of contacts
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if nothing was discovered
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Check if a contact is a member
    pub fn contains(&self, id: ContactId) -> bool {
        self.members.contains_key(&id)
    }

    /// Get a member by id
    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.members.get(&id)
    }

    /// Add a newly discovered contact
    ///
    /// Returns `false` if a contact with the same id is already a member; the
    /// existing member is kept.
    pub fn discover(&mut self, contact: Contact) -> bool {
        if self.members.contains_key(&contact.id) {
            return false;
        }
        self.members.insert(contact.id, contact);
        true
    }

    /// Replace a member with its updated state, or add it
    pub fn put(&mut self, contact: Contact) {
        self.members.insert(contact.id, contact);
    }

    /// Members ascending by id
    pub fn iter(&self) -> impl Iterator<Item = &Contact> {
        self.members.values()
    }

    /// Primaries ascending by id
    pub fn primaries(&self) -> impl Iterator<Item = &Contact> {
        self.iter().filter(|c| c.is_primary())
    }

    /// Member ids ascending
    pub fn ids(&self) -> impl Iterator<Item = ContactId> + '_ {
        self.members.keys().copied()
    }
}

impl FromIterator<Contact> for Closure {
    fn from_iter<I: IntoIterator<Item = Contact>>(iter: I) -> Self {
        let mut closure = Closure::new();
        for contact in iter {
            closure.discover(contact);
        }
        closure
    }
}

/// Outcome of one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The response for the caller
    pub response: IdentifyResponse,
    /// Contact appended by the novelty gate, if any
    pub created: Option<ContactId>,
    /// Primaries demoted to secondary
    pub demoted: Vec<ContactId>,
    /// Secondaries repointed at the elected primary
    pub relinked: Vec<ContactId>,
}

impl Resolution {
    /// Check if this resolution wrote anything
    pub fn wrote(&self) -> bool {
        self.created.is_some() || !self.demoted.is_empty() || !self.relinked.is_empty()
    }
}

/// Run the full pipeline for one request
///
/// # Errors
///
/// - `InvalidRequest` if the request has neither email nor phone (before any
///   store access)
/// - `Corruption` if the discovered contacts have no primary
/// - Any error from the repository
pub fn resolve<R>(repo: &mut R, request: &IdentifyRequest) -> LinkageResult<Resolution>
where
    R: ContactRepository + ?Sized,
{
    request.validate()?;
    let (email, phone) = (request.email(), request.phone_number());

    let mut closure = resolve_closure(repo, email, phone)?;

    let (main_primary, demotions) = match elect_primary(&closure)? {
        Some(winner) => {
            let demotions = demote_losers(repo, &mut closure, winner.id)?;
            (Some(winner.id), demotions)
        }
        None => (None, Demotions::default()),
    };

    let representation = ensure_represented(repo, &mut closure, email, phone, main_primary)?;
    let main_primary = main_primary.unwrap_or(representation.contact.id);

    let primary = closure.get(main_primary).ok_or_else(|| {
        LinkageError::internal(format!("elected primary {} left the closure", main_primary))
    })?;
    let view = project(primary, &closure);

    debug!(
        target: "linkage::resolve",
        primary = %main_primary,
        members = closure.len(),
        created = representation.created,
        demoted = demotions.demoted.len(),
        relinked = demotions.relinked.len(),
        "Resolved identity"
    );

    Ok(Resolution {
        response: IdentifyResponse::from(view),
        created: representation.created.then_some(representation.contact.id),
        demoted: demotions.demoted,
        relinked: demotions.relinked,
    })
}

//! Closure discovery
//!
//! Starting from the request's email and phone, repeatedly look up every
//! contact sharing an email or phone with something already found, until a
//! round discovers nothing new. Link edges are followed too, so a secondary
//! whose primary no longer shares any field with it still pulls that primary
//! in.
//!
//! Each distinct email and phone is queried at most once, which bounds the
//! number of lookups by the number of distinct values in the closure.

use std::collections::{BTreeSet, VecDeque};

use linkage_core::{Contact, ContactId, ContactRepository, LinkageError, LinkageResult};
use tracing::debug;

use super::Closure;

/// Discover every contact connected to `(email, phone)`
///
/// Returns an empty closure if nothing in the store shares either value.
///
/// # Errors
///
/// - `InvalidRequest` if both inputs are absent
/// - `Corruption` if a secondary links to a contact that does not exist
pub fn resolve_closure<R>(
    repo: &mut R,
    email: Option<&str>,
    phone: Option<&str>,
) -> LinkageResult<Closure>
where
    R: ContactRepository + ?Sized,
{
    if email.is_none() && phone.is_none() {
        return Err(LinkageError::invalid_request(
            "email or phoneNumber is required",
        ));
    }

    let mut closure = Closure::new();
    let mut seen_emails: BTreeSet<String> = BTreeSet::new();
    let mut seen_phones: BTreeSet<String> = BTreeSet::new();
    let mut frontier: VecDeque<Contact> = VecDeque::new();
    let mut lookups = 0usize;

    let seeds = repo.find_by_email_or_phone(email, phone)?;
    lookups += 1;
    seen_emails.extend(email.map(String::from));
    seen_phones.extend(phone.map(String::from));
    for contact in seeds {
        if closure.discover(contact.clone()) {
            frontier.push_back(contact);
        }
    }

    while let Some(contact) = frontier.pop_front() {
        let next_email = contact
            .email
            .as_deref()
            .filter(|e| !seen_emails.contains(*e));
        let next_phone = contact
            .phone
            .as_deref()
            .filter(|p| !seen_phones.contains(*p));

        if next_email.is_some() || next_phone.is_some() {
            let found = repo.find_by_email_or_phone(next_email, next_phone)?;
            lookups += 1;
            seen_emails.extend(next_email.map(String::from));
            seen_phones.extend(next_phone.map(String::from));
            for member in found {
                if closure.discover(member.clone()) {
                    frontier.push_back(member);
                }
            }
        }

        if let Some(primary_id) = contact.linked_primary_id {
            if !closure.contains(primary_id) {
                let primary = follow_link(repo, contact.id, primary_id)?;
                closure.discover(primary.clone());
                frontier.push_back(primary);
            }
        }
    }

    debug!(
        target: "linkage::resolve",
        members = closure.len(),
        lookups,
        "Discovered closure"
    );
    Ok(closure)
}

fn follow_link<R>(repo: &mut R, from: ContactId, to: ContactId) -> LinkageResult<Contact>
where
    R: ContactRepository + ?Sized,
{
    repo.get(to)?.ok_or_else(|| {
        LinkageError::corruption(format!(
            "contact {} links to missing primary {}",
            from, to
        ))
    })
}

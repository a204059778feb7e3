//! Novelty gate
//!
//! A request is recorded as a new contact only when no member of its closure
//! holds exactly the requested `(email, phone)` pair. Absence counts as a
//! value: `(a@x.com, None)` is not represented by `(a@x.com, 100)`.

use linkage_core::{Contact, ContactId, ContactRepository, LinkageError, LinkageResult, NewContact};
use tracing::debug;

use super::Closure;

/// The closure member that represents the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Representation {
    /// Existing or newly inserted contact holding the requested pair
    pub contact: Contact,
    /// Whether `contact` was inserted by this call
    pub created: bool,
}

/// Make sure the requested pair is held by some member of `closure`
///
/// With an elected `main_primary` a missing pair is inserted as its
/// secondary. With an empty closure the new contact becomes the primary of a
/// brand-new identity. Either way the new contact joins `closure`.
///
/// # Errors
///
/// Returns `Internal` if `closure` is non-empty but no primary was given.
pub fn ensure_represented<R>(
    repo: &mut R,
    closure: &mut Closure,
    email: Option<&str>,
    phone: Option<&str>,
    main_primary: Option<ContactId>,
) -> LinkageResult<Representation>
where
    R: ContactRepository + ?Sized,
{
    if let Some(existing) = closure.iter().find(|c| c.holds_pair(email, phone)) {
        return Ok(Representation {
            contact: existing.clone(),
            created: false,
        });
    }

    let (email, phone) = (email.map(String::from), phone.map(String::from));
    let new_contact = match main_primary {
        Some(primary) => NewContact::secondary(email, phone, primary),
        None if closure.is_empty() => NewContact::primary(email, phone),
        None => {
            return Err(LinkageError::internal(format!(
                "closure of {} contact(s) has no elected primary",
                closure.len()
            )))
        }
    };

    let contact = repo.insert(new_contact)?;
    debug!(
        target: "linkage::resolve",
        id = %contact.id,
        precedence = %contact.precedence,
        "Recorded new contact"
    );
    closure.put(contact.clone());
    Ok(Representation {
        contact,
        created: true,
    })
}

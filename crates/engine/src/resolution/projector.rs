//! Response projection
//!
//! Pure function from the final closure to the public view. Output depends
//! only on the closure's contents, never on discovery order:
//! - the primary's email and phone come first
//! - remaining distinct values follow in seniority order of the contact that
//!   holds them
//! - secondary ids are ascending

use linkage_core::{Contact, ContactId, IdentityView};

use super::Closure;

/// Aggregate `closure` around its elected `primary`
pub fn project(primary: &Contact, closure: &Closure) -> IdentityView {
    let mut by_seniority: Vec<&Contact> = closure.iter().filter(|c| c.id != primary.id).collect();
    by_seniority.sort_by_key(|c| c.seniority());

    let mut emails: Vec<String> = Vec::new();
    let mut phone_numbers: Vec<String> = Vec::new();
    for contact in std::iter::once(primary).chain(by_seniority) {
        push_distinct(&mut emails, contact.email.as_deref());
        push_distinct(&mut phone_numbers, contact.phone.as_deref());
    }

    let secondary_contact_ids: Vec<ContactId> = closure
        .iter()
        .filter(|c| !c.is_primary())
        .map(|c| c.id)
        .collect();

    IdentityView {
        primary_contact_id: primary.id,
        emails,
        phone_numbers,
        secondary_contact_ids,
    }
}

fn push_distinct(values: &mut Vec<String>, value: Option<&str>) {
    if let Some(value) = value {
        if !values.iter().any(|v| v == value) {
            values.push(value.to_string());
        }
    }
}

//! Precedence arbitration
//!
//! Within one closure the oldest primary (by creation time, then id) stays
//! primary. Every other primary is demoted to a secondary of it, and every
//! secondary still pointing elsewhere is repointed, so after one pass each
//! secondary links directly to the survivor.

use linkage_core::{Contact, ContactId, ContactRepository, LinkageError, LinkageResult, Timestamp};
use tracing::info;

use super::Closure;

/// Ids changed by one arbitration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Demotions {
    /// Former primaries, ascending
    pub demoted: Vec<ContactId>,
    /// Secondaries repointed at the survivor, ascending
    pub relinked: Vec<ContactId>,
}

impl Demotions {
    /// Check if nothing changed
    pub fn is_empty(&self) -> bool {
        self.demoted.is_empty() && self.relinked.is_empty()
    }
}

/// Pick the primary that survives for this closure
///
/// Returns `None` for an empty closure.
///
/// # Errors
///
/// Returns `Corruption` if the closure is non-empty but holds no primary.
pub fn elect_primary(closure: &Closure) -> LinkageResult<Option<Contact>> {
    if closure.is_empty() {
        return Ok(None);
    }
    closure
        .primaries()
        .min_by_key(|c| c.seniority())
        .cloned()
        .map(Some)
        .ok_or_else(|| {
            let ids: Vec<String> = closure.ids().map(|id| id.to_string()).collect();
            LinkageError::corruption(format!(
                "contacts [{}] have no primary",
                ids.join(", ")
            ))
        })
}

/// Link every member other than `winner` directly to `winner`
///
/// Members already linked to `winner` are left untouched. Changed members are
/// written through `repo` and replaced in `closure`.
pub fn demote_losers<R>(
    repo: &mut R,
    closure: &mut Closure,
    winner: ContactId,
) -> LinkageResult<Demotions>
where
    R: ContactRepository + ?Sized,
{
    let now = Timestamp::now();
    let mut demotions = Demotions::default();

    let losers: Vec<Contact> = closure
        .iter()
        .filter(|c| c.id != winner && !c.is_linked_to(winner))
        .cloned()
        .collect();

    for mut contact in losers {
        let was_primary = contact.is_primary();
        if !contact.link_to(winner, now) {
            continue;
        }
        repo.update(&contact)?;
        if was_primary {
            demotions.demoted.push(contact.id);
        } else {
            demotions.relinked.push(contact.id);
        }
        closure.put(contact);
    }

    if !demotions.is_empty() {
        info!(
            target: "linkage::resolve",
            winner = %winner,
            demoted = ?demotions.demoted,
            relinked = ?demotions.relinked,
            "Merged identities"
        );
    }
    Ok(demotions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolution::test_support::{primary, repo_with, secondary};
    use linkage_core::{Precedence, Timestamp};

    fn closure_of(contacts: &[Contact]) -> Closure {
        contacts.iter().cloned().collect()
    }

    #[test]
    fn test_empty_closure_elects_nobody() {
        assert_eq!(elect_primary(&Closure::new()).unwrap(), None);
    }

    #[test]
    fn test_oldest_primary_wins() {
        let mut older = primary(9, Some("a"), None);
        older.created_at = Timestamp::from_secs(1);
        let closure = closure_of(&[primary(2, Some("b"), None), older]);
        assert_eq!(elect_primary(&closure).unwrap().unwrap().id, ContactId::new(9));
    }

    #[test]
    fn test_tie_goes_to_lower_id() {
        let mut a = primary(5, Some("a"), None);
        let mut b = primary(3, Some("b"), None);
        a.created_at = Timestamp::from_secs(1);
        b.created_at = Timestamp::from_secs(1);
        let closure = closure_of(&[a, b]);
        assert_eq!(elect_primary(&closure).unwrap().unwrap().id, ContactId::new(3));
    }

    #[test]
    fn test_no_primary_is_corruption() {
        let closure = closure_of(&[secondary(2, Some("a"), None, 1)]);
        let err = elect_primary(&closure).unwrap_err();
        assert!(matches!(err, LinkageError::Corruption { .. }));
    }

    #[test]
    fn test_demotes_primaries_and_repoints_their_secondaries() {
        let contacts = vec![
            primary(1, Some("a"), Some("100")),
            primary(2, Some("b"), Some("200")),
            secondary(3, Some("c"), Some("200"), 2),
            secondary(4, Some("a"), Some("400"), 1),
        ];
        let mut repo = repo_with(contacts.clone());
        let mut closure = closure_of(&contacts);

        let demotions = demote_losers(&mut repo, &mut closure, ContactId::new(1)).unwrap();
        assert_eq!(demotions.demoted, vec![ContactId::new(2)]);
        assert_eq!(demotions.relinked, vec![ContactId::new(3)]);
        assert_eq!(repo.updates, 2);

        for id in [2, 3, 4] {
            let stored = repo.contact(id);
            assert_eq!(stored.precedence, Precedence::Secondary);
            assert_eq!(stored.linked_primary_id, Some(ContactId::new(1)));
            assert_eq!(closure.get(ContactId::new(id)), Some(stored));
        }
        assert!(repo.contact(1).is_primary());
    }

    #[test]
    fn test_settled_closure_writes_nothing() {
        let contacts = vec![
            primary(1, Some("a"), Some("100")),
            secondary(2, Some("b"), Some("100"), 1),
        ];
        let mut repo = repo_with(contacts.clone());
        let mut closure = closure_of(&contacts);

        let demotions = demote_losers(&mut repo, &mut closure, ContactId::new(1)).unwrap();
        assert!(demotions.is_empty());
        assert_eq!(repo.updates, 0);
        assert_eq!(closure, closure_of(&contacts));
    }
}

//! Property tests over random request sequences
//!
//! Emails and phones are drawn from small alphabets so requests collide and
//! merge often.

use std::collections::{BTreeMap, BTreeSet};

use linkage_core::{Contact, ContactId, IdentifyRequest};
use linkage_engine::IdentityService;
use proptest::prelude::*;

fn request_strategy() -> impl Strategy<Value = (Option<String>, Option<String>)> {
    let email = prop::option::of(prop::sample::select(vec!["a@x.com", "b@x.com", "c@x.com", "d@x.com"]));
    let phone = prop::option::of(prop::sample::select(vec!["100", "200", "300", "400"]));
    (email, phone)
        .prop_filter("needs email or phone", |(e, p)| e.is_some() || p.is_some())
        .prop_map(|(e, p)| (e.map(String::from), p.map(String::from)))
}

fn run(requests: &[(Option<String>, Option<String>)]) -> IdentityService {
    let service = IdentityService::ephemeral();
    for (email, phone) in requests {
        service
            .identify(&IdentifyRequest::new(email.as_deref(), phone.as_deref()))
            .unwrap();
    }
    service
}

/// Group contacts by the "shares an email or phone" relation
fn components(contacts: &[Contact]) -> Vec<Vec<Contact>> {
    let mut parent: BTreeMap<ContactId, ContactId> = contacts.iter().map(|c| (c.id, c.id)).collect();

    fn find(parent: &mut BTreeMap<ContactId, ContactId>, id: ContactId) -> ContactId {
        let mut root = id;
        while parent[&root] != root {
            root = parent[&root];
        }
        parent.insert(id, root);
        root
    }

    for a in contacts {
        for b in contacts {
            if a.id < b.id && b.matches_either(a.email.as_deref(), a.phone.as_deref()) {
                let (ra, rb) = (find(&mut parent, a.id), find(&mut parent, b.id));
                if ra != rb {
                    parent.insert(ra.max(rb), ra.min(rb));
                }
            }
        }
    }

    let mut groups: BTreeMap<ContactId, Vec<Contact>> = BTreeMap::new();
    for contact in contacts {
        let root = find(&mut parent, contact.id);
        groups.entry(root).or_default().push(contact.clone());
    }
    groups.into_values().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_each_component_has_one_oldest_primary(
        requests in prop::collection::vec(request_strategy(), 1..24)
    ) {
        let service = run(&requests);
        let contacts = service.database().contacts().unwrap();

        for group in components(&contacts) {
            let primaries: Vec<&Contact> = group.iter().filter(|c| c.is_primary()).collect();
            prop_assert_eq!(primaries.len(), 1);
            let primary = primaries[0];

            let oldest = group.iter().map(|c| c.id).min().unwrap();
            prop_assert_eq!(primary.id, oldest);
            for member in group.iter().filter(|c| !c.is_primary()) {
                prop_assert_eq!(member.linked_primary_id, Some(primary.id));
            }
        }
    }

    #[test]
    fn prop_one_contact_per_distinct_pair(
        requests in prop::collection::vec(request_strategy(), 1..24)
    ) {
        let service = run(&requests);
        let contacts = service.database().contacts().unwrap();

        let distinct: BTreeSet<&(Option<String>, Option<String>)> = requests.iter().collect();
        prop_assert_eq!(contacts.len(), distinct.len());

        let stored: BTreeSet<(Option<String>, Option<String>)> =
            contacts.into_iter().map(|c| (c.email, c.phone)).collect();
        prop_assert_eq!(stored.len(), distinct.len());
    }

    #[test]
    fn prop_replaying_any_request_is_idempotent(
        requests in prop::collection::vec(request_strategy(), 1..16),
        pick in any::<prop::sample::Index>()
    ) {
        let service = run(&requests);
        let (email, phone) = pick.get(&requests);
        let request = IdentifyRequest::new(email.as_deref(), phone.as_deref());

        let first = service.identify(&request).unwrap();
        let version = service.database().current_version();
        let second = service.identify(&request).unwrap();

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(service.database().current_version(), version);
    }

    #[test]
    fn prop_response_lists_are_distinct_and_sorted(
        requests in prop::collection::vec(request_strategy(), 1..16)
    ) {
        let service = run(&requests);
        let (email, phone) = requests.last().unwrap();
        let view = service
            .identify(&IdentifyRequest::new(email.as_deref(), phone.as_deref()))
            .unwrap()
            .contact;

        let emails: BTreeSet<&String> = view.emails.iter().collect();
        prop_assert_eq!(emails.len(), view.emails.len());
        let phones: BTreeSet<&String> = view.phone_numbers.iter().collect();
        prop_assert_eq!(phones.len(), view.phone_numbers.len());

        let mut sorted = view.secondary_contact_ids.clone();
        sorted.sort();
        prop_assert_eq!(&sorted, &view.secondary_contact_ids);
        prop_assert!(!view.secondary_contact_ids.contains(&view.primary_contact_id));

        if let Some(email) = email {
            prop_assert!(view.emails.contains(email));
        }
        if let Some(phone) = phone {
            prop_assert!(view.phone_numbers.contains(phone));
        }
    }
}

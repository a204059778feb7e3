//! End-to-end identify scenarios
//!
//! Each test drives `IdentityService::identify` and checks both the response
//! and the committed store state.

use std::sync::Arc;

use linkage_core::{
    Contact, ContactId, ContactStore, IdentifyRequest, IdentifyResponse, LinkageError,
    LinkageResult, LookupSnapshot, NewContact, Precedence, StoreKey, Timestamp, VersionedContact,
};
use linkage_engine::{IdentityService, LinkageConfig};
use linkage_storage::MemoryStore;

fn identify(service: &IdentityService, email: Option<&str>, phone: Option<&str>) -> IdentifyResponse {
    service
        .identify(&IdentifyRequest::new(email, phone))
        .unwrap()
}

fn ids(raw: &[u64]) -> Vec<ContactId> {
    raw.iter().copied().map(ContactId::new).collect()
}

fn stored(service: &IdentityService, id: u64) -> Contact {
    service
        .database()
        .contact(ContactId::new(id))
        .unwrap()
        .unwrap()
}

// ============================================================================
// Basic lifecycle
// ============================================================================

#[test]
fn first_sighting_creates_primary() {
    let service = IdentityService::ephemeral();
    let response = identify(&service, Some("a@x.com"), Some("100"));

    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.emails, vec!["a@x.com"]);
    assert_eq!(response.contact.phone_numbers, vec!["100"]);
    assert!(response.contact.secondary_contact_ids.is_empty());

    let contact = stored(&service, 1);
    assert_eq!(contact.precedence, Precedence::Primary);
    assert_eq!(contact.linked_primary_id, None);
}

#[test]
fn new_phone_for_known_email_creates_secondary() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100"));
    let response = identify(&service, Some("a@x.com"), Some("200"));

    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.emails, vec!["a@x.com"]);
    assert_eq!(response.contact.phone_numbers, vec!["100", "200"]);
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2]));

    let secondary = stored(&service, 2);
    assert_eq!(secondary.precedence, Precedence::Secondary);
    assert_eq!(secondary.linked_primary_id, Some(ContactId::new(1)));
}

#[test]
fn exact_repeat_writes_nothing() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100"));
    let after_second = identify(&service, Some("a@x.com"), Some("200"));
    let version = service.database().current_version();

    let repeat = identify(&service, Some("a@x.com"), Some("100"));
    assert_eq!(repeat, after_second);
    assert_eq!(repeat.contact.phone_numbers, vec!["100", "200"]);
    assert_eq!(service.database().current_version(), version);
    assert_eq!(service.database().contacts().unwrap().len(), 2);
}

#[test]
fn bridging_request_merges_identities() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100"));
    identify(&service, Some("b@x.com"), Some("200"));

    let response = identify(&service, Some("a@x.com"), Some("200"));
    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.emails, vec!["a@x.com", "b@x.com"]);
    assert_eq!(response.contact.phone_numbers, vec!["100", "200"]);
    // B is demoted; the bridging pair itself is new and recorded as 3
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2, 3]));

    let demoted = stored(&service, 2);
    assert_eq!(demoted.precedence, Precedence::Secondary);
    assert_eq!(demoted.linked_primary_id, Some(ContactId::new(1)));
    assert!(demoted.updated_at >= demoted.created_at);
    assert!(stored(&service, 1).is_primary());
}

#[test]
fn missing_email_and_phone_is_rejected_before_store_access() {
    let service = IdentityService::ephemeral();
    let err = service
        .identify(&IdentifyRequest::new(None, None))
        .unwrap_err();

    assert!(matches!(err, LinkageError::InvalidRequest { .. }));
    assert_eq!(service.database().metrics().total_started, 0);
    assert!(service.database().contacts().unwrap().is_empty());
}

// ============================================================================
// Merges
// ============================================================================

#[test]
fn merge_repoints_secondaries_of_demoted_primary() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100")); // 1
    identify(&service, Some("b@x.com"), Some("200")); // 2
    identify(&service, Some("c@x.com"), Some("200")); // 3 -> 2

    // Joins 1 and 2 via email a and phone 200
    identify(&service, Some("a@x.com"), Some("200"));

    for id in [2, 3, 4] {
        assert_eq!(stored(&service, id).linked_primary_id, Some(ContactId::new(1)));
    }
    let response = identify(&service, Some("c@x.com"), Some("200"));
    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2, 3, 4]));
}

#[test]
fn older_primary_wins_regardless_of_request_order() {
    let older = NewContact::primary(Some("old@x.com".into()), Some("111".into()))
        .into_contact(ContactId::new(7), Timestamp::from_secs(100));
    let newer = NewContact::primary(Some("new@x.com".into()), Some("222".into()))
        .into_contact(ContactId::new(3), Timestamp::from_secs(200));
    let store = Arc::new(MemoryStore::with_contacts(vec![older, newer]).unwrap());
    let service = IdentityService::with_store(store, LinkageConfig::default());

    let response = identify(&service, Some("new@x.com"), Some("111"));
    assert_eq!(response.contact.primary_contact_id, ContactId::new(7));
    assert_eq!(response.contact.emails, vec!["old@x.com", "new@x.com"]);
    assert_eq!(stored(&service, 3).linked_primary_id, Some(ContactId::new(7)));
}

#[test]
fn transitive_chain_is_fully_discovered() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100"));
    identify(&service, Some("b@x.com"), Some("100"));
    identify(&service, Some("b@x.com"), Some("300"));

    let response = identify(&service, Some("b@x.com"), Some("300"));
    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.emails, vec!["a@x.com", "b@x.com"]);
    assert_eq!(response.contact.phone_numbers, vec!["100", "300"]);
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2, 3]));
}

#[test]
fn email_only_request_records_its_own_pair() {
    let service = IdentityService::ephemeral();
    identify(&service, Some("a@x.com"), Some("100"));

    let response = identify(&service, Some("a@x.com"), None);
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2]));
    assert_eq!(stored(&service, 2).phone, None);
}

// ============================================================================
// Historical data
// ============================================================================

#[test]
fn link_edges_reach_primary_without_shared_fields() {
    let primary = NewContact::primary(Some("a@x.com".into()), Some("100".into()))
        .into_contact(ContactId::new(1), Timestamp::from_secs(1));
    let stray = NewContact::secondary(Some("z@x.com".into()), Some("900".into()), ContactId::new(1))
        .into_contact(ContactId::new(2), Timestamp::from_secs(2));
    let store = Arc::new(MemoryStore::with_contacts(vec![primary, stray]).unwrap());
    let service = IdentityService::with_store(store, LinkageConfig::default());

    let response = identify(&service, Some("z@x.com"), Some("900"));
    assert_eq!(response.contact.primary_contact_id, ContactId::new(1));
    assert_eq!(response.contact.emails, vec!["a@x.com", "z@x.com"]);
    assert_eq!(response.contact.phone_numbers, vec!["100", "900"]);
    assert_eq!(response.contact.secondary_contact_ids, ids(&[2]));
}

#[test]
fn dangling_link_is_reported_as_corruption() {
    let orphan = NewContact::secondary(Some("o@x.com".into()), None, ContactId::new(99))
        .into_contact(ContactId::new(1), Timestamp::from_secs(1));
    let store = Arc::new(MemoryStore::with_contacts(vec![orphan]).unwrap());
    let service = IdentityService::with_store(store, LinkageConfig::default());

    let err = service
        .identify(&IdentifyRequest::new(Some("o@x.com"), None))
        .unwrap_err();
    assert!(matches!(err, LinkageError::Corruption { .. }));
    assert_eq!(service.database().metrics().total_retried, 0);
    assert_eq!(service.database().contacts().unwrap().len(), 1);
}

// ============================================================================
// Store failures
// ============================================================================

/// Store whose lookups always fail
struct UnreachableStore {
    inner: MemoryStore,
}

impl ContactStore for UnreachableStore {
    fn get(&self, id: ContactId) -> LinkageResult<Option<VersionedContact>> {
        self.inner.get(id)
    }

    fn lookup(&self, _email: Option<&str>, _phone: Option<&str>) -> LinkageResult<LookupSnapshot> {
        Err(LinkageError::store_unavailable("connection refused"))
    }

    fn key_version(&self, key: &StoreKey) -> LinkageResult<u64> {
        self.inner.key_version(key)
    }

    fn current_version(&self) -> u64 {
        self.inner.current_version()
    }

    fn allocate_id(&self) -> ContactId {
        self.inner.allocate_id()
    }

    fn apply(&self, writes: &[Contact], commit_version: u64) -> LinkageResult<()> {
        self.inner.apply(writes, commit_version)
    }

    fn contacts(&self) -> LinkageResult<Vec<Contact>> {
        self.inner.contacts()
    }
}

#[test]
fn store_failure_is_surfaced_without_retry() {
    let store = Arc::new(UnreachableStore {
        inner: MemoryStore::new(),
    });
    let service = IdentityService::with_store(store, LinkageConfig::default());

    let err = service
        .identify(&IdentifyRequest::new(Some("a@x.com"), None))
        .unwrap_err();
    assert!(matches!(err, LinkageError::StoreUnavailable { .. }));

    let metrics = service.database().metrics();
    assert_eq!(metrics.total_started, 1);
    assert_eq!(metrics.total_aborted, 1);
    assert_eq!(metrics.total_retried, 0);
}

#[test]
fn shut_down_service_reports_store_unavailable() {
    let service = IdentityService::ephemeral();
    service.database().shutdown();

    let err = service
        .identify(&IdentifyRequest::new(Some("a@x.com"), None))
        .unwrap_err();
    assert!(matches!(err, LinkageError::StoreUnavailable { .. }));
}

// ============================================================================
// Wire format
// ============================================================================

#[test]
fn json_request_and_response_shapes() {
    let service = IdentityService::ephemeral();
    let request: IdentifyRequest =
        serde_json::from_str(r#"{"email":"a@x.com","phoneNumber":100}"#).unwrap();
    let response = service.identify(&request).unwrap();

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "contact": {
                "primaryContactId": 1,
                "emails": ["a@x.com"],
                "phoneNumbers": ["100"],
                "secondaryContactIds": []
            }
        })
    );
}

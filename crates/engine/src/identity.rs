//! Request-level entry point
//!
//! [`IdentityService::identify`] is the one operation callers need: it turns
//! an [`IdentifyRequest`] into an [`IdentifyResponse`], running the whole
//! resolution pipeline as one retried transaction.

use std::sync::Arc;

use linkage_core::{ContactStore, IdentifyRequest, IdentifyResponse, LinkageResult};
use tracing::info;

use crate::database::{Database, LinkageConfig};
use crate::resolution::{resolve, Resolution};

/// Identity resolution over one database
#[derive(Debug)]
pub struct IdentityService {
    db: Database,
}

impl IdentityService {
    /// Serve requests from `db`
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Fresh in-memory store with default configuration
    pub fn ephemeral() -> Self {
        Self::new(Database::ephemeral())
    }

    /// Serve requests from an existing store
    pub fn with_store(store: Arc<dyn ContactStore>, config: LinkageConfig) -> Self {
        Self::new(Database::with_store(store, config))
    }

    /// The underlying database
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Resolve a request to its unified identity
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if neither email nor phoneNumber is present; the
    ///   store is not touched
    /// - `ConcurrentConflict` if every retry lost a commit race
    /// - `StoreUnavailable` if the database is shut down or the store fails
    /// - `Corruption` if stored contacts violate the linkage invariants
    pub fn identify(&self, request: &IdentifyRequest) -> LinkageResult<IdentifyResponse> {
        self.identify_detailed(request)
            .map(|resolution| resolution.response)
    }

    /// Like [`IdentityService::identify`], also reporting what was written
    pub fn identify_detailed(&self, request: &IdentifyRequest) -> LinkageResult<Resolution> {
        request.validate()?;

        let retry = self.db.config().retry_config();
        let resolution = self
            .db
            .transaction_with_retry(&retry, |txn| resolve(txn, request))?;

        info!(
            target: "linkage::resolve",
            primary = %resolution.response.contact.primary_contact_id,
            created = ?resolution.created,
            demoted = resolution.demoted.len(),
            relinked = resolution.relinked.len(),
            "Identified contact"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkage_core::{ContactId, LinkageError};

    #[test]
    fn test_first_sighting_creates_primary() {
        let service = IdentityService::ephemeral();
        let resolution = service
            .identify_detailed(&IdentifyRequest::new(Some("a@x.com"), Some("100")))
            .unwrap();

        assert_eq!(resolution.created, Some(ContactId::new(1)));
        assert!(resolution.wrote());
        let view = resolution.response.contact;
        assert_eq!(view.primary_contact_id, ContactId::new(1));
        assert!(view.secondary_contact_ids.is_empty());
    }

    #[test]
    fn test_repeat_request_writes_nothing() {
        let service = IdentityService::ephemeral();
        let request = IdentifyRequest::new(Some("a@x.com"), Some("100"));
        let first = service.identify(&request).unwrap();
        let version = service.database().current_version();

        let second = service.identify_detailed(&request).unwrap();
        assert!(!second.wrote());
        assert_eq!(second.response, first);
        assert_eq!(service.database().current_version(), version);
    }

    #[test]
    fn test_invalid_request_never_starts_a_transaction() {
        let service = IdentityService::ephemeral();
        let err = service
            .identify(&IdentifyRequest::new(None, Some("")))
            .unwrap_err();

        assert!(matches!(err, LinkageError::InvalidRequest { .. }));
        assert_eq!(service.database().metrics().total_started, 0);
    }
}

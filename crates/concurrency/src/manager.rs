//! Transaction manager for coordinating commit operations
//!
//! Provides atomic commit by orchestrating:
//! 1. Validation (first-committer-wins)
//! 2. Version allocation
//! 3. Storage application (visibility)
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. acquire commit lock
//! 2. validate read set against current store versions
//! 3. IF conflicts: abort and return ValidationFailed
//! 4. allocate commit_version
//! 5. apply write set to storage at commit_version
//! 6. release commit lock, return commit_version
//! ```
//!
//! Validation and application happen under one lock, so no other commit can
//! slip in between the check and the write.

use crate::{CommitError, TransactionContext, TransactionStatus};
use linkage_core::ContactStore;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error};

/// Manages transaction lifecycle and atomic commits
pub struct TransactionManager {
    /// Global version counter
    ///
    /// Monotonically increasing. Each committed write set increments by 1.
    version: AtomicU64,

    /// Next transaction ID
    next_txn_id: AtomicU64,

    /// Serializes validate-then-apply
    commit_lock: Mutex<()>,
}

impl TransactionManager {
    /// Create a new transaction manager
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (typically the store's current version)
    pub fn new(initial_version: u64) -> Self {
        TransactionManager {
            version: AtomicU64::new(initial_version),
            next_txn_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
        }
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Allocate next transaction ID
    pub fn next_txn_id(&self) -> u64 {
        self.next_txn_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Begin a transaction against `store`
    pub fn begin(&self, store: Arc<dyn ContactStore>) -> TransactionContext {
        TransactionContext::new(self.next_txn_id(), store)
    }

    /// Allocate next commit version
    ///
    /// Never hands out a version at or below what the store has already
    /// applied, even if the store was written outside this manager.
    fn allocate_version(&self, store: &dyn ContactStore) -> u64 {
        self.version
            .fetch_max(store.current_version(), Ordering::SeqCst);
        self.version.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commit a transaction atomically
    ///
    /// Read-only transactions are validated but consume no version; they
    /// return the current version.
    ///
    /// # Returns
    /// - Ok(commit_version) on success
    /// - Err(CommitError) if validation fails or the store rejects the writes
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        store: &dyn ContactStore,
    ) -> Result<u64, CommitError> {
        let _guard = self.commit_lock.lock();

        txn.commit(store)?;

        if txn.is_read_only() {
            return Ok(self.current_version().max(store.current_version()));
        }

        let commit_version = self.allocate_version(store);
        match txn.apply_writes(store, commit_version) {
            Ok(applied) => {
                debug!(
                    target: "linkage::txn",
                    txn_id = txn.txn_id,
                    commit_version,
                    applied,
                    "Applied write set"
                );
                Ok(commit_version)
            }
            Err(e) => {
                error!(
                    target: "linkage::txn",
                    txn_id = txn.txn_id,
                    commit_version,
                    error = %e,
                    "Storage application failed after validation"
                );
                txn.status = TransactionStatus::Aborted {
                    reason: format!("store apply failed: {}", e),
                };
                Err(CommitError::Store(e))
            }
        }
    }

    /// Explicitly abort a transaction
    ///
    /// Buffered writes are discarded. Nothing reaches the store.
    pub fn abort(&self, txn: &mut TransactionContext, reason: String) {
        if let Err(e) = txn.mark_aborted(reason) {
            debug!(target: "linkage::txn", txn_id = txn.txn_id, error = %e, "Abort ignored");
        }
    }
}

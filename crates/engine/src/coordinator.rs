//! Transaction coordinator for managing transaction lifecycle
//!
//! The TransactionCoordinator wraps TransactionManager and adds:
//! - Active transaction tracking
//! - Transaction metrics (started, committed, aborted, retried)
//! - Conversion of commit failures into [`LinkageError`]

use linkage_concurrency::{TransactionContext, TransactionManager};
use linkage_core::{ContactStore, LinkageError, LinkageResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Transaction coordinator for the database
///
/// # Memory Ordering
///
/// The metric counters are observational only and use Relaxed ordering.
/// They do not synchronize any other memory operations.
pub struct TransactionCoordinator {
    /// Transaction manager for ID/version allocation and commit
    manager: TransactionManager,
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
    /// Attempts re-run after a conflict
    total_retried: AtomicU64,
}

impl TransactionCoordinator {
    /// Create new coordinator with initial version
    ///
    /// # Arguments
    /// * `initial_version` - Starting version (typically the store's current version)
    pub fn new(initial_version: u64) -> Self {
        Self {
            manager: TransactionManager::new(initial_version),
            active_count: AtomicU64::new(0),
            total_started: AtomicU64::new(0),
            total_committed: AtomicU64::new(0),
            total_aborted: AtomicU64::new(0),
            total_retried: AtomicU64::new(0),
        }
    }

    /// Start a new transaction against `store`
    ///
    /// Increments active count and total started metrics.
    pub fn start_transaction(&self, store: &Arc<dyn ContactStore>) -> TransactionContext {
        let txn = self.manager.begin(Arc::clone(store));

        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);

        debug!(
            target: "linkage::txn",
            txn_id = txn.txn_id,
            start_version = txn.start_version,
            "Transaction started"
        );
        txn
    }

    /// Commit a transaction through the concurrency layer
    ///
    /// # Returns
    /// * `Ok(commit_version)` - Transaction committed successfully
    /// * `Err(ConcurrentConflict)` - Read set changed since it was observed
    /// * `Err(..)` - Store failure or invalid state
    pub fn commit(
        &self,
        txn: &mut TransactionContext,
        store: &dyn ContactStore,
    ) -> LinkageResult<u64> {
        match self.manager.commit(txn, store) {
            Ok(version) => {
                self.record_commit();
                info!(
                    target: "linkage::txn",
                    txn_id = txn.txn_id,
                    version,
                    writes = txn.write_count(),
                    "Transaction committed"
                );
                Ok(version)
            }
            Err(e) => {
                self.record_abort();
                warn!(target: "linkage::txn", txn_id = txn.txn_id, error = %e, "Transaction aborted");
                Err(LinkageError::from(e))
            }
        }
    }

    /// Abort a transaction, discarding its buffered writes
    pub fn abort(&self, txn: &mut TransactionContext, reason: impl Into<String>) {
        let reason = reason.into();
        debug!(target: "linkage::txn", txn_id = txn.txn_id, reason = %reason, "Transaction abandoned");
        self.manager.abort(txn, reason);
        self.record_abort();
    }

    /// Record transaction commit
    ///
    /// Decrements active count (saturating at 0) and increments committed count.
    pub fn record_commit(&self) {
        self.leave_active();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record transaction abort
    ///
    /// Decrements active count (saturating at 0) and increments aborted count.
    pub fn record_abort(&self) {
        self.leave_active();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record that an aborted attempt is about to be re-run
    pub fn record_retry(&self) {
        self.total_retried.fetch_add(1, Ordering::Relaxed);
    }

    fn leave_active(&self) {
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    /// Get current global version
    pub fn current_version(&self) -> u64 {
        self.manager.current_version()
    }

    /// Get current active transaction count
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }

    /// Get transaction metrics
    pub fn metrics(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            total_retried: self.total_retried.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Transaction metrics
#[derive(Debug, Clone)]
pub struct TransactionMetrics {
    /// Number of currently active transactions
    pub active_count: u64,
    /// Total number of transactions started
    pub total_started: u64,
    /// Total number of transactions committed
    pub total_committed: u64,
    /// Total number of transactions aborted
    pub total_aborted: u64,
    /// Total number of conflict retries
    pub total_retried: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total transactions that completed (committed + aborted)
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted
    }

    /// Abort rate (aborted / started)
    pub fn abort_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_aborted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

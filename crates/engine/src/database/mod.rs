//! Database: store ownership and the transaction API
//!
//! The Database owns one [`ContactStore`] and the [`TransactionCoordinator`]
//! that serializes commits against it. Callers run work through
//! [`Database::transaction`] or [`Database::transaction_with_retry`]; both
//! commit on `Ok` and discard buffered writes on `Err`.
//!
//! After [`Database::shutdown`] every new transaction fails with
//! `StoreUnavailable`. Transactions already in flight may still commit.

mod config;
mod transactions;

pub use config::{LinkageConfig, CONFIG_FILE_NAME};
pub use transactions::RetryConfig;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use linkage_concurrency::TransactionContext;
use linkage_core::{Contact, ContactId, ContactStore, LinkageError, LinkageResult};
use linkage_storage::MemoryStore;
use tracing::{info, warn};

use crate::coordinator::{TransactionCoordinator, TransactionMetrics};

/// Handle to one contact store plus its commit coordinator
pub struct Database {
    store: Arc<dyn ContactStore>,
    coordinator: TransactionCoordinator,
    config: LinkageConfig,
    accepting_transactions: AtomicBool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("version", &self.coordinator.current_version())
            .field("open", &self.is_open())
            .field("config", &self.config)
            .finish()
    }
}

impl Database {
    /// Open an in-memory database with the given configuration
    ///
    /// # Errors
    ///
    /// Returns `Config` if the configuration fails validation.
    pub fn open(config: LinkageConfig) -> LinkageResult<Self> {
        config.validate()?;
        Ok(Self::with_store(Arc::new(MemoryStore::new()), config))
    }

    /// Open an in-memory database with default configuration
    pub fn ephemeral() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), LinkageConfig::default())
    }

    /// Wrap an existing store
    ///
    /// The commit version counter starts from the store's current version, so
    /// a pre-seeded store keeps monotonically increasing versions.
    pub fn with_store(store: Arc<dyn ContactStore>, config: LinkageConfig) -> Self {
        let coordinator = TransactionCoordinator::new(store.current_version());
        Self {
            store,
            coordinator,
            config,
            accepting_transactions: AtomicBool::new(true),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &LinkageConfig {
        &self.config
    }

    /// Underlying store
    pub fn store(&self) -> &Arc<dyn ContactStore> {
        &self.store
    }

    // ========================================================================
    // Transaction API
    // ========================================================================

    fn check_accepting(&self) -> LinkageResult<()> {
        if !self.accepting_transactions.load(Ordering::SeqCst) {
            return Err(LinkageError::store_unavailable("database is shut down"));
        }
        Ok(())
    }

    /// Commit on `Ok`, abort on `Err`.
    fn run_single_attempt<T>(
        &self,
        txn: &mut TransactionContext,
        result: LinkageResult<T>,
    ) -> LinkageResult<(T, u64)> {
        match result {
            Ok(value) => {
                let commit_version = self.commit_transaction(txn)?;
                Ok((value, commit_version))
            }
            Err(e) => {
                self.coordinator
                    .abort(txn, format!("transaction body failed: {}", e));
                Err(e)
            }
        }
    }

    /// Begin a new transaction (for manual control)
    ///
    /// Returns a TransactionContext that must be passed to
    /// [`Database::commit_transaction`] or dropped. Prefer
    /// [`Database::transaction`].
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` after shutdown.
    pub fn begin_transaction(&self) -> LinkageResult<TransactionContext> {
        self.check_accepting()?;
        Ok(self.coordinator.start_transaction(&self.store))
    }

    /// Validate and apply a transaction's buffered writes
    ///
    /// # Returns
    /// * `Ok(commit_version)` - Transaction committed
    /// * `Err(ConcurrentConflict)` - Validation failed, nothing applied
    pub fn commit_transaction(&self, txn: &mut TransactionContext) -> LinkageResult<u64> {
        self.coordinator.commit(txn, self.store.as_ref())
    }

    /// Execute a transaction with the given closure
    ///
    /// # Example
    /// ```text
    /// let found = db.transaction(|txn| txn.find_by_email_or_phone(Some("a@x.com"), None))?;
    /// ```
    pub fn transaction<F, T>(&self, f: F) -> LinkageResult<T>
    where
        F: FnOnce(&mut TransactionContext) -> LinkageResult<T>,
    {
        let mut txn = self.begin_transaction()?;
        let result = f(&mut txn);
        self.run_single_attempt(&mut txn, result)
            .map(|(value, _)| value)
    }

    /// Execute a transaction with automatic retry on conflict
    ///
    /// Each attempt starts a fresh transaction and calls `f` again, so `f`
    /// must not carry state between calls. The closure is re-run until:
    /// - The transaction commits
    /// - A non-conflict error occurs (not retried)
    /// - `config.max_retries` retries are used up
    pub fn transaction_with_retry<F, T>(&self, config: &RetryConfig, mut f: F) -> LinkageResult<T>
    where
        F: FnMut(&mut TransactionContext) -> LinkageResult<T>,
    {
        let mut attempt = 0;
        loop {
            let mut txn = self.begin_transaction()?;
            let result = f(&mut txn);

            match self.run_single_attempt(&mut txn, result) {
                Ok((value, _)) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < config.max_retries => {
                    let delay = config.calculate_delay(attempt);
                    warn!(
                        target: "linkage::txn",
                        attempt = attempt + 1,
                        max_retries = config.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Retrying after conflict"
                    );
                    self.coordinator.record_retry();
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Committed state of one contact
    pub fn contact(&self, id: ContactId) -> LinkageResult<Option<Contact>> {
        self.check_accepting()?;
        Ok(self.store.get(id)?.map(|row| row.contact))
    }

    /// Every committed contact, ascending by id
    pub fn contacts(&self) -> LinkageResult<Vec<Contact>> {
        self.check_accepting()?;
        self.store.contacts()
    }

    /// Transaction statistics
    pub fn metrics(&self) -> TransactionMetrics {
        self.coordinator.metrics()
    }

    /// Current global commit version
    pub fn current_version(&self) -> u64 {
        self.coordinator.current_version()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Check if the database accepts new transactions
    pub fn is_open(&self) -> bool {
        self.accepting_transactions.load(Ordering::SeqCst)
    }

    /// Stop accepting new transactions
    ///
    /// Idempotent.
    pub fn shutdown(&self) {
        if self.accepting_transactions.swap(false, Ordering::SeqCst) {
            let metrics = self.metrics();
            info!(
                target: "linkage::txn",
                committed = metrics.total_committed,
                aborted = metrics.total_aborted,
                retried = metrics.total_retried,
                "Database shut down"
            );
        }
    }
}

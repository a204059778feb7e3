//! Error types for Linkage
//!
//! All failures surface as [`LinkageError`]. Resolution never applies a
//! partial result: a request either commits a complete, invariant-preserving
//! update or fails with one of these errors and leaves the store untouched.
//!
//! | Variant | Retryable | Cause |
//! |---------|-----------|-------|
//! | `InvalidRequest` | no | Both email and phone absent |
//! | `ConcurrentConflict` | yes | An overlapping resolution committed first |
//! | `StoreUnavailable` | no | Store I/O failure or database shut down |
//! | `Corruption` | no | Stored contacts violate identity invariants |
//! | `Config` | no | Configuration file unreadable or invalid |
//! | `Internal` | no | Misuse of a transaction or other bug |

use thiserror::Error;

/// Result type alias for Linkage operations
pub type LinkageResult<T> = std::result::Result<T, LinkageError>;

/// Error type for Linkage operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkageError {
    /// Request rejected before touching the store
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected
        reason: String,
    },

    /// Commit validation found a concurrent write to data this resolution read
    ///
    /// The whole pipeline must be re-run from scratch; the closure may have
    /// changed.
    #[error("concurrent conflict: {reason}")]
    ConcurrentConflict {
        /// Description of the conflicting reads
        reason: String,
    },

    /// The contact store could not serve the request
    #[error("store unavailable: {message}")]
    StoreUnavailable {
        /// Underlying failure
        message: String,
    },

    /// Stored contacts violate an identity invariant
    #[error("data corruption: {message}")]
    Corruption {
        /// The violated invariant
        message: String,
    },

    /// Configuration could not be loaded
    #[error("configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Internal error (bug or misuse)
    #[error("internal error: {message}")]
    Internal {
        /// What went wrong
        message: String,
    },
}

impl LinkageError {
    /// Create an InvalidRequest error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        LinkageError::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Create a ConcurrentConflict error
    pub fn conflict(reason: impl Into<String>) -> Self {
        LinkageError::ConcurrentConflict {
            reason: reason.into(),
        }
    }

    /// Create a StoreUnavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        LinkageError::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a Corruption error
    pub fn corruption(message: impl Into<String>) -> Self {
        LinkageError::Corruption {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        LinkageError::Config {
            message: message.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LinkageError::Internal {
            message: message.into(),
        }
    }

    /// Check if this error came from commit-time conflict detection
    pub fn is_conflict(&self) -> bool {
        matches!(self, LinkageError::ConcurrentConflict { .. })
    }

    /// Check if re-running the whole operation may succeed
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            LinkageError::InvalidRequest { .. } => "InvalidRequest",
            LinkageError::ConcurrentConflict { .. } => "ConcurrentConflict",
            LinkageError::StoreUnavailable { .. } => "StoreUnavailable",
            LinkageError::Corruption { .. } => "Corruption",
            LinkageError::Config { .. } => "Config",
            LinkageError::Internal { .. } => "Internal",
        }
    }
}

//! Transaction validation for OCC
//!
//! Key rules:
//! - First-committer-wins based on the READ-SET
//! - Row reads and lookup reads are validated the same way: the version
//!   observed when reading must still be current at commit time
//! - A lookup that found nothing recorded version 0 for its key; a concurrent
//!   insert of a matching contact bumps that key and fails validation

use linkage_core::{ContactStore, LinkageResult, StoreKey};
use std::collections::BTreeMap;

/// Types of conflicts that can occur during transaction validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictType {
    /// A key was read at one version but the current version differs
    ReadWriteConflict {
        /// The key that has a conflict
        key: StoreKey,
        /// Version recorded in read_set when read
        read_version: u64,
        /// Current version in storage at validation time
        current_version: u64,
    },
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::ReadWriteConflict {
                key,
                read_version,
                current_version,
            } => write!(
                f,
                "{} read at version {}, now {}",
                key, read_version, current_version
            ),
        }
    }
}

/// Result of transaction validation
///
/// A transaction commits only if is_valid() returns true.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// All conflicts detected during validation
    pub conflicts: Vec<ConflictType>,
}

impl ValidationResult {
    /// Create a successful validation result (no conflicts)
    pub fn ok() -> Self {
        Self::default()
    }

    /// Create a validation result with a single conflict
    pub fn conflict(conflict: ConflictType) -> Self {
        ValidationResult {
            conflicts: vec![conflict],
        }
    }

    /// Check if validation passed (no conflicts)
    pub fn is_valid(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Merge another validation result into this one
    pub fn merge(&mut self, other: ValidationResult) {
        self.conflicts.extend(other.conflicts);
    }

    /// Get the number of conflicts
    pub fn conflict_count(&self) -> usize {
        self.conflicts.len()
    }

    /// Human-readable summary naming the first conflicting key
    pub fn summary(&self) -> String {
        match self.conflicts.first() {
            None => "no conflicts".to_string(),
            Some(first) if self.conflicts.len() == 1 => first.to_string(),
            Some(first) => format!(
                "{} (and {} more conflict(s))",
                first,
                self.conflicts.len() - 1
            ),
        }
    }
}

/// Validate the read-set against current storage state
///
/// For each key in read_set, check that the current version matches the
/// version recorded when it was read.
///
/// # Errors
///
/// Propagates store failures; validation is abandoned rather than risking an
/// incorrect commit.
pub fn validate_read_set(
    read_set: &BTreeMap<StoreKey, u64>,
    store: &dyn ContactStore,
) -> LinkageResult<ValidationResult> {
    let mut result = ValidationResult::ok();

    for (key, read_version) in read_set {
        let current_version = store.key_version(key)?;
        if current_version != *read_version {
            result.conflicts.push(ConflictType::ReadWriteConflict {
                key: key.clone(),
                read_version: *read_version,
                current_version,
            });
        }
    }

    Ok(result)
}

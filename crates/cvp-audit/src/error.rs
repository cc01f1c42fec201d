//! Error types for audit trail operations.

use thiserror::Error;

/// Result type alias for audit operations.
pub type Result<T> = core::result::Result<T, AuditError>;

/// Audit trail errors.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The log file could not be opened, written, or flushed.
    #[error("Audit I/O error: {0}")]
    Io(String),

    /// The process-wide audit log has not been initialized.
    #[error("Audit log not initialized")]
    NotInitialized,

    /// An operation tag exceeds the length bound.
    #[error("Operation tag is {len} bytes (max {max})")]
    OperationTooLong {
        /// Tag length in bytes.
        len: usize,
        /// Maximum tag length permitted.
        max: usize,
    },

    /// An entry could not be parsed during verification.
    #[error("Malformed audit entry at index {index}: {detail}")]
    Malformed {
        /// One-based entry index within the log.
        index: usize,
        /// What failed to parse.
        detail: String,
    },

    /// One or more entries failed checksum verification.
    #[error("Audit integrity check failed: {failures} of {entries} entries, first at index {first}")]
    Integrity {
        /// Total entries examined.
        entries: usize,
        /// Number of entries whose checksum did not match.
        failures: usize,
        /// One-based index of the first failing entry.
        first: usize,
    },
}

impl From<std::io::Error> for AuditError {
    fn from(err: std::io::Error) -> Self {
        AuditError::Io(err.to_string())
    }
}

//! Tamper-evident audit trail for the CVP canonical validation protocol.
//!
//! Every admission decision is appended to a line-oriented log with a
//! per-entry integrity checksum and a session-scoped sequence number. The
//! trail covers:
//! - Entry format, checksumming, and parsing (`entry`)
//! - The append-only log with session lifecycle and integrity verification
//!   (`log`)
//! - The process-wide singleton used by front-ends (`global`)
//!
//! Entries are flushed to durable storage before `log` returns; concurrent
//! callers serialize on an internal mutex.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod entry;
pub mod error;
pub mod global;
pub mod log;

pub use entry::{AuditEntry, COMPLIANCE_TAG, NULL_HASH};
pub use error::{AuditError, Result};
pub use log::{verify, AuditLog, RETENTION_DAYS};

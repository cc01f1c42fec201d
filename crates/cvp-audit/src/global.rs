//! Process-wide audit singleton.
//!
//! Front-ends initialize the trail once, hand `Arc<AuditLog>` handles to
//! their validators, and tear it down on exit. Nothing outside this module
//! can append without holding a handle.

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{AuditError, Result};
use crate::log::AuditLog;

static GLOBAL: Mutex<Option<Arc<AuditLog>>> = Mutex::new(None);

/// Initialize the process-wide audit log.
///
/// Idempotent: if already initialized, the existing handle is returned and
/// the path argument is ignored.
pub fn init(path: impl AsRef<Path>) -> Result<Arc<AuditLog>> {
    let mut slot = GLOBAL.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(log) = slot.as_ref() {
        return Ok(Arc::clone(log));
    }
    let log = Arc::new(AuditLog::open(path)?);
    *slot = Some(Arc::clone(&log));
    Ok(log)
}

/// Get a handle to the initialized audit log.
pub fn handle() -> Result<Arc<AuditLog>> {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone)
        .ok_or(AuditError::NotInitialized)
}

/// Append one entry through the singleton.
pub fn log(operation: &str, hash: Option<&[u8]>) -> Result<u32> {
    handle()?.log(operation, hash)
}

/// Log the session close marker and release the singleton.
///
/// A no-op if the singleton was never initialized. Outstanding handles stay
/// valid; the session is considered closed once this returns.
pub fn cleanup() -> Result<()> {
    let taken = GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    match taken {
        Some(log) => log.close(),
        None => Ok(()),
    }
}

/// Whether the singleton has been initialized.
pub fn is_initialized() -> bool {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

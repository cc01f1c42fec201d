//! Append-only audit log with session lifecycle and integrity verification.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::entry::{checksum32, AuditEntry};
use crate::error::{AuditError, Result};

/// Retention period in days (7 years).
///
/// Enforced externally by rotation policy; recorded here for the compliance
/// report.
pub const RETENTION_DAYS: u32 = 2555;

/// Seconds since the Unix epoch.
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug)]
struct LogInner {
    file: File,
    path: PathBuf,
    session_id: String,
    sequence: u32,
    started_at: u64,
}

/// An open audit log.
///
/// One session per open handle: the session id is derived from the open time,
/// sequence numbers restart at one, and `AUDIT_INIT`/`AUDIT_CLEANUP` bracket
/// the session. Every `log` call appends one entry and flushes it before
/// returning; concurrent callers serialize on the internal mutex.
#[derive(Debug)]
pub struct AuditLog {
    inner: Mutex<LogInner>,
}

impl AuditLog {
    /// Open (or create) the log file in append mode and start a session.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        let now = now_secs();
        let session_id = format!(
            "CVP_{:08X}_{:08X}",
            now as u32,
            checksum32(&now.to_le_bytes())
        );

        let log = Self {
            inner: Mutex::new(LogInner {
                file,
                path,
                session_id,
                sequence: 0,
                started_at: now,
            }),
        };
        log.log("AUDIT_INIT", None)?;
        Ok(log)
    }

    /// Append one entry and flush it to the file before returning.
    ///
    /// Returns the entry's sequence number.
    pub fn log(&self, operation: &str, hash: Option<&[u8]>) -> Result<u32> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let sequence = inner.sequence + 1;
        let entry = AuditEntry::new(now_secs(), operation, hash, &inner.session_id, sequence)?;

        let mut line = entry.render();
        line.push('\n');
        inner.file.write_all(line.as_bytes())?;
        inner.file.flush()?;
        inner.sequence = sequence;

        tracing::trace!(operation, sequence, "audit entry appended");
        Ok(sequence)
    }

    /// Log the session close marker and flush.
    ///
    /// The handle stays usable afterwards, but a well-behaved caller treats
    /// the session as finished.
    pub fn close(&self) -> Result<()> {
        self.log("AUDIT_CLEANUP", None)?;
        Ok(())
    }

    /// This session's identifier.
    pub fn session_id(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id
            .clone()
    }

    /// Sequence number of the most recent entry.
    pub fn sequence(&self) -> u32 {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sequence
    }

    /// Path of the backing log file.
    pub fn path(&self) -> PathBuf {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .path
            .clone()
    }

    /// Render a human-readable session compliance summary.
    pub fn compliance_report(&self) -> String {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        format!(
            "CVP Audit Compliance Report\n\
             ===========================\n\
             Standard:          {}\n\
             Session ID:        {}\n\
             Session Start:     {}\n\
             Operations Logged: {}\n\
             Audit Log Path:    {}\n\
             Retention Period:  {} days\n",
            crate::entry::COMPLIANCE_TAG,
            inner.session_id,
            inner.started_at,
            inner.sequence,
            inner.path.display(),
            RETENTION_DAYS,
        )
    }
}

/// Verify the integrity of every entry in a log file.
///
/// Each entry's checksum is recomputed from its fields; mismatches and parse
/// failures are reported with their one-based entry index. Returns the number
/// of entries verified; any failure is fatal.
pub fn verify(path: impl AsRef<Path>) -> Result<usize> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut entries = 0usize;
    let mut failures = 0usize;
    let mut first = 0usize;

    for line in reader.lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        entries += 1;
        let index = entries;

        match AuditEntry::parse(&line, index) {
            Ok(entry) if entry.is_intact() => {}
            Ok(entry) => {
                let stored = format!("{:08X}", entry.checksum);
                let computed = format!("{:08X}", entry.expected_checksum());
                tracing::error!(index, %stored, %computed, "audit entry checksum mismatch");
                failures += 1;
                if first == 0 {
                    first = index;
                }
            }
            Err(err) => {
                tracing::error!(index, %err, "audit entry parse failure");
                failures += 1;
                if first == 0 {
                    first = index;
                }
            }
        }
    }

    if failures > 0 {
        Err(AuditError::Integrity {
            entries,
            failures,
            first,
        })
    } else {
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_log() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("audit.log");
        (dir, path)
    }

    #[test]
    fn test_open_logs_init_entry() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();
        assert_eq!(log.sequence(), 1);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("OPERATION=AUDIT_INIT"));
        assert!(contents.contains("HASH_REF=NULL_HASH"));
    }

    #[test]
    fn test_sequence_strictly_increases() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();

        let s1 = log.log("BUFFER_VALIDATION", Some(&[1])).unwrap();
        let s2 = log.log("BUFFER_VALIDATION", Some(&[2])).unwrap();
        let s3 = log.log("VALIDATION_FAILED", None).unwrap();
        assert!(s1 < s2 && s2 < s3);
    }

    #[test]
    fn test_verify_clean_log() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();
        log.log("BUFFER_VALIDATION", Some(&[0xAB; 32])).unwrap();
        log.close().unwrap();

        // AUDIT_INIT + BUFFER_VALIDATION + AUDIT_CLEANUP
        assert_eq!(verify(&path).unwrap(), 3);
    }

    #[test]
    fn test_verify_detects_single_byte_flip() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();
        log.log("BUFFER_VALIDATION", Some(&[0xCD; 32])).unwrap();
        log.close().unwrap();

        let mut contents = std::fs::read(&path).unwrap();
        // Flip one byte inside the second entry's hash reference.
        let needle = b"HASH_REF=cdcd";
        let pos = contents
            .windows(needle.len())
            .position(|w| w == needle)
            .expect("hash ref present");
        contents[pos + 9] ^= 0x01;
        std::fs::write(&path, &contents).unwrap();

        let err = verify(&path).unwrap_err();
        match err {
            AuditError::Integrity {
                entries,
                failures,
                first,
            } => {
                assert_eq!(entries, 3);
                assert_eq!(failures, 1);
                assert_eq!(first, 2);
            }
            other => panic!("expected integrity failure, got {other}"),
        }
    }

    #[test]
    fn test_sessions_resume_appending() {
        let (_dir, path) = temp_log();
        {
            let log = AuditLog::open(&path).unwrap();
            log.close().unwrap();
        }
        {
            let log = AuditLog::open(&path).unwrap();
            log.close().unwrap();
        }

        // Two sessions, two entries each, all intact.
        assert_eq!(verify(&path).unwrap(), 4);
    }

    #[test]
    fn test_compliance_report_mentions_session() {
        let (_dir, path) = temp_log();
        let log = AuditLog::open(&path).unwrap();
        let report = log.compliance_report();
        assert!(report.contains(&log.session_id()));
        assert!(report.contains("2555 days"));
    }
}

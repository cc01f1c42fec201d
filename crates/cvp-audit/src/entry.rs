//! Audit entry format: pipe-delimited key=value fields with an integrity
//! checksum.
//!
//! Wire format, one entry per line:
//!
//! ```text
//! TIMESTAMP=<u64>|OPERATION=<tag>|HASH_REF=<hex-or-NULL_HASH>|CONTEXT=<str>|COMPLIANCE=<tag>|SEQ=<u32>|CHECKSUM=<8-hex>
//! ```
//!
//! The checksum is a 32-bit hash over every byte of the line preceding
//! `|CHECKSUM=`, so any edit to any earlier field is detectable.

use std::hash::Hasher;

use twox_hash::XxHash32;

use crate::error::{AuditError, Result};

/// Literal hash reference recorded when an operation carries no payload hash.
pub const NULL_HASH: &str = "NULL_HASH";

/// Compliance tag carried on every entry.
pub const COMPLIANCE_TAG: &str = "NASA-STD-8739.8";

/// Maximum operation tag length in bytes.
pub const MAX_OPERATION_LEN: usize = 64;

/// Maximum context string length in bytes.
pub const MAX_CONTEXT_LEN: usize = 128;

/// One immutable audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: u64,
    /// Operation tag, at most 64 bytes.
    pub operation: String,
    /// Hex encoding of the hashed canonical bytes, or `NULL_HASH`.
    pub hash_reference: String,
    /// Session context, `SESSION_<id>_SEQ_<n>`.
    pub context: String,
    /// Compliance level tag.
    pub compliance_level: String,
    /// Session-scoped sequence number, strictly increasing.
    pub sequence_number: u32,
    /// Checksum over all prior fields.
    pub checksum: u32,
}

/// 32-bit integrity hash used for entry checksums and session ids.
pub(crate) fn checksum32(data: &[u8]) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(data);
    hasher.finish() as u32
}

impl AuditEntry {
    /// Build an entry, computing its checksum.
    ///
    /// `hash` is hex-encoded when present; absent hashes are recorded as the
    /// literal `NULL_HASH`.
    pub fn new(
        timestamp: u64,
        operation: &str,
        hash: Option<&[u8]>,
        session_id: &str,
        sequence_number: u32,
    ) -> Result<Self> {
        if operation.len() > MAX_OPERATION_LEN {
            return Err(AuditError::OperationTooLong {
                len: operation.len(),
                max: MAX_OPERATION_LEN,
            });
        }

        let hash_reference = match hash {
            Some(bytes) if !bytes.is_empty() => hex::encode(bytes),
            _ => NULL_HASH.to_string(),
        };

        let mut context = format!("SESSION_{session_id}_SEQ_{sequence_number}");
        context.truncate(MAX_CONTEXT_LEN);

        let mut entry = Self {
            timestamp,
            operation: operation.to_string(),
            hash_reference,
            context,
            compliance_level: COMPLIANCE_TAG.to_string(),
            sequence_number,
            checksum: 0,
        };
        entry.checksum = checksum32(entry.prefix().as_bytes());
        Ok(entry)
    }

    /// The line content preceding `|CHECKSUM=`, the checksummed region.
    fn prefix(&self) -> String {
        format!(
            "TIMESTAMP={}|OPERATION={}|HASH_REF={}|CONTEXT={}|COMPLIANCE={}|SEQ={}",
            self.timestamp,
            self.operation,
            self.hash_reference,
            self.context,
            self.compliance_level,
            self.sequence_number,
        )
    }

    /// Render the entry as one log line, without a trailing newline.
    pub fn render(&self) -> String {
        format!("{}|CHECKSUM={:08X}", self.prefix(), self.checksum)
    }

    /// Recompute the checksum from the entry's own fields.
    pub fn expected_checksum(&self) -> u32 {
        checksum32(self.prefix().as_bytes())
    }

    /// Whether the stored checksum matches the recomputed one.
    pub fn is_intact(&self) -> bool {
        self.checksum == self.expected_checksum()
    }

    /// Parse one log line. `index` is the one-based entry position, used in
    /// diagnostics only.
    pub fn parse(line: &str, index: usize) -> Result<Self> {
        let malformed = |detail: &str| AuditError::Malformed {
            index,
            detail: detail.to_string(),
        };

        let mut fields = line.trim_end_matches(['\r', '\n']).split('|');
        let timestamp = take(&mut fields, "TIMESTAMP").ok_or_else(|| malformed("TIMESTAMP"))?;
        let operation = take(&mut fields, "OPERATION").ok_or_else(|| malformed("OPERATION"))?;
        let hash_reference = take(&mut fields, "HASH_REF").ok_or_else(|| malformed("HASH_REF"))?;
        let context = take(&mut fields, "CONTEXT").ok_or_else(|| malformed("CONTEXT"))?;
        let compliance = take(&mut fields, "COMPLIANCE").ok_or_else(|| malformed("COMPLIANCE"))?;
        let seq = take(&mut fields, "SEQ").ok_or_else(|| malformed("SEQ"))?;
        let checksum = take(&mut fields, "CHECKSUM").ok_or_else(|| malformed("CHECKSUM"))?;
        if fields.next().is_some() {
            return Err(malformed("trailing fields"));
        }

        Ok(Self {
            timestamp: timestamp
                .parse()
                .map_err(|_| malformed("TIMESTAMP value"))?,
            operation: operation.to_string(),
            hash_reference: hash_reference.to_string(),
            context: context.to_string(),
            compliance_level: compliance.to_string(),
            sequence_number: seq.parse().map_err(|_| malformed("SEQ value"))?,
            checksum: u32::from_str_radix(checksum, 16)
                .map_err(|_| malformed("CHECKSUM value"))?,
        })
    }
}

/// Pull the next `KEY=value` field, returning the value.
fn take<'a>(fields: &mut std::str::Split<'a, char>, key: &str) -> Option<&'a str> {
    let field = fields.next()?;
    let (k, v) = field.split_once('=')?;
    (k == key).then_some(v)
}

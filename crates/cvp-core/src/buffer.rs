//! Owned message buffers and their admission state.

use zeroize::Zeroize;

use crate::cost::GovernanceZone;
use crate::error::{Error, Result};

/// Maximum payload size in bytes.
pub const MAX_BUFFER_SIZE: usize = 8192;

/// Size of the on-buffer pattern hash field in bytes.
pub const HASH_SIZE: usize = 32;

/// Buffer security classification.
///
/// Carried as metadata; admission applies the same pipeline at every level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityLevel {
    /// Unclassified.
    None,
    /// Low sensitivity.
    #[default]
    Low,
    /// Medium sensitivity.
    Medium,
    /// High sensitivity.
    High,
    /// Critical sensitivity, the upper bound.
    Critical,
}

/// An owned message buffer moving through the admission pipeline.
///
/// Derived state is only reachable through the pipeline: `cost`, `zone`, and
/// `pattern_hash` are `None` until the corresponding stage has run, and
/// `validated` implies `normalized`. Payload bytes are wiped on drop.
#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    max_size: usize,
    /// Security classification of the payload.
    pub security_level: SecurityLevel,
    normalized: bool,
    validated: bool,
    cost: Option<f64>,
    zone: Option<GovernanceZone>,
    pattern_hash: Option<[u8; HASH_SIZE]>,
}

impl Buffer {
    /// Create an empty buffer with the protocol maximum capacity.
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            max_size: MAX_BUFFER_SIZE,
            security_level: SecurityLevel::default(),
            normalized: false,
            validated: false,
            cost: None,
            zone: None,
            pattern_hash: None,
        }
    }

    /// Create an empty buffer with a smaller capacity bound.
    pub fn with_max_size(max_size: usize) -> Result<Self> {
        if max_size == 0 || max_size > MAX_BUFFER_SIZE {
            return Err(Error::InvalidInput(format!(
                "buffer capacity {max_size} outside 1..={MAX_BUFFER_SIZE}"
            )));
        }
        let mut buffer = Self::new();
        buffer.max_size = max_size;
        Ok(buffer)
    }

    /// Create a buffer holding a copy of `data`.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut buffer = Self::new();
        buffer.set_data(data)?;
        Ok(buffer)
    }

    /// Replace the payload, resetting all derived admission state.
    pub fn set_data(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.max_size {
            return Err(Error::BufferOverflow {
                length: data.len(),
                max: self.max_size,
            });
        }
        self.data.zeroize();
        self.data.clear();
        self.data.extend_from_slice(data);
        self.normalized = false;
        self.validated = false;
        self.cost = None;
        self.zone = None;
        self.pattern_hash = None;
        Ok(())
    }

    /// Payload bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Capacity bound for this buffer.
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Whether the payload is in canonical form.
    pub fn is_normalized(&self) -> bool {
        self.normalized
    }

    /// Whether the full pipeline admitted this payload.
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Admission cost, set once the cost stage has run.
    pub fn cost(&self) -> Option<f64> {
        self.cost
    }

    /// Governance zone, set once the cost stage has run.
    pub fn zone(&self) -> Option<GovernanceZone> {
        self.zone
    }

    /// Canonical pattern fingerprint, set iff the recognizer accepted.
    pub fn pattern_hash(&self) -> Option<[u8; HASH_SIZE]> {
        self.pattern_hash
    }

    /// Replace the payload with its canonical form.
    pub(crate) fn replace_with_canonical(&mut self, canonical: Vec<u8>) {
        self.data.zeroize();
        self.data = canonical;
        self.normalized = true;
    }

    pub(crate) fn set_pattern_hash(&mut self, hash: [u8; HASH_SIZE]) {
        self.pattern_hash = Some(hash);
    }

    pub(crate) fn set_cost(&mut self, cost: f64, zone: GovernanceZone) {
        self.cost = Some(cost);
        self.zone = Some(zone);
    }

    pub(crate) fn set_validated(&mut self) {
        debug_assert!(self.normalized);
        self.validated = true;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_blank() {
        let buffer = Buffer::new();
        assert!(buffer.is_empty());
        assert_eq!(buffer.max_size(), MAX_BUFFER_SIZE);
        assert!(!buffer.is_normalized());
        assert!(!buffer.is_validated());
        assert_eq!(buffer.cost(), None);
        assert_eq!(buffer.zone(), None);
        assert_eq!(buffer.pattern_hash(), None);
    }

    #[test]
    fn test_oversize_payload_rejected() {
        let data = vec![0x41; MAX_BUFFER_SIZE + 1];
        let result = Buffer::from_bytes(&data);
        assert!(matches!(
            result,
            Err(Error::BufferOverflow { length, max })
                if length == MAX_BUFFER_SIZE + 1 && max == MAX_BUFFER_SIZE
        ));
    }

    #[test]
    fn test_payload_at_limit_accepted() {
        let data = vec![0x41; MAX_BUFFER_SIZE];
        let buffer = Buffer::from_bytes(&data).unwrap();
        assert_eq!(buffer.len(), MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_smaller_capacity_enforced() {
        let mut buffer = Buffer::with_max_size(16).unwrap();
        assert!(buffer.set_data(&[0u8; 16]).is_ok());
        assert!(buffer.set_data(&[0u8; 17]).is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(Buffer::with_max_size(0).is_err());
        assert!(Buffer::with_max_size(MAX_BUFFER_SIZE + 1).is_err());
    }

    #[test]
    fn test_set_data_resets_derived_state() {
        let mut buffer = Buffer::from_bytes(b"abc").unwrap();
        buffer.replace_with_canonical(b"abc".to_vec());
        buffer.set_pattern_hash([1u8; HASH_SIZE]);
        buffer.set_cost(0.1, GovernanceZone::Autonomous);
        buffer.set_validated();

        buffer.set_data(b"def").unwrap();
        assert!(!buffer.is_normalized());
        assert!(!buffer.is_validated());
        assert_eq!(buffer.cost(), None);
        assert_eq!(buffer.zone(), None);
        assert_eq!(buffer.pattern_hash(), None);
    }

    #[test]
    fn test_security_level_ordering() {
        assert!(SecurityLevel::None < SecurityLevel::Low);
        assert!(SecurityLevel::Low < SecurityLevel::Medium);
        assert!(SecurityLevel::Medium < SecurityLevel::High);
        assert!(SecurityLevel::High < SecurityLevel::Critical);
    }
}

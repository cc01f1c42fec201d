//! Stable 32-bit pattern hashing.
//!
//! The pattern fingerprint is XXH32 with seed 0: deterministic, identical
//! across platforms for identical canonical bytes. On the buffer it is
//! serialized into a 32-byte field, little-endian, zero-padded, so a drop-in
//! upgrade to a 256-bit digest only touches this module and `HASH_SIZE`.

use std::hash::Hasher;

use twox_hash::XxHash32;

use crate::buffer::HASH_SIZE;

/// Hash a complete byte sequence.
pub fn pattern_hash32(data: &[u8]) -> u32 {
    let mut hasher = PatternHasher::new();
    hasher.update(data);
    hasher.finish32()
}

/// Serialize a 32-bit hash into the 32-byte on-buffer field.
///
/// First 4 bytes are the hash little-endian; the remaining 28 are zero.
pub fn encode_pattern_hash(hash: u32) -> [u8; HASH_SIZE] {
    let mut out = [0u8; HASH_SIZE];
    out[..4].copy_from_slice(&hash.to_le_bytes());
    out
}

/// Incremental pattern hasher fed by the recognizer as it consumes bytes.
pub struct PatternHasher {
    inner: XxHash32,
}

impl PatternHasher {
    /// Start a new hash computation.
    pub fn new() -> Self {
        Self {
            inner: XxHash32::with_seed(0),
        }
    }

    /// Feed consumed bytes.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.write(data);
    }

    /// Finish and return the 32-bit value.
    pub fn finish32(&self) -> u32 {
        self.inner.finish() as u32
    }
}

impl Default for PatternHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let a = pattern_hash32(b"canonical bytes");
        let b = pattern_hash32(b"canonical bytes");
        assert_eq!(a, b);
    }

    #[test]
    fn test_one_byte_change_changes_hash() {
        let a = pattern_hash32(b"canonical bytes");
        let b = pattern_hash32(b"canonical byteS");
        assert_ne!(a, b);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let mut hasher = PatternHasher::new();
        for chunk in [b"can".as_slice(), b"onical ", b"bytes"] {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finish32(), pattern_hash32(b"canonical bytes"));
    }

    #[test]
    fn test_encoding_layout() {
        let field = encode_pattern_hash(0x1122_3344);
        assert_eq!(&field[..4], &[0x44, 0x33, 0x22, 0x11]);
        assert!(field[4..].iter().all(|&b| b == 0));
    }
}

//! USCN canonical-form reduction.
//!
//! The normalizer maps every input to the unique representative of its
//! encoding equivalence class, so that validators downstream never see two
//! textually different spellings of the same value. Three phases run in
//! fixed order:
//!
//! 1. Multi-byte mapping: longest-match-first reduction of percent-encoded
//!    and overlong sequences (`%2e%2e%2f` and friends become `../`).
//! 2. ASCII case folding (unless the schema is case-sensitive).
//! 3. Whitespace folding: runs collapse to one space, one trailing space is
//!    stripped.
//!
//! Mapping precedes case folding because mapping keys contain hex letters;
//! whitespace folding runs last so mapped spaces (`%20`) participate in
//! collapsing. Applying the reduction twice yields the same bytes.

use crate::buffer::Buffer;
use crate::error::{Error, Result};

/// Maximum number of mapping table entries.
pub const MAX_MAPPINGS: usize = 256;

/// One reduction rule: an encoded spelling and its canonical form.
#[derive(Debug, Clone, Copy)]
struct Mapping {
    encoded: &'static [u8],
    canonical: &'static [u8],
}

/// Reduction table, ordered longest-encoded-form-first so a linear scan
/// implements longest-match. Hex digits in encoded forms match either case.
const MAPPINGS: &[Mapping] = &[
    // Path traversal spellings.
    Mapping { encoded: b"%2e%2e%2f", canonical: b"../" },
    Mapping { encoded: b"%2e%2e/", canonical: b"../" },
    Mapping { encoded: b"%c0%af", canonical: b"../" }, // overlong traversal
    Mapping { encoded: b"%c0%ae", canonical: b"." },   // overlong dot
    Mapping { encoded: b".%2e/", canonical: b"../" },
    // Single-character escapes.
    Mapping { encoded: b"%2f", canonical: b"/" },
    Mapping { encoded: b"%2e", canonical: b"." },
    Mapping { encoded: b"%20", canonical: b" " },
];

/// Whitespace set folded in phase 3.
fn is_foldable_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r' | b'\n' | 0x0B | 0x0C)
}

/// Whether `input[pos..]` starts with `pattern`, ignoring ASCII case.
fn matches_at(input: &[u8], pos: usize, pattern: &[u8]) -> bool {
    input.len() - pos >= pattern.len()
        && input[pos..pos + pattern.len()]
            .iter()
            .zip(pattern)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// The canonical-form reducer.
///
/// Constructed once per validator from the schema's normalization knobs and
/// read-only afterwards.
#[derive(Debug, Clone)]
pub struct Normalizer {
    mappings: &'static [Mapping],
    case_sensitive: bool,
    whitespace_fold: bool,
}

impl Normalizer {
    /// Create a normalizer with the protocol defaults: case folding and
    /// whitespace folding both on.
    pub fn new() -> Self {
        Self::with_flags(false, true)
    }

    /// Create a normalizer with explicit folding behavior.
    pub fn with_flags(case_sensitive: bool, whitespace_fold: bool) -> Self {
        Self {
            mappings: MAPPINGS,
            case_sensitive,
            whitespace_fold,
        }
    }

    /// Create a normalizer from a schema's normalization section.
    pub fn for_schema(schema: &cvp_schema::Schema) -> Self {
        Self::with_flags(schema.case_sensitive(), schema.whitespace_fold())
    }

    /// Whether ASCII case is preserved.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether whitespace runs are collapsed.
    pub fn whitespace_fold(&self) -> bool {
        self.whitespace_fold
    }

    /// Reduce raw bytes to their canonical form.
    ///
    /// Infallible: bounds are checked by [`Normalizer::normalize`], which is
    /// the pipeline entry point.
    pub fn canonicalize(&self, input: &[u8]) -> Vec<u8> {
        let mut out = self.apply_mappings(input);
        if !self.case_sensitive {
            out.make_ascii_lowercase();
        }
        if self.whitespace_fold {
            out = fold_whitespace(&out);
        }
        out
    }

    /// Normalize a buffer in place.
    ///
    /// On success the payload is replaced by its canonical bytes and the
    /// buffer is marked normalized. Fails with `NORMALIZATION_FAILED` when
    /// the reduction leaves nothing, or `BUFFER_OVERFLOW` when the canonical
    /// form exceeds the buffer's capacity bound.
    pub fn normalize(&self, buffer: &mut Buffer) -> Result<()> {
        let canonical = self.canonicalize(buffer.as_slice());
        if canonical.is_empty() {
            return Err(Error::NormalizationFailed(
                "input reduced to an empty canonical form".to_string(),
            ));
        }
        if canonical.len() > buffer.max_size() {
            return Err(Error::BufferOverflow {
                length: canonical.len(),
                max: buffer.max_size(),
            });
        }
        buffer.replace_with_canonical(canonical);
        Ok(())
    }

    /// Phase 1: longest-match-first multi-byte mapping.
    fn apply_mappings(&self, input: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(input.len());
        let mut pos = 0;
        while pos < input.len() {
            let mapped = self
                .mappings
                .iter()
                .find(|m| matches_at(input, pos, m.encoded));
            match mapped {
                Some(m) => {
                    out.extend_from_slice(m.canonical);
                    pos += m.encoded.len();
                }
                None => {
                    out.push(input[pos]);
                    pos += 1;
                }
            }
        }
        out
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Phase 3: collapse whitespace runs to one space, strip one trailing space.
fn fold_whitespace(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut in_run = false;
    for &byte in input {
        if is_foldable_whitespace(byte) {
            if !in_run {
                out.push(b' ');
                in_run = true;
            }
        } else {
            out.push(byte);
            in_run = false;
        }
    }
    if out.last() == Some(&b' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_table_is_longest_first() {
        for pair in MAPPINGS.windows(2) {
            assert!(
                pair[0].encoded.len() >= pair[1].encoded.len(),
                "table must be ordered longest-encoded-first"
            );
        }
        assert!(MAPPINGS.len() <= MAX_MAPPINGS);
    }

    #[test]
    fn test_every_mapping_is_a_reduction() {
        for m in MAPPINGS {
            assert!(m.canonical.len() <= m.encoded.len());
        }
    }

    #[test]
    fn test_traversal_equivalence_class_confluence() {
        let normalizer = Normalizer::new();
        let canonical = normalizer.canonicalize(b"../");
        for spelling in [
            b"../".as_slice(),
            b"%2e%2e%2f",
            b"%2E%2E%2F",
            b"%c0%af",
            b"%C0%AF",
            b".%2e/",
            b"%2e%2e/",
        ] {
            assert_eq!(
                normalizer.canonicalize(spelling),
                canonical,
                "spelling {:?} must reduce to ../",
                std::str::from_utf8(spelling)
            );
        }
    }

    #[test]
    fn test_single_character_escapes() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonicalize(b"a%2fb"), b"a/b");
        assert_eq!(normalizer.canonicalize(b"a%2eb"), b"a.b");
        assert_eq!(normalizer.canonicalize(b"a%20b"), b"a b");
        assert_eq!(normalizer.canonicalize(b"%c0%ae"), b".");
    }

    #[test]
    fn test_case_folding() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonicalize(b"AbC123"), b"abc123");

        let sensitive = Normalizer::with_flags(true, true);
        assert_eq!(sensitive.canonicalize(b"AbC123"), b"AbC123");
    }

    #[test]
    fn test_whitespace_folding() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonicalize(b"a \t\r\n b"), b"a b");
        assert_eq!(normalizer.canonicalize(b"a%20%20b"), b"a b");
        assert_eq!(normalizer.canonicalize(b"trailing   "), b"trailing");

        let raw = Normalizer::with_flags(false, false);
        assert_eq!(raw.canonicalize(b"a  b"), b"a  b");
    }

    #[test]
    fn test_mapped_space_participates_in_collapse() {
        // `%20` maps to a space, then folds with its neighbors.
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonicalize(b"a %20 b"), b"a b");
    }

    #[test]
    fn test_idempotence() {
        let normalizer = Normalizer::new();
        for input in [
            b"%2e%2e%2fetc%2fpasswd".as_slice(),
            b"Mixed CASE  and\tspace",
            b"{\"id\":\"12345\"}",
            b"..%2F..",
        ] {
            let once = normalizer.canonicalize(input);
            let twice = normalizer.canonicalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_normalize_buffer_updates_state() {
        let normalizer = Normalizer::new();
        let mut buffer = Buffer::from_bytes(b"%2e%2e%2fETC").unwrap();
        normalizer.normalize(&mut buffer).unwrap();
        assert!(buffer.is_normalized());
        assert_eq!(buffer.as_slice(), b"../etc");
    }

    #[test]
    fn test_whitespace_only_input_rejected() {
        let normalizer = Normalizer::new();
        let mut buffer = Buffer::from_bytes(b" \t\r\n ").unwrap();
        let result = normalizer.normalize(&mut buffer);
        assert!(matches!(result, Err(Error::NormalizationFailed(_))));
        assert!(!buffer.is_normalized());
    }

    #[test]
    fn test_percent_without_hex_passes_through() {
        let normalizer = Normalizer::new();
        assert_eq!(normalizer.canonicalize(b"100%zz"), b"100%zz");
        assert_eq!(normalizer.canonicalize(b"%"), b"%");
    }
}

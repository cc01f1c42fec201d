//! The validation orchestrator.
//!
//! `Validator` owns one normalizer, one recognizer, one compiled schema, and
//! an audit handle, and drives every message through the same fixed pipeline:
//!
//! 1. Structural bounds
//! 2. Zero-trust gate
//! 3. Canonical reduction
//! 4. Shape recognition and fingerprinting
//! 5. Schema-directed field checks
//! 6. Admission cost and governance zoning
//! 7. Commit
//!
//! The pipeline fails fast on the first non-success, and every terminating
//! path, success or failure, writes exactly one audit entry. A failed
//! audit write is itself fatal and surfaces as `AUDIT_REQUIRED`, whatever
//! the stage outcome was.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use cvp_audit::AuditLog;
use cvp_schema::{FieldDescriptor, FieldType, Schema};

use crate::automaton::Dfa;
use crate::buffer::{Buffer, SecurityLevel, MAX_BUFFER_SIZE};
use crate::cost::{CostEvaluator, ALPHA_DEFAULT, BETA_DEFAULT};
use crate::error::{Error, Result};
use crate::hash::encode_pattern_hash;
use crate::normalize::Normalizer;

/// Operation tag recorded for admitted messages.
pub const OP_BUFFER_VALIDATION: &str = "BUFFER_VALIDATION";

/// Accepted clock skew for timestamp fields: one year ahead of now.
const TIMESTAMP_SKEW_MAX: u64 = 365 * 86_400;

/// What the zero-trust gate does with a buffer that arrives unnormalized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnnormalizedInput {
    /// Normalize inline; the reduction stage runs regardless.
    #[default]
    Normalize,
    /// Reject with `ZERO_TRUST_VIOLATION`.
    Reject,
}

/// Validator behavior, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorConfig {
    /// Whether the zero-trust gate is active. Defaults to true.
    pub zero_trust: bool,
    /// Strict compliance profile: forbids disabling zero trust.
    pub strict: bool,
    /// KL weight for the admission cost.
    pub alpha: f64,
    /// Entropy-change weight for the admission cost.
    pub beta: f64,
    /// Gate policy for unnormalized buffers.
    pub unnormalized: UnnormalizedInput,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            zero_trust: true,
            strict: true,
            alpha: ALPHA_DEFAULT,
            beta: BETA_DEFAULT,
            unnormalized: UnnormalizedInput::Normalize,
        }
    }
}

/// The admission pipeline orchestrator.
///
/// Exclusively owns its inner components for its lifetime; buffers pass
/// through by mutable borrow and are never retained.
#[derive(Debug)]
pub struct Validator {
    schema: Schema,
    normalizer: Normalizer,
    dfa: Dfa,
    cost: CostEvaluator,
    config: ValidatorConfig,
    audit: Arc<AuditLog>,
    validation_count: u64,
}

impl Validator {
    /// Build a validator over a compiled schema.
    ///
    /// Fails with `NUMERICAL_INSTABILITY` when the cost weights leave the
    /// parameter simplex, and with `ZERO_TRUST_VIOLATION` when the strict
    /// profile is asked to run without the zero-trust gate.
    pub fn new(schema: Schema, config: ValidatorConfig, audit: Arc<AuditLog>) -> Result<Self> {
        let cost = CostEvaluator::new(config.alpha, config.beta)?;
        if config.strict && !config.zero_trust {
            return Err(Error::ZeroTrustViolation(
                "the strict compliance profile forbids disabling zero trust".to_string(),
            ));
        }

        let normalizer = Normalizer::for_schema(&schema);
        Ok(Self {
            schema,
            normalizer,
            dfa: Dfa::new(),
            cost,
            config,
            audit,
            validation_count: 0,
        })
    }

    /// Build a validator with the built-in secure-message schema and default
    /// configuration.
    pub fn with_defaults(audit: Arc<AuditLog>) -> Result<Self> {
        Self::new(Schema::secure_message(), ValidatorConfig::default(), audit)
    }

    /// The compiled schema this validator enforces.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Whether the zero-trust gate is active.
    pub fn is_zero_trust(&self) -> bool {
        self.config.zero_trust
    }

    /// Messages admitted by this validator so far.
    pub fn validation_count(&self) -> u64 {
        self.validation_count
    }

    /// Run the full admission pipeline over a buffer.
    ///
    /// On success the buffer is canonical, fingerprinted, costed, and marked
    /// validated. On failure the buffer keeps whatever state the completed
    /// stages produced (at most `normalized` plus a fingerprint) and the
    /// typed error identifies the stage. Either way, exactly one audit entry
    /// records the outcome.
    pub fn validate(&mut self, buffer: &mut Buffer) -> Result<()> {
        let outcome = self.run_pipeline(buffer);

        let operation = match &outcome {
            Ok(()) => OP_BUFFER_VALIDATION,
            Err(err) => err.code().as_str(),
        };
        let hash = buffer.pattern_hash();
        let audit_outcome = self
            .audit
            .log(operation, hash.as_ref().map(|h| h.as_slice()));

        // An unrecorded decision is fatal regardless of the stage outcome.
        audit_outcome?;
        outcome?;

        buffer.set_validated();
        self.validation_count += 1;
        tracing::debug!(
            count = self.validation_count,
            zone = buffer.zone().map(|z| z.as_str()),
            "message admitted"
        );
        Ok(())
    }

    fn run_pipeline(&self, buffer: &mut Buffer) -> Result<()> {
        // Stage 1: structural bounds. Length bounds hold by construction:
        // every `Buffer` constructor rejects data beyond
        // `max_size <= MAX_BUFFER_SIZE` with `BUFFER_OVERFLOW`.
        if buffer.is_empty() {
            return Err(Error::InvalidInput("empty buffer".to_string()));
        }
        debug_assert!(buffer.len() <= buffer.max_size());
        debug_assert!(buffer.max_size() <= MAX_BUFFER_SIZE);
        debug_assert!(buffer.security_level <= SecurityLevel::Critical);

        // Stage 2: zero-trust gate.
        if self.config.zero_trust
            && !buffer.is_normalized()
            && self.config.unnormalized == UnnormalizedInput::Reject
        {
            return Err(Error::ZeroTrustViolation(
                "buffer reached validation without canonical reduction".to_string(),
            ));
        }

        // Stage 3: canonical reduction (idempotent on already-canonical input).
        self.normalizer.normalize(buffer)?;

        // Stage 4: shape recognition and fingerprinting.
        let fingerprint = self.dfa.run(buffer.as_slice())?;
        buffer.set_pattern_hash(encode_pattern_hash(fingerprint));

        // Stage 5: schema-directed field checks.
        self.check_fields(buffer.as_slice())?;

        // Stage 6: admission cost.
        let (cost, zone) = self.cost.evaluate(buffer.as_slice())?;
        buffer.set_cost(cost, zone);
        if !zone.is_admissible() {
            tracing::warn!(cost, "admission cost in governance zone");
            return Err(Error::SinphaseViolation { cost });
        }

        Ok(())
    }

    fn check_fields(&self, payload: &[u8]) -> Result<()> {
        // The recognizer only accepts printable ASCII, so this cannot fail
        // for payloads that reached this stage.
        let text = std::str::from_utf8(payload).map_err(|_| {
            Error::ValidationFailed("canonical payload is not valid UTF-8".to_string())
        })?;

        for field in self.schema.fields() {
            let marker = format!("\"{}\":", field.name);
            match text.find(&marker) {
                Some(at) => {
                    let value = extract_value(&text[at + marker.len()..]);
                    check_field_value(field, value)?;
                }
                None if field.required => {
                    return Err(Error::ValidationFailed(format!(
                        "required field `{}` is missing",
                        field.name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Seconds since the Unix epoch.
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extract a field value.
///
/// The recognizer only admits quoted values, whose content runs to the
/// closing quote (it cannot contain an unescaped `"`). Bare trailing text is
/// tolerated for robustness and ends at the next `,` or `}`.
fn extract_value(rest: &str) -> &str {
    let trimmed = rest.trim_start_matches(' ');
    if let Some(inner) = trimmed.strip_prefix('"') {
        match inner.find('"') {
            Some(end) => &inner[..end],
            None => inner,
        }
    } else {
        let end = rest.find([',', '}']).unwrap_or(rest.len());
        rest[..end].trim_matches(' ')
    }
}

/// Apply type predicate, length bound, allowed values, and pattern in order.
fn check_field_value(field: &FieldDescriptor, value: &str) -> Result<()> {
    let type_ok = match field.field_type {
        FieldType::Uint64 => is_uint64(value),
        FieldType::Timestamp => is_timestamp(value),
        FieldType::Sha256Digest => is_sha256_digest(value),
        FieldType::Binary => is_base64(value),
        FieldType::String => is_plain_string(value),
    };
    if !type_ok {
        return Err(Error::ValidationFailed(format!(
            "field `{}` failed its {} check",
            field.name,
            field.field_type.as_str()
        )));
    }

    if let Some(max) = field.max_length {
        if value.len() > max {
            return Err(Error::ValidationFailed(format!(
                "field `{}` is {} bytes (max {max})",
                field.name,
                value.len()
            )));
        }
    }

    if !field.allows(value) {
        return Err(Error::ValidationFailed(format!(
            "field `{}` has a value outside its allowed set",
            field.name
        )));
    }

    if !field.pattern_matches(value) {
        return Err(Error::ValidationFailed(format!(
            "field `{}` does not match its pattern",
            field.name
        )));
    }

    Ok(())
}

/// Non-empty digit sequence, no leading zero unless exactly `0`, fits u64.
fn is_uint64(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && (value.len() == 1 || !value.starts_with('0'))
        && value.parse::<u64>().is_ok()
}

/// A `uint64` no further than one year ahead of the wall clock.
fn is_timestamp(value: &str) -> bool {
    if !is_uint64(value) {
        return false;
    }
    match value.parse::<u64>() {
        Ok(ts) => ts <= now_secs().saturating_add(TIMESTAMP_SKEW_MAX),
        Err(_) => false,
    }
}

/// Exactly 64 hexadecimal digits, either case.
fn is_sha256_digest(value: &str) -> bool {
    value.len() == 64 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Base-64 alphabet with zero to two trailing `=`.
fn is_base64(value: &str) -> bool {
    let mut padding = 0usize;
    for b in value.bytes() {
        if b == b'=' {
            padding += 1;
            continue;
        }
        if padding > 0 {
            return false; // padding only at the end
        }
        if !(b.is_ascii_alphanumeric() || b == b'+' || b == b'/') {
            return false;
        }
    }
    padding <= 2
}

/// Printable ASCII minus `"` and `\`.
fn is_plain_string(value: &str) -> bool {
    value
        .bytes()
        .all(|b| (0x20..=0x7E).contains(&b) && b != b'"' && b != b'\\')
}

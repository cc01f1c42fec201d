//! Error types for the admission pipeline.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Admission pipeline errors.
///
/// Every variant maps onto exactly one wire-level [`ResultCode`]; messages
/// carry positions and bounds but never buffer contents.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or empty input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A validation stage rejected the message.
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Canonical reduction produced no output.
    #[error("Normalization failed: {0}")]
    NormalizationFailed(String),

    /// A length bound was exceeded.
    #[error("Buffer overflow: {length} bytes (max {max})")]
    BufferOverflow {
        /// Observed length in bytes.
        length: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// A payload attempted to bypass mandatory normalization.
    #[error("Zero trust violation: {0}")]
    ZeroTrustViolation(String),

    /// Cost parameters or intermediates left the admissible range.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// The admission cost landed in the governance zone.
    #[error("Sinphase violation: cost {cost} exceeds the governance threshold")]
    SinphaseViolation {
        /// The computed admission cost.
        cost: f64,
    },

    /// The recognizer entered its absorbing reject state.
    #[error("DFA transition failed at offset {offset} (state {state})")]
    DfaTransitionFailed {
        /// State index the recognizer was in.
        state: usize,
        /// Byte offset of the rejected input.
        offset: usize,
    },

    /// The message does not fit the declared schema.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Schema loading or compilation failed.
    #[error("Schema error: {0}")]
    Schema(#[from] cvp_schema::SchemaError),

    /// The audit trail could not record the decision.
    #[error("Audit error: {0}")]
    Audit(#[from] cvp_audit::AuditError),
}

impl Error {
    /// The wire-level result code for this error.
    pub fn code(&self) -> ResultCode {
        match self {
            Error::InvalidInput(_) => ResultCode::InvalidInput,
            Error::ValidationFailed(_) => ResultCode::ValidationFailed,
            Error::NormalizationFailed(_) => ResultCode::NormalizationFailed,
            Error::BufferOverflow { .. } => ResultCode::BufferOverflow,
            Error::ZeroTrustViolation(_) => ResultCode::ZeroTrustViolation,
            Error::NumericalInstability(_) => ResultCode::NumericalInstability,
            Error::SinphaseViolation { .. } => ResultCode::SinphaseViolation,
            Error::DfaTransitionFailed { .. } => ResultCode::DfaTransitionFailed,
            Error::SchemaMismatch(_) | Error::Schema(_) => ResultCode::SchemaMismatch,
            // Integrity failures in an existing trail are validation failures;
            // everything else means the trail itself is unavailable.
            Error::Audit(cvp_audit::AuditError::Integrity { .. }) => ResultCode::ValidationFailed,
            Error::Audit(_) => ResultCode::AuditRequired,
        }
    }
}

/// Closed wire-level result taxonomy.
///
/// These tags are stable across language adapters; textual form is the
/// interchange format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResultCode {
    /// Operation completed.
    Success = 0,
    /// Malformed or empty input.
    InvalidInput = 1,
    /// A validation stage rejected the message.
    ValidationFailed = 2,
    /// The audit trail could not record the decision.
    AuditRequired = 3,
    /// A payload attempted to bypass mandatory normalization.
    ZeroTrustViolation = 4,
    /// A length bound was exceeded.
    BufferOverflow = 5,
    /// Cost parameters or intermediates left the admissible range.
    NumericalInstability = 6,
    /// The admission cost landed in the governance zone.
    SinphaseViolation = 7,
    /// Canonical reduction produced no output.
    NormalizationFailed = 8,
    /// The recognizer entered its absorbing reject state.
    DfaTransitionFailed = 9,
    /// The message does not fit the declared schema.
    SchemaMismatch = 10,
}

impl ResultCode {
    /// Stable textual tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Success => "SUCCESS",
            ResultCode::InvalidInput => "INVALID_INPUT",
            ResultCode::ValidationFailed => "VALIDATION_FAILED",
            ResultCode::AuditRequired => "AUDIT_REQUIRED",
            ResultCode::ZeroTrustViolation => "ZERO_TRUST_VIOLATION",
            ResultCode::BufferOverflow => "BUFFER_OVERFLOW",
            ResultCode::NumericalInstability => "NUMERICAL_INSTABILITY",
            ResultCode::SinphaseViolation => "SINPHASE_VIOLATION",
            ResultCode::NormalizationFailed => "NORMALIZATION_FAILED",
            ResultCode::DfaTransitionFailed => "DFA_TRANSITION_FAILED",
            ResultCode::SchemaMismatch => "SCHEMA_MISMATCH",
        }
    }

    /// Convert from the numeric wire form.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::InvalidInput),
            2 => Some(Self::ValidationFailed),
            3 => Some(Self::AuditRequired),
            4 => Some(Self::ZeroTrustViolation),
            5 => Some(Self::BufferOverflow),
            6 => Some(Self::NumericalInstability),
            7 => Some(Self::SinphaseViolation),
            8 => Some(Self::NormalizationFailed),
            9 => Some(Self::DfaTransitionFailed),
            10 => Some(Self::SchemaMismatch),
            _ => None,
        }
    }

    /// Convert from the textual wire form.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "SUCCESS" => Some(Self::Success),
            "INVALID_INPUT" => Some(Self::InvalidInput),
            "VALIDATION_FAILED" => Some(Self::ValidationFailed),
            "AUDIT_REQUIRED" => Some(Self::AuditRequired),
            "ZERO_TRUST_VIOLATION" => Some(Self::ZeroTrustViolation),
            "BUFFER_OVERFLOW" => Some(Self::BufferOverflow),
            "NUMERICAL_INSTABILITY" => Some(Self::NumericalInstability),
            "SINPHASE_VIOLATION" => Some(Self::SinphaseViolation),
            "NORMALIZATION_FAILED" => Some(Self::NormalizationFailed),
            "DFA_TRANSITION_FAILED" => Some(Self::DfaTransitionFailed),
            "SCHEMA_MISMATCH" => Some(Self::SchemaMismatch),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_tags_roundtrip() {
        for value in 0..=10u8 {
            let code = ResultCode::from_u8(value).unwrap();
            assert_eq!(ResultCode::parse(code.as_str()), Some(code));
            assert_eq!(code as u8, value);
        }
        assert_eq!(ResultCode::from_u8(11), None);
        assert_eq!(ResultCode::parse("WHATEVER"), None);
    }

    #[test]
    fn test_error_to_code_mapping() {
        assert_eq!(
            Error::BufferOverflow { length: 9000, max: 8192 }.code(),
            ResultCode::BufferOverflow
        );
        assert_eq!(
            Error::SinphaseViolation { cost: 0.7 }.code(),
            ResultCode::SinphaseViolation
        );
        assert_eq!(
            Error::DfaTransitionFailed { state: 0, offset: 3 }.code(),
            ResultCode::DfaTransitionFailed
        );
    }

    #[test]
    fn test_audit_integrity_maps_to_validation_failed() {
        let err = Error::Audit(cvp_audit::AuditError::Integrity {
            entries: 3,
            failures: 1,
            first: 2,
        });
        assert_eq!(err.code(), ResultCode::ValidationFailed);

        let err = Error::Audit(cvp_audit::AuditError::NotInitialized);
        assert_eq!(err.code(), ResultCode::AuditRequired);
    }
}

//! Field descriptors: name, type, length bound, and match predicates.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};

/// Maximum number of fields a schema may declare.
pub const MAX_SCHEMA_FIELDS: usize = 64;

/// Maximum field name length in bytes.
pub const MAX_FIELD_NAME_LEN: usize = 128;

/// Field value types.
///
/// The type drives the first-stage predicate applied to an extracted field
/// value; length bounds and patterns apply afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Decimal digit sequence fitting in 64 bits, no leading zero.
    Uint64,
    /// A `uint64` bounded by wall clock plus one year of skew.
    Timestamp,
    /// Base-64 alphabet with up to two trailing `=`.
    Binary,
    /// Exactly 64 hexadecimal digits.
    Sha256Digest,
    /// Printable ASCII minus `"` and `\`.
    String,
}

impl FieldType {
    /// Stable lower-case tag, matching the YAML `type` key.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Uint64 => "uint64",
            FieldType::Timestamp => "timestamp",
            FieldType::Binary => "binary",
            FieldType::Sha256Digest => "sha256_digest",
            FieldType::String => "string",
        }
    }
}

/// A single compiled field descriptor.
///
/// Descriptors are built once at schema load; the pattern, when present, is
/// already compiled and only a match predicate is exposed.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    /// Field name as it appears in the canonical payload.
    pub name: String,
    /// Value type.
    pub field_type: FieldType,
    /// Whether a message missing this field is rejected.
    pub required: bool,
    /// Maximum value length in bytes, if bounded.
    pub max_length: Option<usize>,
    pattern: Option<Regex>,
    allowed_values: Option<Vec<String>>,
}

impl FieldDescriptor {
    /// Build a descriptor, compiling the validation pattern if one is given.
    pub fn new(
        name: impl Into<String>,
        field_type: FieldType,
        required: bool,
        max_length: Option<usize>,
        pattern: Option<&str>,
        allowed_values: Option<Vec<String>>,
    ) -> Result<Self> {
        let name = name.into();
        if name.len() > MAX_FIELD_NAME_LEN {
            return Err(SchemaError::FieldNameTooLong {
                len: name.len(),
                max: MAX_FIELD_NAME_LEN,
                name,
            });
        }

        let pattern = match pattern {
            Some(src) => Some(Regex::new(src).map_err(|err| SchemaError::BadPattern {
                field: name.clone(),
                detail: err.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            name,
            field_type,
            required,
            max_length,
            pattern,
            allowed_values,
        })
    }

    /// Whether the value matches this field's pattern.
    ///
    /// A descriptor without a pattern matches everything.
    pub fn pattern_matches(&self, value: &str) -> bool {
        match &self.pattern {
            Some(re) => re.is_match(value),
            None => true,
        }
    }

    /// Whether the value is admitted by the `allowed_values` list.
    ///
    /// Membership is ASCII-case-insensitive so that declared values compose
    /// with canonical case folding. A descriptor without a list admits
    /// everything.
    pub fn allows(&self, value: &str) -> bool {
        match &self.allowed_values {
            Some(values) => values.iter().any(|v| v.eq_ignore_ascii_case(value)),
            None => true,
        }
    }

    /// Whether this descriptor carries a compiled pattern.
    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }
}

//! Error types for schema loading and compilation.

use thiserror::Error;

/// Result type alias for schema operations.
pub type Result<T> = core::result::Result<T, SchemaError>;

/// Schema loading and compilation errors.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The YAML document could not be parsed.
    #[error("Schema parse failed: {0}")]
    Parse(String),

    /// The schema file could not be read.
    #[error("Schema I/O error: {0}")]
    Io(String),

    /// The document declares no fields.
    #[error("Schema declares no fields")]
    Empty,

    /// The document declares more fields than the protocol allows.
    #[error("Schema declares {count} fields (max {max})")]
    TooManyFields {
        /// Number of fields declared.
        count: usize,
        /// Maximum number of fields permitted.
        max: usize,
    },

    /// Two fields share the same name.
    #[error("Duplicate field name: {0}")]
    DuplicateField(String),

    /// A field name exceeds the length bound.
    #[error("Field name `{name}` is {len} bytes (max {max})")]
    FieldNameTooLong {
        /// The offending field name.
        name: String,
        /// Its length in bytes.
        len: usize,
        /// Maximum name length permitted.
        max: usize,
    },

    /// A field validation pattern failed to compile.
    #[error("Pattern for field `{field}` failed to compile: {detail}")]
    BadPattern {
        /// The field whose pattern is invalid.
        field: String,
        /// Compiler diagnostic.
        detail: String,
    },

    /// The document requests an encoding this engine does not provide.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),
}

impl From<std::io::Error> for SchemaError {
    fn from(err: std::io::Error) -> Self {
        SchemaError::Io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SchemaError {
    fn from(err: serde_yaml::Error) -> Self {
        SchemaError::Parse(err.to_string())
    }
}

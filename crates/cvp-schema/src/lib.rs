//! Schema handling for the CVP canonical validation protocol.
//!
//! A schema is an ordered list of field descriptors loaded from a YAML
//! document. This crate covers:
//! - The raw YAML document model (`SchemaDocument`)
//! - Compilation into a validated `Schema` with pre-compiled field patterns
//! - The built-in secure-message schema used when no document is supplied
//!
//! Field patterns are compiled exactly once, at schema load time; only a
//! match predicate is exposed to the validation engine.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod field;

pub use document::{SchemaDocument, Schema};
pub use error::{Result, SchemaError};
pub use field::{FieldDescriptor, FieldType, MAX_FIELD_NAME_LEN, MAX_SCHEMA_FIELDS};

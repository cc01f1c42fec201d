//! YAML schema documents and their compiled form.
//!
//! A `SchemaDocument` is the raw serde image of the schema file. Compiling it
//! checks the protocol bounds (field count, name uniqueness and length),
//! compiles every validation pattern, and yields a read-only `Schema` that
//! the validation engine can share for its lifetime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::field::{FieldDescriptor, FieldType, MAX_SCHEMA_FIELDS};

/// The only payload encoding this engine produces.
pub const ENCODING_UTF8_CANONICAL: &str = "utf8_canonical";

/// Raw YAML schema document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDocument {
    /// Message type this schema describes.
    pub message_type: String,
    /// Schema version string.
    pub version: String,
    /// Compliance tag carried into audit entries.
    #[serde(default = "default_compliance")]
    pub compliance: String,
    /// Ordered field declarations.
    pub fields: Vec<FieldSpec>,
    /// Normalization knobs.
    #[serde(default)]
    pub normalization: NormalizationSpec,
    /// Audit requirements.
    #[serde(default)]
    pub audit: AuditSpec,
}

/// One field declaration in the YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, unique within the document.
    pub name: String,
    /// Value type.
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be present. Defaults to true.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Maximum value length in bytes.
    #[serde(default)]
    pub max_length: Option<usize>,
    /// Regular expression applied after the type check.
    #[serde(default)]
    pub validation: Option<String>,
    /// Closed set of admissible values.
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
}

/// Normalization section of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationSpec {
    /// When false (the default), ASCII case is folded to lower case.
    #[serde(default)]
    pub case_sensitivity: bool,
    /// Payload encoding; only `utf8_canonical` is supported.
    #[serde(default = "default_encoding")]
    pub encoding: String,
    /// Whitespace handling; `normalized` collapses runs to one space.
    #[serde(default = "default_whitespace")]
    pub whitespace: String,
}

impl Default for NormalizationSpec {
    fn default() -> Self {
        Self {
            case_sensitivity: false,
            encoding: default_encoding(),
            whitespace: default_whitespace(),
        }
    }
}

/// Audit section of the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSpec {
    /// Whether every admission decision must be logged.
    #[serde(default = "default_true")]
    pub required: bool,
    /// Hash algorithm tag, informational.
    #[serde(default = "default_hash_algorithm")]
    pub hash_algorithm: String,
    /// Fields to surface in audit context, informational.
    #[serde(default)]
    pub include_fields: Vec<String>,
}

impl Default for AuditSpec {
    fn default() -> Self {
        Self {
            required: true,
            hash_algorithm: default_hash_algorithm(),
            include_fields: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_compliance() -> String {
    "NASA-STD-8739.8".to_string()
}

fn default_encoding() -> String {
    ENCODING_UTF8_CANONICAL.to_string()
}

fn default_whitespace() -> String {
    "normalized".to_string()
}

fn default_hash_algorithm() -> String {
    "xxhash32".to_string()
}

impl SchemaDocument {
    /// Parse a document from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Read and parse a document from a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Compile the document into a validated, read-only schema.
    pub fn compile(&self) -> Result<Schema> {
        if self.fields.is_empty() {
            return Err(SchemaError::Empty);
        }
        if self.fields.len() > MAX_SCHEMA_FIELDS {
            return Err(SchemaError::TooManyFields {
                count: self.fields.len(),
                max: MAX_SCHEMA_FIELDS,
            });
        }
        if self.normalization.encoding != ENCODING_UTF8_CANONICAL {
            return Err(SchemaError::UnsupportedEncoding(
                self.normalization.encoding.clone(),
            ));
        }

        let mut fields = Vec::with_capacity(self.fields.len());
        for spec in &self.fields {
            if fields
                .iter()
                .any(|f: &FieldDescriptor| f.name == spec.name)
            {
                return Err(SchemaError::DuplicateField(spec.name.clone()));
            }
            fields.push(FieldDescriptor::new(
                spec.name.clone(),
                spec.field_type,
                spec.required,
                spec.max_length,
                spec.validation.as_deref(),
                spec.allowed_values.clone(),
            )?);
        }

        Ok(Schema {
            message_type: self.message_type.clone(),
            version: self.version.clone(),
            compliance: self.compliance.clone(),
            fields,
            case_sensitive: self.normalization.case_sensitivity,
            whitespace_fold: self.normalization.whitespace == "normalized",
            audit_required: self.audit.required,
        })
    }
}

/// A compiled, read-only schema.
#[derive(Debug, Clone)]
pub struct Schema {
    message_type: String,
    version: String,
    compliance: String,
    fields: Vec<FieldDescriptor>,
    case_sensitive: bool,
    whitespace_fold: bool,
    audit_required: bool,
}

impl Schema {
    /// Message type this schema describes.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Schema version string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Compliance tag carried into audit entries.
    pub fn compliance(&self) -> &str {
        &self.compliance
    }

    /// Ordered field descriptors.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Whether normalization preserves ASCII case.
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Whether normalization collapses whitespace runs.
    pub fn whitespace_fold(&self) -> bool {
        self.whitespace_fold
    }

    /// Whether every admission decision must be logged.
    pub fn audit_required(&self) -> bool {
        self.audit_required
    }

    /// The built-in secure-message schema.
    ///
    /// Used whenever no schema document is supplied; field set and patterns
    /// match the shipped `secure_message.yaml`.
    pub fn secure_message() -> Self {
        let doc = SchemaDocument {
            message_type: "secure_message".to_string(),
            version: "1.0".to_string(),
            compliance: default_compliance(),
            fields: vec![
                FieldSpec {
                    name: "id".to_string(),
                    field_type: FieldType::Uint64,
                    required: true,
                    max_length: None,
                    validation: Some("^[1-9][0-9]*$".to_string()),
                    allowed_values: None,
                },
                FieldSpec {
                    name: "timestamp".to_string(),
                    field_type: FieldType::Timestamp,
                    required: true,
                    max_length: None,
                    validation: Some("^[0-9]+$".to_string()),
                    allowed_values: None,
                },
                FieldSpec {
                    name: "payload".to_string(),
                    field_type: FieldType::Binary,
                    required: true,
                    max_length: Some(4096),
                    validation: Some("^[A-Za-z0-9+/]*={0,2}$".to_string()),
                    allowed_values: None,
                },
                FieldSpec {
                    name: "signature".to_string(),
                    field_type: FieldType::Sha256Digest,
                    required: true,
                    max_length: Some(64),
                    validation: Some("^[a-fA-F0-9]{64}$".to_string()),
                    allowed_values: None,
                },
                FieldSpec {
                    name: "message_type".to_string(),
                    field_type: FieldType::String,
                    required: true,
                    max_length: Some(32),
                    validation: None,
                    allowed_values: Some(vec![
                        "DATA".to_string(),
                        "CONTROL".to_string(),
                        "AUDIT".to_string(),
                    ]),
                },
                FieldSpec {
                    name: "source_id".to_string(),
                    field_type: FieldType::String,
                    required: true,
                    max_length: Some(256),
                    validation: Some("^[A-Za-z0-9_-]+$".to_string()),
                    allowed_values: None,
                },
            ],
            normalization: NormalizationSpec::default(),
            audit: AuditSpec::default(),
        };

        doc.compile().expect("built-in schema is well-formed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
message_type: telemetry
version: "2.1"
fields:
  - name: id
    type: uint64
    validation: "^[1-9][0-9]*$"
  - name: payload
    type: binary
    required: false
    max_length: 1024
"#;

    #[test]
    fn test_minimal_document_parses() {
        let doc = SchemaDocument::from_yaml(MINIMAL_YAML).unwrap();
        assert_eq!(doc.message_type, "telemetry");
        assert_eq!(doc.fields.len(), 2);
        assert!(doc.fields[0].required); // defaulted
        assert!(!doc.fields[1].required);
        assert!(!doc.normalization.case_sensitivity);
        assert!(doc.audit.required);
    }

    #[test]
    fn test_compile_minimal_document() {
        let schema = SchemaDocument::from_yaml(MINIMAL_YAML)
            .unwrap()
            .compile()
            .unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert!(schema.whitespace_fold());
        assert!(!schema.case_sensitive());
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let yaml = r#"
message_type: t
version: "1"
fields:
  - { name: id, type: uint64 }
  - { name: id, type: string }
"#;
        let result = SchemaDocument::from_yaml(yaml).unwrap().compile();
        assert!(matches!(result, Err(SchemaError::DuplicateField(name)) if name == "id"));
    }

    #[test]
    fn test_empty_fields_rejected() {
        let yaml = "message_type: t\nversion: \"1\"\nfields: []\n";
        let result = SchemaDocument::from_yaml(yaml).unwrap().compile();
        assert!(matches!(result, Err(SchemaError::Empty)));
    }

    #[test]
    fn test_field_count_bound() {
        let mut doc = SchemaDocument::from_yaml(MINIMAL_YAML).unwrap();
        doc.fields = (0..MAX_SCHEMA_FIELDS + 1)
            .map(|i| FieldSpec {
                name: format!("field_{i}"),
                field_type: FieldType::String,
                required: false,
                max_length: None,
                validation: None,
                allowed_values: None,
            })
            .collect();
        assert!(matches!(
            doc.compile(),
            Err(SchemaError::TooManyFields { count, .. }) if count == MAX_SCHEMA_FIELDS + 1
        ));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let yaml = r#"
message_type: t
version: "1"
fields:
  - { name: id, type: uint64 }
normalization:
  encoding: latin1
"#;
        let result = SchemaDocument::from_yaml(yaml).unwrap().compile();
        assert!(matches!(result, Err(SchemaError::UnsupportedEncoding(_))));
    }

    #[test]
    fn test_secure_message_schema() {
        let schema = Schema::secure_message();
        assert_eq!(schema.message_type(), "secure_message");
        assert_eq!(schema.fields().len(), 6);
        assert_eq!(schema.compliance(), "NASA-STD-8739.8");

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["id", "timestamp", "payload", "signature", "message_type", "source_id"]
        );
    }

    #[test]
    fn test_bad_pattern_surfaces_field_name() {
        let yaml = r#"
message_type: t
version: "1"
fields:
  - { name: broken, type: string, validation: "([" }
"#;
        let result = SchemaDocument::from_yaml(yaml).unwrap().compile();
        assert!(matches!(result, Err(SchemaError::BadPattern { field, .. }) if field == "broken"));
    }
}

//! Validation error taxonomy
//!
//! Every constraint the validator checks maps to exactly one variant, so
//! callers can match on the failure kind and decide whether to log, reject
//! or retry.

use serde::Serialize;
use thiserror::Error;

/// A single violated envelope constraint
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    #[error("Envelope must be a JSON object, got {actual}")]
    NotAnObject { actual: String },

    #[error("Missing required field '{field}'")]
    MissingRequiredField { field: String },

    #[error("Field '{field}' has invalid type: expected {expected}, got {actual}")]
    InvalidFieldType {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Field '{field}' has invalid value {actual}: expected one of {expected}")]
    InvalidEnumValue {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("Unknown field '{field}' is not allowed in strict mode")]
    UnknownField { field: String },
}

impl ValidationError {
    /// Name of the field the violation refers to, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::MissingRequiredField { field }
            | Self::InvalidFieldType { field, .. }
            | Self::InvalidEnumValue { field, .. }
            | Self::UnknownField { field } => Some(field),
        }
    }
}

/// Outcome of a single validation pass
pub type ValidationResult = Result<(), ValidationError>;

/// Errors that can occur converting raw JSON into a typed envelope
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("Invalid envelope: {0}")]
    Invalid(#[from] ValidationError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_accessor() {
        let err = ValidationError::MissingRequiredField {
            field: "cmd".into(),
        };
        assert_eq!(err.field(), Some("cmd"));

        let err = ValidationError::NotAnObject {
            actual: "array".into(),
        };
        assert_eq!(err.field(), None);
    }

    #[test]
    fn test_display_names_field_and_types() {
        let err = ValidationError::InvalidFieldType {
            field: "retry".into(),
            expected: "integer".into(),
            actual: "string".into(),
        };
        assert_eq!(
            err.to_string(),
            "Field 'retry' has invalid type: expected integer, got string"
        );
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let err = ValidationError::UnknownField {
            field: "version".into(),
        };
        let value = serde_json::to_value(&err).expect("serialize failed");
        assert_eq!(value["kind"], "unknown_field");
        assert_eq!(value["field"], "version");
    }
}

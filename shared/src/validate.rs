//! Response envelope validator
//!
//! Checks run in a fixed order: `cmd`, `result`, `msg`, `retry`, `data`,
//! then unknown fields when strict mode is on. [`Validator::validate`]
//! stops at the first violation, [`Validator::validate_all`] collects every
//! violation in the same order.

use serde_json::{Map, Value};

use crate::error::{ValidationError, ValidationResult};
use crate::schema::{self, FieldRule, FIELDS};

/// How fields outside the envelope contract are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdditionalFields {
    /// Extra fields are ignored
    #[default]
    Allow,
    /// Extra fields are reported as [`ValidationError::UnknownField`]
    Reject,
}

/// Validator configuration
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatorConfig {
    pub additional_fields: AdditionalFields,
}

impl ValidatorConfig {
    /// Configuration that rejects unknown fields
    pub fn strict() -> Self {
        Self {
            additional_fields: AdditionalFields::Reject,
        }
    }
}

/// Stateless envelope validator
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with the given configuration
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Create a validator that rejects unknown fields
    pub fn strict() -> Self {
        Self::new(ValidatorConfig::strict())
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a candidate, returning the first violated constraint
    pub fn validate(&self, candidate: &Value) -> ValidationResult {
        let mut first = None;
        self.walk(candidate, |err| {
            first = Some(err);
            false
        });
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Validate a candidate, returning every violated constraint
    ///
    /// An empty list means the candidate conforms.
    pub fn validate_all(&self, candidate: &Value) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        self.walk(candidate, |err| {
            errors.push(err);
            true
        });
        errors
    }

    /// Visit violations in check order; `report` returns false to stop
    fn walk(&self, candidate: &Value, mut report: impl FnMut(ValidationError) -> bool) {
        let Some(fields) = candidate.as_object() else {
            report(ValidationError::NotAnObject {
                actual: schema::describe(candidate),
            });
            return;
        };

        for rule in FIELDS {
            if let Err(err) = check_field(rule, fields) {
                if !report(err) {
                    return;
                }
            }
        }

        if self.config.additional_fields == AdditionalFields::Reject {
            for name in fields.keys().filter(|name| schema::rule(name).is_none()) {
                if !report(ValidationError::UnknownField {
                    field: name.clone(),
                }) {
                    return;
                }
            }
        }
    }
}

fn check_field(rule: &FieldRule, fields: &Map<String, Value>) -> ValidationResult {
    let Some(value) = fields.get(rule.name) else {
        if rule.required {
            return Err(ValidationError::MissingRequiredField {
                field: rule.name.into(),
            });
        }
        return Ok(());
    };

    if !rule.kinds.iter().any(|kind| kind.matches(value)) {
        return Err(ValidationError::InvalidFieldType {
            field: rule.name.into(),
            expected: rule.expected(),
            actual: schema::describe(value),
        });
    }

    if let Some(allowed) = rule.allowed {
        let text = value.as_str().unwrap_or_default();
        if !allowed.contains(&text) {
            return Err(ValidationError::InvalidEnumValue {
                field: rule.name.into(),
                expected: allowed.join(", "),
                actual: value.to_string(),
            });
        }
    }

    Ok(())
}

/// Validate with the default (permissive) configuration
pub fn validate(candidate: &Value) -> ValidationResult {
    Validator::default().validate(candidate)
}

/// Collect every violation with the default (permissive) configuration
pub fn validate_all(candidate: &Value) -> Vec<ValidationError> {
    Validator::default().validate_all(candidate)
}

//! Response envelope schema
//!
//! The contract is kept in two forms: the JSON Schema document handed to
//! external consumers, and a constant rule table the validator walks. Tests
//! keep the two in agreement.

use serde_json::Value;

/// JSON Schema (draft-07) for a command response envelope
pub const RESPONSE_SCHEMA: &str = r#"{
  "$schema": "http://json-schema.org/draft-07/schema#",
  "title": "Response",
  "description": "Result reported by a device command interface",
  "type": "object",
  "properties": {
    "cmd": {
      "description": "The command name(s) that produced this response",
      "anyOf": [
        { "type": "string" },
        { "type": "array", "items": { "type": "string" } }
      ]
    },
    "msg": {
      "description": "Non-actionable informational text",
      "type": "string"
    },
    "retry": {
      "description": "Count of retries attempted for the command",
      "type": "integer"
    },
    "data": {
      "description": "The payload requested by the command",
      "type": ["string", "integer", "array", "object"]
    },
    "result": {
      "description": "Outcome status of the command",
      "type": "string",
      "enum": ["Success", "Error", "Timeout"]
    }
  },
  "required": ["cmd", "result"]
}"#;

/// Allowed literals for the `result` field
pub const RESULT_VALUES: &[&str] = &["Success", "Error", "Timeout"];

/// Shape a JSON value may take for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Integer,
    Array,
    /// Array whose every element is a string
    StringArray,
    Object,
}

impl Kind {
    /// Check whether a value has this shape
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Integer => value.as_i64().is_some(),
            Kind::Array => value.is_array(),
            Kind::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Kind::Object => value.is_object(),
        }
    }

    /// Human-readable name used in error messages
    pub fn name(self) -> &'static str {
        match self {
            Kind::String => "string",
            Kind::Integer => "integer",
            Kind::Array => "array",
            Kind::StringArray => "array of strings",
            Kind::Object => "object",
        }
    }
}

/// Validation rule for one envelope field
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    /// Permitted shapes; a value must match at least one
    pub kinds: &'static [Kind],
    /// Closed set of allowed string values, if the field is enumerated
    pub allowed: Option<&'static [&'static str]>,
}

impl FieldRule {
    /// Describe the permitted shapes, e.g. `string or array of strings`
    pub fn expected(&self) -> String {
        self.kinds
            .iter()
            .map(|k| k.name())
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// Field rules in the order they are checked
pub const FIELDS: &[FieldRule] = &[
    FieldRule {
        name: "cmd",
        required: true,
        kinds: &[Kind::String, Kind::StringArray],
        allowed: None,
    },
    FieldRule {
        name: "result",
        required: true,
        kinds: &[Kind::String],
        allowed: Some(RESULT_VALUES),
    },
    FieldRule {
        name: "msg",
        required: false,
        kinds: &[Kind::String],
        allowed: None,
    },
    FieldRule {
        name: "retry",
        required: false,
        kinds: &[Kind::Integer],
        allowed: None,
    },
    FieldRule {
        name: "data",
        required: false,
        kinds: &[Kind::String, Kind::Integer, Kind::Array, Kind::Object],
        allowed: None,
    },
];

/// Look up the rule for a field name
pub fn rule(name: &str) -> Option<&'static FieldRule> {
    FIELDS.iter().find(|r| r.name == name)
}

/// Parse [`RESPONSE_SCHEMA`] into a JSON value
pub fn response_schema() -> Value {
    serde_json::from_str(RESPONSE_SCHEMA).unwrap_or(Value::Null)
}

/// Describe the JSON type of a value for error messages
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(_) => "boolean".into(),
        Value::Number(n) if n.is_i64() => "integer".into(),
        Value::Number(n) if n.is_u64() => "integer out of range".into(),
        Value::Number(_) => "number".into(),
        Value::String(_) => "string".into(),
        Value::Array(items) => match items.iter().find(|v| !v.is_string()) {
            Some(item) => format!("array containing {}", describe(item)),
            None => "array".into(),
        },
        Value::Object(_) => "object".into(),
    }
}

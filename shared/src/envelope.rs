//! Typed command response envelope
//!
//! A [`ResponseEnvelope`] is the terminal record of one command round-trip.
//! Fields are private and only set while building, so a constructed
//! envelope never changes. Deserialization always goes through the
//! validator.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EnvelopeError;
use crate::validate::Validator;

/// Command name(s) that produced a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cmd {
    Single(String),
    Sequence(Vec<String>),
}

impl Cmd {
    /// All command names in order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Cmd::Single(name) => vec![name.as_str()],
            Cmd::Sequence(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Cmd {
    fn from(name: &str) -> Self {
        Cmd::Single(name.into())
    }
}

impl From<String> for Cmd {
    fn from(name: String) -> Self {
        Cmd::Single(name)
    }
}

impl From<Vec<String>> for Cmd {
    fn from(names: Vec<String>) -> Self {
        Cmd::Sequence(names)
    }
}

impl From<&[&str]> for Cmd {
    fn from(names: &[&str]) -> Self {
        Cmd::Sequence(names.iter().map(|n| (*n).to_owned()).collect())
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(", "))
    }
}

/// Payload returned by a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Data {
    Text(String),
    Integer(i64),
    Sequence(Vec<Value>),
    Mapping(Map<String, Value>),
}

impl Data {
    /// Discriminate a JSON value into a payload shape
    ///
    /// Returns `None` for shapes a payload cannot take (null, booleans,
    /// floats and integers outside `i64`).
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Data::Text(s)),
            Value::Number(n) => n.as_i64().map(Data::Integer),
            Value::Array(items) => Some(Data::Sequence(items)),
            Value::Object(map) => Some(Data::Mapping(map)),
            Value::Null | Value::Bool(_) => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Data::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Data::Text(s) => Value::String(s),
            Data::Integer(n) => Value::from(n),
            Data::Sequence(items) => Value::Array(items),
            Data::Mapping(map) => Value::Object(map),
        }
    }
}

impl From<i64> for Data {
    fn from(n: i64) -> Self {
        Data::Integer(n)
    }
}

impl From<&str> for Data {
    fn from(s: &str) -> Self {
        Data::Text(s.into())
    }
}

impl From<String> for Data {
    fn from(s: String) -> Self {
        Data::Text(s)
    }
}

impl From<Vec<Value>> for Data {
    fn from(items: Vec<Value>) -> Self {
        Data::Sequence(items)
    }
}

impl From<Map<String, Value>> for Data {
    fn from(map: Map<String, Value>) -> Self {
        Data::Mapping(map)
    }
}

/// Outcome status of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultStatus {
    Success,
    Error,
    Timeout,
}

impl ResultStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultStatus::Success => "Success",
            ResultStatus::Error => "Error",
            ResultStatus::Timeout => "Timeout",
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result object reported after a command completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct ResponseEnvelope {
    cmd: Cmd,
    #[serde(skip_serializing_if = "Option::is_none")]
    msg: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Data>,
    result: ResultStatus,
    /// Fields outside the envelope contract, kept as received
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Field-for-field mirror used after validation has passed
#[derive(Deserialize)]
struct RawEnvelope {
    cmd: Cmd,
    msg: Option<String>,
    retry: Option<i64>,
    data: Option<Data>,
    result: ResultStatus,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Create an envelope with the required fields
    pub fn new(cmd: impl Into<Cmd>, result: ResultStatus) -> Self {
        Self {
            cmd: cmd.into(),
            msg: None,
            retry: None,
            data: None,
            result,
            extra: Map::new(),
        }
    }

    /// Create a successful envelope carrying a payload
    pub fn success(cmd: impl Into<Cmd>, data: impl Into<Data>) -> Self {
        Self::new(cmd, ResultStatus::Success).with_data(data)
    }

    /// Create an error envelope with an explanatory message
    pub fn error(cmd: impl Into<Cmd>, msg: impl Into<String>) -> Self {
        Self::new(cmd, ResultStatus::Error).with_msg(msg)
    }

    /// Create a timeout envelope after the given number of retries
    pub fn timeout(cmd: impl Into<Cmd>, retry: i64) -> Self {
        Self::new(cmd, ResultStatus::Timeout).with_retry(retry)
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn with_retry(mut self, retry: i64) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_data(mut self, data: impl Into<Data>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Validate a JSON value and convert it into a typed envelope
    pub fn from_value(value: Value, validator: &Validator) -> Result<Self, EnvelopeError> {
        validator.validate(&value)?;
        let raw: RawEnvelope = serde_json::from_value(value)?;
        Ok(Self {
            cmd: raw.cmd,
            msg: raw.msg,
            retry: raw.retry,
            data: raw.data,
            result: raw.result,
            extra: raw.extra,
        })
    }

    /// Parse and validate an envelope from JSON text
    pub fn from_json_str(text: &str) -> Result<Self, EnvelopeError> {
        let value: Value = serde_json::from_str(text)?;
        Self::try_from(value)
    }

    pub fn cmd(&self) -> &Cmd {
        &self.cmd
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    pub fn retry(&self) -> Option<i64> {
        self.retry
    }

    pub fn data(&self) -> Option<&Data> {
        self.data.as_ref()
    }

    pub fn result(&self) -> ResultStatus {
        self.result
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }

    pub fn is_success(&self) -> bool {
        self.result == ResultStatus::Success
    }

    /// Convert into the JSON wire form
    pub fn to_value(&self) -> Result<Value, EnvelopeError> {
        Ok(serde_json::to_value(self)?)
    }
}

impl TryFrom<Value> for ResponseEnvelope {
    type Error = EnvelopeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value, &Validator::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use serde_json::json;

    #[test]
    fn test_builder_sets_fields() {
        let env = ResponseEnvelope::new("read_reg", ResultStatus::Success)
            .with_data(42_i64)
            .with_retry(1)
            .with_msg("ok");
        assert_eq!(env.cmd(), &Cmd::Single("read_reg".into()));
        assert_eq!(env.data().and_then(Data::as_integer), Some(42));
        assert_eq!(env.retry(), Some(1));
        assert_eq!(env.msg(), Some("ok"));
        assert!(env.is_success());
    }

    #[test]
    fn test_serializes_to_wire_form() {
        let env = ResponseEnvelope::success(&["read_reg", "write_reg"][..], "abc");
        let value = env.to_value().expect("serialize failed");
        assert_eq!(
            value,
            json!({"cmd": ["read_reg", "write_reg"], "data": "abc", "result": "Success"})
        );
    }

    #[test]
    fn test_built_envelope_passes_validation() {
        let env = ResponseEnvelope::timeout("commit", 3);
        let value = env.to_value().expect("serialize failed");
        assert_eq!(crate::validate(&value), Ok(()));
    }

    #[test]
    fn test_from_json_keeps_extra_fields() {
        let env = ResponseEnvelope::from_json_str(
            r#"{"result": "Success", "cmd": "foo(bar=42)", "data": 4, "version": "0.0.0"}"#,
        )
        .expect("parse failed");
        assert_eq!(env.extra().get("version"), Some(&json!("0.0.0")));
        let value = env.to_value().expect("serialize failed");
        assert_eq!(value["version"], "0.0.0");
    }

    #[test]
    fn test_deserialize_runs_validator() {
        let err = serde_json::from_value::<ResponseEnvelope>(json!({"cmd": "read_reg", "result": "Failed"}))
            .unwrap_err();
        assert!(err.to_string().contains("result"), "{err}");

        let err = ResponseEnvelope::try_from(json!({"result": "Success"})).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Invalid(ValidationError::MissingRequiredField { .. })
        ));
    }

    #[test]
    fn test_strict_conversion_rejects_extra_fields() {
        let value = json!({"cmd": "x", "result": "Error", "version": "1"});
        let err = ResponseEnvelope::from_value(value, &Validator::strict()).unwrap_err();
        assert!(matches!(
            err,
            EnvelopeError::Invalid(ValidationError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_data_shapes_from_value() {
        assert_eq!(Data::from_value(json!(7)), Some(Data::Integer(7)));
        assert_eq!(Data::from_value(json!("s")), Some(Data::Text("s".into())));
        assert!(matches!(Data::from_value(json!([1, 2])), Some(Data::Sequence(_))));
        assert!(matches!(Data::from_value(json!({"a": 1})), Some(Data::Mapping(_))));
        assert_eq!(Data::from_value(json!(0.5)), None);
        assert_eq!(Data::from_value(json!(false)), None);
    }

    #[test]
    fn test_mapping_data_roundtrips_through_validation() {
        let env = ResponseEnvelope::from_json_str(
            r#"{"cmd": "read_struct", "result": "Success", "data": {"sys.sn": 7}}"#,
        )
        .expect("parse failed");
        match env.data() {
            Some(Data::Mapping(map)) => assert_eq!(map.get("sys.sn"), Some(&json!(7))),
            other => panic!("unexpected data: {other:?}"),
        }
    }

    #[test]
    fn test_cmd_display() {
        let cmd = Cmd::from(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(cmd.to_string(), "a, b");
        assert_eq!(ResultStatus::Timeout.to_string(), "Timeout");
    }
}

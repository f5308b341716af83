//! Memory-map device response envelopes
//!
//! This crate provides the response envelope contract shared by device
//! command interfaces and the tools that consume their output: a typed
//! envelope, the JSON Schema, a validator and a line codec.

pub mod codec;
pub mod envelope;
pub mod error;
pub mod schema;
pub mod validate;

// Re-export commonly used types at crate root
pub use envelope::{Cmd, Data, ResponseEnvelope, ResultStatus};
pub use error::{EnvelopeError, ValidationError, ValidationResult};
pub use validate::{validate, validate_all, AdditionalFields, Validator, ValidatorConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_examples_validate() {
        let examples = [
            json!({"result": "Success", "cmd": "foo(bar=42)", "data": 4}),
            json!({"result": "Error", "cmd": "foo(bar=42)", "data": 4}),
            json!({"result": "Timeout", "cmd": "foo(bar=42)"}),
            json!({"result": "Success", "cmd": ["foo(bar=42)", "anotherthing"], "data": 4}),
            json!({"result": "Success", "cmd": "foo(bar=42)", "data": 4, "msg": "this is a debug message"}),
            json!({"result": "Success", "cmd": "foo(bar=42)", "data": 4, "version": "0.0.0"}),
        ];
        for example in &examples {
            assert_eq!(validate(example), Ok(()), "{example}");
        }
    }

    #[test]
    fn test_concurrent_validation() {
        let validator = Validator::strict();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                std::thread::spawn(move || {
                    let candidate = json!({"cmd": format!("cmd-{i}"), "result": "Success", "retry": i});
                    validator.validate(&candidate)
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().expect("thread panicked"), Ok(()));
        }
    }
}

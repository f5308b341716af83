//! Check executor - validates assembled responses and tallies outcomes

use mm_envelope::codec::CodecError;
use mm_envelope::{Cmd, ResultStatus, ValidationError, Validator, ValidatorConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// Report for a single assembled envelope
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub source: String,
    /// Position of the envelope within its source, starting at 1
    pub index: u64,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ValidationError>,
}

/// Running totals shared by every input task
#[derive(Debug, Default)]
pub struct CheckStats {
    checked: AtomicU64,
    valid: AtomicU64,
    invalid: AtomicU64,
    decode_errors: AtomicU64,
}

/// Point-in-time copy of [`CheckStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub checked: u64,
    pub valid: u64,
    pub invalid: u64,
    pub decode_errors: u64,
}

impl StatsSnapshot {
    /// True when nothing was rejected or failed to decode
    pub fn all_valid(&self) -> bool {
        self.invalid == 0 && self.decode_errors == 0
    }
}

impl CheckStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            checked: self.checked.load(Ordering::SeqCst),
            valid: self.valid.load(Ordering::SeqCst),
            invalid: self.invalid.load(Ordering::SeqCst),
            decode_errors: self.decode_errors.load(Ordering::SeqCst),
        }
    }
}

/// Validates responses and records the outcome
pub struct CheckExecutor {
    validator: Validator,
    report_all: bool,
    stats: CheckStats,
}

impl CheckExecutor {
    /// Create a new check executor
    pub fn new(config: ValidatorConfig, report_all: bool) -> Self {
        Self {
            validator: Validator::new(config),
            report_all,
            stats: CheckStats::default(),
        }
    }

    /// Get the running totals
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Validate one assembled response and return its report
    pub fn check(&self, source: &str, index: u64, candidate: &Value) -> CheckReport {
        self.stats.checked.fetch_add(1, Ordering::SeqCst);

        let errors = if self.report_all {
            self.validator.validate_all(candidate)
        } else {
            self.validator.validate(candidate).err().into_iter().collect()
        };

        if errors.is_empty() {
            match summarize(candidate) {
                Ok((cmd, result)) => {
                    self.stats.valid.fetch_add(1, Ordering::SeqCst);
                    info!("[{}#{}] valid: cmd={} result={}", source, index, cmd, result);
                    return CheckReport {
                        source: source.into(),
                        index,
                        valid: true,
                        cmd: Some(cmd.to_string()),
                        result: Some(result.to_string()),
                        errors,
                    };
                }
                Err(e) => {
                    warn!("[{}#{}] envelope conversion failed: {}", source, index, e);
                }
            }
        }

        self.stats.invalid.fetch_add(1, Ordering::SeqCst);
        for err in &errors {
            warn!("[{}#{}] invalid: {}", source, index, err);
        }

        CheckReport {
            source: source.into(),
            index,
            valid: false,
            cmd: None,
            result: None,
            errors,
        }
    }

    /// Record a stream that could not be decoded into responses
    pub fn record_decode_error(&self, source: &str, err: &CodecError) {
        self.stats.decode_errors.fetch_add(1, Ordering::SeqCst);
        warn!("[{}] decode error: {}", source, err);
    }
}

/// Read `cmd` and `result` from a candidate that passed validation
fn summarize(candidate: &Value) -> Result<(Cmd, ResultStatus), serde_json::Error> {
    let cmd = Cmd::deserialize(&candidate["cmd"])?;
    let result = ResultStatus::deserialize(&candidate["result"])?;
    Ok((cmd, result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_envelope_report() {
        let executor = CheckExecutor::new(ValidatorConfig::default(), false);
        let report = executor.check(
            "test",
            1,
            &json!({"cmd": ["read_reg", "write_reg"], "result": "Timeout"}),
        );

        assert!(report.valid);
        assert_eq!(report.cmd.as_deref(), Some("read_reg, write_reg"));
        assert_eq!(report.result.as_deref(), Some("Timeout"));
        assert!(report.errors.is_empty());
        assert_eq!(executor.stats().valid, 1);
    }

    #[test]
    fn test_summarize_reads_cmd_and_result() {
        let (cmd, result) = summarize(&json!({"cmd": "read_reg", "result": "Error", "retry": 2}))
            .expect("summarize failed");
        assert_eq!(cmd, Cmd::Single("read_reg".into()));
        assert_eq!(result, ResultStatus::Error);
    }

    #[test]
    fn test_summarize_reports_conversion_error() {
        assert!(summarize(&json!({"cmd": "read_reg"})).is_err());
        assert!(summarize(&json!({"cmd": 1, "result": "Success"})).is_err());
    }

    #[test]
    fn test_first_error_only_by_default() {
        let executor = CheckExecutor::new(ValidatorConfig::default(), false);
        let report = executor.check("test", 1, &json!({"msg": 1}));

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].field(), Some("cmd"));
    }

    #[test]
    fn test_report_all_collects_every_error() {
        let executor = CheckExecutor::new(ValidatorConfig::default(), true);
        let report = executor.check("test", 1, &json!({"msg": 1}));

        assert_eq!(report.errors.len(), 3);
    }

    #[test]
    fn test_stats_track_outcomes() {
        let executor = CheckExecutor::new(ValidatorConfig::strict(), false);
        executor.check("a", 1, &json!({"cmd": "x", "result": "Success"}));
        executor.check("a", 2, &json!({"cmd": "x", "result": "Success", "version": "1"}));
        executor.record_decode_error("a", &CodecError::Incomplete(vec!["cmd".into()]));

        let stats = executor.stats();
        assert_eq!(
            stats,
            StatsSnapshot {
                checked: 2,
                valid: 1,
                invalid: 1,
                decode_errors: 1,
            }
        );
        assert!(!stats.all_valid());
    }

    #[test]
    fn test_report_serializes_errors() {
        let executor = CheckExecutor::new(ValidatorConfig::default(), false);
        let report = executor.check("stdin", 3, &json!({"cmd": "read_reg", "result": "Failed"}));
        let value = serde_json::to_value(&report).expect("serialize failed");

        assert_eq!(value["valid"], false);
        assert_eq!(value["index"], 3);
        assert_eq!(value["errors"][0]["kind"], "invalid_enum_value");
        assert!(value.get("cmd").is_none());
    }
}

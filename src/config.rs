//! Command-line configuration for the envelope checker

use clap::Parser;
use mm_envelope::codec::{AssemblerConfig, DEFAULT_END_KEY, DEFAULT_MAX_LINE_LEN};
use mm_envelope::{AdditionalFields, ValidatorConfig};
use std::fmt;
use std::path::PathBuf;

/// Validate newline-delimited command response envelopes
#[derive(Debug, Parser)]
#[command(name = "envelope-check", version, about)]
pub struct Cli {
    /// Input files; reads stdin when empty or `-`
    pub files: Vec<PathBuf>,

    /// Reject fields outside the envelope contract
    #[arg(long)]
    pub strict: bool,

    /// Report every violation instead of the first
    #[arg(long)]
    pub all: bool,

    /// Key whose arrival completes a response
    #[arg(long, default_value = DEFAULT_END_KEY)]
    pub end_key: String,

    /// Longest accepted line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    pub max_line_len: usize,

    /// Print one JSON report per envelope on stdout
    #[arg(long)]
    pub json: bool,
}

/// Where envelopes are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Stdin,
    File(PathBuf),
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Input::Stdin => write!(f, "<stdin>"),
            Input::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Configuration for a check run
#[derive(Debug, Clone)]
pub struct CheckConfig {
    pub inputs: Vec<Input>,
    pub validator: ValidatorConfig,
    pub assembler: AssemblerConfig,
    /// Collect all violations per envelope
    pub report_all: bool,
    /// Emit JSON report lines on stdout
    pub json_output: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            inputs: vec![Input::Stdin],
            validator: ValidatorConfig::default(),
            assembler: AssemblerConfig::default(),
            report_all: false,
            json_output: false,
        }
    }
}

impl From<Cli> for CheckConfig {
    fn from(cli: Cli) -> Self {
        let mut inputs: Vec<Input> = cli
            .files
            .into_iter()
            .map(|path| {
                if path.as_os_str() == "-" {
                    Input::Stdin
                } else {
                    Input::File(path)
                }
            })
            .collect();
        // stdin can only be read by one task
        let mut seen_stdin = false;
        inputs.retain(|input| match input {
            Input::Stdin => !std::mem::replace(&mut seen_stdin, true),
            Input::File(_) => true,
        });
        if inputs.is_empty() {
            inputs.push(Input::Stdin);
        }

        let additional_fields = if cli.strict {
            AdditionalFields::Reject
        } else {
            AdditionalFields::Allow
        };

        Self {
            inputs,
            validator: ValidatorConfig { additional_fields },
            assembler: AssemblerConfig {
                end_key: cli.end_key,
                max_line_len: cli.max_line_len,
            },
            report_all: cli.all,
            json_output: cli.json,
        }
    }
}

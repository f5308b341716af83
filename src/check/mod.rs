//! Envelope checking for the CLI
//!
//! This module handles:
//! - Validating assembled responses against the envelope contract
//! - Producing per-envelope reports
//! - Tallying results across all inputs
//! - Reading envelope streams from files and stdin

mod executor;
mod reader;

pub use executor::{CheckExecutor, CheckReport, StatsSnapshot};
pub use reader::check_stream;

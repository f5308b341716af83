mod check;
mod config;

use anyhow::{Context, Result};
use check::{check_stream, CheckExecutor, CheckReport, StatsSnapshot};
use clap::Parser;
use config::{CheckConfig, Cli, Input};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::fs::File;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Initialize tracing; stdout is reserved for JSON reports
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = CheckConfig::from(Cli::parse());
    info!(
        "Checking {} input(s): strict={:?} end_key={}",
        config.inputs.len(),
        config.validator.additional_fields,
        config.assembler.end_key
    );

    let stats = run(config).await?;

    info!(
        "Checked {} envelope(s): {} valid, {} invalid, {} decode error(s)",
        stats.checked, stats.valid, stats.invalid, stats.decode_errors
    );

    Ok(if stats.all_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Check every input concurrently, one task per input
async fn run(config: CheckConfig) -> Result<StatsSnapshot> {
    let executor = Arc::new(CheckExecutor::new(config.validator, config.report_all));
    let mut handles = Vec::with_capacity(config.inputs.len());

    for input in config.inputs {
        let executor = executor.clone();
        let assembler = config.assembler.clone();
        let json_output = config.json_output;

        handles.push(tokio::spawn(async move {
            let source = input.to_string();
            let emit = |report: &CheckReport| {
                if json_output {
                    print_report(report);
                }
            };
            let count = match &input {
                Input::Stdin => {
                    check_stream(&source, tokio::io::stdin(), assembler, &executor, emit).await?
                }
                Input::File(path) => {
                    let file = File::open(path)
                        .await
                        .with_context(|| format!("failed to open {}", path.display()))?;
                    check_stream(&source, file, assembler, &executor, emit).await?
                }
            };
            info!("[{}] {} envelope(s) checked", source, count);
            anyhow::Ok(())
        }));
    }

    let mut failed = false;
    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("Input failed: {:#}", e);
                failed = true;
            }
            Err(e) => {
                error!("Input task panicked: {}", e);
                failed = true;
            }
        }
    }

    let mut stats = executor.stats();
    if failed {
        // Unreadable inputs count against the run
        stats.decode_errors += 1;
    }
    Ok(stats)
}

fn print_report(report: &CheckReport) {
    match serde_json::to_string(report) {
        Ok(line) => println!("{}", line),
        Err(e) => error!("Failed to encode report: {}", e),
    }
}

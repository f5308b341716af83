mod session;

use anyhow::Result;
use clap::Parser;
use mm_envelope::codec::{AssemblerConfig, DEFAULT_END_KEY, DEFAULT_MAX_LINE_LEN};
use mm_envelope::{Validator, ValidatorConfig};
use session::{SessionManager, SinkSession};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Accept envelope streams over TCP and validate every envelope
#[derive(Debug, Parser)]
#[command(name = "envelope-sink", version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0:8080")]
    listen: String,

    /// Reject fields outside the envelope contract
    #[arg(long)]
    strict: bool,

    /// Key whose arrival completes a response
    #[arg(long, default_value = DEFAULT_END_KEY)]
    end_key: String,

    /// Longest accepted line in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN)]
    max_line_len: usize,
}

/// Configuration for the sink
#[derive(Debug, Clone)]
struct SinkConfig {
    listen: String,
    validator: ValidatorConfig,
    assembler: AssemblerConfig,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8080".into(),
            validator: ValidatorConfig::default(),
            assembler: AssemblerConfig::default(),
        }
    }
}

impl From<Cli> for SinkConfig {
    fn from(cli: Cli) -> Self {
        Self {
            listen: cli.listen,
            validator: if cli.strict {
                ValidatorConfig::strict()
            } else {
                ValidatorConfig::default()
            },
            assembler: AssemblerConfig {
                end_key: cli.end_key,
                max_line_len: cli.max_line_len,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = SinkConfig::from(Cli::parse());
    let listener = TcpListener::bind(&config.listen).await?;
    info!("Sink listening on {}", config.listen);

    serve(listener, config, Arc::new(SessionManager::new())).await
}

/// Accept connections forever, one session task per connection
async fn serve(listener: TcpListener, config: SinkConfig, manager: Arc<SessionManager>) -> Result<()> {
    let validator = Validator::new(config.validator);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("Connection from: {}", addr);

        let session = SinkSession::new(
            addr.to_string(),
            socket,
            config.assembler.clone(),
            validator,
            manager.clone(),
        );
        let manager = manager.clone();

        tokio::spawn(async move {
            match session.run().await {
                Ok(summary) => {
                    let stats = manager.stats();
                    info!(
                        "Session {} closed: {} envelope(s), {} invalid (sink totals: received={} valid={} invalid={} decode_errors={} active={})",
                        addr,
                        summary.received,
                        summary.invalid,
                        stats.received,
                        stats.valid,
                        stats.invalid,
                        stats.decode_errors,
                        stats.active_sessions
                    );
                }
                Err(e) => {
                    error!("Read error from {}: {}", addr, e);
                }
            }
        });
    }
}

//! Lifecycle engine demo daemon.
//!
//! Runs a `Ping` hook that logs a heartbeat until the process receives
//! SIGINT, SIGTERM or SIGQUIT, then shuts it down gracefully.
//!
//! ```text
//! lifecycle-engine --timeout-ms 2000 --ping-interval-secs 1
//! lifecycle-engine --config engine.toml
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use lifecycle_engine::config::{load_config, EngineConfig};
use lifecycle_engine::lifecycle::{options, BoxError, Engine, Hook};
use lifecycle_engine::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "lifecycle-engine")]
#[command(about = "Run hooks until a shutdown signal is received", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the shutdown timeout, in milliseconds.
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Override the log level.
    #[arg(short, long)]
    log_level: Option<String>,

    /// Seconds between two pings.
    #[arg(long, default_value_t = 2)]
    ping_interval_secs: u64,
}

/// Logs a heartbeat until cancelled.
struct Ping {
    interval: Duration,
}

#[async_trait]
impl Hook for Ping {
    async fn start(&self, ctx: CancellationToken) -> Result<(), BoxError> {
        let mut ticker = tokio::time::interval(self.interval);
        let mut count: u64 = 0;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    count += 1;
                    tracing::info!(count, "Ping");
                }
                _ = ctx.cancelled() => return Ok(()),
            }
        }
    }

    async fn stop(&self, _ctx: CancellationToken) -> Result<(), BoxError> {
        tracing::info!("Pong");
        Ok(())
    }

    fn name(&self) -> &str {
        "ping"
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.shutdown_timeout_ms = timeout_ms;
    }
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        shutdown_timeout_ms = config.shutdown_timeout_ms,
        signals = ?config.signals,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut engine = Engine::from_config(
        CancellationToken::new(),
        &config,
        [
            options::before_shutdown(|| tracing::info!("Shutting down hooks")),
            options::error_reporter(|err| tracing::error!(hook = %err.hook(), error = %err, "Hook error")),
        ],
    )?;
    engine.register(Ping {
        interval: Duration::from_secs(cli.ping_interval_secs.max(1)),
    });

    engine.start().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

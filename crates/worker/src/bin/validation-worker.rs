//! validation-worker: consumes entity-change events from SQS, validates them
//! against the configured rules, and publishes the results.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;
use tracing::{info, warn};

use validus_core::config::{load_dotenv, split_list};
use validus_core::Config;
use validus_worker::setup;
use validus_worker::ValidationService;

// ── CLI ─────────────────────────────────────────────────────────────

/// Entity-change validation worker.
#[derive(Parser, Debug)]
#[command(name = "validation-worker", version, about)]
struct Cli {
    /// Comma-separated rule roots; overrides RULES_DIRS from the profile.
    #[arg(long, env = "VALIDATION_RULES_DIRS")]
    rules_dirs: Option<String>,

    /// Poll interval in milliseconds; overrides POLL_INTERVAL_MS.
    #[arg(long, env = "VALIDATION_POLL_INTERVAL_MS")]
    poll_interval_ms: Option<u64>,

    /// Compile the rules, build the validator's clients, print the config summary, and exit.
    /// Models are resolved on first use, so the model source is not contacted.
    #[arg(long)]
    check: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dirs) = &cli.rules_dirs {
        config.rules.dirs = split_list(dirs).into_iter().map(PathBuf::from).collect();
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.queue.poll_interval_ms = ms;
    }
    config.log_summary();

    let validator = Arc::new(setup::build_validator(&config)?);
    if cli.check {
        info!(rules = validator.registry().rule_count(), "configuration is valid");
        return Ok(());
    }

    let (consumer, channels) = setup::build_sqs(&config)?;
    let publisher = Arc::new(setup::build_publisher(channels, &config.publisher));
    let service = ValidationService::new(Arc::new(consumer), validator, publisher)
        .with_batch_size(config.queue.batch_size)
        .with_poll_interval(config.queue.poll_interval());

    if let Err(e) = service.queue_health().await {
        warn!(code = %e.code(), error = %e, "queue health check failed, polling anyway");
    }

    let shutdown = Arc::new(Notify::new());
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                signal.notify_one();
            }
            Err(e) => warn!(error = %e, "failed to listen for shutdown signal"),
        }
    });

    info!("validation-worker starting");
    service.run(shutdown).await;
    info!("validation-worker exited cleanly");
    Ok(())
}

/*
[INPUT]:  CLI arguments, optional YAML configuration, KUCOIN_* environment, OS shutdown signals
[OUTPUT]: Account and market snapshots plus a time-bounded live order book on stdout
[POS]:    Binary entry point
[UPDATE]: When changing CLI flags, startup flow, or shutdown handling
*/

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use kucoin_futures_demo::{ConsoleReporter, DemoConfig, KucoinClientFactory, Session};

#[derive(Parser, Debug)]
#[command(name = "kucoin-futures-demo", version, about = "KuCoin Futures account and market data demo")]
struct Cli {
    #[arg(long = "config", value_name = "PATH")]
    config_path: Option<PathBuf>,
    /// Contract symbol, overrides configuration
    #[arg(long)]
    symbol: Option<String>,
    /// Live order book duration in seconds, overrides configuration
    #[arg(long = "duration", value_name = "SECS")]
    watch_duration_secs: Option<u64>,
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    log_level: String,
    #[arg(long = "dry-run")]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let dotenv = dotenvy::dotenv();
    init_tracing(&args.log_level)?;

    if let Ok(path) = &dotenv {
        info!(path = %path.display(), "loaded .env");
    }

    let run_id = Uuid::new_v4();
    info!(
        run_id = %run_id,
        config_path = ?args.config_path,
        dry_run = args.dry_run,
        "starting kucoin-futures-demo"
    );

    let mut config = DemoConfig::load(args.config_path.as_deref()).context("load config")?;
    if let Some(symbol) = args.symbol {
        config.symbol = symbol;
    }
    if let Some(secs) = args.watch_duration_secs {
        config.watch_duration_secs = secs;
    }
    config.validate().context("validate config")?;
    info!(
        symbol = %config.symbol,
        watch_duration_secs = config.watch_duration_secs,
        "configuration loaded"
    );

    if args.dry_run {
        config.credentials().context("validate credentials")?;
        print!("{}", config.to_redacted_yaml().context("render config")?);
        info!("dry-run requested; configuration validated");
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    setup_signal_handlers(shutdown.clone());

    let mut session = Session::new(config, KucoinClientFactory, ConsoleReporter::new(), shutdown);
    let report = session.run().await;

    if let Some(watch) = &report.watch {
        info!(outcome = ?watch, "live watch summary");
    }
    for failure in &report.cleanup.errors {
        warn!(error = %failure, "client release failed");
    }

    match report.fatal {
        Some(err) => Err(anyhow::Error::new(err).context("session failed")),
        None => Ok(()),
    }
}

fn init_tracing(log_level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(log_level).context("invalid log level")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!(err))
        .context("initialize tracing subscriber")?;
    Ok(())
}

fn setup_signal_handlers(shutdown: CancellationToken) {
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install SIGINT handler");
            return;
        }
        info!("received SIGINT");
        shutdown_clone.cancel();
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let shutdown_clone = shutdown.clone();
        tokio::spawn(async move {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                    info!("received SIGTERM");
                    shutdown_clone.cancel();
                }
                Err(err) => {
                    warn!(error = %err, "failed to install SIGTERM handler");
                }
            }
        });
    }
}

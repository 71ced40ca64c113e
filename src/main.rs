//! upbit-autotrader - Main Entry Point
//!
//! Loads configuration, recovers pre-existing holdings, and hands control
//! to the tick scheduler for good.

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use upbit_autotrader::common::traits::{Notifier, SystemClock};
use upbit_autotrader::config::types::ApiCredentials;
use upbit_autotrader::config::load_config;
use upbit_autotrader::engine::TickScheduler;
use upbit_autotrader::telegram::{NullNotifier, TelegramNotifier};
use upbit_autotrader::upbit::UpbitRestClient;

/// CLI arguments for the application
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting upbit-autotrader");
    info!("Configuration file: {}", args.config);

    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let cfg = load_config(Some(&args.config)).context("failed to load configuration")?;

    let access_key = cfg
        .upbit
        .access_key
        .clone()
        .or_else(|| std::env::var("UPBIT_ACCESS_KEY").ok())
        .context("UPBIT_ACCESS_KEY not configured")?;
    let secret_key = cfg
        .upbit
        .secret_key
        .clone()
        .or_else(|| std::env::var("UPBIT_SECRET_KEY").ok())
        .context("UPBIT_SECRET_KEY not configured")?;

    let timeout = std::time::Duration::from_secs(cfg.settings.request_timeout_seconds);
    let client = UpbitRestClient::with_timeout(&cfg.upbit.rest_url, timeout)?
        .with_credentials(ApiCredentials::new(access_key, secret_key));

    let notifier: Box<dyn Notifier> = match &cfg.telegram {
        Some(telegram_cfg) => Box::new(TelegramNotifier::new(telegram_cfg)?),
        None => {
            info!("no Telegram configuration, reports go to the log only");
            Box::new(NullNotifier)
        }
    };

    let mut scheduler = TickScheduler::new(
        cfg.clone(),
        client.clone(),
        client,
        notifier,
        SystemClock,
    )
    .await
    .context("failed to initialize scheduler")?;

    info!(
        starting_equity = %scheduler.governor().period_start_equity(),
        open_positions = scheduler.book().open_count(),
        "initialized"
    );

    scheduler.run().await;

    Ok(())
}

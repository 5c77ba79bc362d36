use anyhow::{Context, Result};
use channelbot::api::{BinanceFuturesClient, LogNotifier, Notifier, TelegramNotifier};
use channelbot::execution::shutdown_listener;
use channelbot::{BotConfig, Scanner};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "channelbot")]
#[command(about = "Regression channel scanner for Binance USDT-M futures", long_about = None)]
struct Args {
    /// Path to configuration file (JSON or TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single scan cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();
    let config = BotConfig::load(args.config.as_deref())?;

    tracing::info!("🚀 ChannelBot starting");
    tracing::info!(
        "Symbols: {} | Timeframe: {} | Channel: {} candles",
        config.symbols.join(", "),
        config.timeframe,
        config.regression_length
    );

    let market_data =
        BinanceFuturesClient::new().context("Failed to create Binance client")?;
    let notifier = build_notifier(&config)?;

    let mut scanner = Scanner::new(config, market_data, notifier);

    if args.once {
        let report = scanner.run_cycle().await?;
        tracing::info!(
            "Single cycle done: {} scanned, {} opened, {} closed",
            report.scanned,
            report.opened.len(),
            report.closed.len()
        );
        return Ok(());
    }

    let shutdown = shutdown_listener(tokio::signal::ctrl_c()).await;
    scanner.run(shutdown).await;

    tracing::info!("Final stats: {}", scanner.tracker().statistics());
    Ok(())
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("channelbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_notifier(config: &BotConfig) -> Result<Box<dyn Notifier>> {
    match config.telegram() {
        Some((token, chat_id)) => {
            tracing::info!("Telegram notifications enabled");
            let notifier = TelegramNotifier::new(token, chat_id)
                .context("Failed to create Telegram client")?;
            Ok(Box::new(notifier))
        }
        None => {
            tracing::warn!("Telegram not configured, notifications go to the log");
            Ok(Box::new(LogNotifier))
        }
    }
}

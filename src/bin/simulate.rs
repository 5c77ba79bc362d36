use anyhow::Result;
use channelbot::api::LogNotifier;
use channelbot::backtest::{MarketScenario, ReplayMarketData, SyntheticDataGenerator};
use channelbot::{BotConfig, Scanner};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "simulate")]
#[command(about = "Replay synthetic markets through the channel scanner", long_about = None)]
struct Args {
    /// RNG seed for the synthetic series
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Candles generated per instrument
    #[arg(long, default_value = "500")]
    candles: usize,

    /// Regression window length
    #[arg(long, default_value = "50")]
    regression_length: usize,

    /// Touch tolerance in percent
    #[arg(long, default_value = "0.5")]
    touch_threshold: f64,

    /// Minimum channel angle in degrees
    #[arg(long, default_value = "0.05")]
    min_trend_angle: f64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("channelbot=warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║          CHANNELBOT OFFLINE REPLAY                    ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let scenarios = [
        ("UPUSDT", MarketScenario::Uptrend, "📈 Uptrend"),
        ("DOWNUSDT", MarketScenario::Downtrend, "📉 Downtrend"),
        ("FLATUSDT", MarketScenario::Sideways, "↔️  Sideways"),
        ("WILDUSDT", MarketScenario::Volatile, "⚡ Volatile"),
    ];

    let mut generator = SyntheticDataGenerator::new(args.seed);
    let mut replay = ReplayMarketData::new(args.regression_length);
    for (symbol, scenario, name) in &scenarios {
        println!("  {} -> {}", symbol, name);
        replay.insert(symbol, generator.generate(*scenario, args.candles, 15));
    }

    let config = BotConfig {
        symbols: scenarios.iter().map(|(s, _, _)| s.to_string()).collect(),
        regression_length: args.regression_length,
        touch_threshold: args.touch_threshold,
        min_trend_angle: args.min_trend_angle,
        history_padding: 0,
        ..Default::default()
    };

    let mut scanner = Scanner::new(config, replay, LogNotifier);
    let mut cycles = 0;

    loop {
        let report = scanner.run_cycle().await?;
        cycles += 1;

        for position in &report.opened {
            println!(
                "  [{:>4}] OPEN  {:<9} {} @ {:.4} (SL {:.4} / TP {:.4})",
                cycles,
                position.instrument,
                position.direction,
                position.entry_price,
                position.stop_loss,
                position.take_profit
            );
        }
        for position in &report.closed {
            println!(
                "  [{:>4}] CLOSE {:<9} {} by {} | PnL {:+.2}%",
                cycles,
                position.instrument,
                position.direction,
                position.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
                position.pnl_percent.unwrap_or_default()
            );
        }

        if !scanner.market_data_mut().advance() {
            break;
        }
    }

    let tracker = scanner.tracker();
    println!("\n{}", "=".repeat(57));
    println!("  Cycles:          {}", cycles);
    println!("  Still open:      {}", tracker.open_count());
    println!("  {}", tracker.statistics());
    println!("{}", "=".repeat(57));

    Ok(())
}

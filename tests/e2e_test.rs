use async_trait::async_trait;
use channelbot::backtest::{MarketScenario, ReplayMarketData, SyntheticDataGenerator};
use channelbot::*;
use chrono::{Duration, Utc};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingNotifier {
    messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> channelbot::Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn candles(closes: &[f64]) -> Vec<Candle> {
    let start = Utc::now() - Duration::minutes(15 * closes.len() as i64);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            timestamp: start + Duration::minutes(15 * i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        })
        .collect()
}

fn rising(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let noise = if i % 2 == 0 { 0.5 } else { -0.5 };
            100.0 + i as f64 * 0.5 + noise
        })
        .collect()
}

fn falling(n: usize) -> Vec<f64> {
    rising(n).into_iter().map(|p| 260.0 - p).collect()
}

fn with_tail(mut closes: Vec<f64>, tail: &[f64]) -> Vec<f64> {
    closes.extend_from_slice(tail);
    closes
}

fn config(symbols: &[&str]) -> BotConfig {
    BotConfig {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        regression_length: 50,
        touch_threshold: 0.2,
        min_trend_angle: 0.0,
        history_padding: 50,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_replay_opens_and_closes_positions() {
    let _ = tracing_subscriber::fmt::try_init();

    // 60 candles visible at start; each series has one more candle to replay
    let replay = ReplayMarketData::new(60)
        .with_series("BTCUSDT", candles(&with_tail(rising(59), &[128.8, 135.0])))
        .with_series("ETHUSDT", candles(&with_tail(rising(59), &[128.8, 120.0])))
        .with_series("SOLUSDT", candles(&with_tail(falling(59), &[131.2, 120.0])))
        .with_series("XRPUSDT", candles(&with_tail(rising(59), &[129.5, 130.0])));

    let notifier = RecordingNotifier::default();
    let mut scanner = Scanner::new(
        config(&["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT"]),
        replay,
        notifier.clone(),
    );

    // Cycle 1: dips in the rising channels and the rally in the falling one
    let report = scanner.run_cycle().await.unwrap();
    assert_eq!(report.scanned, 4);
    assert!(report.closed.is_empty());

    let mut opened: Vec<(String, Direction)> = report
        .opened
        .iter()
        .map(|p| (p.instrument.clone(), p.direction))
        .collect();
    opened.sort();
    assert_eq!(
        opened,
        vec![
            ("BTCUSDT".to_string(), Direction::Long),
            ("ETHUSDT".to_string(), Direction::Long),
            ("SOLUSDT".to_string(), Direction::Short),
        ]
    );
    assert!(!scanner.tracker().has_open_position("XRPUSDT"));
    assert_eq!(scanner.tracker().open_count(), 3);
    assert_eq!(notifier.messages.lock().unwrap().len(), 3);

    let btc = scanner.tracker().get_open_position("BTCUSDT").unwrap();
    assert_eq!(btc.entry_price, 128.8);
    assert!(btc.stop_loss < btc.entry_price && btc.entry_price < btc.take_profit);
    assert!(btc.id.starts_with("BTCUSDT_"));

    // Cycle 2: BTC runs to target, ETH falls through its stop, SOL drops to target
    assert!(scanner.market_data_mut().advance());
    let report = scanner.run_cycle().await.unwrap();

    assert!(report.opened.is_empty());
    assert_eq!(report.closed.len(), 3);
    assert_eq!(scanner.tracker().open_count(), 0);

    let closed = scanner.tracker().closed_positions();
    let by_instrument = |symbol: &str| closed.iter().find(|p| p.instrument == symbol).unwrap();

    let btc = by_instrument("BTCUSDT");
    assert_eq!(btc.exit_reason, Some(ExitReason::Target));
    assert_eq!(btc.exit_price, Some(135.0));
    assert!((btc.pnl_percent.unwrap() - 4.8137).abs() < 1e-3);

    let eth = by_instrument("ETHUSDT");
    assert_eq!(eth.exit_reason, Some(ExitReason::Stop));
    assert!((eth.pnl_percent.unwrap() + 6.8323).abs() < 1e-3);

    let sol = by_instrument("SOLUSDT");
    assert_eq!(sol.exit_reason, Some(ExitReason::Target));
    assert!((sol.pnl_percent.unwrap() - 8.5366).abs() < 1e-3);

    for position in closed {
        assert_eq!(position.state, PositionState::Closed);
        assert!(position.closed_at.is_some());
    }

    let stats = scanner.tracker().statistics();
    assert_eq!(stats.total_closed, 3);
    assert!((stats.win_rate - 200.0 / 3.0).abs() < 1e-9);
    assert!((stats.total_pnl_percent - (4.8137 - 6.8323 + 8.5366)).abs() < 1e-3);

    let messages = notifier.messages.lock().unwrap();
    assert_eq!(messages.len(), 6);
    assert_eq!(
        messages.iter().filter(|m| m.contains("POSITION CLOSED")).count(),
        3
    );

    // Replay is exhausted
    assert!(!scanner.market_data_mut().advance());
}

#[tokio::test]
async fn test_unknown_symbol_is_skipped() {
    let replay = ReplayMarketData::new(60)
        .with_series("BTCUSDT", candles(&with_tail(rising(59), &[128.8])));

    let mut scanner = Scanner::new(
        config(&["NOPEUSDT", "BTCUSDT"]),
        replay,
        RecordingNotifier::default(),
    );

    let report = scanner.run_cycle().await.unwrap();
    assert_eq!(report.scanned, 2);
    assert_eq!(report.opened.len(), 1);
    assert_eq!(report.opened[0].instrument, "BTCUSDT");
}

#[tokio::test]
async fn test_synthetic_replay_keeps_tracker_consistent() {
    let mut generator = SyntheticDataGenerator::new(42);
    let replay = ReplayMarketData::new(50)
        .with_series("UPUSDT", generator.generate(MarketScenario::Uptrend, 300, 15))
        .with_series("DOWNUSDT", generator.generate(MarketScenario::Downtrend, 300, 15))
        .with_series("FLATUSDT", generator.generate(MarketScenario::Sideways, 300, 15));

    let notifier = RecordingNotifier::default();
    let mut scanner = Scanner::new(
        BotConfig {
            symbols: vec!["UPUSDT".into(), "DOWNUSDT".into(), "FLATUSDT".into()],
            regression_length: 50,
            touch_threshold: 0.5,
            min_trend_angle: 0.05,
            history_padding: 0,
            ..Default::default()
        },
        replay,
        notifier.clone(),
    );

    let mut opened = 0;
    let mut closed = 0;
    loop {
        let report = scanner.run_cycle().await.unwrap();
        opened += report.opened.len();
        closed += report.closed.len();

        // never more than one open position per instrument
        assert!(scanner.tracker().open_count() <= 3);

        if !scanner.market_data_mut().advance() {
            break;
        }
    }

    let tracker = scanner.tracker();
    assert_eq!(opened, closed + tracker.open_count());
    assert_eq!(tracker.closed_positions().len(), closed);
    assert_eq!(notifier.messages.lock().unwrap().len(), opened + closed);

    let stats = tracker.statistics();
    assert_eq!(stats.total_closed, closed);
    if closed > 0 {
        let wins = tracker
            .closed_positions()
            .iter()
            .filter(|p| p.exit_reason == Some(ExitReason::Target))
            .count();
        assert!((stats.win_rate - wins as f64 / closed as f64 * 100.0).abs() < 1e-9);
    }
}

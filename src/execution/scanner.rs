use anyhow::{Context, Result};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};

use super::PositionTracker;
use crate::api::{format_entry_message, format_exit_message, MarketData, Notifier};
use crate::config::BotConfig;
use crate::models::Position;
use crate::strategy::ChannelReversionStrategy;

/// Outcome of one scan cycle
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Instruments visited this cycle (including skipped ones)
    pub scanned: usize,
    /// Positions opened this cycle
    pub opened: Vec<Position>,
    /// Positions closed by the exit check at the start of the cycle
    pub closed: Vec<Position>,
}

/// Drives the scan loop: exit checks, then per-instrument evaluation
///
/// Everything runs sequentially on the caller's task; the tracker is only
/// ever touched from here.
pub struct Scanner<M, N> {
    config: BotConfig,
    strategy: ChannelReversionStrategy,
    tracker: PositionTracker,
    market_data: M,
    notifier: N,
}

impl<M: MarketData, N: Notifier> Scanner<M, N> {
    pub fn new(config: BotConfig, market_data: M, notifier: N) -> Self {
        let strategy = ChannelReversionStrategy::new(config.strategy_config());
        Self {
            config,
            strategy,
            tracker: PositionTracker::new(),
            market_data,
            notifier,
        }
    }

    pub fn tracker(&self) -> &PositionTracker {
        &self.tracker
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn market_data(&self) -> &M {
        &self.market_data
    }

    pub fn market_data_mut(&mut self) -> &mut M {
        &mut self.market_data
    }

    /// Run cycles until `shutdown` resolves
    ///
    /// Sleeps the scan interval after a good cycle and the error cooldown
    /// after a failed one. Shutdown is only observed between cycles.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let delay = match self.run_cycle().await {
                Ok(_) => {
                    tracing::info!(
                        "Next scan in {} minutes",
                        self.config.scan_interval_minutes
                    );
                    self.scan_interval()
                }
                Err(e) => {
                    tracing::error!("Scan cycle failed: {:#}", e);
                    tracing::info!(
                        "Retrying in {} seconds",
                        self.config.error_cooldown_seconds
                    );
                    self.error_cooldown()
                }
            };

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Stopping scanner...");
                    break;
                }
                _ = sleep(delay) => {}
            }
        }
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.config.scan_interval_minutes * 60)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.config.error_cooldown_seconds)
    }

    /// One full cycle: close positions that hit their levels, then scan the
    /// configured instruments for new entries.
    ///
    /// Fails only when the market data source is unreachable; per-instrument
    /// data problems are skipped.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        self.market_data
            .check_connectivity()
            .await
            .context("Market data source unreachable")?;

        let mut report = CycleReport {
            closed: self.check_exits().await,
            ..Default::default()
        };

        tracing::info!(
            "CHANNEL SCAN - {}",
            self.config.mode.to_uppercase()
        );
        tracing::info!(
            "Config: {} candles | SL {}% | Scan: {}min",
            self.config.regression_length,
            self.config.sl_percentage,
            self.config.scan_interval_minutes
        );
        tracing::info!(
            "Open positions: {} | {}",
            self.tracker.open_count(),
            self.tracker.statistics()
        );
        tracing::info!("{}", "=".repeat(70));

        let instruments: Vec<String> = self
            .config
            .symbols
            .iter()
            .take(self.config.max_symbols_to_scan)
            .cloned()
            .collect();

        for instrument in &instruments {
            report.scanned += 1;

            if let Some(position) = self.scan_instrument(instrument).await? {
                report.opened.push(position);
            }
        }

        tracing::info!(
            "SCAN COMPLETE. Scanned: {} | New signals: {}",
            report.scanned,
            report.opened.len()
        );
        tracing::info!("Open positions total: {}", self.tracker.open_count());

        Ok(report)
    }

    /// Fetch last prices for open positions and close those past a level
    async fn check_exits(&mut self) -> Vec<Position> {
        if self.tracker.open_count() == 0 {
            return Vec::new();
        }

        let mut prices = HashMap::new();
        for instrument in self.tracker.open_instruments() {
            match self.market_data.fetch_last_price(&instrument).await {
                Ok(price) => {
                    prices.insert(instrument, price);
                }
                Err(e) => {
                    tracing::warn!("  ✗ Price check skipped: {}", e);
                }
            }
        }

        let closed = self.tracker.check_exits(|i| prices.get(i).copied());

        for position in &closed {
            tracing::info!(
                "✓ {} {} closed by {} @ {:.4} | PnL: {:+.2}%",
                position.instrument,
                position.direction,
                position.exit_reason.map(|r| r.to_string()).unwrap_or_default(),
                position.exit_price.unwrap_or_default(),
                position.pnl_percent.unwrap_or_default()
            );
            self.send(&format_exit_message(position)).await;
        }

        closed
    }

    /// Evaluate one instrument; opens a position when a signal fires
    async fn scan_instrument(&mut self, instrument: &str) -> Result<Option<Position>> {
        let has_open_position = self.tracker.has_open_position(instrument);
        if has_open_position {
            tracing::info!("    {}...    open position, skipped", instrument);
            return Ok(None);
        }

        let candles = match self
            .market_data
            .fetch_recent_candles(
                instrument,
                &self.config.timeframe,
                self.config.candles_to_fetch(),
            )
            .await
        {
            Ok(candles) => candles,
            Err(e) => {
                tracing::warn!("    {}...    ERROR: {}", instrument, e);
                return Ok(None);
            }
        };

        if candles.len() < self.strategy.min_candles_required() {
            tracing::info!(
                "    {}...    collecting data ({}/{} candles)",
                instrument,
                candles.len(),
                self.strategy.min_candles_required()
            );
            return Ok(None);
        }

        let signal = match self
            .strategy
            .evaluate_candles(instrument, &candles, has_open_position)
        {
            Some(signal) => signal,
            None => {
                tracing::info!("    {}...    no signal", instrument);
                return Ok(None);
            }
        };

        let position = self.tracker.open(signal.clone())?;

        tracing::info!(
            "    {}...    SIGNAL {} | Channel {}",
            instrument,
            signal.direction,
            signal.channel_type
        );
        tracing::info!("        💰 Entry: {:.4}", signal.entry_price);
        tracing::info!(
            "        🛡️  SL: {:.4} | 🎯 TP: {:.4}",
            signal.stop_loss,
            signal.take_profit
        );
        tracing::info!(
            "        📊 R/R: {:.2} | Angle: {:.2}°",
            signal.risk_reward,
            signal.channel_angle
        );

        self.send(&format_entry_message(&signal, self.config.regression_length))
            .await;

        Ok(Some(position))
    }

    async fn send(&self, message: &str) {
        if let Err(e) = self.notifier.notify(message).await {
            tracing::warn!("Notification not delivered: {}", e);
        }
    }
}

/// Start watching `signal` right away and return a future that resolves once
/// it fires
///
/// `tokio::signal::ctrl_c` only installs its handler on first poll, so the
/// watcher is spawned and allowed to run once before this returns. Expects a
/// current-thread runtime.
pub async fn shutdown_listener<S>(signal: S) -> impl Future<Output = ()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                let _ = tx.send(());
            }
            Err(e) => {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                // Keep the sender alive so the scanner is not stopped
                let _tx = tx;
                std::future::pending::<()>().await;
            }
        }
    });

    tokio::task::yield_now().await;

    async move {
        let _ = rx.await;
    }
}

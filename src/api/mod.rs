pub mod binance;
pub mod messages;
pub mod telegram;

use async_trait::async_trait;

use crate::models::Candle;
use crate::Result;

pub use binance::BinanceFuturesClient;
pub use messages::{format_entry_message, format_exit_message};
pub use telegram::{LogNotifier, TelegramNotifier};

/// Source of candles and last prices
///
/// Any failure is reported as `Error::DataUnavailable`; callers skip the
/// instrument for the current cycle.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Most recent `count` candles for `instrument`, oldest first
    async fn fetch_recent_candles(
        &self,
        instrument: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>>;

    /// Last traded price for `instrument`
    async fn fetch_last_price(&self, instrument: &str) -> Result<f64>;

    /// Whether the source is reachable at all. A failure here aborts the
    /// whole cycle instead of skipping single instruments.
    async fn check_connectivity(&self) -> Result<()> {
        Ok(())
    }
}

/// Best-effort outbound message channel
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str) -> Result<()>;
}

/// Lets the binary pick a notifier at runtime
#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Box<T> {
    async fn notify(&self, message: &str) -> Result<()> {
        (**self).notify(message).await
    }
}

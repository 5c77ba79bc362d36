use async_trait::async_trait;
use std::collections::HashMap;

use crate::api::MarketData;
use crate::error::Error;
use crate::models::Candle;
use crate::Result;

/// Serves recorded candle series as if they were arriving live
///
/// Each instrument exposes a prefix of its series ending at the shared
/// cursor. `advance` moves the cursor one candle forward, so one scan cycle
/// per `advance` walks the whole series.
#[derive(Debug, Clone, Default)]
pub struct ReplayMarketData {
    series: HashMap<String, Vec<Candle>>,
    cursor: usize,
}

impl ReplayMarketData {
    /// Start with `warmup` candles visible (at least one)
    pub fn new(warmup: usize) -> Self {
        Self {
            series: HashMap::new(),
            cursor: warmup.max(1),
        }
    }

    pub fn with_series(mut self, instrument: &str, candles: Vec<Candle>) -> Self {
        self.insert(instrument, candles);
        self
    }

    pub fn insert(&mut self, instrument: &str, candles: Vec<Candle>) {
        self.series.insert(instrument.to_string(), candles);
    }

    /// Number of candles currently visible
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length of the longest series
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reveal one more candle. Returns false once every series is exhausted.
    pub fn advance(&mut self) -> bool {
        if self.cursor >= self.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    fn visible(&self, instrument: &str) -> Result<&[Candle]> {
        let candles = self
            .series
            .get(instrument)
            .ok_or_else(|| Error::data_unavailable(instrument, "no recorded series"))?;

        let end = self.cursor.min(candles.len());
        if end == 0 {
            return Err(Error::data_unavailable(instrument, "series is empty"));
        }
        Ok(&candles[..end])
    }
}

#[async_trait]
impl MarketData for ReplayMarketData {
    async fn fetch_recent_candles(
        &self,
        instrument: &str,
        _timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let visible = self.visible(instrument)?;
        let start = visible.len().saturating_sub(count);
        Ok(visible[start..].to_vec())
    }

    async fn fetch_last_price(&self, instrument: &str) -> Result<f64> {
        self.visible(instrument)?
            .last()
            .map(|c| c.close)
            .ok_or_else(|| Error::data_unavailable(instrument, "series is empty"))
    }
}

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use super::MarketData;
use crate::error::Error;
use crate::models::Candle;
use crate::Result;

const BINANCE_FUTURES_API_BASE: &str = "https://fapi.binance.com";
const MAX_KLINES_PER_REQUEST: usize = 1500;
const REQUESTS_PER_MINUTE: u32 = 600;
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Public market data client for Binance USDT-M futures
///
/// No API key is needed for klines and ticker prices. Clones share the same
/// rate limiter.
#[derive(Clone)]
pub struct BinanceFuturesClient {
    client: Client,
    base_url: String,
    rate_limiter: Arc<BinanceRateLimiter>,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

impl BinanceFuturesClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BINANCE_FUTURES_API_BASE)
    }

    /// Point the client at another host (testnet, mock server)
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let quota =
            Quota::per_minute(NonZeroU32::new(REQUESTS_PER_MINUTE).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
            max_retries: MAX_RETRIES,
        })
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Rate-limited GET with retry on transport errors, 429 and 5xx
    async fn get(
        &self,
        instrument: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.max_retries {
            self.rate_limiter.until_ready().await;

            match self.client.get(&url).query(query).send().await {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response);
                    }

                    if status.as_u16() != 429 && !status.is_server_error() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(Error::data_unavailable(
                            instrument,
                            format!("Binance API error {}: {}", status, body),
                        ));
                    }

                    last_error = format!("Binance API error {}", status);
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_retries {
                let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt - 1);
                tracing::warn!(
                    "Attempt {}/{} failed for {}: {}. Retrying in {}ms...",
                    attempt,
                    self.max_retries,
                    instrument,
                    last_error,
                    backoff_ms
                );
                sleep(Duration::from_millis(backoff_ms)).await;
            }
        }

        Err(Error::data_unavailable(instrument, last_error))
    }
}

#[async_trait]
impl MarketData for BinanceFuturesClient {
    async fn fetch_recent_candles(
        &self,
        instrument: &str,
        timeframe: &str,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let limit = count.clamp(1, MAX_KLINES_PER_REQUEST);
        let query = [
            ("symbol", instrument.to_string()),
            ("interval", timeframe.to_string()),
            ("limit", limit.to_string()),
        ];

        tracing::debug!(
            "Fetching klines: symbol={}, interval={}, limit={}",
            instrument,
            timeframe,
            limit
        );

        let rows: Vec<Vec<Value>> = self
            .get(instrument, "/fapi/v1/klines", &query)
            .await?
            .json()
            .await
            .map_err(|e| Error::data_unavailable(instrument, e.to_string()))?;

        let candles: Vec<Candle> = rows.iter().filter_map(|row| parse_kline(row)).collect();

        if candles.is_empty() {
            return Err(Error::data_unavailable(instrument, "empty kline response"));
        }

        Ok(candles)
    }

    async fn check_connectivity(&self) -> Result<()> {
        self.get("exchange", "/fapi/v1/ping", &[]).await?;
        Ok(())
    }

    async fn fetch_last_price(&self, instrument: &str) -> Result<f64> {
        let query = [("symbol", instrument.to_string())];

        let ticker: TickerPrice = self
            .get(instrument, "/fapi/v1/ticker/price", &query)
            .await?
            .json()
            .await
            .map_err(|e| Error::data_unavailable(instrument, e.to_string()))?;

        ticker
            .price
            .parse()
            .map_err(|_| Error::data_unavailable(instrument, format!("bad price {:?}", ticker.price)))
    }
}

/// Parse one kline row: [open_time, open, high, low, close, volume, ...]
///
/// Binance sends prices as strings; plain numbers are accepted too.
fn parse_kline(row: &[Value]) -> Option<Candle> {
    if row.len() < 6 {
        return None;
    }

    let open_time = row[0].as_i64()?;
    let timestamp: DateTime<Utc> = Utc.timestamp_millis_opt(open_time).single()?;

    Some(Candle {
        timestamp,
        open: number(&row[1])?,
        high: number(&row[2])?,
        low: number(&row[3])?,
        close: number(&row[4])?,
        volume: number(&row[5])?,
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

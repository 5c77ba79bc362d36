use crate::models::Candle;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketScenario {
    /// Rising channel with regular pullbacks
    Uptrend,
    /// Falling channel with regular rallies
    Downtrend,
    /// Mean-reverting range with no trend
    Sideways,
    /// Large random swings (±3% per candle)
    Volatile,
}

/// Generates synthetic price data for offline replay
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
    base_volume: f64,
}

impl SyntheticDataGenerator {
    /// Create a new generator with a seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 100.0,
            base_volume: 1_000_000.0,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_candles` candles spaced `interval_minutes` apart,
    /// ending now
    pub fn generate(
        &mut self,
        scenario: MarketScenario,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let start_time = Utc::now() - Duration::minutes(num_candles as i64 * interval_minutes);

        match scenario {
            MarketScenario::Uptrend => {
                self.generate_trend(start_time, num_candles, interval_minutes, 0.002)
            }
            MarketScenario::Downtrend => {
                self.generate_trend(start_time, num_candles, interval_minutes, -0.002)
            }
            MarketScenario::Sideways => {
                self.generate_sideways(start_time, num_candles, interval_minutes)
            }
            MarketScenario::Volatile => {
                self.generate_volatile(start_time, num_candles, interval_minutes)
            }
        }
    }

    /// Compounding drift per candle plus a 24-candle swing of ±1.5%
    fn generate_trend(
        &mut self,
        start_time: DateTime<Utc>,
        num_candles: usize,
        interval_minutes: i64,
        drift: f64,
    ) -> Vec<Candle> {
        let mut candles = Vec::with_capacity(num_candles);
        let mut trend_price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            trend_price *= 1.0 + drift;
            let swing = 0.015 * (i as f64 * std::f64::consts::TAU / 24.0).sin();
            let noise = self.rng.gen_range(-0.002..0.002);
            let price = trend_price * (1.0 + swing + noise);

            candles.push(self.create_candle(price, timestamp));
        }

        candles
    }

    /// Mean-reverting random walk around the base price
    fn generate_sideways(
        &mut self,
        start_time: DateTime<Utc>,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let mut candles = Vec::with_capacity(num_candles);
        let mut current_price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            let reversion = (self.base_price - current_price) * 0.1;
            let noise = current_price * self.rng.gen_range(-0.01..0.01);
            current_price += reversion + noise;

            candles.push(self.create_candle(current_price, timestamp));
        }

        candles
    }

    fn generate_volatile(
        &mut self,
        start_time: DateTime<Utc>,
        num_candles: usize,
        interval_minutes: i64,
    ) -> Vec<Candle> {
        let mut candles = Vec::with_capacity(num_candles);
        let mut current_price = self.base_price;

        for i in 0..num_candles {
            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);

            current_price += current_price * self.rng.gen_range(-0.03..0.03);
            current_price = current_price.max(self.base_price * 0.5);

            candles.push(self.create_candle(current_price, timestamp));
        }

        candles
    }

    /// Build an OHLC bar around a close price
    fn create_candle(&mut self, price: f64, timestamp: DateTime<Utc>) -> Candle {
        let noise_pct = 0.002;

        let high = price * (1.0 + self.rng.gen_range(0.0..noise_pct));
        let low = price * (1.0 - self.rng.gen_range(0.0..noise_pct));
        let open = (price * (1.0 + self.rng.gen_range(-noise_pct..noise_pct))).clamp(low, high);
        let volume = self.base_volume * self.rng.gen_range(0.7..1.3);

        Candle {
            timestamp,
            open,
            high,
            low,
            close: price,
            volume,
        }
    }
}

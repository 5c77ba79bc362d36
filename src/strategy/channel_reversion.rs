use crate::indicators::{
    calculate_regression_channel, classify_touch, trailing_mean, RegressionChannel,
};
use crate::models::{Candle, ChannelType, Direction, Signal};

/// Number of trailing volume samples averaged for the liquidity filter
pub const VOLUME_LOOKBACK: usize = 20;

/// Regression channel mean reversion strategy
///
/// Fits a linear regression channel to recent closes and trades touches of
/// the band that sits against the trend:
/// - LONG when the channel slopes up and price touches the lower band
/// - SHORT when the channel slopes down and price touches the upper band
///
/// An uptrend touching its own upper band (or a downtrend touching its lower
/// band) is trend continuation and never produces an entry.
#[derive(Debug, Clone)]
pub struct ChannelReversionStrategy {
    config: ChannelReversionConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReversionConfig {
    /// Number of closes the channel is fitted over
    pub regression_length: usize,

    /// Distance from a band, in percent, that still counts as a touch
    pub touch_threshold: f64,

    /// Minimum absolute channel angle in degrees
    pub min_trend_angle: f64,

    /// Stop distance beyond the band, in percent
    pub sl_percentage: f64,

    /// Minimum average volume over the last 20 candles
    pub min_volume: f64,
}

impl Default for ChannelReversionConfig {
    fn default() -> Self {
        Self {
            regression_length: 50,
            touch_threshold: 0.5,
            min_trend_angle: 0.5,
            sl_percentage: 1.0,
            min_volume: 0.0,
        }
    }
}

impl ChannelReversionStrategy {
    pub fn new(config: ChannelReversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChannelReversionConfig {
        &self.config
    }

    /// Minimum candles needed before a channel can be fitted
    pub fn min_candles_required(&self) -> usize {
        self.config.regression_length
    }

    /// Evaluate the latest candle of a series as the current price
    pub fn evaluate_candles(
        &self,
        instrument: &str,
        candles: &[Candle],
        has_open_position: bool,
    ) -> Option<Signal> {
        let current_price = candles.last()?.close;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

        self.evaluate(instrument, &closes, &volumes, current_price, has_open_position)
    }

    /// Decide whether `current_price` is an entry for `instrument`
    ///
    /// Returns None when a position is already open, history is too short,
    /// the channel is too flat, volume is too thin, or the touch does not go
    /// against the slope.
    pub fn evaluate(
        &self,
        instrument: &str,
        closes: &[f64],
        volumes: &[f64],
        current_price: f64,
        has_open_position: bool,
    ) -> Option<Signal> {
        if has_open_position {
            return None;
        }

        let channel = match calculate_regression_channel(closes, self.config.regression_length) {
            Some(channel) => channel,
            None => {
                tracing::debug!(
                    "{}: no channel ({} closes, need {})",
                    instrument,
                    closes.len(),
                    self.config.regression_length
                );
                return None;
            }
        };

        if channel.angle_degrees.abs() < self.config.min_trend_angle {
            tracing::debug!(
                "{}: channel too flat ({:.3}° < {}°)",
                instrument,
                channel.angle_degrees,
                self.config.min_trend_angle
            );
            return None;
        }

        let avg_volume = trailing_mean(volumes, VOLUME_LOOKBACK)?;
        if avg_volume < self.config.min_volume {
            tracing::debug!(
                "{}: volume too low ({:.0} < {:.0})",
                instrument,
                avg_volume,
                self.config.min_volume
            );
            return None;
        }

        let touch = classify_touch(current_price, &channel, self.config.touch_threshold);

        let direction = if channel.slope > 0.0 && touch.lower {
            Direction::Long
        } else if channel.slope < 0.0 && touch.upper {
            Direction::Short
        } else {
            return None;
        };

        let (stop_loss, take_profit) =
            stop_and_target(direction, &channel, self.config.sl_percentage);
        let risk_reward = risk_reward(direction, current_price, stop_loss, take_profit);

        let channel_type = if channel.slope > 0.0 {
            ChannelType::Up
        } else {
            ChannelType::Down
        };

        tracing::debug!(
            "{}: {} touch on {} channel, angle {:.2}°, R/R {:.2}",
            instrument,
            direction,
            channel_type,
            channel.angle_degrees,
            risk_reward
        );

        Some(Signal {
            instrument: instrument.to_string(),
            direction,
            entry_price: current_price,
            stop_loss,
            take_profit,
            risk_reward,
            channel_angle: channel.angle_degrees,
            slope: channel.slope,
            avg_volume,
            channel_type,
        })
    }
}

impl Default for ChannelReversionStrategy {
    fn default() -> Self {
        Self::new(ChannelReversionConfig::default())
    }
}

/// Stop-loss beyond the entry-side band, take-profit at the opposite band
pub fn stop_and_target(
    direction: Direction,
    channel: &RegressionChannel,
    sl_percentage: f64,
) -> (f64, f64) {
    let sl = sl_percentage / 100.0;
    let upper = channel.current_upper();
    let lower = channel.current_lower();

    match direction {
        Direction::Long => (lower * (1.0 - sl), upper),
        Direction::Short => (upper * (1.0 + sl), lower),
    }
}

/// Reward over risk; 0 when the risk is not positive
pub fn risk_reward(direction: Direction, entry: f64, stop_loss: f64, take_profit: f64) -> f64 {
    let (risk, reward) = match direction {
        Direction::Long => (entry - stop_loss, take_profit - entry),
        Direction::Short => (stop_loss - entry, entry - take_profit),
    };

    if risk > 0.0 {
        reward / risk
    } else {
        0.0
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLCV candlestick data, oldest first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Trade direction
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Direction of the regression channel slope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChannelType {
    Up,
    Down,
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Up => write!(f, "UP"),
            ChannelType::Down => write!(f, "DOWN"),
        }
    }
}

/// Entry opportunity produced by the strategy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Signal {
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub channel_angle: f64,
    pub slope: f64,
    pub avg_volume: f64,
    pub channel_type: ChannelType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExitReason {
    Stop,
    Target,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Stop => write!(f, "SL"),
            ExitReason::Target => write!(f, "TP"),
        }
    }
}

/// Simulated position tracked from signal to exit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub instrument: String,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub risk_reward: f64,
    pub opened_at: DateTime<Utc>,
    pub state: PositionState,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub pnl_percent: Option<f64>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    /// Signed percentage move from entry to `price` in the position's favour
    pub fn pnl_percent_at(&self, price: f64) -> f64 {
        match self.direction {
            Direction::Long => (price - self.entry_price) / self.entry_price * 100.0,
            Direction::Short => (self.entry_price - price) / self.entry_price * 100.0,
        }
    }
}

/// Aggregate performance over closed positions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Statistics {
    pub win_rate: f64,
    pub total_closed: usize,
    pub total_pnl_percent: f64,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_closed == 0 {
            return write!(f, "No closed positions");
        }
        write!(
            f,
            "Win Rate: {:.1}% | Ops: {} | PnL: {:+.2}%",
            self.win_rate, self.total_closed, self.total_pnl_percent
        )
    }
}

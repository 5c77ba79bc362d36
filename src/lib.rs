// Core modules
pub mod api;
pub mod backtest;
pub mod config;
pub mod error;
pub mod execution;
pub mod indicators;
pub mod models;
pub mod strategy;

// Re-export commonly used types
pub use api::{MarketData, Notifier};
pub use config::BotConfig;
pub use error::Error;
pub use execution::{CycleReport, PositionTracker, Scanner};
pub use models::*;
pub use strategy::{ChannelReversionConfig, ChannelReversionStrategy};

// Error handling
pub type Result<T> = std::result::Result<T, Error>;

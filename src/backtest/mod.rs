// Offline replay of synthetic or recorded candles
pub mod replay;
pub mod synthetic;

pub use replay::ReplayMarketData;
pub use synthetic::{MarketScenario, SyntheticDataGenerator};

// Technical indicators module
// Regression channel, band touches and moving averages

pub mod moving_average;
pub mod regression_channel;
pub mod touch;

pub use moving_average::{calculate_sma, trailing_mean};
pub use regression_channel::{calculate_regression_channel, RegressionChannel};
pub use touch::{classify_touch, Touch};

/// Simple moving average of the last `period` values
pub fn calculate_sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }

    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// Average over the most recent `period` values, or over all of them when
/// fewer are available. None only for an empty series.
pub fn trailing_mean(values: &[f64], period: usize) -> Option<f64> {
    let take = period.min(values.len());
    calculate_sma(values, take)
}

use super::RegressionChannel;

/// Which channel bands the current price is touching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Touch {
    pub upper: bool,
    pub lower: bool,
}

/// Check whether `price` is within `threshold_pct` percent of the most recent
/// upper or lower band value.
///
/// Both flags can be set at once when the channel is narrower than the
/// tolerance.
pub fn classify_touch(price: f64, channel: &RegressionChannel, threshold_pct: f64) -> Touch {
    let tolerance = threshold_pct / 100.0;

    Touch {
        upper: within(price, channel.current_upper(), tolerance),
        lower: within(price, channel.current_lower(), tolerance),
    }
}

fn within(price: f64, band: f64, tolerance: f64) -> bool {
    if band == 0.0 {
        return price == 0.0;
    }
    ((price - band) / band).abs() <= tolerance
}

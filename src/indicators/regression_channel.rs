/// Linear regression channel fitted over a trailing window of closes
///
/// All three series have the same length as the window, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionChannel {
    pub centerline: Vec<f64>,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
    pub slope: f64,
    pub angle_degrees: f64,
}

impl RegressionChannel {
    /// Most recent upper band value
    pub fn current_upper(&self) -> f64 {
        self.upper_band.last().copied().unwrap_or(f64::NAN)
    }

    /// Most recent lower band value
    pub fn current_lower(&self) -> f64 {
        self.lower_band.last().copied().unwrap_or(f64::NAN)
    }
}

/// Fit a regression channel over the last `length` prices
///
/// Ordinary least squares over x = 0..length-1, bands at one population
/// standard deviation of the residuals. The angle normalises the slope by the
/// mean price so channels are comparable across price scales.
///
/// Returns None when there is not enough history or the fit is degenerate
/// (fewer than two points, or a zero mean price).
pub fn calculate_regression_channel(prices: &[f64], length: usize) -> Option<RegressionChannel> {
    if length < 2 || prices.len() < length {
        return None;
    }

    let window = &prices[prices.len() - length..];
    let n = length as f64;

    let mean_x = (n - 1.0) / 2.0;
    let mean_y = window.iter().sum::<f64>() / n;

    if mean_y == 0.0 || !mean_y.is_finite() {
        return None;
    }

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, &y) in window.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let centerline: Vec<f64> = (0..length)
        .map(|i| slope * i as f64 + intercept)
        .collect();

    let variance = window
        .iter()
        .zip(&centerline)
        .map(|(y, fit)| (y - fit).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();

    let upper_band = centerline.iter().map(|c| c + std_dev).collect();
    let lower_band = centerline.iter().map(|c| c - std_dev).collect();

    let angle_degrees = (slope / mean_y).atan().to_degrees();

    Some(RegressionChannel {
        centerline,
        upper_band,
        lower_band,
        slope,
        angle_degrees,
    })
}

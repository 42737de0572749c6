use std::f64::consts::PI;

/// Sinusoidal seasonal multiplier for a calendar month (1 = January).
///
/// Peaks in March, troughs in September, and returns to 1.0 in June and December.
pub fn seasonal_factor(calendar_month: u32, amplitude: f64) -> f64 {
    1.0 + amplitude * (2.0 * PI * calendar_month as f64 / 12.0).sin()
}

/// Linear (non-compounding) growth multiplier for the `index`-th generated month.
pub fn growth_factor(index: usize, monthly_growth_rate: f64) -> f64 {
    1.0 + index as f64 * monthly_growth_rate
}

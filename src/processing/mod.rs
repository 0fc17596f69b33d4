pub mod merge;
pub mod normalize;

/// Percent change of `current` against `previous`, rounded to two
/// decimals. `None` when the base is zero: division by zero must never
/// leak NaN or infinity into an artifact.
pub fn calc_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some(((current - previous) / previous.abs() * 10_000.0).round() / 100.0)
}

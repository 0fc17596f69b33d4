pub mod hma;
pub mod kline_stats;
pub mod price_action;
pub mod rolling_vwap;
pub mod vwap_report;

/// Decimal places of the shortest display form, used to round derived
/// values to the precision of the instrument's close price.
pub(crate) fn count_decimal_places(value: f64) -> usize {
    if !value.is_finite() || value.fract() == 0.0 {
        return 0;
    }
    let text = format!("{value}");
    match text.split_once('.') {
        Some((_, decimals)) => decimals.len(),
        None => 0,
    }
}

pub(crate) fn round_to(value: f64, decimal_places: usize) -> f64 {
    let factor = 10f64.powi(decimal_places as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_places_follow_display_form() {
        assert_eq!(count_decimal_places(42.0), 0);
        assert_eq!(count_decimal_places(0.5), 1);
        assert_eq!(count_decimal_places(123.4567), 4);
        assert_eq!(count_decimal_places(f64::NAN), 0);
    }

    #[test]
    fn rounding_respects_precision() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(1.23556, 3), 1.236);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}

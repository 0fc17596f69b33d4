use crate::colors::{
    color_from_change_value, gradient_color_for_negative_range,
    gradient_color_for_positive_range, ColorPalette, NEUTRAL_HEX,
};
use crate::models::{CandleColors, SymbolSeries};

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    })
}

fn scale_to_unit(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    // a flat batch maps to 1.0, never to 0/0
    let scaled = if range == 0.0 { 1.0 } else { (value - min) / range };
    (scaled * 100.0).round() / 100.0
}

/// Scales the display metrics of each series into [0, 1] and attaches the
/// per-metric colors. Ranges are computed per symbol over that symbol's
/// own candle history in this batch, never across symbols.
pub fn normalize_kline_data(
    mut series_batch: Vec<SymbolSeries>,
    palette: Option<&ColorPalette>,
) -> Vec<SymbolSeries> {
    let hex = |pick: fn(&ColorPalette) -> &str| -> String {
        palette.map(pick).unwrap_or(NEUTRAL_HEX).to_string()
    };
    let cp_min_color = hex(|p| &p.close_price_min);
    let cp_max_color = hex(|p| &p.close_price_max);
    let br_min_color = hex(|p| &p.buyer_ratio_min);
    let br_max_color = hex(|p| &p.buyer_ratio_max);
    let qv_min_color = hex(|p| &p.quote_volume_min);
    let qv_max_color = hex(|p| &p.quote_volume_max);
    let vd_min_color = hex(|p| &p.volume_delta_min);
    let vd_max_color = hex(|p| &p.volume_delta_max);

    for series in series_batch.iter_mut() {
        let data = &mut series.data;

        let collect = |f: fn(&crate::models::Candle) -> Option<f64>| -> Vec<f64> {
            data.iter().map(|c| f(c).unwrap_or(0.0)).collect()
        };

        let close_prices: Vec<f64> = data.iter().map(|c| c.close_price).collect();
        let quote_volumes: Vec<f64> = data.iter().map(|c| c.quote_volume).collect();
        let buyer_ratios = collect(|c| c.buyer_ratio);
        let volume_deltas = collect(|c| c.volume_delta);
        let cp_changes = collect(|c| c.close_price_change);
        let br_changes = collect(|c| c.buyer_ratio_change);
        let qv_changes = collect(|c| c.quote_volume_change);
        let vd_changes = collect(|c| c.volume_delta_change);
        let ps_diffs = collect(|c| c.perp_spot_diff);

        let (cp_min, cp_max) = min_max(&close_prices);
        let (qv_min, qv_max) = min_max(&quote_volumes);
        let (br_min, br_max) = min_max(&buyer_ratios);
        let (vd_min, vd_max) = min_max(&volume_deltas);
        let (cpc_min, cpc_max) = min_max(&cp_changes);
        let (brc_min, brc_max) = min_max(&br_changes);
        let (qvc_min, qvc_max) = min_max(&qv_changes);
        let (vdc_min, vdc_max) = min_max(&vd_changes);
        let (ps_min, ps_max) = min_max(&ps_diffs);

        for candle in data.iter_mut() {
            let buyer_ratio = candle.buyer_ratio.unwrap_or(0.0);
            let volume_delta = candle.volume_delta.unwrap_or(0.0);

            let normalized_cp = scale_to_unit(candle.close_price, cp_min, cp_max);
            let normalized_qv = scale_to_unit(candle.quote_volume, qv_min, qv_max);
            let normalized_br = scale_to_unit(buyer_ratio, br_min, br_max);
            let normalized_vd = scale_to_unit(volume_delta, vd_min, vd_max);

            candle.normalized_close_price = Some(normalized_cp);
            candle.normalized_quote_volume = Some(normalized_qv);
            candle.normalized_buyer_ratio = Some(normalized_br);
            candle.normalized_volume_delta = Some(normalized_vd);

            candle.colors = Some(CandleColors {
                close_price: gradient_color_for_positive_range(
                    normalized_cp,
                    &cp_min_color,
                    &cp_max_color,
                ),
                close_price_change: color_from_change_value(
                    candle.close_price_change.unwrap_or(0.0),
                    cpc_min,
                    cpc_max,
                ),
                buyer_ratio: gradient_color_for_positive_range(
                    normalized_br,
                    &br_min_color,
                    &br_max_color,
                ),
                buyer_ratio_change: color_from_change_value(
                    candle.buyer_ratio_change.unwrap_or(0.0),
                    brc_min,
                    brc_max,
                ),
                quote_volume: gradient_color_for_positive_range(
                    normalized_qv,
                    &qv_min_color,
                    &qv_max_color,
                ),
                quote_volume_change: color_from_change_value(
                    candle.quote_volume_change.unwrap_or(0.0),
                    qvc_min,
                    qvc_max,
                ),
                perp_spot_diff: color_from_change_value(
                    candle.perp_spot_diff.unwrap_or(0.0),
                    ps_min,
                    ps_max,
                ),
                // sign decides here, fed the raw delta
                volume_delta: gradient_color_for_negative_range(
                    volume_delta,
                    &vd_min_color,
                    &vd_max_color,
                ),
                volume_delta_change: color_from_change_value(
                    candle.volume_delta_change.unwrap_or(0.0),
                    vdc_min,
                    vdc_max,
                ),
            });
        }
    }

    series_batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;

    fn series_with_closes(closes: &[f64]) -> SymbolSeries {
        SymbolSeries {
            symbol: "TESTUSDT".to_string(),
            category: "test".to_string(),
            exchanges: vec![],
            image_url: String::new(),
            data: closes
                .iter()
                .enumerate()
                .map(|(i, &close)| Candle {
                    open_time: i as i64,
                    close_price: close,
                    quote_volume: 100.0 + i as f64,
                    buyer_ratio: Some(50.0),
                    volume_delta: Some(10.0),
                    ..Candle::default()
                })
                .collect(),
        }
    }

    #[test]
    fn uniform_batch_normalizes_to_one() {
        let out = normalize_kline_data(vec![series_with_closes(&[42.0, 42.0, 42.0])], None);
        for candle in &out[0].data {
            assert_eq!(candle.normalized_close_price, Some(1.0));
            assert_eq!(candle.normalized_buyer_ratio, Some(1.0));
            assert_eq!(candle.normalized_volume_delta, Some(1.0));
        }
    }

    #[test]
    fn extremes_map_to_zero_and_one() {
        let out = normalize_kline_data(vec![series_with_closes(&[10.0, 15.0, 20.0])], None);
        let data = &out[0].data;
        assert_eq!(data[0].normalized_close_price, Some(0.0));
        assert_eq!(data[1].normalized_close_price, Some(0.5));
        assert_eq!(data[2].normalized_close_price, Some(1.0));
    }

    #[test]
    fn missing_palette_falls_back_to_white() {
        let out = normalize_kline_data(vec![series_with_closes(&[10.0, 20.0])], None);
        let colors = out[0].data[1].colors.as_ref().unwrap();
        assert_eq!(colors.close_price, "#ffffff");
    }

    #[test]
    fn palette_gradient_is_applied_to_magnitude_metrics() {
        let palette = ColorPalette {
            close_price_min: "#000000".to_string(),
            close_price_max: "#ffffff".to_string(),
            ..ColorPalette::default()
        };
        let out = normalize_kline_data(vec![series_with_closes(&[10.0, 20.0])], Some(&palette));
        let data = &out[0].data;
        assert_eq!(data[0].colors.as_ref().unwrap().close_price, "#000000");
        assert_eq!(data[1].colors.as_ref().unwrap().close_price, "#ffffff");
    }

    #[test]
    fn volume_delta_color_is_sign_based() {
        let mut series = series_with_closes(&[10.0, 20.0]);
        series.data[0].volume_delta = Some(-5.0);
        series.data[1].volume_delta = Some(5.0);
        let palette = ColorPalette::default();
        let out = normalize_kline_data(vec![series], Some(&palette));
        assert_eq!(
            out[0].data[0].colors.as_ref().unwrap().volume_delta,
            palette.volume_delta_min
        );
        assert_eq!(
            out[0].data[1].colors.as_ref().unwrap().volume_delta,
            palette.volume_delta_max
        );
    }
}

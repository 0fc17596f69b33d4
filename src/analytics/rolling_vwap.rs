use crate::models::SymbolSeries;
use crate::timeframe::Timeframe;

use super::{count_decimal_places, round_to};

const MIN_BARS: usize = 10;

/// Computes the rolling VWAP and its deviation bands for every candle of
/// every series. The lookback window is time based per timeframe but never
/// shrinks below [`MIN_BARS`] candles when enough history exists.
pub fn calculate_rolling_vwap(mut series_batch: Vec<SymbolSeries>, timeframe: Timeframe) -> Vec<SymbolSeries> {
    let window_ms = timeframe.vwap_window_ms();

    for series in series_batch.iter_mut() {
        for i in 0..series.data.len() {
            let current = &series.data[i];
            let decimal_places = count_decimal_places(current.close_price);
            let window_start = current.open_time - window_ms;

            // walk back in time, extending past the window edge until the
            // minimum bar count is met
            let mut start = i;
            for j in (0..=i).rev() {
                let collected = i - j;
                if series.data[j].open_time >= window_start || collected < MIN_BARS {
                    start = j;
                } else {
                    break;
                }
            }

            let window = &series.data[start..=i];

            let mut sum_vol = 0.0;
            let mut sum_src_vol = 0.0;
            let mut sum_src_src_vol = 0.0;
            for bar in window {
                let hlc3 = bar.typical_price();
                sum_vol += bar.quote_volume;
                sum_src_vol += hlc3 * bar.quote_volume;
                sum_src_src_vol += bar.quote_volume * hlc3 * hlc3;
            }

            if sum_vol == 0.0 {
                continue;
            }

            let vwap = round_to(sum_src_vol / sum_vol, decimal_places);
            let variance = (sum_src_src_vol / sum_vol - vwap * vwap).max(0.0);
            let st_dev = round_to(variance.sqrt(), decimal_places);

            let candle = &mut series.data[i];
            candle.rolling_vwap = Some(vwap);
            candle.rolling_vwap_u_band = Some(round_to(vwap + st_dev, decimal_places));
            candle.rolling_vwap_l_band = Some(round_to(vwap - st_dev, decimal_places));
        }
    }

    series_batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Candle;

    fn series(candles: Vec<Candle>) -> SymbolSeries {
        SymbolSeries {
            symbol: "TESTUSDT".to_string(),
            category: "test".to_string(),
            exchanges: vec![],
            image_url: String::new(),
            data: candles,
        }
    }

    fn candle(open_time: i64, price: f64, volume: f64) -> Candle {
        Candle {
            open_time,
            high_price: price,
            low_price: price,
            close_price: price,
            quote_volume: volume,
            ..Candle::default()
        }
    }

    #[test]
    fn flat_prices_yield_zero_width_bands() {
        let hour = 3_600_000i64;
        let data: Vec<Candle> = (0..24).map(|i| candle(i * hour, 100.0, 50.0)).collect();
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);

        let last = out[0].data.last().unwrap();
        assert_eq!(last.rolling_vwap, Some(100.0));
        assert_eq!(last.rolling_vwap_u_band, Some(100.0));
        assert_eq!(last.rolling_vwap_l_band, Some(100.0));
    }

    #[test]
    fn vwap_weights_by_quote_volume() {
        let hour = 3_600_000i64;
        // two bars in window: price 100 with volume 300 and price 200 with
        // volume 100, vwap = (100*300 + 200*100) / 400 = 125
        let data = vec![candle(0, 100.0, 300.0), candle(hour, 200.0, 100.0)];
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);
        assert_eq!(out[0].data[1].rolling_vwap, Some(125.0));
    }

    #[test]
    fn single_candle_vwap_is_its_typical_price() {
        let data = vec![Candle {
            open_time: 0,
            high_price: 110.0,
            low_price: 90.0,
            close_price: 100.0,
            quote_volume: 42.0,
            ..Candle::default()
        }];
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);
        let only = &out[0].data[0];
        assert_eq!(only.rolling_vwap, Some(100.0));
        assert_eq!(only.rolling_vwap_u_band, Some(100.0));
        assert_eq!(only.rolling_vwap_l_band, Some(100.0));
    }

    #[test]
    fn zero_volume_window_is_skipped() {
        let data = vec![candle(0, 100.0, 0.0)];
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);
        assert_eq!(out[0].data[0].rolling_vwap, None);
        assert_eq!(out[0].data[0].rolling_vwap_u_band, None);
    }

    #[test]
    fn values_round_to_close_price_precision() {
        let hour = 3_600_000i64;
        let data = vec![candle(0, 100.12, 100.0), candle(hour, 100.56, 200.0)];
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);
        // vwap = (100.12*100 + 100.56*200) / 300 = 100.4133..., close has
        // 2 decimals so the stored value is rounded to 100.41
        assert_eq!(out[0].data[1].rolling_vwap, Some(100.41));
    }

    #[test]
    fn short_history_still_extends_to_min_bars() {
        let day = 24 * 3_600_000i64;
        // daily bars far older than the 1h window still count toward the
        // minimum bar extension
        let data: Vec<Candle> = (0..12).map(|i| candle(i * day, 100.0 + i as f64, 10.0)).collect();
        let out = calculate_rolling_vwap(vec![series(data)], Timeframe::H1);
        assert!(out[0].data.last().unwrap().rolling_vwap.is_some());
    }
}

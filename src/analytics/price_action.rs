use crate::models::{
    Candle, PriceActionBucket, PriceActionReport, PriceActionStatsBucket, PriceActionStatsReport,
    SymbolSeries,
};
use crate::timeframe::Timeframe;
use std::collections::BTreeMap;

const ACTION_WINDOW: usize = 10;
const STATS_LIMIT: usize = 50;

fn body(candle: &Candle) -> f64 {
    (candle.close_price - candle.open_price).abs()
}

fn range(candle: &Candle) -> f64 {
    candle.high_price - candle.low_price
}

/// Small body with a long wick on either side.
pub fn is_pinbar(candle: &Candle) -> bool {
    let range = range(candle);
    let upper_wick = candle.high_price - candle.open_price.max(candle.close_price);
    let lower_wick = candle.open_price.min(candle.close_price) - candle.low_price;
    body(candle) / range < 0.3 && (upper_wick / range > 0.4 || lower_wick / range > 0.4)
}

/// Small body with a long lower wick.
pub fn is_hammer(candle: &Candle) -> bool {
    let range = range(candle);
    let lower_wick = candle.open_price.min(candle.close_price) - candle.low_price;
    body(candle) / range < 0.3 && lower_wick / range > 0.5
}

/// Open and close nearly equal.
pub fn is_doji(candle: &Candle) -> bool {
    body(candle) / range(candle) < 0.1
}

pub fn is_bullish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.close_price < prev.open_price
        && curr.close_price > curr.open_price
        && curr.open_price < prev.close_price
        && curr.close_price > prev.open_price
}

pub fn is_bearish_engulfing(prev: &Candle, curr: &Candle) -> bool {
    prev.close_price > prev.open_price
        && curr.close_price < curr.open_price
        && curr.open_price > prev.close_price
        && curr.close_price < prev.open_price
}

/// Pattern counts aggregated over every candle of every symbol, bucketed
/// per open time and truncated to the latest buckets.
pub fn calculate_price_action_stats(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> PriceActionStatsReport {
    let mut buckets: BTreeMap<i64, PriceActionStatsBucket> = BTreeMap::new();

    for coin in series_batch {
        let mut prev: Option<&Candle> = None;

        for candle in &coin.data {
            let bucket = buckets
                .entry(candle.open_time)
                .or_insert_with(|| PriceActionStatsBucket {
                    open_time: candle.open_time,
                    close_time: candle.close_time,
                    ..PriceActionStatsBucket::default()
                });

            if candle.is_bullish() {
                bucket.bullish_candles += 1;
            }
            if is_pinbar(candle) {
                bucket.pinbars += 1;
            }
            if is_hammer(candle) {
                bucket.hammers += 1;
            }
            if is_doji(candle) {
                bucket.dojis += 1;
            }
            if let Some(prev) = prev {
                if is_bullish_engulfing(prev, candle) {
                    bucket.bullish_engulfings += 1;
                }
                if is_bearish_engulfing(prev, candle) {
                    bucket.bearish_engulfings += 1;
                }
            }

            prev = Some(candle);
        }
    }

    let mut data: Vec<PriceActionStatsBucket> = buckets.into_values().collect();
    let keep_from = data.len().saturating_sub(STATS_LIMIT);
    PriceActionStatsReport {
        total_coins: series_batch.len(),
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data: data.split_off(keep_from),
    }
}

/// Symbols showing each pattern over the latest candles, bucketed per
/// open time.
pub fn calculate_price_action(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> PriceActionReport {
    let mut buckets: BTreeMap<i64, PriceActionBucket> = BTreeMap::new();

    for coin in series_batch {
        let tail_start = coin.data.len().saturating_sub(ACTION_WINDOW);
        let tail = &coin.data[tail_start..];

        for (i, candle) in tail.iter().enumerate() {
            let bucket = buckets
                .entry(candle.open_time)
                .or_insert_with(|| PriceActionBucket {
                    open_time: candle.open_time,
                    close_time: candle.close_time,
                    ..PriceActionBucket::default()
                });

            if is_pinbar(candle) {
                bucket.pinbars.push(coin.symbol.clone());
            }
            if is_hammer(candle) {
                bucket.hammers.push(coin.symbol.clone());
            }
            if is_doji(candle) {
                bucket.dojis.push(coin.symbol.clone());
            }
            if i > 0 {
                let prev = &tail[i - 1];
                if is_bullish_engulfing(prev, candle) {
                    bucket.bullish_engulfings.push(coin.symbol.clone());
                }
                if is_bearish_engulfing(prev, candle) {
                    bucket.bearish_engulfings.push(coin.symbol.clone());
                }
            }
        }
    }

    PriceActionReport {
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data: buckets.into_values().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            open_price: open,
            high_price: high,
            low_price: low,
            close_price: close,
            quote_volume: 10.0,
            ..Candle::default()
        }
    }

    #[test]
    fn hammer_has_small_body_and_long_lower_wick() {
        // body 1 of range 10, lower wick 8
        assert!(is_hammer(&candle(9.0, 11.0, 1.0, 10.0)));
        // long upper wick instead
        assert!(!is_hammer(&candle(2.0, 11.0, 1.0, 3.0)));
    }

    #[test]
    fn pinbar_accepts_either_wick() {
        assert!(is_pinbar(&candle(9.0, 11.0, 1.0, 10.0)));
        assert!(is_pinbar(&candle(2.0, 11.0, 1.0, 3.0)));
        // full-body candle
        assert!(!is_pinbar(&candle(1.0, 11.0, 1.0, 11.0)));
    }

    #[test]
    fn doji_requires_a_tiny_body() {
        assert!(is_doji(&candle(10.0, 15.0, 5.0, 10.5)));
        assert!(!is_doji(&candle(10.0, 15.0, 5.0, 12.0)));
    }

    #[test]
    fn engulfing_requires_opposite_bodies() {
        let bearish = candle(10.0, 11.0, 8.0, 9.0);
        let engulfer = candle(8.5, 12.0, 8.0, 11.0);
        assert!(is_bullish_engulfing(&bearish, &engulfer));
        assert!(!is_bearish_engulfing(&bearish, &engulfer));

        let bullish = candle(9.0, 11.0, 8.0, 10.0);
        let bear_engulfer = candle(10.5, 11.0, 7.0, 8.0);
        assert!(is_bearish_engulfing(&bullish, &bear_engulfer));
    }

    fn series(symbol: &str, candles: Vec<Candle>) -> SymbolSeries {
        SymbolSeries {
            symbol: symbol.to_string(),
            category: "test".to_string(),
            exchanges: vec![],
            image_url: String::new(),
            data: candles,
        }
    }

    #[test]
    fn stats_count_patterns_per_open_time() {
        let mut hammer = candle(9.0, 11.0, 1.0, 10.0);
        hammer.open_time = 100;
        hammer.close_time = 199;
        let mut plain = candle(1.0, 11.0, 1.0, 11.0);
        plain.open_time = 100;
        plain.close_time = 199;

        let report = calculate_price_action_stats(
            &[series("AUSDT", vec![hammer]), series("BUSDT", vec![plain])],
            Timeframe::H1,
            "test",
            0,
        );
        assert_eq!(report.total_coins, 2);
        assert_eq!(report.data.len(), 1);
        let bucket = &report.data[0];
        assert_eq!(bucket.hammers, 1);
        assert_eq!(bucket.bullish_candles, 2);
    }

    #[test]
    fn action_lists_symbols_and_limits_the_window() {
        let candles: Vec<Candle> = (0..20)
            .map(|i| {
                let mut c = candle(9.0, 11.0, 1.0, 10.0);
                c.open_time = i as i64 * 100;
                c.close_time = i as i64 * 100 + 99;
                c
            })
            .collect();
        let report =
            calculate_price_action(&[series("AUSDT", candles)], Timeframe::H1, "test", 0);
        // only the last 10 candles produce buckets
        assert_eq!(report.data.len(), 10);
        assert_eq!(report.data[0].open_time, 1000);
        assert_eq!(report.data[0].hammers, vec!["AUSDT".to_string()]);
    }
}

use crate::models::{KlineStatsBucket, KlineStatsReport, SymbolSeries};
use crate::timeframe::Timeframe;
use std::collections::BTreeMap;

const STATS_LIMIT: usize = 50;

/// Counts per open time how many symbols sit in, crossed, or left the
/// rolling VWAP bands. Candles without a VWAP are excluded entirely.
pub fn calculate_kline_stats(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> KlineStatsReport {
    let mut buckets: BTreeMap<i64, KlineStatsBucket> = BTreeMap::new();

    for coin in series_batch {
        for candle in &coin.data {
            let (vwap, ub, lb) = match (
                candle.rolling_vwap,
                candle.rolling_vwap_u_band,
                candle.rolling_vwap_l_band,
            ) {
                (Some(vwap), Some(ub), Some(lb)) => (vwap, ub, lb),
                _ => continue,
            };

            let o = candle.open_price;
            let c = candle.close_price;

            let bucket = buckets
                .entry(candle.open_time)
                .or_insert_with(|| KlineStatsBucket {
                    open_time: candle.open_time,
                    close_time: candle.close_time,
                    ..KlineStatsBucket::default()
                });

            if c > o {
                bucket.bullish_candles += 1;
            }
            if o > ub && c > ub {
                bucket.above_u_band += 1;
            }
            if o < lb && c < lb {
                bucket.below_l_band += 1;
            }
            if o > lb && o < ub && c > lb && c < ub {
                bucket.inside_bands += 1;
            }
            if o < ub && c > ub {
                bucket.cross_u_band_up += 1;
            }
            if o < lb && c > lb {
                bucket.cross_l_band_up += 1;
            }
            if o > ub && c < ub {
                bucket.cross_u_band_down += 1;
            }
            if o > lb && c < lb {
                bucket.cross_l_band_down += 1;
            }
            if o < vwap && c > vwap {
                bucket.cross_vwap_up += 1;
            }
            if o > vwap && c < vwap {
                bucket.cross_vwap_down += 1;
            }
        }
    }

    let mut data: Vec<KlineStatsBucket> = buckets.into_values().collect();
    let keep_from = data.len().saturating_sub(STATS_LIMIT);
    KlineStatsReport {
        total_coins: series_batch.len(),
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data: data.split_off(keep_from),
    }
}

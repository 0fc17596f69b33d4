use crate::models::{HmaActionBucket, HmaActionReport, HmaStatsItem, HmaStatsReport, SymbolSeries};
use crate::timeframe::Timeframe;
use std::collections::BTreeMap;

const HMA_LENGTH: usize = 20;
const ACTION_WINDOW: usize = 11;
const STATS_LIMIT: usize = 50;

fn wma(values: &[Option<f64>], length: usize) -> Vec<Option<f64>> {
    let denominator = (length * (length + 1)) as f64 / 2.0;
    values
        .iter()
        .enumerate()
        .map(|(i, _)| {
            if i + 1 < length {
                return None;
            }
            let slice = &values[i + 1 - length..=i];
            let mut weighted_sum = 0.0;
            for (idx, value) in slice.iter().enumerate() {
                weighted_sum += (*value)? * (idx + 1) as f64;
            }
            Some(weighted_sum / denominator)
        })
        .collect()
}

/// Hull moving average over closes, undefined while the warmup windows
/// have not filled.
pub fn calculate_hma(closes: &[f64], length: usize) -> Vec<Option<f64>> {
    let half_length = ((length as f64) / 2.0).round() as usize;
    let sqrt_length = (length as f64).sqrt().round() as usize;

    let values: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    let wma_half = wma(&values, half_length);
    let wma_full = wma(&values, length);
    let diff: Vec<Option<f64>> = wma_half
        .iter()
        .zip(wma_full.iter())
        .map(|(h, f)| Some(2.0 * (*h)? - (*f)?))
        .collect();
    wma(&diff, sqrt_length)
}

/// Per-symbol summary of how closes sit against the HMA over the whole
/// history, keyed to the symbol's latest candle.
pub fn calculate_hma_stats(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> HmaStatsReport {
    let mut stats: Vec<HmaStatsItem> = Vec::with_capacity(series_batch.len());

    for coin in series_batch {
        let last = match coin.data.last() {
            Some(last) => last,
            None => continue,
        };
        let closes: Vec<f64> = coin.data.iter().map(|c| c.close_price).collect();
        let hma = calculate_hma(&closes, HMA_LENGTH);

        let mut item = HmaStatsItem {
            open_time: last.open_time,
            close_time: last.close_time,
            ..HmaStatsItem::default()
        };

        for i in 1..coin.data.len() {
            let candle = &coin.data[i];
            let price = candle.close_price;
            let hma_val = match hma[i] {
                Some(v) => v,
                None => continue,
            };

            if price > hma_val {
                item.above_hma += 1;
            } else if price < hma_val {
                item.below_hma += 1;
            }

            let prev_hma_val = match hma[i - 1] {
                Some(v) => v,
                None => continue,
            };
            let prev_price = coin.data[i - 1].close_price;

            if prev_price < prev_hma_val && price > hma_val {
                item.cross_hma_up += 1;
            } else if prev_price > prev_hma_val && price < hma_val {
                item.cross_hma_down += 1;
            }

            if candle.is_bullish() {
                item.bullish_candle += 1;
            }
        }

        stats.push(item);
    }

    let keep_from = stats.len().saturating_sub(STATS_LIMIT);
    HmaStatsReport {
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data: stats.split_off(keep_from),
    }
}

/// Symbols that crossed the HMA up or down inside the latest candles,
/// bucketed per open time across the whole batch.
pub fn calculate_hma_action(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> HmaActionReport {
    let mut buckets: BTreeMap<i64, HmaActionBucket> = BTreeMap::new();

    for coin in series_batch {
        let closes: Vec<f64> = coin.data.iter().map(|c| c.close_price).collect();
        let hma = calculate_hma(&closes, HMA_LENGTH);

        let tail_start = coin.data.len().saturating_sub(ACTION_WINDOW);
        let tail = &coin.data[tail_start..];

        for i in 1..tail.len() {
            let prev_close = tail[i - 1].close_price;
            let curr_close = tail[i].close_price;
            let prev_hma = hma[tail_start + i - 1];
            let curr_hma = hma[tail_start + i];

            let bucket = buckets
                .entry(tail[i].open_time)
                .or_insert_with(|| HmaActionBucket {
                    open_time: tail[i].open_time,
                    close_time: tail[i].close_time,
                    ..HmaActionBucket::default()
                });

            if let (Some(prev_hma), Some(curr_hma)) = (prev_hma, curr_hma) {
                if prev_close < prev_hma && curr_close > curr_hma {
                    bucket.cross_hma_up.push(coin.symbol.clone());
                } else if prev_close > prev_hma && curr_close < curr_hma {
                    bucket.cross_hma_down.push(coin.symbol.clone());
                }
            }
        }
    }

    let mut data: Vec<HmaActionBucket> = buckets.into_values().collect();
    let keep_from = data.len().saturating_sub(STATS_LIMIT);
    HmaActionReport {
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data: data.split_off(keep_from),
    }
}

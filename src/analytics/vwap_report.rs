use crate::models::{
    Candle, SymbolSeries, VwapActionBucket, VwapActionReport, VwapStatsBucket, VwapStatsReport,
};
use crate::timeframe::Timeframe;
use std::collections::{BTreeSet, HashMap};

const STATS_LIMIT: usize = 50;
const ACTION_LIMIT: usize = 15;

struct BandSignals {
    above_u_band: bool,
    below_l_band: bool,
    inside_bands: bool,
    cross_u_band_up: bool,
    cross_l_band_up: bool,
    cross_u_band_down: bool,
    cross_l_band_down: bool,
    cross_vwap_up: bool,
    cross_vwap_down: bool,
}

/// Open/close position of one candle against its VWAP and bands.
/// Candles that never got a VWAP read the levels as zero, matching how
/// partially warmed histories are reported.
fn band_signals(candle: &Candle) -> BandSignals {
    let o = candle.open_price;
    let c = candle.close_price;
    let vwap = candle.rolling_vwap.unwrap_or(0.0);
    let ub = candle.rolling_vwap_u_band.unwrap_or(0.0);
    let lb = candle.rolling_vwap_l_band.unwrap_or(0.0);

    BandSignals {
        above_u_band: o > ub && c > ub,
        below_l_band: o < lb && c < lb,
        inside_bands: o > lb && o < ub && c > lb && c < ub,
        cross_u_band_up: o < ub && c > ub,
        cross_l_band_up: o < lb && c > lb,
        cross_u_band_down: o > ub && c < ub,
        cross_l_band_down: o > lb && c < lb,
        cross_vwap_up: o < vwap && c > vwap,
        cross_vwap_down: o > vwap && c < vwap,
    }
}

fn sorted_open_times(series_batch: &[SymbolSeries]) -> Vec<i64> {
    let mut times: BTreeSet<i64> = BTreeSet::new();
    for coin in series_batch {
        for candle in &coin.data {
            times.insert(candle.open_time);
        }
    }
    times.into_iter().collect()
}

fn candle_index(series_batch: &[SymbolSeries]) -> Vec<(&str, HashMap<i64, &Candle>)> {
    series_batch
        .iter()
        .map(|coin| {
            let by_time: HashMap<i64, &Candle> =
                coin.data.iter().map(|c| (c.open_time, c)).collect();
            (coin.symbol.as_str(), by_time)
        })
        .collect()
}

/// Per open time, the symbols in each VWAP band position, over the
/// latest buckets of the whole batch.
pub fn calculate_vwap_stats(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> VwapStatsReport {
    let interval_ms = timeframe.interval_ms();
    let times = sorted_open_times(series_batch);
    let index = candle_index(series_batch);

    let keep_from = times.len().saturating_sub(STATS_LIMIT);
    let mut data: Vec<VwapStatsBucket> = Vec::with_capacity(times.len() - keep_from);

    for &open_time in &times[keep_from..] {
        let mut bucket = VwapStatsBucket {
            open_time,
            close_time: open_time + interval_ms,
            ..VwapStatsBucket::default()
        };

        for (symbol, by_time) in &index {
            let candle = match by_time.get(&open_time) {
                Some(candle) => candle,
                None => continue,
            };
            let signals = band_signals(candle);
            let sym = symbol.to_string();

            if signals.above_u_band {
                bucket.above_u_band.push(sym.clone());
            }
            if signals.below_l_band {
                bucket.below_l_band.push(sym.clone());
            }
            if signals.inside_bands {
                bucket.inside_bands.push(sym.clone());
            }
            if signals.cross_u_band_up {
                bucket.cross_u_band_up.push(sym.clone());
            }
            if signals.cross_l_band_up {
                bucket.cross_l_band_up.push(sym.clone());
            }
            if signals.cross_u_band_down {
                bucket.cross_u_band_down.push(sym.clone());
            }
            if signals.cross_l_band_down {
                bucket.cross_l_band_down.push(sym.clone());
            }
            if signals.cross_vwap_up {
                bucket.cross_vwap_up.push(sym.clone());
            }
            if signals.cross_vwap_down {
                bucket.cross_vwap_down.push(sym);
            }
        }

        data.push(bucket);
    }

    VwapStatsReport {
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data,
    }
}

/// Like the stats report but restricted to the most recent open times
/// and without the inside-bands membership.
pub fn calculate_vwap_action(
    series_batch: &[SymbolSeries],
    timeframe: Timeframe,
    project_name: &str,
    expiration_time: i64,
) -> VwapActionReport {
    let interval_ms = timeframe.interval_ms();
    let times = sorted_open_times(series_batch);
    let index = candle_index(series_batch);

    let keep_from = times.len().saturating_sub(ACTION_LIMIT);
    let mut data: Vec<VwapActionBucket> = Vec::with_capacity(times.len() - keep_from);

    for &open_time in &times[keep_from..] {
        let mut bucket = VwapActionBucket {
            open_time,
            close_time: open_time + interval_ms,
            ..VwapActionBucket::default()
        };

        for (symbol, by_time) in &index {
            let candle = match by_time.get(&open_time) {
                Some(candle) => candle,
                None => continue,
            };
            let signals = band_signals(candle);
            let sym = symbol.to_string();

            if signals.above_u_band {
                bucket.above_u_band.push(sym.clone());
            }
            if signals.below_l_band {
                bucket.below_l_band.push(sym.clone());
            }
            if signals.cross_u_band_up {
                bucket.cross_u_band_up.push(sym.clone());
            }
            if signals.cross_l_band_up {
                bucket.cross_l_band_up.push(sym.clone());
            }
            if signals.cross_u_band_down {
                bucket.cross_u_band_down.push(sym.clone());
            }
            if signals.cross_l_band_down {
                bucket.cross_l_band_down.push(sym.clone());
            }
            if signals.cross_vwap_up {
                bucket.cross_vwap_up.push(sym.clone());
            }
            if signals.cross_vwap_down {
                bucket.cross_vwap_down.push(sym);
            }
        }

        data.push(bucket);
    }

    VwapActionReport {
        project_name: project_name.to_string(),
        timeframe,
        expiration_time,
        data,
    }
}

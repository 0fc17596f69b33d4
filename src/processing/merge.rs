use std::collections::HashMap;

use super::calc_change;
use crate::models::{SpotSeries, SymbolSeries};

/// Joins perpetual series with spot series by symbol and open time,
/// attaching the spot close, the perp-vs-spot percent difference and the
/// four period-over-period changes. Each series loses its first candle:
/// it has no predecessor for the change fields. Perp series are
/// authoritative; spot-only symbols are dropped.
pub fn merge_spot_with_perps(
    perps: Vec<SymbolSeries>,
    spot: Vec<SpotSeries>,
) -> Vec<SymbolSeries> {
    let mut spot_map: HashMap<String, HashMap<i64, f64>> = HashMap::new();
    for spot_series in spot {
        let time_map = spot_map.entry(spot_series.symbol).or_default();
        for entry in spot_series.data {
            time_map.insert(entry.open_time, entry.close_price);
        }
    }

    perps
        .into_iter()
        .map(|mut series| {
            let spot_for_symbol = spot_map.get(&series.symbol);
            let mut prev: Option<(f64, f64, f64, f64)> = None;

            for candle in series.data.iter_mut() {
                let spot_close = spot_for_symbol
                    .and_then(|by_time| by_time.get(&candle.open_time))
                    .copied();

                candle.spot_close_price = spot_close;
                candle.perp_spot_diff = match spot_close {
                    Some(sc) => calc_change(candle.close_price, sc),
                    None => Some(0.0),
                };

                let volume_delta = candle.volume_delta.unwrap_or(0.0);
                let buyer_ratio = candle.buyer_ratio.unwrap_or(0.0);

                match prev {
                    Some((p_quote, p_close, p_delta, p_ratio)) => {
                        candle.quote_volume_change = calc_change(candle.quote_volume, p_quote);
                        candle.close_price_change = calc_change(candle.close_price, p_close);
                        candle.volume_delta_change = calc_change(volume_delta, p_delta);
                        candle.buyer_ratio_change = calc_change(buyer_ratio, p_ratio);
                    }
                    None => {
                        candle.quote_volume_change = Some(0.0);
                        candle.close_price_change = Some(0.0);
                        candle.volume_delta_change = Some(0.0);
                        candle.buyer_ratio_change = Some(0.0);
                    }
                }

                prev = Some((
                    candle.quote_volume,
                    candle.close_price,
                    volume_delta,
                    buyer_ratio,
                ));
            }

            if !series.data.is_empty() {
                series.data.remove(0);
            }
            series
        })
        .collect()
}

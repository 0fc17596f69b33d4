use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{browser_headers, round2, run_bounded, series_meta, trim_both_edges};
use crate::config::Config;
use crate::error::Result;
use crate::models::{Candle, FetchOutcome, SpotCandle, SpotSeries, SymbolRef, SymbolSeries};
use crate::timeframe::Timeframe;

/// One raw kline row:
/// [openTime, open, high, low, close, volume, closeTime, quoteVolume,
///  trades, takerBuyBase, takerBuyQuote, ignore]
#[derive(Debug, Deserialize)]
struct RawKline(
    i64,
    String,
    String,
    String,
    String,
    String,
    i64,
    String,
    i64,
    String,
    String,
    serde_json::Value,
);

impl RawKline {
    fn open_time(&self) -> i64 {
        self.0
    }
}

fn parse_f64(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(0.0)
}

#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    config: Arc<Config>,
}

impl BinanceClient {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    /// Perpetual klines for every symbol, one outcome per input symbol.
    pub async fn fetch_perp_klines(
        &self,
        coins: &[SymbolRef],
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<FetchOutcome<SymbolSeries>>> {
        let interval = timeframe.binance_interval();
        run_bounded(coins, self.config.concurrency_limit, |coin| {
            let client = self.client.clone();
            let url = format!(
                "{}/fapi/v1/klines?symbol={}&interval={}&limit={}",
                self.config.binance_perp_api, coin.symbol, interval, limit
            );
            let delay = Duration::from_millis(self.config.fetch_delay_ms);
            async move {
                tokio::time::sleep(delay).await;
                match fetch_rows(&client, &url).await {
                    Ok(rows) => FetchOutcome::Success(build_perp_series(&coin, rows)),
                    Err(reason) => {
                        warn!("Error fetching {}: {}", coin.symbol, reason);
                        FetchOutcome::Failure {
                            symbol: coin.symbol,
                            reason,
                        }
                    }
                }
            }
        })
        .await
    }

    /// Spot klines: only open time and close price survive, the rest of
    /// the row is irrelevant to the merge.
    pub async fn fetch_spot_klines(
        &self,
        coins: &[SymbolRef],
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<FetchOutcome<SpotSeries>>> {
        let interval = timeframe.binance_interval();
        run_bounded(coins, self.config.concurrency_limit, |coin| {
            let client = self.client.clone();
            let url = format!(
                "{}/api/v3/klines?symbol={}&interval={}&limit={}",
                self.config.binance_spot_api, coin.symbol, interval, limit
            );
            let delay = Duration::from_millis(self.config.fetch_delay_ms);
            async move {
                tokio::time::sleep(delay).await;
                match fetch_rows(&client, &url).await {
                    Ok(rows) => FetchOutcome::Success(build_spot_series(&coin, rows)),
                    Err(reason) => {
                        warn!("Error fetching {}: {}", coin.symbol, reason);
                        FetchOutcome::Failure {
                            symbol: coin.symbol,
                            reason,
                        }
                    }
                }
            }
        })
        .await
    }
}

async fn fetch_rows(client: &Client, url: &str) -> std::result::Result<Vec<RawKline>, String> {
    let response = client
        .get(url)
        .headers(browser_headers())
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("status {status}: {body}"));
    }

    let mut rows: Vec<RawKline> = response
        .json()
        .await
        .map_err(|e| format!("invalid response structure: {e}"))?;

    // Upstream ordering is not trusted; sort and drop duplicate opens.
    rows.sort_by_key(RawKline::open_time);
    rows.dedup_by_key(|r| r.open_time());
    Ok(rows)
}

fn build_perp_series(coin: &SymbolRef, rows: Vec<RawKline>) -> SymbolSeries {
    let (category, exchanges, image_url) = series_meta(coin);
    let candles = rows
        .into_iter()
        .map(|row| {
            let base_volume = parse_f64(&row.5);
            let total_quote_volume = parse_f64(&row.7);
            let taker_buy_base = parse_f64(&row.9);
            let taker_buy_quote = parse_f64(&row.10);

            let buyer_ratio = if base_volume > 0.0 {
                round2(taker_buy_base / base_volume * 100.0)
            } else {
                0.0
            };
            let seller_quote_volume = total_quote_volume - taker_buy_quote;
            let volume_delta = round2(taker_buy_quote - seller_quote_volume);

            Candle {
                open_time: row.0,
                close_time: row.6,
                open_price: parse_f64(&row.1),
                high_price: parse_f64(&row.2),
                low_price: parse_f64(&row.3),
                close_price: parse_f64(&row.4),
                quote_volume: total_quote_volume,
                buyer_ratio: Some(buyer_ratio),
                volume_delta: Some(volume_delta),
                ..Candle::default()
            }
        })
        .collect();

    SymbolSeries {
        symbol: coin.symbol.clone(),
        category,
        exchanges,
        image_url,
        data: trim_both_edges(candles),
    }
}

fn build_spot_series(coin: &SymbolRef, rows: Vec<RawKline>) -> SpotSeries {
    let (category, exchanges, image_url) = series_meta(coin);
    let candles = rows
        .into_iter()
        .map(|row| SpotCandle {
            open_time: row.0,
            close_price: parse_f64(&row.4),
        })
        .collect();

    SpotSeries {
        symbol: coin.symbol.clone(),
        category,
        exchanges,
        image_url,
        data: trim_both_edges(candles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(open_time: i64, close: &str) -> RawKline {
        RawKline(
            open_time,
            "100".to_string(),
            "110".to_string(),
            "90".to_string(),
            close.to_string(),
            "50".to_string(),
            open_time + 3_599_999,
            "5000".to_string(),
            10,
            "30".to_string(),
            "3100".to_string(),
            serde_json::Value::Null,
        )
    }

    #[test]
    fn perp_series_trims_edges_and_derives_fields() {
        let coin = SymbolRef {
            symbol: "BTCUSDT".to_string(),
            ..SymbolRef::default()
        };
        let rows = vec![raw(0, "100"), raw(1, "101"), raw(2, "102"), raw(3, "103")];
        let series = build_perp_series(&coin, rows);

        assert_eq!(series.data.len(), 2);
        assert_eq!(series.data[0].open_time, 1);
        assert_eq!(series.data[1].open_time, 2);
        // takerBuyBase/baseVolume = 30/50 -> 60.00%
        assert_eq!(series.data[0].buyer_ratio, Some(60.0));
        // 2 * 3100 - 5000
        assert_eq!(series.data[0].volume_delta, Some(1200.0));
        assert_eq!(series.category, "unknown");
        assert_eq!(series.image_url, "assets/img/noname.png");
    }

    #[test]
    fn zero_base_volume_clamps_buyer_ratio() {
        let coin = SymbolRef {
            symbol: "XUSDT".to_string(),
            ..SymbolRef::default()
        };
        let mut row = raw(1, "100");
        row.5 = "0".to_string();
        let series = build_perp_series(&coin, vec![raw(0, "99"), row, raw(2, "101")]);
        assert_eq!(series.data[0].buyer_ratio, Some(0.0));
    }

    #[test]
    fn raw_rows_deserialize_from_binance_arrays() {
        let payload = serde_json::json!([
            [0_i64, "1.0", "2.0", "0.5", "1.5", "100", 3_599_999_i64, "150", 42, "60", "90", "0"]
        ]);
        let rows: Vec<RawKline> = serde_json::from_value(payload).unwrap();
        assert_eq!(rows[0].open_time(), 0);
        assert_eq!(rows[0].4, "1.5");
    }
}

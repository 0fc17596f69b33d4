use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::{run_bounded, series_meta, trim_both_edges, trim_trailing_edge};
use crate::config::Config;
use crate::error::Result;
use crate::models::{Candle, FetchOutcome, SpotCandle, SpotSeries, SymbolRef, SymbolSeries};
use crate::timeframe::{close_time, Timeframe};

#[derive(Debug, Deserialize)]
struct BybitApiResponse {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    #[serde(default)]
    result: Option<BybitResult>,
}

#[derive(Debug, Deserialize, Default)]
struct BybitResult {
    #[serde(default)]
    list: Option<Vec<Vec<String>>>,
}

/// [startTime, open, high, low, close, volume, turnover]
const BYBIT_ROW_LEN: usize = 7;

fn parse_f64(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(0.0)
}

#[derive(Clone)]
pub struct BybitClient {
    client: Client,
    config: Arc<Config>,
}

impl BybitClient {
    pub fn new(client: Client, config: Arc<Config>) -> Self {
        Self { client, config }
    }

    pub async fn fetch_perp_klines(
        &self,
        coins: &[SymbolRef],
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<FetchOutcome<SymbolSeries>>> {
        let interval = timeframe.bybit_interval();
        let interval_ms = timeframe.interval_ms();
        run_bounded(coins, self.config.concurrency_limit, |coin| {
            let client = self.client.clone();
            let url = format!(
                "{}/v5/market/kline?category=linear&symbol={}&interval={}&limit={}",
                self.config.bybit_api, coin.symbol, interval, limit
            );
            let delay = Duration::from_millis(self.config.fetch_delay_ms);
            async move {
                tokio::time::sleep(delay).await;
                match fetch_rows(&client, &url).await {
                    Ok(rows) => {
                        FetchOutcome::Success(build_perp_series(&coin, rows, interval_ms))
                    }
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

    pub async fn fetch_spot_klines(
        &self,
        coins: &[SymbolRef],
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<FetchOutcome<SpotSeries>>> {
        let interval = timeframe.bybit_interval();
        run_bounded(coins, self.config.concurrency_limit, |coin| {
            let client = self.client.clone();
            let url = format!(
                "{}/v5/market/kline?category=spot&symbol={}&interval={}&limit={}",
                self.config.bybit_api, coin.symbol, interval, limit
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

async fn fetch_rows(client: &Client, url: &str) -> std::result::Result<Vec<Vec<String>>, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("status {status}: {body}"));
    }

    let payload: BybitApiResponse = response
        .json()
        .await
        .map_err(|e| format!("invalid response structure: {e}"))?;

    if payload.ret_code != 0 {
        return Err(format!("retCode {}: {}", payload.ret_code, payload.ret_msg));
    }

    let mut rows = payload
        .result
        .and_then(|r| r.list)
        .ok_or_else(|| "invalid response structure: missing result.list".to_string())?;

    rows.retain(|row| row.len() >= BYBIT_ROW_LEN);
    rows.sort_by_key(row_open_time);
    rows.dedup_by_key(|row| row_open_time(row));
    Ok(rows)
}

fn row_open_time(row: &Vec<String>) -> i64 {
    row.first().and_then(|v| v.parse::<i64>().ok()).unwrap_or(0)
}

fn build_perp_series(coin: &SymbolRef, rows: Vec<Vec<String>>, interval_ms: i64) -> SymbolSeries {
    let (category, exchanges, image_url) = series_meta(coin);
    let candles = rows
        .iter()
        .map(|row| {
            let open_time = row_open_time(row);
            Candle {
                open_time,
                close_time: close_time(open_time, interval_ms),
                open_price: parse_f64(&row[1]),
                high_price: parse_f64(&row[2]),
                low_price: parse_f64(&row[3]),
                close_price: parse_f64(&row[4]),
                // index 6 is turnover, the quote-currency volume
                quote_volume: parse_f64(&row[6]),
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

fn build_spot_series(coin: &SymbolRef, rows: Vec<Vec<String>>) -> SpotSeries {
    let (category, exchanges, image_url) = series_meta(coin);
    let candles = rows
        .iter()
        .map(|row| SpotCandle {
            open_time: row_open_time(row),
            close_price: parse_f64(&row[4]),
        })
        .collect();

    SpotSeries {
        symbol: coin.symbol.clone(),
        category,
        exchanges,
        image_url,
        // Bybit spot keeps the leading candle; only the unfinished
        // trailing one goes.
        data: trim_trailing_edge(candles),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(open_time: i64) -> Vec<String> {
        vec![
            open_time.to_string(),
            "100".to_string(),
            "110".to_string(),
            "90".to_string(),
            "105".to_string(),
            "10".to_string(),
            "1050".to_string(),
        ]
    }

    #[test]
    fn perp_series_computes_close_time_from_interval() {
        let coin = SymbolRef {
            symbol: "ETHUSDT".to_string(),
            ..SymbolRef::default()
        };
        let interval_ms = Timeframe::H1.interval_ms();
        let series = build_perp_series(&coin, vec![row(0), row(interval_ms), row(2 * interval_ms)], interval_ms);
        assert_eq!(series.data.len(), 1);
        assert_eq!(series.data[0].open_time, interval_ms);
        assert_eq!(series.data[0].close_time, 2 * interval_ms - 1);
        assert_eq!(series.data[0].quote_volume, 1050.0);
    }

    #[test]
    fn spot_series_drops_only_trailing_candle() {
        let coin = SymbolRef {
            symbol: "ETHUSDT".to_string(),
            ..SymbolRef::default()
        };
        let series = build_spot_series(&coin, vec![row(0), row(1), row(2)]);
        assert_eq!(series.data.len(), 2);
        assert_eq!(series.data[0].open_time, 0);
    }

    #[test]
    fn response_with_error_code_is_rejected() {
        let payload: BybitApiResponse = serde_json::from_value(serde_json::json!({
            "retCode": 10001,
            "retMsg": "params error",
        }))
        .unwrap();
        assert_eq!(payload.ret_code, 10001);
        assert!(payload.result.is_none());
    }

    #[test]
    fn short_rows_are_skipped() {
        let mut rows = vec![row(0), vec!["1".to_string()], row(2)];
        rows.retain(|r| r.len() >= BYBIT_ROW_LEN);
        assert_eq!(rows.len(), 2);
    }
}

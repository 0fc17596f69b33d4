mod binance;
mod bybit;

pub use binance::BinanceClient;
pub use bybit::BybitClient;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, ORIGIN, REFERER, USER_AGENT};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::Result;
use crate::models::{FetchOutcome, SymbolRef};

/// Fans one task per symbol out over a bounded permit pool. Per-symbol
/// problems come back as `FetchOutcome::Failure`; only a task join failure
/// aborts the whole batch.
pub(crate) async fn run_bounded<T, F, Fut>(
    coins: &[SymbolRef],
    concurrency: usize,
    task: F,
) -> Result<Vec<FetchOutcome<T>>>
where
    T: Send + 'static,
    F: Fn(SymbolRef) -> Fut,
    Fut: Future<Output = FetchOutcome<T>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut set = JoinSet::new();

    for coin in coins {
        let semaphore = semaphore.clone();
        let fut = task(coin.clone());
        set.spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            fut.await
        });
    }

    let mut outcomes = Vec::with_capacity(coins.len());
    while let Some(joined) = set.join_next().await {
        outcomes.push(joined?);
    }
    Ok(outcomes)
}

/// Binance rejects bare clients on some routes; mimic a browser the way
/// the upstream service does.
pub(crate) fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(ORIGIN, HeaderValue::from_static("https://www.binance.com"));
    headers.insert(REFERER, HeaderValue::from_static("https://www.binance.com/"));
    headers
}

/// `slice(1, -1)`: drop the still-forming edge candles on both sides.
pub(crate) fn trim_both_edges<T>(mut rows: Vec<T>) -> Vec<T> {
    if rows.len() < 2 {
        return Vec::new();
    }
    rows.pop();
    rows.remove(0);
    rows
}

/// `slice(0, -1)`: drop only the trailing, still-forming candle.
pub(crate) fn trim_trailing_edge<T>(mut rows: Vec<T>) -> Vec<T> {
    rows.pop();
    rows
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn series_meta(coin: &SymbolRef) -> (String, Vec<String>, String) {
    (
        coin.category.clone().unwrap_or_else(|| "unknown".to_string()),
        coin.exchanges.clone().unwrap_or_default(),
        coin.image_url
            .clone()
            .unwrap_or_else(|| "assets/img/noname.png".to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_edges_trim_matches_slice_semantics() {
        assert_eq!(trim_both_edges(vec![1, 2, 3, 4]), vec![2, 3]);
        assert!(trim_both_edges(vec![1, 2]).is_empty());
        assert!(trim_both_edges(vec![1]).is_empty());
        assert!(trim_both_edges(Vec::<i32>::new()).is_empty());
    }

    #[test]
    fn trailing_trim_drops_only_last() {
        assert_eq!(trim_trailing_edge(vec![1, 2, 3]), vec![1, 2]);
        assert!(trim_trailing_edge(Vec::<i32>::new()).is_empty());
    }
}

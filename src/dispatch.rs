use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error};

use crate::config::Config;
use crate::models::{FetchOutcome, SeriesPayload};

/// One failed symbol as reported to the coin service.
#[derive(Debug, Clone, Serialize)]
pub struct FailedSymbol {
    pub symbol: String,
    pub time: String,
    pub error: String,
}

/// Best-effort reporter for symbols that failed to fetch. Recording is a
/// spawned task so failure-sink latency never slows the pipeline; sink
/// errors are logged and dropped.
#[derive(Clone)]
pub struct FailureSink {
    client: Client,
    coins_api: String,
}

impl FailureSink {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            coins_api: config.coins_api.clone(),
        }
    }

    pub fn record(&self, exchange: &str, coin_type: &str, failed: Vec<FailedSymbol>) {
        let url = format!(
            "{}/api/coins/failed-add?exchange={}&coinType={}",
            self.coins_api, exchange, coin_type
        );
        let client = self.client.clone();
        tokio::spawn(async move {
            match client.post(&url).json(&failed).send().await {
                Ok(response) if !response.status().is_success() => {
                    error!(
                        "Failed to record failed coins: status {}",
                        response.status()
                    );
                }
                Ok(_) => debug!("Recorded {} failed coins", failed.len()),
                Err(e) => error!("Error recording failed coins: {}", e),
            }
        });
    }
}

/// Partitions fetch outcomes into surviving series and failure records. A
/// `Success` carrying an empty candle list counts as failed, exactly like
/// an outright `Failure`.
pub fn partition_outcomes<T: SeriesPayload>(
    outcomes: Vec<FetchOutcome<T>>,
) -> (Vec<T>, Vec<FailedSymbol>) {
    let now = Utc::now().format("%d.%m.%Y %H:%M:%S").to_string();
    let mut succeeded = Vec::with_capacity(outcomes.len());
    let mut failed = Vec::new();

    for outcome in outcomes {
        match outcome {
            FetchOutcome::Success(series) if !series.is_empty() => succeeded.push(series),
            FetchOutcome::Success(series) => failed.push(FailedSymbol {
                symbol: series.symbol().to_string(),
                time: now.clone(),
                error: "No data returned".to_string(),
            }),
            FetchOutcome::Failure { symbol, reason } => failed.push(FailedSymbol {
                symbol,
                time: now.clone(),
                error: reason,
            }),
        }
    }

    (succeeded, failed)
}

/// Dispatcher step: keep the good series, hand the failures to the sink
/// as a side effect.
pub fn dispatch_with_failure_tracking<T: SeriesPayload>(
    outcomes: Vec<FetchOutcome<T>>,
    sink: Arc<FailureSink>,
    exchange: &str,
    coin_type: &str,
) -> Vec<T> {
    let (succeeded, failed) = partition_outcomes(outcomes);
    if !failed.is_empty() {
        sink.record(exchange, coin_type, failed);
    }
    succeeded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, SymbolSeries};

    fn series(symbol: &str, candle_count: usize) -> SymbolSeries {
        SymbolSeries {
            symbol: symbol.to_string(),
            category: "layer1".to_string(),
            exchanges: vec!["Binance".to_string()],
            image_url: String::new(),
            data: (0..candle_count)
                .map(|i| Candle {
                    open_time: i as i64,
                    ..Candle::default()
                })
                .collect(),
        }
    }

    #[test]
    fn failures_and_empty_successes_are_partitioned_out() {
        let outcomes = vec![
            FetchOutcome::Success(series("BTCUSDT", 3)),
            FetchOutcome::Success(series("EMPTYUSDT", 0)),
            FetchOutcome::Failure {
                symbol: "XYZUSDT".to_string(),
                reason: "status 500".to_string(),
            },
        ];

        let (succeeded, failed) = partition_outcomes(outcomes);

        assert_eq!(succeeded.len(), 1);
        assert_eq!(succeeded[0].symbol, "BTCUSDT");
        assert_eq!(failed.len(), 2);
        assert!(failed.iter().any(|f| f.symbol == "XYZUSDT" && f.error == "status 500"));
        assert!(failed.iter().any(|f| f.symbol == "EMPTYUSDT" && f.error == "No data returned"));
    }
}

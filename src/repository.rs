use crate::compression::{compress_to_gzip_base64, decompress_from_gzip_base64};
use crate::models::{ReportBundle, ReportKind};
use crate::store::{report_key, KlineStore};
use crate::timeframe::Timeframe;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Compressed report cache. Writes happen once per pipeline run as a
/// batch, reads serve the HTTP layer.
pub struct KlineRepository {
    store: KlineStore,
}

impl KlineRepository {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            store: KlineStore::new(),
        })
    }

    /// Persists every report of a run. A report that fails to compress is
    /// dropped from the batch; the previous value for its key stays
    /// readable.
    pub async fn store_run(&self, timeframe: Timeframe, bundle: &ReportBundle) {
        let mut batch = Vec::with_capacity(ReportKind::ALL.len());

        for kind in ReportKind::ALL {
            let encoded = match kind {
                ReportKind::MarketData => compress_to_gzip_base64(&bundle.market_data),
                ReportKind::KlineStats => compress_to_gzip_base64(&bundle.kline_stats),
                ReportKind::VwapStats => compress_to_gzip_base64(&bundle.vwap_stats),
                ReportKind::VwapAction => compress_to_gzip_base64(&bundle.vwap_action),
                ReportKind::PriceActionStats => {
                    compress_to_gzip_base64(&bundle.price_action_stats)
                }
                ReportKind::PriceAction => compress_to_gzip_base64(&bundle.price_action),
                ReportKind::HmaStats => compress_to_gzip_base64(&bundle.hma_stats),
                ReportKind::HmaAction => compress_to_gzip_base64(&bundle.hma_action),
            };

            match encoded {
                Ok(blob) => batch.push((report_key(kind, timeframe), blob)),
                Err(e) => error!(
                    "Failed to compress {} report for {}: {}",
                    kind.as_str(),
                    timeframe,
                    e
                ),
            }
        }

        let stored = batch.len();
        self.store.set_many(batch).await;
        info!("Stored {} reports for timeframe {}", stored, timeframe);
    }

    /// One report as raw JSON. A corrupt blob is treated the same as a
    /// missing one.
    pub async fn get_report(&self, timeframe: Timeframe, kind: ReportKind) -> Option<Value> {
        let key = report_key(kind, timeframe);
        let blob = self.store.get(&key).await?;
        match decompress_from_gzip_base64::<Value>(&blob) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        HmaActionReport, HmaStatsReport, KlineStatsReport, MarketDataArtifact, PriceActionReport,
        PriceActionStatsReport, VwapActionReport, VwapStatsReport,
    };

    fn empty_bundle(timeframe: Timeframe) -> ReportBundle {
        ReportBundle {
            market_data: MarketDataArtifact {
                project_name: "test".to_string(),
                data_type: "kline".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            kline_stats: KlineStatsReport {
                total_coins: 0,
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            vwap_stats: VwapStatsReport {
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            vwap_action: VwapActionReport {
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            price_action_stats: PriceActionStatsReport {
                total_coins: 0,
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            price_action: PriceActionReport {
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            hma_stats: HmaStatsReport {
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
            hma_action: HmaActionReport {
                project_name: "test".to_string(),
                timeframe,
                expiration_time: 42,
                data: vec![],
            },
        }
    }

    #[tokio::test]
    async fn a_run_persists_all_eight_reports() {
        let repo = KlineRepository::new();
        repo.store_run(Timeframe::H1, &empty_bundle(Timeframe::H1)).await;

        for kind in ReportKind::ALL {
            let value = repo.get_report(Timeframe::H1, kind).await;
            assert!(value.is_some(), "missing report {}", kind.as_str());
        }
        // other timeframes stay empty
        assert!(repo.get_report(Timeframe::H4, ReportKind::MarketData).await.is_none());
    }

    #[tokio::test]
    async fn stored_reports_round_trip_as_json() {
        let repo = KlineRepository::new();
        repo.store_run(Timeframe::D, &empty_bundle(Timeframe::D)).await;

        let value = repo
            .get_report(Timeframe::D, ReportKind::MarketData)
            .await
            .unwrap();
        assert_eq!(value["projectName"], "test");
        assert_eq!(value["expirationTime"], 42);
        assert_eq!(value["timeframe"], "D");
    }
}

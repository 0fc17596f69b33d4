use crate::analytics::hma::{calculate_hma_action, calculate_hma_stats};
use crate::analytics::kline_stats::calculate_kline_stats;
use crate::analytics::price_action::{calculate_price_action, calculate_price_action_stats};
use crate::analytics::rolling_vwap::calculate_rolling_vwap;
use crate::analytics::vwap_report::{calculate_vwap_action, calculate_vwap_stats};
use crate::api::{BinanceClient, BybitClient};
use crate::coins::CoinsRepository;
use crate::colors::ColorsRepository;
use crate::config::Config;
use crate::dispatch::{dispatch_with_failure_tracking, FailureSink};
use crate::error::Result;
use crate::models::{MarketDataArtifact, ReportBundle, SymbolSeries};
use crate::processing::merge::merge_spot_with_perps;
use crate::processing::normalize::normalize_kline_data;
use crate::repository::KlineRepository;
use crate::timeframe::{expiration_time, now_ms, Timeframe};
use std::sync::Arc;
use tracing::{info, warn};

const SERIES_HISTORY_LIMIT: usize = 50;

/// Caps each series to its most recent candles. The analytics engines
/// consume the full history first; only the persisted artifact is bounded.
pub fn truncate_series_history(series_batch: &mut [SymbolSeries], limit: usize) {
    for series in series_batch.iter_mut() {
        let keep_from = series.data.len().saturating_sub(limit);
        if keep_from > 0 {
            series.data.drain(..keep_from);
        }
    }
}

/// Runs the whole pipeline for one timeframe: fetch, merge, normalize,
/// derive the reports, persist.
pub struct KlineService {
    config: Arc<Config>,
    binance: BinanceClient,
    bybit: BybitClient,
    coins: Arc<CoinsRepository>,
    colors: Arc<ColorsRepository>,
    failures: Arc<FailureSink>,
    repository: Arc<KlineRepository>,
}

impl KlineService {
    pub fn new(
        config: Arc<Config>,
        binance: BinanceClient,
        bybit: BybitClient,
        coins: Arc<CoinsRepository>,
        colors: Arc<ColorsRepository>,
        failures: Arc<FailureSink>,
        repository: Arc<KlineRepository>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            binance,
            bybit,
            coins,
            colors,
            failures,
            repository,
        })
    }

    pub async fn run(&self, timeframe: Timeframe) -> Result<()> {
        let limit = self.config.kline_limit;
        let coins = self.coins.get_coins_from_cache().await;

        let binance_perps = coins.binance_perps.unwrap_or_default();
        let bybit_perps = coins.bybit_perps.unwrap_or_default();
        let binance_spot = coins.binance_spot.unwrap_or_default();
        let bybit_spot = coins.bybit_spot.unwrap_or_default();

        let (binance_perp, bybit_perp, binance_spot, bybit_spot) = tokio::join!(
            self.binance.fetch_perp_klines(&binance_perps, timeframe, limit),
            self.bybit.fetch_perp_klines(&bybit_perps, timeframe, limit),
            self.binance.fetch_spot_klines(&binance_spot, timeframe, limit),
            self.bybit.fetch_spot_klines(&bybit_spot, timeframe, limit),
        );

        let binance_perp =
            dispatch_with_failure_tracking(binance_perp?, self.failures.clone(), "Binance", "perp");
        let bybit_perp =
            dispatch_with_failure_tracking(bybit_perp?, self.failures.clone(), "Bybit", "perp");
        let binance_spot =
            dispatch_with_failure_tracking(binance_spot?, self.failures.clone(), "Binance", "spot");
        let bybit_spot =
            dispatch_with_failure_tracking(bybit_spot?, self.failures.clone(), "Bybit", "spot");

        // anchor the expiration to the freshest closed perp candle
        let last_open_time = binance_perp
            .first()
            .and_then(|series| series.data.last())
            .or_else(|| bybit_perp.first().and_then(|series| series.data.last()))
            .map(|candle| candle.open_time)
            .unwrap_or_else(now_ms);
        let expiration = expiration_time(last_open_time, timeframe);

        let perps: Vec<SymbolSeries> = binance_perp.into_iter().chain(bybit_perp).collect();
        let spots = binance_spot.into_iter().chain(bybit_spot).collect();

        let merged = merge_spot_with_perps(perps, spots);
        let palette = self.colors.get_cached_colors().await;
        let normalized = normalize_kline_data(merged, palette.as_ref());
        let with_vwap = calculate_rolling_vwap(normalized, timeframe);

        let (mut data, empty): (Vec<SymbolSeries>, Vec<SymbolSeries>) =
            with_vwap.into_iter().partition(|series| !series.data.is_empty());
        if !empty.is_empty() {
            let symbols: Vec<&str> = empty.iter().map(|s| s.symbol.as_str()).collect();
            warn!("Empty series dropped for {}: {:?}", timeframe, symbols);
        }

        let project_name = self.config.project_name.as_str();
        let kline_stats = calculate_kline_stats(&data, timeframe, project_name, expiration);
        let vwap_stats = calculate_vwap_stats(&data, timeframe, project_name, expiration);
        let vwap_action = calculate_vwap_action(&data, timeframe, project_name, expiration);
        let price_action_stats =
            calculate_price_action_stats(&data, timeframe, project_name, expiration);
        let price_action = calculate_price_action(&data, timeframe, project_name, expiration);
        let hma_stats = calculate_hma_stats(&data, timeframe, project_name, expiration);
        let hma_action = calculate_hma_action(&data, timeframe, project_name, expiration);

        // the engines need the full history; the stored artifact does not
        truncate_series_history(&mut data, SERIES_HISTORY_LIMIT);

        let bundle = ReportBundle {
            kline_stats,
            vwap_stats,
            vwap_action,
            price_action_stats,
            price_action,
            hma_stats,
            hma_action,
            market_data: MarketDataArtifact {
                project_name: project_name.to_string(),
                data_type: "kline".to_string(),
                timeframe,
                expiration_time: expiration,
                data,
            },
        };

        self.repository.store_run(timeframe, &bundle).await;
        info!(
            "Kline cache {} updated, {} symbols",
            timeframe,
            bundle.market_data.data.len()
        );
        Ok(())
    }
}

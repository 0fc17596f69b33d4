use market_data_service::analytics::hma::{calculate_hma_action, calculate_hma_stats};
use market_data_service::analytics::kline_stats::calculate_kline_stats;
use market_data_service::analytics::price_action::{
    calculate_price_action, calculate_price_action_stats,
};
use market_data_service::analytics::rolling_vwap::calculate_rolling_vwap;
use market_data_service::analytics::vwap_report::{calculate_vwap_action, calculate_vwap_stats};
use market_data_service::dispatch::partition_outcomes;
use market_data_service::models::{
    Candle, FetchOutcome, MarketDataArtifact, ReportBundle, ReportKind, SpotCandle, SpotSeries,
    SymbolSeries,
};
use market_data_service::processing::merge::merge_spot_with_perps;
use market_data_service::processing::normalize::normalize_kline_data;
use market_data_service::repository::KlineRepository;
use market_data_service::service::truncate_series_history;
use market_data_service::timeframe::{expiration_time, Timeframe};

const HOUR_MS: i64 = 3_600_000;

fn perp_series(symbol: &str, bars: usize) -> SymbolSeries {
    let data = (0..bars)
        .map(|i| {
            let open = 100.0 + i as f64;
            let close = open + 0.8;
            Candle {
                open_time: i as i64 * HOUR_MS,
                close_time: (i as i64 + 1) * HOUR_MS - 1,
                open_price: open,
                high_price: close + 0.5,
                low_price: open - 0.5,
                close_price: close,
                quote_volume: 1_000.0 + i as f64 * 10.0,
                buyer_ratio: Some(55.0),
                volume_delta: Some(100.0),
                ..Candle::default()
            }
        })
        .collect();
    SymbolSeries {
        symbol: symbol.to_string(),
        category: "layer1".to_string(),
        exchanges: vec!["Binance".to_string()],
        image_url: "assets/img/noname.png".to_string(),
        data,
    }
}

fn spot_series(symbol: &str, bars: usize) -> SpotSeries {
    let data = (0..bars)
        .map(|i| SpotCandle {
            open_time: i as i64 * HOUR_MS,
            close_price: 100.0 + i as f64,
        })
        .collect();
    SpotSeries {
        symbol: symbol.to_string(),
        category: "layer1".to_string(),
        exchanges: vec!["Binance".to_string()],
        image_url: "assets/img/noname.png".to_string(),
        data,
    }
}

fn run_pipeline(symbols: &[&str], bars: usize, timeframe: Timeframe) -> ReportBundle {
    let perps: Vec<SymbolSeries> = symbols.iter().map(|s| perp_series(s, bars)).collect();
    let spots: Vec<SpotSeries> = symbols.iter().map(|s| spot_series(s, bars)).collect();

    let last_open = perps[0].data.last().unwrap().open_time;
    let expiration = expiration_time(last_open, timeframe);

    let merged = merge_spot_with_perps(perps, spots);
    let normalized = normalize_kline_data(merged, None);
    let mut data = calculate_rolling_vwap(normalized, timeframe);

    let kline_stats = calculate_kline_stats(&data, timeframe, "test", expiration);
    let vwap_stats = calculate_vwap_stats(&data, timeframe, "test", expiration);
    let vwap_action = calculate_vwap_action(&data, timeframe, "test", expiration);
    let price_action_stats = calculate_price_action_stats(&data, timeframe, "test", expiration);
    let price_action = calculate_price_action(&data, timeframe, "test", expiration);
    let hma_stats = calculate_hma_stats(&data, timeframe, "test", expiration);
    let hma_action = calculate_hma_action(&data, timeframe, "test", expiration);
    truncate_series_history(&mut data, 50);

    ReportBundle {
        kline_stats,
        vwap_stats,
        vwap_action,
        price_action_stats,
        price_action,
        hma_stats,
        hma_action,
        market_data: MarketDataArtifact {
            project_name: "test".to_string(),
            data_type: "kline".to_string(),
            timeframe,
            expiration_time: expiration,
            data,
        },
    }
}

#[tokio::test]
async fn one_run_stores_all_eight_reports() {
    let bundle = run_pipeline(&["BTCUSDT", "ETHUSDT"], 60, Timeframe::H1);
    let repo = KlineRepository::new();
    repo.store_run(Timeframe::H1, &bundle).await;

    for kind in ReportKind::ALL {
        let value = repo.get_report(Timeframe::H1, kind).await;
        assert!(value.is_some(), "missing report {}", kind.as_str());
    }
}

#[test]
fn merged_series_carry_spot_and_derived_fields() {
    let bundle = run_pipeline(&["BTCUSDT"], 40, Timeframe::H1);
    let series = &bundle.market_data.data[0];

    // the first raw candle is dropped by the merge
    assert_eq!(series.data.len(), 39);
    assert_eq!(series.data[0].open_time, HOUR_MS);

    for candle in &series.data {
        assert!(candle.spot_close_price.is_some());
        assert!(candle.perp_spot_diff.is_some());
        assert!(candle.close_price_change.is_some());
        assert!(candle.normalized_close_price.is_some());
        assert!(candle.colors.is_some());
        assert!(candle.rolling_vwap.is_some());
    }
}

#[test]
fn persisted_market_data_is_capped_to_fifty_candles() {
    let bundle = run_pipeline(&["BTCUSDT", "ETHUSDT"], 100, Timeframe::H1);

    for series in &bundle.market_data.data {
        assert_eq!(series.data.len(), 50);
        // the freshest candle survives the cap
        assert_eq!(series.data.last().unwrap().open_time, 99 * HOUR_MS);
    }
    // the aggregates were computed before the cap and still cover the
    // full history
    assert_eq!(bundle.kline_stats.data.len(), 50);
    assert!(bundle.hma_stats.data[0].above_hma > 50);
}

#[test]
fn reports_share_the_expiration_anchor() {
    let bundle = run_pipeline(&["BTCUSDT"], 60, Timeframe::H4);
    let expected = expiration_time(59 * HOUR_MS, Timeframe::H4);

    assert_eq!(bundle.market_data.expiration_time, expected);
    assert_eq!(bundle.kline_stats.expiration_time, expected);
    assert_eq!(bundle.vwap_stats.expiration_time, expected);
    assert_eq!(bundle.hma_action.expiration_time, expected);
}

#[test]
fn stats_report_counts_every_surviving_symbol() {
    let bundle = run_pipeline(&["BTCUSDT", "ETHUSDT", "SOLUSDT"], 60, Timeframe::H1);
    assert_eq!(bundle.kline_stats.total_coins, 3);
    assert_eq!(bundle.price_action_stats.total_coins, 3);
    // one hma stats item per symbol
    assert_eq!(bundle.hma_stats.data.len(), 3);
}

#[test]
fn failed_fetches_are_excluded_from_the_batch() {
    let outcomes = vec![
        FetchOutcome::Success(perp_series("BTCUSDT", 30)),
        FetchOutcome::Success(perp_series("EMPTYUSDT", 0)),
        FetchOutcome::Failure {
            symbol: "XYZUSDT".to_string(),
            reason: "HTTP error 500".to_string(),
        },
    ];

    let (succeeded, failed) = partition_outcomes(outcomes);
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0].symbol, "BTCUSDT");

    let failed_symbols: Vec<&str> = failed.iter().map(|f| f.symbol.as_str()).collect();
    assert_eq!(failed_symbols, vec!["EMPTYUSDT", "XYZUSDT"]);
    assert_eq!(failed[0].error, "No data returned");
}

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::MarketDataError;
use crate::timeframe::Timeframe;

/// Coin entry as served by the coin-list service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SymbolRef {
    pub symbol: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub exchanges: Option<Vec<String>>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Display colors attached to a candle during normalization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CandleColors {
    pub close_price: String,
    pub close_price_change: String,
    pub buyer_ratio: String,
    pub buyer_ratio_change: String,
    pub quote_volume: String,
    pub quote_volume_change: String,
    pub perp_spot_diff: String,
    pub volume_delta: String,
    pub volume_delta_change: String,
}

/// One OHLCV bar plus the derived fields the pipeline adds stage by stage.
/// Optional fields stay off the wire until a stage sets them.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    pub quote_volume: f64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub buyer_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub quote_volume_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub close_price_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub volume_delta_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub buyer_ratio_change: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub spot_close_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub perp_spot_diff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normalized_close_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normalized_buyer_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normalized_quote_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub normalized_volume_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rolling_vwap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rolling_vwap_u_band: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rolling_vwap_l_band: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub colors: Option<CandleColors>,
}

impl Candle {
    pub fn typical_price(&self) -> f64 {
        (self.high_price + self.low_price + self.close_price) / 3.0
    }

    pub fn is_bullish(&self) -> bool {
        self.close_price > self.open_price
    }
}

/// Per-symbol perpetual candle history, the unit flowing through the
/// merge/normalize/analytics stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSeries {
    pub symbol: String,
    pub category: String,
    pub exchanges: Vec<String>,
    pub image_url: String,
    pub data: Vec<Candle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotCandle {
    pub open_time: i64,
    pub close_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpotSeries {
    pub symbol: String,
    pub category: String,
    pub exchanges: Vec<String>,
    pub image_url: String,
    pub data: Vec<SpotCandle>,
}

/// Result of one symbol's fetch; every input symbol resolves to exactly
/// one of these.
#[derive(Debug, Clone)]
pub enum FetchOutcome<T> {
    Success(T),
    Failure { symbol: String, reason: String },
}

/// Series payloads the failure-tracking dispatcher can partition.
pub trait SeriesPayload {
    fn symbol(&self) -> &str;
    fn is_empty(&self) -> bool;
}

impl SeriesPayload for SymbolSeries {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl SeriesPayload for SpotSeries {
    fn symbol(&self) -> &str {
        &self.symbol
    }
    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Top-level persisted artifact for one timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataArtifact {
    pub project_name: String,
    pub data_type: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<SymbolSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct KlineStatsBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub bullish_candles: u32,
    pub above_u_band: u32,
    pub below_l_band: u32,
    pub inside_bands: u32,
    pub cross_u_band_up: u32,
    pub cross_l_band_up: u32,
    pub cross_u_band_down: u32,
    pub cross_l_band_down: u32,
    pub cross_vwap_up: u32,
    pub cross_vwap_down: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineStatsReport {
    pub total_coins: usize,
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<KlineStatsBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VwapStatsBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub above_u_band: Vec<String>,
    pub below_l_band: Vec<String>,
    pub inside_bands: Vec<String>,
    pub cross_u_band_up: Vec<String>,
    pub cross_l_band_up: Vec<String>,
    pub cross_u_band_down: Vec<String>,
    pub cross_l_band_down: Vec<String>,
    pub cross_vwap_up: Vec<String>,
    pub cross_vwap_down: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VwapStatsReport {
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<VwapStatsBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VwapActionBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub above_u_band: Vec<String>,
    pub below_l_band: Vec<String>,
    pub cross_u_band_up: Vec<String>,
    pub cross_l_band_up: Vec<String>,
    pub cross_u_band_down: Vec<String>,
    pub cross_l_band_down: Vec<String>,
    pub cross_vwap_up: Vec<String>,
    pub cross_vwap_down: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VwapActionReport {
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<VwapActionBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionStatsBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub bullish_candles: u32,
    pub pinbars: u32,
    pub hammers: u32,
    pub dojis: u32,
    pub bullish_engulfings: u32,
    pub bearish_engulfings: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionStatsReport {
    pub total_coins: usize,
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<PriceActionStatsBucket>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub pinbars: Vec<String>,
    pub hammers: Vec<String>,
    pub dojis: Vec<String>,
    pub bullish_engulfings: Vec<String>,
    pub bearish_engulfings: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceActionReport {
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<PriceActionBucket>,
}

/// Latest-window summary for one symbol's close-vs-HMA behavior.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HmaStatsItem {
    pub open_time: i64,
    pub close_time: i64,
    pub bullish_candle: u32,
    pub above_hma: u32,
    pub below_hma: u32,
    pub cross_hma_up: u32,
    pub cross_hma_down: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmaStatsReport {
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<HmaStatsItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HmaActionBucket {
    pub open_time: i64,
    pub close_time: i64,
    pub cross_hma_up: Vec<String>,
    pub cross_hma_down: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HmaActionReport {
    pub project_name: String,
    pub timeframe: Timeframe,
    pub expiration_time: i64,
    pub data: Vec<HmaActionBucket>,
}

/// Everything one pipeline run produces for a timeframe.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    pub market_data: MarketDataArtifact,
    pub kline_stats: KlineStatsReport,
    pub vwap_stats: VwapStatsReport,
    pub vwap_action: VwapActionReport,
    pub price_action_stats: PriceActionStatsReport,
    pub price_action: PriceActionReport,
    pub hma_stats: HmaStatsReport,
    pub hma_action: HmaActionReport,
}

/// The eight artifact kinds persisted per timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    MarketData,
    KlineStats,
    VwapStats,
    VwapAction,
    PriceActionStats,
    PriceAction,
    HmaStats,
    HmaAction,
}

impl ReportKind {
    pub const ALL: [ReportKind; 8] = [
        ReportKind::MarketData,
        ReportKind::KlineStats,
        ReportKind::VwapStats,
        ReportKind::VwapAction,
        ReportKind::PriceActionStats,
        ReportKind::PriceAction,
        ReportKind::HmaStats,
        ReportKind::HmaAction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportKind::MarketData => "market-data",
            ReportKind::KlineStats => "kline-stats",
            ReportKind::VwapStats => "vwap-stats",
            ReportKind::VwapAction => "vwap-action",
            ReportKind::PriceActionStats => "price-action-stats",
            ReportKind::PriceAction => "price-action",
            ReportKind::HmaStats => "hma-stats",
            ReportKind::HmaAction => "hma-action",
        }
    }

    /// Response-envelope field name used by the combined endpoint.
    pub fn response_field(&self) -> &'static str {
        match self {
            ReportKind::MarketData => "marketData",
            ReportKind::KlineStats => "klineStatsData",
            ReportKind::VwapStats => "vwapStatsData",
            ReportKind::VwapAction => "vwapActionData",
            ReportKind::PriceActionStats => "priceActionStatsData",
            ReportKind::PriceAction => "priceActionData",
            ReportKind::HmaStats => "hmaStatsData",
            ReportKind::HmaAction => "hmaActionData",
        }
    }
}

impl FromStr for ReportKind {
    type Err = MarketDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            // kline-action is the legacy route token for the market artifact
            "market-data" | "kline-action" => Ok(ReportKind::MarketData),
            "kline-stats" => Ok(ReportKind::KlineStats),
            "vwap-stats" => Ok(ReportKind::VwapStats),
            "vwap-action" => Ok(ReportKind::VwapAction),
            "price-action-stats" => Ok(ReportKind::PriceActionStats),
            "price-action" => Ok(ReportKind::PriceAction),
            "hma-stats" => Ok(ReportKind::HmaStats),
            "hma-action" => Ok(ReportKind::HmaAction),
            other => Err(MarketDataError::NotFound(format!(
                "unknown report kind: {other}"
            ))),
        }
    }
}

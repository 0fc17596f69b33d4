use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::config::Config;

pub const NEUTRAL_HEX: &str = "#fff";
const NEUTRAL_RGB: &str = "rgb(255, 255, 255)";
const ZERO_HEX: &str = "#f5f5f0";

/// Hex color pairs keyed by metric, as served by the utils service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub close_price_min: String,
    pub close_price_max: String,
    pub buyer_ratio_min: String,
    pub buyer_ratio_max: String,
    pub quote_volume_min: String,
    pub quote_volume_max: String,
    pub volume_delta_min: String,
    pub volume_delta_max: String,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            close_price_min: "#1a2b4c".to_string(),
            close_price_max: "#4c9aff".to_string(),
            buyer_ratio_min: "#3d1c1c".to_string(),
            buyer_ratio_max: "#d9534f".to_string(),
            quote_volume_min: "#1c3d2a".to_string(),
            quote_volume_max: "#5cb85c".to_string(),
            volume_delta_min: "#c9302c".to_string(),
            volume_delta_max: "#449d44".to_string(),
        }
    }
}

fn hex_to_rgb(hex: &str) -> [u8; 3] {
    let hex = hex.trim_start_matches('#');
    let expanded: String = if hex.len() == 3 {
        hex.chars().flat_map(|c| [c, c]).collect()
    } else {
        hex.to_string()
    };
    if expanded.len() != 6 {
        return [255, 255, 255];
    }
    let channel = |range| u8::from_str_radix(&expanded[range], 16).unwrap_or(255);
    [channel(0..2), channel(2..4), channel(4..6)]
}

fn interpolate_color(color1: &str, color2: &str, factor: f64) -> String {
    let c1 = hex_to_rgb(color1);
    let c2 = hex_to_rgb(color2);
    let mixed: Vec<String> = c1
        .iter()
        .zip(c2.iter())
        .map(|(&a, &b)| {
            let v = (a as f64 + factor * (b as f64 - a as f64)).round() as u8;
            format!("{v:02x}")
        })
        .collect();
    format!("#{}", mixed.join(""))
}

/// Two-stop gradient over a [0, 1] magnitude value.
pub fn gradient_color_for_positive_range(value: f64, start: &str, end: &str) -> String {
    let clamped = value.clamp(0.0, 1.0);
    interpolate_color(start, end, clamped)
}

/// Sign-based color for values that can go negative; fed the raw metric.
pub fn gradient_color_for_negative_range(value: f64, min_color: &str, max_color: &str) -> String {
    if value == 0.0 {
        ZERO_HEX.to_string()
    } else if value > 0.0 {
        max_color.to_string()
    } else {
        min_color.to_string()
    }
}

/// Diverging red/white/green mapping for signed "change" metrics. The
/// range is capped at ±500 and values below the visibility threshold stay
/// neutral white.
pub fn color_from_change_value(value: f64, min: f64, max: f64) -> String {
    const MAX_SCALE: f64 = 500.0;
    const MAX_CHANNEL_INTENSITY: f64 = 180.0;
    const ZERO_THRESHOLD: f64 = 0.01;

    let abs_max = min.abs().max(max.abs());
    let scale = abs_max.min(MAX_SCALE);
    if scale == 0.0 {
        return NEUTRAL_RGB.to_string();
    }

    let clamped = value.clamp(-scale, scale);
    if clamped.abs() < ZERO_THRESHOLD {
        return NEUTRAL_RGB.to_string();
    }

    let normalized = (clamped.abs() / scale).sqrt();
    let intensity = (normalized * MAX_CHANNEL_INTENSITY).round() as i64;
    let faded = (255 - intensity).clamp(0, 255) as u8;

    if clamped < 0.0 {
        format!("rgb(255, {faded}, {faded})")
    } else {
        format!("rgb({faded}, 255, {faded})")
    }
}

/// Caches the palette once at startup; the normalizer reads the cached
/// copy on every run.
pub struct ColorsRepository {
    client: Client,
    utils_api: String,
    cached: RwLock<Option<ColorPalette>>,
}

impl ColorsRepository {
    pub fn new(client: Client, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            client,
            utils_api: config.utils_api.clone(),
            cached: RwLock::new(None),
        })
    }

    pub async fn initialize(&self) {
        let url = format!("{}/api/colors/get", self.utils_api);
        match self.fetch_palette(&url).await {
            Ok(palette) => {
                info!("Colors repository initialized");
                *self.cached.write().await = Some(palette);
            }
            Err(e) => {
                error!("Failed to fetch color palette, using defaults: {}", e);
                *self.cached.write().await = Some(ColorPalette::default());
            }
        }
    }

    async fn fetch_palette(&self, url: &str) -> crate::error::Result<ColorPalette> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(crate::error::MarketDataError::ExchangeApi {
                status: response.status().as_u16(),
                message: format!("colors API returned status {}", response.status()),
            });
        }
        Ok(response.json::<ColorPalette>().await?)
    }

    pub async fn get_cached_colors(&self) -> Option<ColorPalette> {
        self.cached.read().await.clone()
    }
}

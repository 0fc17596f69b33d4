use crate::error::{MarketDataError, Result};
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub binance_perp_api: String,
    pub binance_spot_api: String,
    pub bybit_api: String,
    pub coins_api: String,
    pub utils_api: String,
    pub project_name: String,
    pub concurrency_limit: usize,
    pub fetch_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub kline_limit: usize,
    pub settle_delay_secs: u64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // The coin-list and color services have no sane default; a missing
        // endpoint must stop the process before it starts serving.
        let coins_api = env::var("COINS_API")
            .map_err(|_| MarketDataError::Config("COINS_API is not set".to_string()))?;
        let utils_api = env::var("UTILS_API")
            .map_err(|_| MarketDataError::Config("UTILS_API is not set".to_string()))?;

        let concurrency_limit = env::var("CONCURRENCY_LIMIT")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<usize>()
            .map_err(|_| MarketDataError::Config("Invalid CONCURRENCY_LIMIT".to_string()))?;

        let fetch_delay_ms = env::var("FETCH_DELAY_MS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u64>()
            .map_err(|_| MarketDataError::Config("Invalid FETCH_DELAY_MS".to_string()))?;

        let request_timeout_secs = env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|_| MarketDataError::Config("Invalid REQUEST_TIMEOUT_SECS".to_string()))?;

        let kline_limit = env::var("KLINE_LIMIT")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<usize>()
            .map_err(|_| MarketDataError::Config("Invalid KLINE_LIMIT".to_string()))?;

        let settle_delay_secs = env::var("SETTLE_DELAY_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .map_err(|_| MarketDataError::Config("Invalid SETTLE_DELAY_SECS".to_string()))?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| MarketDataError::Config("Invalid PORT".to_string()))?;

        Ok(Self {
            binance_perp_api: env::var("BINANCE_PERP_API")
                .unwrap_or_else(|_| "https://fapi.binance.com".to_string()),
            binance_spot_api: env::var("BINANCE_SPOT_API")
                .unwrap_or_else(|_| "https://api.binance.com".to_string()),
            bybit_api: env::var("BYBIT_API")
                .unwrap_or_else(|_| "https://api.bybit.com".to_string()),
            coins_api,
            utils_api,
            project_name: env::var("PROJECT_NAME")
                .unwrap_or_else(|_| "market-data".to_string()),
            concurrency_limit,
            fetch_delay_ms,
            request_timeout_secs,
            kline_limit,
            settle_delay_secs,
            port,
        })
    }
}

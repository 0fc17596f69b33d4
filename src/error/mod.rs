use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task join failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Exchange API error: {status} - {message}")]
    ExchangeApi { status: u16, message: String },

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, MarketDataError>;

impl From<MarketDataError> for StatusCode {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::InvalidTimeframe(_) => StatusCode::BAD_REQUEST,
            MarketDataError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

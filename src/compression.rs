use base64::{engine::general_purpose::STANDARD, Engine as _};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

use crate::error::{MarketDataError, Result};

/// Serializes a value to JSON, gzips it and encodes the bytes as base64.
/// The store only ever sees these opaque strings.
pub fn compress_to_gzip_base64<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| MarketDataError::Compression(format!("serialize: {e}")))?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| MarketDataError::Compression(format!("gzip: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| MarketDataError::Compression(format!("gzip: {e}")))?;

    Ok(STANDARD.encode(compressed))
}

/// Inverse of [`compress_to_gzip_base64`].
pub fn decompress_from_gzip_base64<T: DeserializeOwned>(blob: &str) -> Result<T> {
    let compressed = STANDARD
        .decode(blob)
        .map_err(|e| MarketDataError::Decompression(format!("base64: {e}")))?;

    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| MarketDataError::Decompression(format!("gunzip: {e}")))?;

    serde_json::from_slice(&json)
        .map_err(|e| MarketDataError::Decompression(format!("deserialize: {e}")))
}

//! Error handling for clipfetch

use crate::extractor::MediaKind;
use thiserror::Error;

/// Main error type for clipfetch
#[derive(Debug, Error)]
pub enum ClipfetchError {
    #[error("Failed to retrieve video metadata: {0}")]
    MetadataUnavailable(String),

    #[error("No {0} format available for this video")]
    NoMatchingFormat(MediaKind),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Download strategy unavailable: {0}")]
    StrategyUnavailable(String),

    #[error("Download failed: {0}")]
    DownloadError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

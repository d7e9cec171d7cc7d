//! clipfetch library

pub mod app;
pub mod downloader;
pub mod extractor;
pub mod utils;

// Re-export main types for easier use
pub use app::{Clipfetch, DownloadReport, DownloadRequest};
pub use downloader::{
    DownloadProgress, DownloadStatus, DownloadStrategy, ProgressSimulator, ProgressSource,
    StrategyPreference, TriggerOutcome,
};
pub use extractor::{select_format, ApiExtractor, Format, MediaKind, MetadataProvider, VideoInfo};
pub use utils::{AppSettings, ClipfetchError};

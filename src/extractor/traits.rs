use crate::extractor::models::{Format, VideoInfo};
use anyhow::Result;
use async_trait::async_trait;

/// Source of video metadata
///
/// Isolates the session from where metadata comes from (the backend API,
/// a canned fixture in tests, ...).
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Returns a short identifier for logging (e.g. "backend-api")
    fn id(&self) -> &'static str;

    /// Fetches metadata for a source URL
    async fn extract_info(&self, url: &str) -> Result<VideoInfo>;

    /// Gets available formats (calls extract_info internally)
    async fn get_formats(&self, url: &str) -> Result<Vec<Format>> {
        let info = self.extract_info(url).await?;
        Ok(info.formats)
    }
}

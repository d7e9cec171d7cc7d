//! Backend API client for video metadata
//!
//! The backend exposes `GET {base}/api/info?url=<source url>` and answers with
//! the camelCase JSON described by [`VideoInfo`]. Any failure along the way is
//! reported as [`ClipfetchError::MetadataUnavailable`].

use crate::extractor::models::VideoInfo;
use crate::extractor::traits::MetadataProvider;
use crate::utils::error::ClipfetchError;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Path of the metadata endpoint, relative to the API base
pub const INFO_PATH: &str = "api/info";

/// Metadata provider backed by the HTTP API
pub struct ApiExtractor {
    client: Client,
    base_url: Url,
}

impl ApiExtractor {
    /// Create a client for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self> {
        let base_url = normalize_base(base_url)?;
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;

        info!("Using metadata API at {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the metadata request URL for a source video
    pub fn info_url(&self, source_url: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join(INFO_PATH)
            .map_err(|e| ClipfetchError::InvalidUrl(e.to_string()))?;
        url.query_pairs_mut().append_pair("url", source_url);
        Ok(url)
    }

    async fn fetch(&self, source_url: &str) -> Result<VideoInfo, String> {
        let request_url = self.info_url(source_url).map_err(|e| e.to_string())?;
        debug!("Requesting metadata: {}", request_url);

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let body: serde_json::Value = response.json().await.map_err(|e| e.to_string())?;
        check_payload(&body)?;

        serde_json::from_value(body).map_err(|e| e.to_string())
    }
}

/// Reject error payloads and bodies that carry no usable metadata
fn check_payload(body: &serde_json::Value) -> Result<(), String> {
    if let Some(message) = body.get("error").and_then(|v| v.as_str()) {
        return Err(message.to_string());
    }

    let object = body
        .as_object()
        .ok_or_else(|| "empty metadata payload".to_string())?;
    let has_title = object
        .get("title")
        .and_then(|v| v.as_str())
        .is_some_and(|t| !t.trim().is_empty());
    if !has_title && !object.contains_key("formats") {
        return Err("empty metadata payload".to_string());
    }
    Ok(())
}

#[async_trait]
impl MetadataProvider for ApiExtractor {
    fn id(&self) -> &'static str {
        "backend-api"
    }

    async fn extract_info(&self, url: &str) -> Result<VideoInfo> {
        match self.fetch(url).await {
            Ok(info) => {
                debug!(
                    "Metadata for {}: \"{}\" with {} formats",
                    url,
                    info.title,
                    info.formats.len()
                );
                Ok(info)
            }
            Err(reason) => {
                error!("Metadata retrieval failed for {}: {}", url, reason);
                Err(ClipfetchError::MetadataUnavailable(reason).into())
            }
        }
    }
}

/// Parse an API base URL, making sure relative joins keep its path
pub fn normalize_base(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ClipfetchError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClipfetchError::InvalidUrl(format!("{}: unsupported scheme", raw)).into());
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

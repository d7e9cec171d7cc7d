//! Download session: metadata → format → strategy → trigger

use crate::downloader::simulator::ProgressSimulator;
use crate::downloader::strategy::{plan_targets, DownloadStrategy, DownloadTarget, StrategyContext};
use crate::downloader::{BrowserTrigger, DownloadProgress, DownloadTrigger, HttpTrigger, TriggerOutcome};
use crate::extractor::api::normalize_base;
use crate::extractor::{select_format_with, ApiExtractor, Format, MediaKind, MetadataProvider, VideoInfo};
use crate::utils::error::ClipfetchError;
use crate::utils::filename::output_filename;
use crate::utils::video_url::validate_source_url;
use crate::utils::AppSettings;
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// One user request
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub quality: Option<String>,
    pub kind: MediaKind,
    pub filename: Option<String>,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            quality: None,
            kind: MediaKind::Video,
            filename: None,
        }
    }

    pub fn quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }

    pub fn kind(mut self, kind: MediaKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Result of a finished request
#[derive(Debug, Clone)]
pub struct DownloadReport {
    pub id: Uuid,
    pub title: String,
    pub format: Format,
    pub strategy: DownloadStrategy,
    pub outcome: TriggerOutcome,
}

/// Ties the metadata provider, format selection and triggers together
pub struct Clipfetch {
    settings: AppSettings,
    api_base: Option<Url>,
    provider: Arc<dyn MetadataProvider>,
    http: Arc<dyn DownloadTrigger>,
    browser: Arc<dyn DownloadTrigger>,
}

impl Clipfetch {
    /// Build a session from settings, talking to the configured backend API
    pub fn new(settings: AppSettings) -> Result<Self> {
        let api_base = settings.api_base_url.as_deref().ok_or_else(|| {
            ClipfetchError::ConfigError(
                "no API base URL configured (use --api-url or CLIPFETCH_API_URL)".to_string(),
            )
        })?;

        let provider = ApiExtractor::new(api_base, settings.request_timeout(), &settings.user_agent)?;
        let http = HttpTrigger::new(
            settings.resolved_download_location()?,
            settings.request_timeout(),
            &settings.user_agent,
        )?;
        let simulator = settings
            .simulate_progress
            .then(|| ProgressSimulator::new(settings.simulation.to_config()));
        let browser = BrowserTrigger::new(simulator);

        Self::with_components(settings, Arc::new(provider), Arc::new(http), Arc::new(browser))
    }

    /// Build a session from explicit parts
    pub fn with_components(
        settings: AppSettings,
        provider: Arc<dyn MetadataProvider>,
        http: Arc<dyn DownloadTrigger>,
        browser: Arc<dyn DownloadTrigger>,
    ) -> Result<Self> {
        let api_base = settings
            .api_base_url
            .as_deref()
            .map(normalize_base)
            .transpose()?;

        Ok(Self {
            settings,
            api_base,
            provider,
            http,
            browser,
        })
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// Validate the source URL and fetch its metadata
    pub async fn fetch_metadata(&self, url: &str) -> Result<VideoInfo> {
        let source = validate_source_url(url)?;
        self.provider.extract_info(source.as_str()).await
    }

    /// Pick the format for a request, failing when none matches
    pub fn choose_format<'a>(
        &self,
        info: &'a VideoInfo,
        kind: MediaKind,
        quality: Option<&str>,
    ) -> Result<&'a Format> {
        select_format_with(&info.formats, kind, quality, &self.settings.selection)
            .ok_or_else(|| ClipfetchError::NoMatchingFormat(kind).into())
    }

    /// Plan download targets for a chosen format
    pub fn plan(
        &self,
        request: &DownloadRequest,
        info: &VideoInfo,
        format: &Format,
    ) -> Result<Vec<DownloadTarget>> {
        let filename = output_filename(&info.title, request.filename.as_deref(), format, request.kind);
        let ctx = StrategyContext {
            source_url: request.url.trim(),
            format,
            filename: &filename,
            api_base: self.api_base.as_ref(),
            mirror_template: &self.settings.mirror_template,
        };
        plan_targets(self.settings.strategy, &self.settings.strategy_order, &ctx)
    }

    fn trigger_for(&self, target: &DownloadTarget) -> &Arc<dyn DownloadTrigger> {
        if target.strategy.requires_browser() || self.settings.use_browser {
            &self.browser
        } else {
            &self.http
        }
    }

    /// Run a request end to end, falling back through the planned strategies
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> Result<DownloadReport> {
        let id = Uuid::new_v4();
        let span = info_span!("download", %id);

        async move {
            let info = self.fetch_metadata(&request.url).await?;
            let quality = request.quality.as_deref().or(self.settings.quality.as_deref());
            let format = self.choose_format(&info, request.kind, quality)?;
            info!(
                "Selected {} {} ({}) for \"{}\"",
                request.kind, format.quality, format.container, info.title
            );

            let targets = self.plan(request, &info, format)?;
            let mut last_error = None;

            for target in &targets {
                let trigger = self.trigger_for(target);
                info!("Trying {} strategy via {} trigger", target.strategy, trigger.id());

                match trigger.trigger(target, progress_tx.clone()).await {
                    Ok(outcome) => {
                        return Ok(DownloadReport {
                            id,
                            title: info.title.clone(),
                            format: format.clone(),
                            strategy: target.strategy,
                            outcome,
                        });
                    }
                    Err(e) => {
                        warn!("{} strategy failed: {}. Trying next...", target.strategy, e);
                        last_error = Some(e);
                    }
                }
            }

            Err(last_error.unwrap_or_else(|| {
                ClipfetchError::StrategyUnavailable("no download targets planned".to_string()).into()
            }))
        }
        .instrument(span)
        .await
    }
}

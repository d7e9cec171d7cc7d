//! Download triggers
//!
//! A trigger takes a planned [`DownloadTarget`] and starts the actual save:
//! [`HttpTrigger`] streams it to disk and reports measured progress,
//! [`BrowserTrigger`] hands the URL to the system browser and, optionally,
//! plays simulated progress for feedback.

use crate::downloader::progress::DownloadProgress;
use crate::downloader::simulator::ProgressSimulator;
use crate::downloader::strategy::DownloadTarget;
use crate::utils::error::ClipfetchError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What a trigger achieved
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The file was written locally
    Saved { path: PathBuf, bytes: u64 },
    /// The URL was handed to the browser; nothing confirms the save
    HandedOff { url: String },
}

#[async_trait]
pub trait DownloadTrigger: Send + Sync {
    fn id(&self) -> &'static str;

    async fn trigger(
        &self,
        target: &DownloadTarget,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> Result<TriggerOutcome>;
}

/// Saves targets over HTTP into a local directory
pub struct HttpTrigger {
    client: Client,
    output_dir: PathBuf,
}

impl HttpTrigger {
    pub fn new(output_dir: impl Into<PathBuf>, timeout: Duration, user_agent: &str) -> Result<Self> {
        // No overall timeout here: it would cap the length of a transfer
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            output_dir: output_dir.into(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn stream_to(
        &self,
        target: &DownloadTarget,
        partial_path: &Path,
        progress_tx: &mpsc::Sender<DownloadProgress>,
    ) -> Result<u64> {
        let response = self.client.get(target.url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(ClipfetchError::DownloadError(format!(
                "HTTP {} from {} strategy",
                response.status(),
                target.strategy
            ))
            .into());
        }

        let total_size = response
            .content_length()
            .or(target.expected_size)
            .unwrap_or(0);

        let mut progress = DownloadProgress::measured(total_size);
        progress.update(0, 0.0);
        if let Err(e) = progress_tx.send(progress.clone()).await {
            warn!("Failed to send initial progress: {}", e);
        }

        let mut file = File::create(partial_path)
            .await
            .with_context(|| format!("Failed to create {:?}", partial_path))?;
        let mut downloaded = 0u64;

        let start_time = Instant::now();
        let mut last_update_time = start_time;

        let mut stream = response.bytes_stream();
        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            // Update progress every second
            let now = Instant::now();
            if now.duration_since(last_update_time) >= Duration::from_secs(1) {
                let elapsed = now.duration_since(start_time).as_secs_f64();
                let speed = if elapsed > 0.0 {
                    downloaded as f64 / elapsed
                } else {
                    0.0
                };
                progress.update(downloaded, speed);

                if let Err(e) = progress_tx.send(progress.clone()).await {
                    warn!("Failed to send progress update: {}", e);
                }
                last_update_time = now;
            }
        }

        file.flush().await?;

        let elapsed = start_time.elapsed().as_secs_f64();
        let speed = if elapsed > 0.0 {
            downloaded as f64 / elapsed
        } else {
            0.0
        };
        progress.update(downloaded, speed);
        progress.complete();
        if let Err(e) = progress_tx.send(progress).await {
            warn!("Failed to send final progress: {}", e);
        }

        Ok(downloaded)
    }
}

#[async_trait]
impl DownloadTrigger for HttpTrigger {
    fn id(&self) -> &'static str {
        "http"
    }

    async fn trigger(
        &self,
        target: &DownloadTarget,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> Result<TriggerOutcome> {
        if target.strategy.requires_browser() {
            return Err(ClipfetchError::StrategyUnavailable(format!(
                "{} targets can only be opened in a browser",
                target.strategy
            ))
            .into());
        }

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", self.output_dir))?;

        let final_path = self.output_dir.join(&target.filename);
        let partial_path = self.output_dir.join(format!("{}.part", target.filename));
        debug!("Saving {} to {:?}", target.url, final_path);

        match self.stream_to(target, &partial_path, &progress_tx).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial_path, &final_path).await?;
                info!("Saved {} bytes to {:?}", bytes, final_path);
                Ok(TriggerOutcome::Saved {
                    path: final_path,
                    bytes,
                })
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial_path).await {
                    debug!("No partial file to clean up: {}", cleanup);
                }
                let mut failed = DownloadProgress::measured(0);
                failed.failed(e.to_string());
                let _ = progress_tx.send(failed).await;
                Err(e)
            }
        }
    }
}

type Opener = dyn Fn(&str) -> std::io::Result<()> + Send + Sync;

/// Opens targets in the system browser
pub struct BrowserTrigger {
    simulator: Option<ProgressSimulator>,
    opener: Box<Opener>,
}

impl BrowserTrigger {
    /// `simulator` drives feedback after the hand-off; `None` disables it
    pub fn new(simulator: Option<ProgressSimulator>) -> Self {
        Self::with_opener(simulator, |url| open::that_detached(url))
    }

    /// Use a custom opener instead of the system browser
    pub fn with_opener<F>(simulator: Option<ProgressSimulator>, opener: F) -> Self
    where
        F: Fn(&str) -> std::io::Result<()> + Send + Sync + 'static,
    {
        Self {
            simulator,
            opener: Box::new(opener),
        }
    }
}

#[async_trait]
impl DownloadTrigger for BrowserTrigger {
    fn id(&self) -> &'static str {
        "browser"
    }

    async fn trigger(
        &self,
        target: &DownloadTarget,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> Result<TriggerOutcome> {
        info!(
            "Opening {} link in browser (suggested name: {})",
            target.strategy, target.filename
        );
        (self.opener)(target.url.as_str()).map_err(|e| {
            ClipfetchError::DownloadError(format!("could not open browser: {}", e))
        })?;

        if let Some(simulator) = &self.simulator {
            let outcome = simulator
                .start(target.expected_size, progress_tx)
                .join()
                .await;
            debug!("Simulated progress ended: {:?}", outcome);
        }

        Ok(TriggerOutcome::HandedOff {
            url: target.url.to_string(),
        })
    }
}

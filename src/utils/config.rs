//! Application configuration
//!
//! Settings come from a JSON file (see [`paths::settings_path`]) layered over
//! [`AppSettings::default`]; the CLI applies its own overrides on top.

use crate::downloader::simulator::SimulationConfig;
use crate::downloader::strategy::{DownloadStrategy, StrategyPreference, DEFAULT_MIRROR_TEMPLATE};
use crate::extractor::{MediaKind, SelectionOptions};
use crate::utils::error::ClipfetchError;
use crate::utils::paths;
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Base URL of the metadata/proxy backend
    pub api_base_url: Option<String>,

    /// Where HTTP downloads are saved
    pub download_location: PathBuf,

    /// Preferred quality label, e.g. "720p"
    pub quality: Option<String>,

    pub media_kind: MediaKind,

    pub selection: SelectionOptions,

    pub strategy: StrategyPreference,

    /// Order in which `auto` tries strategies
    pub strategy_order: Vec<DownloadStrategy>,

    /// Mirror page template; `{id}` is replaced by the video id
    pub mirror_template: String,

    /// Hand direct/proxy links to the browser instead of saving them ourselves
    pub use_browser: bool,

    /// Show simulated progress when real progress can't be observed
    pub simulate_progress: bool,

    pub simulation: SimulationSettings,

    pub request_timeout_secs: u64,

    pub user_agent: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: None,
            download_location: paths::downloads_dir(),
            quality: None,
            media_kind: MediaKind::Video,
            selection: SelectionOptions::default(),
            strategy: StrategyPreference::Auto,
            strategy_order: DownloadStrategy::ALL.to_vec(),
            mirror_template: DEFAULT_MIRROR_TEMPLATE.to_string(),
            use_browser: false,
            simulate_progress: true,
            simulation: SimulationSettings::default(),
            request_timeout_secs: 30,
            user_agent: format!("clipfetch/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Simulated progress tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub interval_ms: u64,
    pub step_percent: f64,
    /// Speed reported when the total size is unknown
    pub assumed_speed_bps: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            interval_ms: defaults.interval.as_millis() as u64,
            step_percent: defaults.step_percent,
            assumed_speed_bps: defaults.assumed_speed_bps,
        }
    }
}

impl SimulationSettings {
    pub fn to_config(&self) -> SimulationConfig {
        SimulationConfig {
            interval: Duration::from_millis(self.interval_ms),
            step_percent: self.step_percent,
            assumed_speed_bps: self.assumed_speed_bps,
        }
    }
}

impl AppSettings {
    /// Load settings from `path`, falling back to defaults when it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file at {:?}, using defaults", path);
            return Ok(Self::default().normalized());
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        let settings: AppSettings = serde_json::from_str(&raw)
            .map_err(|e| ClipfetchError::ConfigError(format!("{:?}: {}", path, e)))?;

        info!("Loaded settings from {:?}", path);
        Ok(settings.normalized())
    }

    /// Load from the platform settings path
    pub fn load_default() -> Result<Self> {
        Self::load(&paths::settings_path())
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Enforce sane minimums and drop duplicate strategies
    pub fn normalized(mut self) -> Self {
        if self.simulation.interval_ms == 0 {
            self.simulation.interval_ms = 1;
        }
        if !(self.simulation.step_percent > 0.0) {
            self.simulation.step_percent = SimulationConfig::default().step_percent;
        }
        self.simulation.step_percent = self.simulation.step_percent.min(100.0);
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = 30;
        }

        let mut seen = Vec::with_capacity(self.strategy_order.len());
        self.strategy_order.retain(|s| {
            if seen.contains(s) {
                false
            } else {
                seen.push(*s);
                true
            }
        });
        if self.strategy_order.is_empty() {
            self.strategy_order = DownloadStrategy::ALL.to_vec();
        }

        self.quality = self
            .quality
            .take()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty());

        self
    }

    /// Absolute form of the download location
    pub fn resolved_download_location(&self) -> Result<PathBuf> {
        let absolute = self
            .download_location
            .absolutize()
            .with_context(|| format!("Invalid download location {:?}", self.download_location))?;
        Ok(absolute.into_owned())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

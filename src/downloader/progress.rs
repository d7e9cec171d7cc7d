//! Progress tracking for downloads

use std::time::Duration;

/// Where a progress update comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressSource {
    /// Counted from bytes actually received
    Measured,
    /// Produced by the progress simulator; says nothing about the real transfer
    Simulated,
}

/// Progress tracking structure
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// 0 when unknown
    pub total_bytes: u64,
    pub downloaded_bytes: u64,
    /// Completion in percent, 0.0 to 100.0
    pub percent: f64,
    pub speed: f64, // bytes per second
    pub eta: Option<Duration>,
    pub status: DownloadStatus,
    pub source: ProgressSource,
}

impl DownloadProgress {
    /// Create a tracker for a real transfer
    pub fn measured(total_bytes: u64) -> Self {
        Self::new(total_bytes, ProgressSource::Measured)
    }

    /// Create a tracker for simulated progress
    pub fn simulated(total_bytes: u64) -> Self {
        Self::new(total_bytes, ProgressSource::Simulated)
    }

    fn new(total_bytes: u64, source: ProgressSource) -> Self {
        Self {
            total_bytes,
            downloaded_bytes: 0,
            percent: 0.0,
            speed: 0.0,
            eta: None,
            status: DownloadStatus::Initializing,
            source,
        }
    }

    /// Update progress with new byte counts
    pub fn update(&mut self, downloaded_bytes: u64, speed: f64) {
        self.downloaded_bytes = downloaded_bytes;
        self.speed = speed;
        self.status = DownloadStatus::Downloading;

        if self.total_bytes == 0 {
            self.eta = None;
            return;
        }

        self.percent = (downloaded_bytes as f64 / self.total_bytes as f64 * 100.0).min(100.0);

        // Calculate ETA if we have a speed
        if speed > 0.0 && self.downloaded_bytes < self.total_bytes {
            let remaining = self.total_bytes - self.downloaded_bytes;
            self.eta = Some(Duration::from_secs_f64((remaining as f64) / speed));
        } else if self.downloaded_bytes >= self.total_bytes {
            self.eta = Some(Duration::from_secs(0));
        } else {
            self.eta = None;
        }
    }

    /// Set every field of a synthetic step at once
    pub fn advance_simulated(&mut self, percent: f64, speed: f64, eta: Duration) {
        self.percent = percent.clamp(0.0, 100.0);
        self.downloaded_bytes = (self.total_bytes as f64 * self.percent / 100.0) as u64;
        self.speed = speed;
        self.eta = Some(eta);
        self.status = DownloadStatus::Downloading;
    }

    /// Mark as completed
    pub fn complete(&mut self) {
        self.status = DownloadStatus::Completed;
        self.percent = 100.0;
        if self.total_bytes > 0 {
            self.downloaded_bytes = self.total_bytes;
        } else {
            self.total_bytes = self.downloaded_bytes;
        }
        self.eta = Some(Duration::from_secs(0));
    }

    /// Mark as failed
    pub fn failed(&mut self, error: String) {
        self.status = DownloadStatus::Failed(error);
    }

    /// Mark as cancelled
    pub fn cancel(&mut self) {
        self.status = DownloadStatus::Cancelled;
        self.eta = None;
    }

    /// Get progress percentage (0.0 to 1.0)
    pub fn percentage(&self) -> f64 {
        self.percent / 100.0
    }

    pub fn is_simulated(&self) -> bool {
        self.source == ProgressSource::Simulated
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.status,
            DownloadStatus::Completed | DownloadStatus::Failed(_) | DownloadStatus::Cancelled
        )
    }
}

/// Download status
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DownloadStatus {
    #[default]
    Initializing,
    Downloading,
    Completed,
    Failed(String),
    Cancelled,
}

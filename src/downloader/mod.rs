//! Download strategies, triggers and progress reporting

pub mod progress;
pub mod simulator;
pub mod strategy;
pub mod trigger;

// Re-export for convenience
pub use progress::{DownloadProgress, DownloadStatus, ProgressSource};
pub use simulator::{ProgressSimulator, SimulationConfig, SimulationHandle, SimulationOutcome};
pub use strategy::{DownloadStrategy, DownloadTarget, StrategyPreference};
pub use trigger::{BrowserTrigger, DownloadTrigger, HttpTrigger, TriggerOutcome};

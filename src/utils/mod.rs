//! Utility modules for error handling, configuration and naming

pub mod config;
pub mod error;
pub mod filename;
pub mod humanize;
pub mod paths;
pub mod video_url;

// Re-export for convenience
pub use config::{AppSettings, SimulationSettings};
pub use error::ClipfetchError;
pub use filename::{output_filename, sanitize_filename};
pub use video_url::{extract_video_id, validate_source_url};

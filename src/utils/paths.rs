//! Platform directories for clipfetch
//!
//! - Downloads: the platform Downloads directory, never a relative path
//! - Config: `~/.config/clipfetch` on Linux, the app data dir elsewhere

use std::path::PathBuf;
use tracing::warn;

const APP_DIR: &str = if cfg!(target_os = "linux") {
    "clipfetch"
} else {
    "Clipfetch"
};

/// Returns the default download directory
pub fn downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| {
            warn!("Could not determine Downloads directory, using the system temp dir");
            std::env::temp_dir()
        })
}

/// Returns the configuration directory
/// - macOS: ~/Library/Application Support/Clipfetch
/// - Windows: %APPDATA%\Clipfetch
/// - Linux: ~/.config/clipfetch
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Default location of the settings file
pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downloads_dir_is_absolute() {
        assert!(downloads_dir().is_absolute());
    }

    #[test]
    fn test_settings_path_naming() {
        let path = settings_path();
        assert!(path.ends_with("settings.json"));

        let dir_name = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        #[cfg(target_os = "linux")]
        assert_eq!(dir_name, "clipfetch");

        #[cfg(not(target_os = "linux"))]
        assert_eq!(dir_name, "Clipfetch");
    }
}

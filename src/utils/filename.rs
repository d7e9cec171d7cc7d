//! Output filename construction

use crate::extractor::{Format, MediaKind};

/// Maximum filename length in bytes
pub const MAX_FILENAME_LEN: usize = 200;

/// Sanitizes a filename by removing invalid characters and preventing security issues.
///
/// # Security
/// - Removes path traversal sequences (`..`)
/// - Removes leading dots (prevents hidden files)
/// - Removes invalid filesystem characters and control characters
/// - Handles empty strings
/// - Limits filename length to 200 bytes
///
/// # Examples
/// ```
/// use clipfetch::utils::filename::sanitize_filename;
/// assert_eq!(sanitize_filename("../../etc/passwd"), "_etc_passwd");
/// assert_eq!(sanitize_filename(".hidden"), "hidden");
/// assert_eq!(sanitize_filename("normal_file.mp4"), "normal_file.mp4");
/// ```
pub fn sanitize_filename(name: &str) -> String {
    // Characters invalid on Windows/macOS/Linux filesystems
    let invalid_chars = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

    let mut sanitized: String = name
        .replace("..", "")
        .chars()
        .map(|c| {
            if invalid_chars.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    // Leading dots and whitespace, then trailing dots and spaces (Windows)
    sanitized = sanitized.trim().trim_start_matches('.').to_string();
    sanitized = sanitized.trim_end_matches('.').trim_end().to_string();

    while sanitized.contains("__") {
        sanitized = sanitized.replace("__", "_");
    }

    if sanitized.is_empty() {
        return "unnamed_file".to_string();
    }

    if sanitized.len() > MAX_FILENAME_LEN {
        if let Some(dot_pos) = sanitized.rfind('.') {
            let extension = &sanitized[dot_pos..];
            if extension.len() < 10 {
                let name_part = truncate_at_boundary(&sanitized[..dot_pos], MAX_FILENAME_LEN - extension.len());
                return format!("{}{}", name_part, extension);
            }
        }
        sanitized = truncate_at_boundary(&sanitized, MAX_FILENAME_LEN).to_string();
    }

    sanitized
}

fn truncate_at_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// File extension for a selected format
///
/// Audio-only mp4 streams are saved as `.m4a`; everything else uses the
/// container name, falling back to `mp4`.
pub fn extension_for(format: &Format, kind: MediaKind) -> String {
    let container = format.container.trim().to_ascii_lowercase();
    match (kind, container.as_str()) {
        (MediaKind::Audio, "mp4") => "m4a".to_string(),
        (_, "") => "mp4".to_string(),
        (_, other) => other.to_string(),
    }
}

/// Pick the name a download is saved under
///
/// A requested name wins (an extension is appended when it has none);
/// otherwise the video title is used.
pub fn output_filename(
    title: &str,
    requested: Option<&str>,
    format: &Format,
    kind: MediaKind,
) -> String {
    let extension = extension_for(format, kind);

    match requested.map(str::trim).filter(|r| !r.is_empty()) {
        Some(name) => {
            let has_extension = std::path::Path::new(name)
                .extension()
                .is_some_and(|e| !e.is_empty());
            if has_extension {
                sanitize_filename(name)
            } else {
                sanitize_filename(&format!("{}.{}", name, extension))
            }
        }
        None => sanitize_filename(&format!("{}.{}", title.trim(), extension)),
    }
}

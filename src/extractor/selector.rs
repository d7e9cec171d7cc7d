//! Format selection
//!
//! Picks a single [`Format`] out of the list the metadata API returns:
//!
//! 1. filter by media kind (audio-only, or muxed mp4 video)
//! 2. if a quality label was given, resolve it to a target height and pick
//!    a candidate at or below it according to the [`QualityPolicy`]
//! 3. otherwise (or if step 2 found nothing) take the tallest candidate
//!
//! Everything here is pure.

use crate::extractor::models::{Format, MediaKind};
use serde::{Deserialize, Serialize};

/// Target height used for quality labels that aren't in the table
pub const DEFAULT_TARGET_HEIGHT: u32 = 1080;

const QUALITY_HEIGHTS: [(&str, u32); 8] = [
    ("4320p", 4320),
    ("2160p", 2160),
    ("1440p", 1440),
    ("1080p", 1080),
    ("720p", 720),
    ("480p", 480),
    ("360p", 360),
    ("240p", 240),
];

/// How a requested quality label picks among candidates at or below its height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPolicy {
    /// First candidate in list order not exceeding the target
    #[default]
    FirstAtOrBelow,
    /// Tallest candidate not exceeding the target; leftmost on ties
    ClosestAtOrBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionOptions {
    pub policy: QualityPolicy,
    /// Require audio-only formats to be in an mp4 container as well
    pub strict_audio_container: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            policy: QualityPolicy::default(),
            strict_audio_container: true,
        }
    }
}

/// Map a quality label such as `"720p"` to a pixel height.
///
/// Unknown labels map to [`DEFAULT_TARGET_HEIGHT`].
pub fn target_height(label: &str) -> u32 {
    let label = label.trim().to_ascii_lowercase();
    QUALITY_HEIGHTS
        .iter()
        .find(|(known, _)| *known == label)
        .map(|(_, height)| *height)
        .unwrap_or(DEFAULT_TARGET_HEIGHT)
}

/// Whether a format belongs to the requested media kind
pub fn matches_kind(format: &Format, kind: MediaKind, options: &SelectionOptions) -> bool {
    match kind {
        MediaKind::Audio => {
            format.has_audio
                && !format.has_video
                && (!options.strict_audio_container || format.is_mp4())
        }
        MediaKind::Video => format.has_video && format.has_audio && format.is_mp4(),
    }
}

/// First stage: keep the formats of the requested kind, in their original order
pub fn filter_formats<'a>(
    formats: &'a [Format],
    kind: MediaKind,
    options: &SelectionOptions,
) -> Vec<&'a Format> {
    formats
        .iter()
        .filter(|f| matches_kind(f, kind, options))
        .collect()
}

/// Select the best format with the default options
pub fn select_format<'a>(
    formats: &'a [Format],
    kind: MediaKind,
    quality: Option<&str>,
) -> Option<&'a Format> {
    select_format_with(formats, kind, quality, &SelectionOptions::default())
}

/// Select the best format, or `None` when nothing of the requested kind exists
pub fn select_format_with<'a>(
    formats: &'a [Format],
    kind: MediaKind,
    quality: Option<&str>,
    options: &SelectionOptions,
) -> Option<&'a Format> {
    let candidates = filter_formats(formats, kind, options);
    if candidates.is_empty() {
        return None;
    }

    if let Some(label) = quality {
        let target = target_height(label);
        if let Some(found) = resolve_quality(&candidates, target, options.policy) {
            return Some(found);
        }
    }

    tallest(candidates.iter().copied())
}

fn resolve_quality<'a>(
    candidates: &[&'a Format],
    target: u32,
    policy: QualityPolicy,
) -> Option<&'a Format> {
    let mut eligible = candidates
        .iter()
        .copied()
        .filter(|f| f.parsed_height() <= target);

    match policy {
        QualityPolicy::FirstAtOrBelow => eligible.next(),
        QualityPolicy::ClosestAtOrBelow => tallest(eligible),
    }
}

// `Iterator::max_by_key` keeps the last maximum; we want the first.
fn tallest<'a>(formats: impl Iterator<Item = &'a Format>) -> Option<&'a Format> {
    formats.reduce(|best, f| {
        if f.parsed_height() > best.parsed_height() {
            f
        } else {
            best
        }
    })
}

//! Data structures for video information

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Video information as returned by the metadata API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub duration: Option<u64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "uploader")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub view_count: Option<u64>,
    #[serde(default, alias = "uploadDate")]
    pub publish_date: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub formats: Vec<Format>,
}

impl VideoInfo {
    /// Parse `publish_date`, accepting `YYYY-MM-DD`, `YYYYMMDD` and RFC 3339
    pub fn published_date(&self) -> Option<NaiveDate> {
        let raw = self.publish_date.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }
}

/// One available encoding of a media item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Format {
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub has_video: bool,
    #[serde(default)]
    pub has_audio: bool,
    /// Pixel height, kept as the string the API sent
    #[serde(default, alias = "resolution", deserialize_with = "lenient_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub bitrate: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    pub content_length: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Format {
    /// Leading integer of the height string, 0 when missing or non-numeric
    pub fn parsed_height(&self) -> u32 {
        self.height.as_deref().map(parse_height).unwrap_or(0)
    }

    pub fn is_mp4(&self) -> bool {
        self.container.eq_ignore_ascii_case("mp4")
    }

    /// Direct media URL, if the API supplied a non-empty one
    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.trim().is_empty())
    }
}

/// Extract the leading integer of a height/resolution string.
///
/// `"1080p"` → 1080, `"720"` → 720, `""` / `"abc"` → 0.
pub fn parse_height(raw: &str) -> u32 {
    let digits = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .filter_map(|c| c.to_digit(10));
    // Saturates at u32::MAX
    digits.fold(0u32, |height, d| height.saturating_mul(10).saturating_add(d))
}

/// Selection axis: video with sound, or audio only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

// The API is inconsistent about numbers vs strings for a few fields.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Int(u64),
    Float(f64),
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|v| match v {
            StringOrNumber::Str(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }),
    )
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.and_then(|v| match v {
            StringOrNumber::Str(s) => s.trim().parse().ok(),
            StringOrNumber::Int(n) => Some(n),
            StringOrNumber::Float(n) if n >= 0.0 => Some(n as u64),
            StringOrNumber::Float(_) => None,
        }),
    )
}

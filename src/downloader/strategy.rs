//! Download strategies
//!
//! A selected format can be fetched three ways:
//!
//! - [`DownloadStrategy::Direct`]: the format's own media URL
//! - [`DownloadStrategy::BackendProxy`]: the backend relays the media URL
//! - [`DownloadStrategy::Mirror`]: a third-party mirror page for the video id
//!
//! Planning turns a preference plus the available capabilities into an
//! ordered list of [`DownloadTarget`]s; the session tries them in turn.

use crate::extractor::Format;
use crate::utils::error::ClipfetchError;
use crate::utils::video_url::extract_video_id;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use url::Url;

/// Path of the relay endpoint, relative to the API base
pub const PROXY_PATH: &str = "api/download";

pub const DEFAULT_MIRROR_TEMPLATE: &str = "https://ssyoutube.com/watch?v={id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStrategy {
    Direct,
    BackendProxy,
    Mirror,
}

impl DownloadStrategy {
    /// Default fallback order
    pub const ALL: [DownloadStrategy; 3] = [
        DownloadStrategy::Direct,
        DownloadStrategy::BackendProxy,
        DownloadStrategy::Mirror,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadStrategy::Direct => "direct",
            DownloadStrategy::BackendProxy => "proxy",
            DownloadStrategy::Mirror => "mirror",
        }
    }

    /// Mirror targets are web pages, only a browser can use them
    pub fn requires_browser(&self) -> bool {
        matches!(self, DownloadStrategy::Mirror)
    }
}

impl fmt::Display for DownloadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which strategies the user allows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyPreference {
    /// Every applicable strategy, in the configured order
    #[default]
    Auto,
    Direct,
    #[serde(alias = "backend_proxy")]
    Proxy,
    Mirror,
}

impl StrategyPreference {
    /// The single strategy this preference pins, if any
    pub fn only(&self) -> Option<DownloadStrategy> {
        match self {
            StrategyPreference::Auto => None,
            StrategyPreference::Direct => Some(DownloadStrategy::Direct),
            StrategyPreference::Proxy => Some(DownloadStrategy::BackendProxy),
            StrategyPreference::Mirror => Some(DownloadStrategy::Mirror),
        }
    }
}

impl FromStr for StrategyPreference {
    type Err = ClipfetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(StrategyPreference::Auto),
            "direct" => Ok(StrategyPreference::Direct),
            "proxy" | "backend_proxy" | "backend-proxy" => Ok(StrategyPreference::Proxy),
            "mirror" => Ok(StrategyPreference::Mirror),
            other => Err(ClipfetchError::ConfigError(format!(
                "unknown strategy '{}' (expected auto, direct, proxy or mirror)",
                other
            ))),
        }
    }
}

/// Everything planning needs to know about one download
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub source_url: &'a str,
    pub format: &'a Format,
    pub filename: &'a str,
    pub api_base: Option<&'a Url>,
    pub mirror_template: &'a str,
}

/// A concrete URL to hand to a trigger
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadTarget {
    pub strategy: DownloadStrategy,
    pub url: Url,
    pub filename: String,
    /// Expected size from the metadata, if any
    pub expected_size: Option<u64>,
}

/// Build the target for one strategy, or explain why it can't be used
pub fn build_target(strategy: DownloadStrategy, ctx: &StrategyContext<'_>) -> Result<DownloadTarget> {
    let url = match strategy {
        DownloadStrategy::Direct => direct_url(ctx)?,
        DownloadStrategy::BackendProxy => proxy_url(ctx)?,
        DownloadStrategy::Mirror => mirror_url(ctx)?,
    };

    Ok(DownloadTarget {
        strategy,
        url,
        filename: ctx.filename.to_string(),
        expected_size: ctx.format.content_length,
    })
}

/// Plan the targets to try, in order
pub fn plan_targets(
    preference: StrategyPreference,
    order: &[DownloadStrategy],
    ctx: &StrategyContext<'_>,
) -> Result<Vec<DownloadTarget>> {
    if let Some(strategy) = preference.only() {
        return Ok(vec![build_target(strategy, ctx)?]);
    }

    let mut targets = Vec::new();
    for strategy in order {
        match build_target(*strategy, ctx) {
            Ok(target) => targets.push(target),
            Err(e) => debug!("Skipping {} strategy: {}", strategy, e),
        }
    }

    if targets.is_empty() {
        return Err(ClipfetchError::StrategyUnavailable(format!(
            "no download strategy applies to {}",
            ctx.source_url
        ))
        .into());
    }
    Ok(targets)
}

fn media_url(ctx: &StrategyContext<'_>) -> Result<Url> {
    let raw = ctx.format.source_url().ok_or_else(|| {
        ClipfetchError::StrategyUnavailable("format has no media URL".to_string())
    })?;
    Url::parse(raw).map_err(|e| {
        ClipfetchError::StrategyUnavailable(format!("format media URL is invalid: {}", e)).into()
    })
}

fn direct_url(ctx: &StrategyContext<'_>) -> Result<Url> {
    media_url(ctx)
}

fn proxy_url(ctx: &StrategyContext<'_>) -> Result<Url> {
    let base = ctx.api_base.ok_or_else(|| {
        ClipfetchError::StrategyUnavailable("no API base URL configured".to_string())
    })?;
    let media = media_url(ctx)?;

    let mut url = base
        .join(PROXY_PATH)
        .map_err(|e| ClipfetchError::InvalidUrl(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("url", media.as_str())
        .append_pair("filename", ctx.filename);
    Ok(url)
}

fn mirror_url(ctx: &StrategyContext<'_>) -> Result<Url> {
    if !ctx.mirror_template.contains("{id}") {
        return Err(ClipfetchError::StrategyUnavailable(
            "mirror template has no {id} placeholder".to_string(),
        )
        .into());
    }
    let id = extract_video_id(ctx.source_url).ok_or_else(|| {
        ClipfetchError::StrategyUnavailable(format!("no video id in {}", ctx.source_url))
    })?;

    let raw = ctx.mirror_template.replace("{id}", &id);
    Url::parse(&raw).map_err(|e| {
        ClipfetchError::StrategyUnavailable(format!("mirror URL {} is invalid: {}", raw, e)).into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    fn format(url: Option<&str>) -> Format {
        Format {
            container: "mp4".to_string(),
            has_video: true,
            has_audio: true,
            height: Some("720".to_string()),
            content_length: Some(2048),
            url: url.map(str::to_string),
            ..Default::default()
        }
    }

    fn ctx<'a>(format: &'a Format, api: Option<&'a Url>, source: &'a str) -> StrategyContext<'a> {
        StrategyContext {
            source_url: source,
            format,
            filename: "Rick Astley.mp4",
            api_base: api,
            mirror_template: DEFAULT_MIRROR_TEMPLATE,
        }
    }

    fn api() -> Url {
        Url::parse("https://api.example.com/").unwrap()
    }

    #[test]
    fn test_direct_target() {
        let f = format(Some("https://cdn.example.com/v.mp4?sig=1"));
        let target = build_target(DownloadStrategy::Direct, &ctx(&f, None, SOURCE)).unwrap();
        assert_eq!(target.url.as_str(), "https://cdn.example.com/v.mp4?sig=1");
        assert_eq!(target.filename, "Rick Astley.mp4");
        assert_eq!(target.expected_size, Some(2048));
    }

    #[test]
    fn test_direct_requires_media_url() {
        let f = format(None);
        let err = build_target(DownloadStrategy::Direct, &ctx(&f, None, SOURCE)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipfetchError>(),
            Some(ClipfetchError::StrategyUnavailable(_))
        ));
    }

    #[test]
    fn test_proxy_target_encodes_query() {
        let f = format(Some("https://cdn.example.com/v.mp4?a=1&b=2"));
        let base = api();
        let target =
            build_target(DownloadStrategy::BackendProxy, &ctx(&f, Some(&base), SOURCE)).unwrap();

        assert_eq!(target.url.path(), "/api/download");
        let pairs: Vec<(String, String)> = target.url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("url".to_string(), "https://cdn.example.com/v.mp4?a=1&b=2".to_string()),
                ("filename".to_string(), "Rick Astley.mp4".to_string()),
            ]
        );
    }

    #[test]
    fn test_proxy_requires_api_base() {
        let f = format(Some("https://cdn.example.com/v.mp4"));
        assert!(build_target(DownloadStrategy::BackendProxy, &ctx(&f, None, SOURCE)).is_err());
    }

    #[test]
    fn test_mirror_target() {
        let f = format(None);
        let target = build_target(DownloadStrategy::Mirror, &ctx(&f, None, SOURCE)).unwrap();
        assert_eq!(target.url.as_str(), "https://ssyoutube.com/watch?v=dQw4w9WgXcQ");
        assert!(target.strategy.requires_browser());
    }

    #[test]
    fn test_mirror_requires_video_id() {
        let f = format(None);
        let result = build_target(
            DownloadStrategy::Mirror,
            &ctx(&f, None, "https://vimeo.com/12345"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_auto_plans_in_order() {
        let f = format(Some("https://cdn.example.com/v.mp4"));
        let base = api();
        let targets = plan_targets(
            StrategyPreference::Auto,
            &DownloadStrategy::ALL,
            &ctx(&f, Some(&base), SOURCE),
        )
        .unwrap();

        let strategies: Vec<_> = targets.iter().map(|t| t.strategy).collect();
        assert_eq!(strategies, DownloadStrategy::ALL.to_vec());
    }

    #[test]
    fn test_auto_skips_unavailable() {
        let f = format(None);
        let targets = plan_targets(
            StrategyPreference::Auto,
            &DownloadStrategy::ALL,
            &ctx(&f, None, SOURCE),
        )
        .unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].strategy, DownloadStrategy::Mirror);
    }

    #[test]
    fn test_auto_respects_custom_order() {
        let f = format(Some("https://cdn.example.com/v.mp4"));
        let targets = plan_targets(
            StrategyPreference::Auto,
            &[DownloadStrategy::Mirror, DownloadStrategy::Direct],
            &ctx(&f, None, SOURCE),
        )
        .unwrap();
        let strategies: Vec<_> = targets.iter().map(|t| t.strategy).collect();
        assert_eq!(strategies, vec![DownloadStrategy::Mirror, DownloadStrategy::Direct]);
    }

    #[test]
    fn test_auto_with_nothing_applicable() {
        let f = format(None);
        let err = plan_targets(
            StrategyPreference::Auto,
            &DownloadStrategy::ALL,
            &ctx(&f, None, "https://vimeo.com/12345"),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ClipfetchError>(),
            Some(ClipfetchError::StrategyUnavailable(_))
        ));
    }

    #[test]
    fn test_pinned_strategy_fails_instead_of_falling_back() {
        let f = format(None);
        assert!(plan_targets(
            StrategyPreference::Direct,
            &DownloadStrategy::ALL,
            &ctx(&f, None, SOURCE),
        )
        .is_err());
    }

    #[test]
    fn test_preference_from_str() {
        assert_eq!("auto".parse::<StrategyPreference>().unwrap(), StrategyPreference::Auto);
        assert_eq!("Proxy".parse::<StrategyPreference>().unwrap(), StrategyPreference::Proxy);
        assert_eq!(
            "backend-proxy".parse::<StrategyPreference>().unwrap(),
            StrategyPreference::Proxy
        );
        assert!("carrier-pigeon".parse::<StrategyPreference>().is_err());
    }
}

//! clipfetch - fetch a video through its metadata API
//!
//! Looks up a video through the backend API, picks the format that best
//! matches the requested quality, and saves it directly, through the backend
//! relay, or via a mirror page in the browser.

use anyhow::Result;
use clap::Parser;
use clipfetch::downloader::{DownloadProgress, DownloadStatus, StrategyPreference, TriggerOutcome};
use clipfetch::extractor::{MediaKind, QualityPolicy, VideoInfo};
use clipfetch::utils::humanize::{format_bytes, format_duration, format_speed};
use clipfetch::utils::{paths, AppSettings};
use clipfetch::{Clipfetch, DownloadRequest};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "clipfetch", version, about = "Download a video via its metadata API")]
struct Args {
    /// Video page URL
    url: String,

    /// Preferred quality label, e.g. 720p
    #[arg(short, long)]
    quality: Option<String>,

    /// Download audio only
    #[arg(short, long)]
    audio: bool,

    /// Output filename
    #[arg(short, long)]
    output: Option<String>,

    /// Directory to save into
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// auto, direct, proxy or mirror
    #[arg(long)]
    strategy: Option<StrategyPreference>,

    /// Open download links in the browser instead of saving them
    #[arg(long)]
    browser: bool,

    /// Base URL of the metadata API
    #[arg(long, env = "CLIPFETCH_API_URL")]
    api_url: Option<String>,

    /// Settings file (defaults to the platform config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// closest or first
    #[arg(long, value_parser = parse_policy)]
    policy: Option<QualityPolicy>,

    /// Don't show simulated progress for browser hand-offs
    #[arg(long)]
    no_simulate: bool,

    /// Print metadata and the selected format, then exit
    #[arg(long)]
    info: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_policy(raw: &str) -> Result<QualityPolicy, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "closest" => Ok(QualityPolicy::ClosestAtOrBelow),
        "first" => Ok(QualityPolicy::FirstAtOrBelow),
        other => Err(format!("unknown policy '{}' (expected closest or first)", other)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose {
        "clipfetch=debug"
    } else {
        "clipfetch=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone().unwrap_or_else(paths::settings_path);
    let settings = apply_overrides(AppSettings::load(&config_path)?, &args);
    let kind = settings.media_kind;

    let app = Clipfetch::new(settings)?;

    let mut request = DownloadRequest::new(args.url.clone()).kind(kind);
    request.quality = args.quality.clone();
    request.filename = args.output.clone();

    if args.info {
        return print_info(&app, &request).await;
    }

    let (progress_tx, mut progress_rx) = mpsc::channel::<DownloadProgress>(100);

    // Spawn progress reporter
    let reporter = tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            print_progress(&progress);
        }
    });

    let result = app.download(&request, progress_tx).await;
    let _ = reporter.await;

    let report = result?;
    match report.outcome {
        TriggerOutcome::Saved { path, bytes } => {
            println!(
                "Saved \"{}\" ({}) via {} to {}",
                report.title,
                format_bytes(bytes),
                report.strategy,
                path.display()
            );
        }
        TriggerOutcome::HandedOff { url } => {
            println!(
                "Opened {} link for \"{}\" in the browser: {}",
                report.strategy, report.title, url
            );
        }
    }

    Ok(())
}

fn apply_overrides(mut settings: AppSettings, args: &Args) -> AppSettings {
    if let Some(api_url) = &args.api_url {
        settings.api_base_url = Some(api_url.clone());
    }
    if let Some(dir) = &args.dir {
        settings.download_location = dir.clone();
    }
    if let Some(strategy) = args.strategy {
        settings.strategy = strategy;
    }
    if let Some(policy) = args.policy {
        settings.selection.policy = policy;
    }
    if args.audio {
        settings.media_kind = MediaKind::Audio;
    }
    if args.browser {
        settings.use_browser = true;
    }
    if args.no_simulate {
        settings.simulate_progress = false;
    }
    settings.normalized()
}

async fn print_info(app: &Clipfetch, request: &DownloadRequest) -> Result<()> {
    let info = app.fetch_metadata(&request.url).await?;
    print_metadata(&info);

    let quality = request
        .quality
        .as_deref()
        .or(app.settings().quality.as_deref());
    let format = app.choose_format(&info, request.kind, quality)?;
    println!(
        "Selected: {} {} ({}p){}",
        format.quality,
        format.container,
        format.parsed_height(),
        format
            .content_length
            .map(|len| format!(", {}", format_bytes(len)))
            .unwrap_or_default()
    );

    for target in app.plan(request, &info, format)? {
        println!("  {:<7} {}", target.strategy.as_str(), target.url);
    }
    Ok(())
}

fn print_metadata(info: &VideoInfo) {
    println!("Title: {}", info.title);
    if let Some(author) = &info.author {
        println!("Author: {}", author);
    }
    if let Some(duration) = info.duration {
        println!("Duration: {}", format_duration(Duration::from_secs(duration)));
    }
    if let Some(views) = info.view_count {
        println!("Views: {}", views);
    }
    if let Some(date) = info.published_date() {
        println!("Published: {}", date);
    }
    println!("Formats:");
    for format in &info.formats {
        let tracks = match (format.has_video, format.has_audio) {
            (true, true) => "video+audio",
            (true, false) => "video",
            (false, true) => "audio",
            (false, false) => "-",
        };
        println!(
            "  {:<8} {:<5} {:<11} {}",
            format.quality,
            format.container,
            tracks,
            format.height.as_deref().unwrap_or("")
        );
    }
}

fn print_progress(progress: &DownloadProgress) {
    let label = if progress.is_simulated() {
        " (simulated)"
    } else {
        ""
    };

    match &progress.status {
        DownloadStatus::Initializing => {}
        DownloadStatus::Downloading => {
            let size = if progress.total_bytes > 0 {
                format!(
                    "{} / {}",
                    format_bytes(progress.downloaded_bytes),
                    format_bytes(progress.total_bytes)
                )
            } else {
                format_bytes(progress.downloaded_bytes)
            };
            let eta = progress
                .eta
                .map(|eta| format!(", ETA {}", format_duration(eta)))
                .unwrap_or_default();
            println!(
                "Progress{}: {:.1}% ({}) at {}{}",
                label,
                progress.percent,
                size,
                format_speed(progress.speed),
                eta
            );
        }
        DownloadStatus::Completed => println!("Progress{}: 100%", label),
        DownloadStatus::Failed(error) => eprintln!("Attempt failed: {}", error),
        DownloadStatus::Cancelled => println!("Progress{}: cancelled", label),
    }
}

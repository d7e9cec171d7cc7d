//! End-to-end tests against a local fake backend: metadata, selection and saving.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clipfetch::downloader::{DownloadProgress, DownloadStatus, StrategyPreference, TriggerOutcome};
use clipfetch::extractor::{ApiExtractor, MetadataProvider};
use clipfetch::{AppSettings, Clipfetch, ClipfetchError, DownloadRequest, DownloadStrategy, MediaKind};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

const MEDIA_BYTES: &[u8] = b"not really an mp4 but close enough";
const RELAYED_BYTES: &[u8] = b"relayed by the backend";
const SOURCE: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

async fn info(
    State(base): State<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let source = params.get("url").cloned().unwrap_or_default();

    if source.contains("crash") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    if source.contains("private") {
        return Json(json!({ "error": "Video unavailable" })).into_response();
    }
    if source.contains("blank") {
        return Json(json!({})).into_response();
    }

    Json(json!({
        "title": "Sample Clip",
        "duration": "212",
        "author": "Uploader",
        "viewCount": 1234,
        "publishDate": "2009-10-25",
        "formats": [
            {
                "quality": "1080p",
                "container": "mp4",
                "hasVideo": true,
                "hasAudio": true,
                "height": 1080,
                "url": format!("{}/media/missing.mp4", base)
            },
            {
                "quality": "720p",
                "container": "mp4",
                "hasVideo": true,
                "hasAudio": true,
                "height": "720",
                "contentLength": MEDIA_BYTES.len(),
                "url": format!("{}/media/clip.mp4", base)
            },
            {
                "quality": "tiny",
                "container": "webm",
                "hasVideo": false,
                "hasAudio": true,
                "bitrate": 160000,
                "url": format!("{}/media/clip.mp4", base)
            }
        ]
    }))
    .into_response()
}

async fn media(Path(name): Path<String>) -> Response {
    if name == "clip.mp4" {
        ([(header::CONTENT_TYPE, "video/mp4")], MEDIA_BYTES.to_vec()).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn relay(Query(params): Query<HashMap<String, String>>) -> Response {
    match (params.get("url"), params.get("filename")) {
        (Some(url), Some(_)) if url.contains("/media/") => {
            ([(header::CONTENT_TYPE, "application/octet-stream")], RELAYED_BYTES.to_vec())
                .into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

/// Start the fake backend on an ephemeral port and return its base URL
async fn spawn_backend() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let base = format!("http://{}", listener.local_addr().expect("addr"));

    let app = Router::new()
        .route("/api/info", get(info))
        .route("/api/download", get(relay))
        .route("/media/{name}", get(media))
        .with_state(base.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    base
}

fn settings(base: &str, dir: &TempDir) -> AppSettings {
    AppSettings {
        api_base_url: Some(base.to_string()),
        download_location: dir.path().to_path_buf(),
        simulate_progress: false,
        ..Default::default()
    }
    .normalized()
}

async fn drain(mut rx: mpsc::Receiver<DownloadProgress>) -> Vec<DownloadProgress> {
    let mut updates = Vec::new();
    while let Some(progress) = rx.recv().await {
        updates.push(progress);
    }
    updates
}

#[tokio::test]
async fn direct_download_saves_selected_format() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let app = Clipfetch::new(settings(&base, &dir)).expect("session");

    let (tx, rx) = mpsc::channel(64);
    let report = app
        .download(&DownloadRequest::new(SOURCE).quality("720p"), tx)
        .await
        .expect("download");

    assert_eq!(report.title, "Sample Clip");
    assert_eq!(report.strategy, DownloadStrategy::Direct);
    assert_eq!(report.format.quality, "720p");

    let expected_path = dir.path().join("Sample Clip.mp4");
    assert_eq!(
        report.outcome,
        TriggerOutcome::Saved {
            path: expected_path.clone(),
            bytes: MEDIA_BYTES.len() as u64
        }
    );
    assert_eq!(std::fs::read(&expected_path).expect("saved file"), MEDIA_BYTES);
    assert!(!dir.path().join("Sample Clip.mp4.part").exists());

    let updates = drain(rx).await;
    let last = updates.last().expect("progress updates");
    assert_eq!(last.status, DownloadStatus::Completed);
    assert!(updates.iter().all(|p| !p.is_simulated()));
}

#[tokio::test]
async fn broken_direct_link_falls_back_to_proxy() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let app = Clipfetch::new(settings(&base, &dir)).expect("session");

    // 1080p points at a missing file, so the direct attempt gets a 404
    let (tx, rx) = mpsc::channel(64);
    let report = app
        .download(&DownloadRequest::new(SOURCE).filename("rick"), tx)
        .await
        .expect("download");

    assert_eq!(report.format.quality, "1080p");
    assert_eq!(report.strategy, DownloadStrategy::BackendProxy);
    assert_eq!(
        std::fs::read(dir.path().join("rick.mp4")).expect("saved file"),
        RELAYED_BYTES
    );

    let updates = drain(rx).await;
    assert!(updates
        .iter()
        .any(|p| matches!(p.status, DownloadStatus::Failed(_))));
    assert_eq!(updates.last().map(|p| &p.status), Some(&DownloadStatus::Completed));
}

#[tokio::test]
async fn pinned_direct_strategy_does_not_fall_back() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let app = Clipfetch::new(AppSettings {
        strategy: StrategyPreference::Direct,
        ..settings(&base, &dir)
    })
    .expect("session");

    let (tx, _rx) = mpsc::channel(64);
    let err = app
        .download(&DownloadRequest::new(SOURCE).quality("1080p"), tx)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ClipfetchError>(),
        Some(ClipfetchError::DownloadError(_))
    ));
    assert!(!dir.path().join("Sample Clip.mp4").exists());
}

#[tokio::test]
async fn api_error_field_is_metadata_unavailable() {
    let base = spawn_backend().await;
    let api = ApiExtractor::new(&base, Duration::from_secs(5), "clipfetch-test").expect("client");

    let err = api
        .extract_info("https://www.youtube.com/watch?v=private0000")
        .await
        .unwrap_err();
    match err.downcast_ref::<ClipfetchError>() {
        Some(ClipfetchError::MetadataUnavailable(reason)) => {
            assert_eq!(reason, "Video unavailable")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn server_error_is_metadata_unavailable() {
    let base = spawn_backend().await;
    let api = ApiExtractor::new(&base, Duration::from_secs(5), "clipfetch-test").expect("client");

    let err = api
        .extract_info("https://www.youtube.com/watch?v=crash000000")
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ClipfetchError>(),
        Some(ClipfetchError::MetadataUnavailable(_))
    ));
}

#[tokio::test]
async fn empty_payload_is_metadata_unavailable() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let app = Clipfetch::new(settings(&base, &dir)).expect("session");

    let (tx, _rx) = mpsc::channel(64);
    let err = app
        .download(
            &DownloadRequest::new("https://www.youtube.com/watch?v=blank000000"),
            tx,
        )
        .await
        .unwrap_err();
    match err.downcast_ref::<ClipfetchError>() {
        Some(ClipfetchError::MetadataUnavailable(reason)) => {
            assert_eq!(reason, "empty metadata payload")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn metadata_accepts_loose_number_fields() {
    let base = spawn_backend().await;
    let api = ApiExtractor::new(&base, Duration::from_secs(5), "clipfetch-test").expect("client");

    let info = api.extract_info(SOURCE).await.expect("metadata");
    assert_eq!(info.duration, Some(212));
    assert_eq!(info.view_count, Some(1234));
    assert_eq!(info.formats.len(), 3);
    assert_eq!(info.formats[0].parsed_height(), 1080);
    assert_eq!(info.formats[1].content_length, Some(MEDIA_BYTES.len() as u64));
    assert_eq!(info.formats[2].bitrate.as_deref(), Some("160000"));
    assert_eq!(
        info.published_date().map(|d| d.to_string()),
        Some("2009-10-25".to_string())
    );
}

#[tokio::test]
async fn audio_request_without_mp4_audio_has_no_match() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let app = Clipfetch::new(settings(&base, &dir)).expect("session");

    let (tx, _rx) = mpsc::channel(64);
    let err = app
        .download(&DownloadRequest::new(SOURCE).kind(MediaKind::Audio), tx)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ClipfetchError>(),
        Some(ClipfetchError::NoMatchingFormat(MediaKind::Audio))
    ));
}

#[tokio::test]
async fn relaxed_audio_container_accepts_webm() {
    let base = spawn_backend().await;
    let dir = TempDir::new().expect("temp dir");
    let mut settings = settings(&base, &dir);
    settings.selection.strict_audio_container = false;
    let app = Clipfetch::new(settings).expect("session");

    let info = app.fetch_metadata(SOURCE).await.expect("metadata");
    let format = app
        .choose_format(&info, MediaKind::Audio, None)
        .expect("audio format");
    assert_eq!(format.container, "webm");
}

//! HTTP gateway integration tests against an in-process fake conversion service.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use reqwest::Client;
use serde_json::json;
use tempfile::TempDir;

use convertino_core::{
    config::{ImageConfig, ServiceConfig},
    gateway::{DownloadRef, UploadRequest},
    smart_convert_registry,
    testing::fixtures,
    ArtifactBundler, BatchOrchestrator, BatchState, DirectorySink, FileSet, FileSetLimits,
    GatewayError, HttpGateway, ObjectUrlPool, RawFile, RemoteGateway, Warmup, WarmupOutcome,
};

/// Fields of a received multipart upload.
#[derive(Default)]
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
    format: Option<String>,
}

async fn read_upload(mut multipart: Multipart) -> Upload {
    let mut upload = Upload::default();
    while let Some(field) = multipart.next_field().await.unwrap() {
        match field.name().unwrap_or("") {
            "file" => {
                upload.file_name = field.file_name().map(str::to_string);
                upload.content_type = field.content_type().map(str::to_string);
                upload.size = field.bytes().await.unwrap().len();
            }
            "format" => upload.format = Some(field.text().await.unwrap()),
            _ => {}
        }
    }
    upload
}

fn stem(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(stem, _)| stem)
}

async fn pdf_to_word(multipart: Multipart) -> impl IntoResponse {
    let upload = read_upload(multipart).await;
    match upload.file_name {
        Some(name) if upload.size > 0 && upload.content_type.as_deref() == Some("application/pdf") => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Converted",
                "download_url": format!("/api/download/s1/{}.docx", stem(&name)),
            })),
        ),
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "No PDF uploaded" })),
        ),
    }
}

async fn ppt_slides(multipart: Multipart) -> Json<serde_json::Value> {
    let upload = read_upload(multipart).await;
    let format = upload.format.unwrap_or_else(|| "png".to_string());
    Json(json!({
        "success": true,
        "download_urls": (1..=3)
            .map(|i| format!("/api/download/s2/slide_{}.{}", i, format))
            .collect::<Vec<_>>(),
    }))
}

async fn crashing_transcoder() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "ffmpeg crashed" })),
    )
}

async fn bad_gateway() -> impl IntoResponse {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

async fn html_page() -> impl IntoResponse {
    (StatusCode::OK, "<html>maintenance</html>")
}

async fn rejecting() -> Json<serde_json::Value> {
    Json(json!({ "success": false, "error": "bad format" }))
}

/// Healthy only for clients identifying as convertino.
async fn agent_health(headers: HeaderMap) -> StatusCode {
    let agent = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if agent.starts_with("convertino-test/") {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn download(Path((session, file)): Path<(String, String)>) -> String {
    format!("{}:{}", session, file)
}

async fn spawn_fake_service() -> String {
    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/agent-health", get(agent_health))
        .route("/api/convert/pdf-to-word", post(pdf_to_word))
        .route("/api/export/ppt-slides", post(ppt_slides))
        .route("/api/convert/video", post(crashing_transcoder))
        .route("/api/convert/audio", post(bad_gateway))
        .route("/api/convert/word-to-txt", post(html_page))
        .route("/api/convert/excel-to-pdf", post(rejecting))
        .route("/api/download/{session}/{file}", get(download));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn gateway(base_url: &str) -> HttpGateway {
    HttpGateway::with_client(Client::new(), base_url)
}

fn any_file(name: &str) -> RawFile {
    RawFile::new(name, "application/octet-stream", vec![1, 2, 3])
}

#[tokio::test]
async fn test_single_download_and_fetch() {
    let base = spawn_fake_service().await;
    let gateway = gateway(&base);

    let download = gateway
        .upload(UploadRequest::new(
            "/api/convert/pdf-to-word",
            fixtures::pdf_file("report.pdf", 2),
        ))
        .await
        .unwrap();
    assert_eq!(
        download,
        DownloadRef::Single("/api/download/s1/report.docx".to_string())
    );

    let bytes = gateway.fetch("/api/download/s1/report.docx").await.unwrap();
    assert_eq!(&bytes[..], b"s1:report.docx");
}

#[tokio::test]
async fn test_format_field_and_fan_out() {
    let base = spawn_fake_service().await;
    let download = gateway(&base)
        .upload(
            UploadRequest::new("/api/export/ppt-slides", any_file("deck.pptx"))
                .with_field("format", "jpg"),
        )
        .await
        .unwrap();

    assert_eq!(
        download.into_urls(),
        vec![
            "/api/download/s2/slide_1.jpg",
            "/api/download/s2/slide_2.jpg",
            "/api/download/s2/slide_3.jpg",
        ]
    );
}

#[tokio::test]
async fn test_error_status_uses_json_error() {
    let base = spawn_fake_service().await;
    let err = gateway(&base)
        .upload(UploadRequest::new("/api/convert/video", any_file("clip.mov")))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Status { status: 500, .. }));
    assert_eq!(err.to_string(), "ffmpeg crashed");
}

#[tokio::test]
async fn test_error_status_without_json() {
    let base = spawn_fake_service().await;
    let err = gateway(&base)
        .upload(UploadRequest::new("/api/convert/audio", any_file("song.wav")))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Server error: 502");
}

#[tokio::test]
async fn test_non_json_success_is_invalid_response() {
    let base = spawn_fake_service().await;
    let err = gateway(&base)
        .upload(UploadRequest::new("/api/convert/word-to-txt", any_file("a.docx")))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_success_false_is_rejected() {
    let base = spawn_fake_service().await;
    let err = gateway(&base)
        .upload(UploadRequest::new("/api/convert/excel-to-pdf", any_file("a.xlsx")))
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Rejected(ref m) if m == "bad format"));
}

#[tokio::test]
async fn test_missing_download_is_status_error() {
    let base = spawn_fake_service().await;
    let err = gateway(&base).fetch("/nowhere/file.pdf").await.unwrap_err();

    assert!(matches!(err, GatewayError::Status { status: 404, .. }));
    assert_eq!(err.to_string(), "Download failed: 404");
}

#[tokio::test]
async fn test_warmup_finds_health_endpoint() {
    let base = spawn_fake_service().await;
    let config = ServiceConfig {
        base_url: base.clone(),
        ping_paths: vec!["/health".to_string()],
        warmup_timeout_secs: 2,
        ..Default::default()
    };

    let warmup = Warmup::new(&config);
    assert_eq!(
        warmup.ping_once().await,
        WarmupOutcome::Awake {
            endpoint: format!("{}/health", base)
        }
    );
}

#[tokio::test]
async fn test_warmup_sends_configured_user_agent() {
    let base = spawn_fake_service().await;
    let config = ServiceConfig {
        base_url: base.clone(),
        ping_paths: vec!["/agent-health".to_string()],
        warmup_timeout_secs: 2,
        user_agent: "convertino-test/1.0".to_string(),
        ..Default::default()
    };

    assert_eq!(
        Warmup::new(&config).ping_once().await,
        WarmupOutcome::Awake {
            endpoint: format!("{}/agent-health", base)
        }
    );

    let default_agent = ServiceConfig {
        user_agent: ServiceConfig::default().user_agent,
        ..config
    };
    assert_eq!(
        Warmup::new(&default_agent).ping_once().await,
        WarmupOutcome::Unconfirmed
    );
}

#[tokio::test]
async fn test_smart_convert_batch_to_archive() {
    let base = spawn_fake_service().await;
    let gateway: Arc<dyn RemoteGateway> = Arc::new(gateway(&base));
    let registry = smart_convert_registry(gateway.clone(), &ImageConfig::default()).unwrap();
    let route = registry.lookup("pdf").unwrap();

    let urls = ObjectUrlPool::new();
    let mut files =
        FileSet::new(FileSetLimits::default(), urls.clone()).with_accept(route.accept.clone());
    files.add(vec![
        fixtures::pdf_file("one.pdf", 1),
        fixtures::pdf_file("two.pdf", 3),
    ]);

    let job = BatchOrchestrator::new(urls.clone())
        .run(files.items(), route, "docx")
        .await
        .unwrap();
    assert_eq!(job.state, BatchState::Done);

    let temp = TempDir::new().unwrap();
    let bundler = ArtifactBundler::new(
        gateway,
        Arc::new(DirectorySink::new(temp.path())),
        urls,
    );
    let mut artifacts = job.into_artifacts();
    let saved = bundler
        .download_all_as_archive(&mut artifacts)
        .await
        .unwrap()
        .unwrap();

    let archive = std::fs::File::open(&saved.location).unwrap();
    let mut archive = zip::ZipArchive::new(archive).unwrap();
    let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["one.docx", "two.docx"]);

    let mut content = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("one.docx").unwrap(), &mut content)
        .unwrap();
    assert_eq!(content, "s1:one.docx");
}

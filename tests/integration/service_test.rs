// Service integration tests: upload, render and download through the facade

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine as _;
use bytes::Bytes;
use image::{ImageFormat, Rgb, RgbImage};
use tilemark::config::Config;
use tilemark::constants::DEFAULT_FONT_CANDIDATES;
use tilemark::service::WatermarkService;
use tilemark::session::SessionId;
use tilemark::watermark::{FileFontProvider, RawStyleParams, WatermarkError};

fn service(dir: &std::path::Path) -> Option<WatermarkService> {
    let font = FileFontProvider::discover(DEFAULT_FONT_CANDIDATES).ok()?;
    let mut config = Config::default();
    config.storage.base_dir = dir.to_path_buf();
    config.render.max_concurrent_renders = 2;
    Some(WatermarkService::new(&config, Arc::new(font)).unwrap())
}

fn jpeg_bytes(width: u32, height: u32) -> Bytes {
    let image = RgbImage::from_pixel(width, height, Rgb([120, 140, 160]));
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, ImageFormat::Jpeg).unwrap();
    Bytes::from(buffer.into_inner())
}

fn style() -> RawStyleParams {
    RawStyleParams::new()
        .with("text", "Confidential")
        .with("font.size", "2px")
        .with("color", "#000000")
        .with("stroke", "#FFFFFF")
        .with("rotation", "45")
}

#[tokio::test]
async fn test_upload_render_download_round() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };
    let session = SessionId::generate();

    service.ensure_ready().await.unwrap();
    service
        .upload(&session, "image/jpeg", jpeg_bytes(400, 300))
        .await
        .unwrap();

    let output = service.render(&session, &style()).await.unwrap();
    assert_eq!(output.path, service.store().output_path(&session));

    let bytes = service.download(&session, &output.filename).await.unwrap();
    let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (400, 300));
}

#[tokio::test]
async fn test_download_of_other_session_is_forbidden() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };
    let owner = SessionId::generate();
    let intruder = SessionId::generate();

    service
        .upload(&owner, "image/jpeg", jpeg_bytes(120, 90))
        .await
        .unwrap();
    let output = service.render(&owner, &style()).await.unwrap();

    let err = service
        .download(&intruder, &output.filename)
        .await
        .unwrap_err();
    assert!(matches!(err, WatermarkError::Forbidden(_)));

    let missing = format!("watermarked_{}_nope.png", owner);
    let err = service.download(&intruder, &missing).await.unwrap_err();
    assert!(matches!(err, WatermarkError::Forbidden(_)));
}

#[tokio::test]
async fn test_rerender_replaces_output() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };
    let session = SessionId::generate();
    service
        .upload(&session, "image/jpeg", jpeg_bytes(200, 150))
        .await
        .unwrap();

    let first = service.render(&session, &style()).await.unwrap();
    let first_bytes = service.download(&session, &first.filename).await.unwrap();

    let second = service
        .render(&session, &style().with("text", "Draft").with("rotation", "-10"))
        .await
        .unwrap();
    let second_bytes = service.download(&session, &second.filename).await.unwrap();

    assert_eq!(first.filename, second.filename);
    assert_ne!(first_bytes, second_bytes);
    // Source plus one output, no temp files
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn test_concurrent_renders_share_permits() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };

    let mut sessions = Vec::new();
    for _ in 0..4 {
        let session = SessionId::generate();
        service
            .upload(&session, "image/jpeg", jpeg_bytes(240, 180))
            .await
            .unwrap();
        sessions.push(session);
    }

    let mut handles = Vec::new();
    for session in sessions.clone() {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service.render(&session, &style()).await
        }));
    }

    for handle in handles {
        let output = handle.await.unwrap().unwrap();
        assert_eq!((output.width, output.height), (240, 180));
    }
    assert_eq!(service.available_permits(), 2);

    for session in &sessions {
        assert!(service.store().output_path(session).exists());
    }
}

#[tokio::test]
async fn test_errors_map_to_status_messages() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };
    let session = SessionId::generate();
    service
        .upload(&session, "image/jpeg", jpeg_bytes(50, 50))
        .await
        .unwrap();

    let err = service
        .render(&session, &style().with("font.size", "9px"))
        .await
        .unwrap_err();
    let message = WatermarkService::status_message(&err);
    assert!(message.contains("font.size"));
    assert!(!err.is_fatal());

    let err = service
        .upload(&session, "image/gif", Bytes::from_static(b"GIF89a"))
        .await
        .unwrap_err();
    assert_eq!(err.to_http_status(), 415);
    assert!(!WatermarkService::status_message(&err).contains("gif"));
}

#[tokio::test]
async fn test_signal_object_uploads_then_renders() {
    let dir = tempfile::tempdir().unwrap();
    let Some(service) = service(dir.path()) else { return };
    let session = SessionId::generate();

    let encoded = base64::engine::general_purpose::STANDARD.encode(jpeg_bytes(160, 100));
    let signals = serde_json::json!({
        "photoNames": ["holiday.jpg"],
        "photo": [encoded],
        "text": "Mine",
        "font": { "size": "1px" },
        "color": "#000000",
        "stroke": "#FFFFFF",
        "rotation": 30
    });

    assert!(service.upload_signals(&session, &signals).await.unwrap());
    let output = service.render_signals(&session, &signals).await.unwrap();
    assert_eq!((output.width, output.height), (160, 100));

    // A later signal object without a photo keeps the stored one
    let restyle = serde_json::json!({ "photoNames": [], "photo": [] });
    assert!(!service.upload_signals(&session, &restyle).await.unwrap());
    assert!(service.store().has_source(&session).await);
}

// Session store unit tests

use bytes::Bytes;
use tilemark::session::SessionId;
use tilemark::storage::{SessionStore, UploadLimits};
use tilemark::watermark::WatermarkError;

fn session(id: &str) -> SessionId {
    SessionId::parse(id).unwrap()
}

#[tokio::test]
async fn test_ensure_ready_creates_base_dir() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("nested").join("photos");
    let store = SessionStore::new(&base, UploadLimits::default());

    store.ensure_ready().await.unwrap();
    assert!(base.is_dir());
}

#[tokio::test]
async fn test_upload_lands_at_session_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path(), UploadLimits::default());
    let id = session("3f2a9c");

    let path = store
        .store_upload(&id, "image/jpg", Bytes::from_static(b"\xFF\xD8\xFF"))
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("3f2a9c"));
    assert_eq!(std::fs::read(path).unwrap(), b"\xFF\xD8\xFF");
}

#[tokio::test]
async fn test_upload_respects_configured_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path(), UploadLimits { max_bytes: 8 });
    let id = session("small");

    let err = store
        .store_upload(&id, "image/png", Bytes::from(vec![0u8; 9]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        WatermarkError::UploadTooLarge {
            size: 9,
            max_size: 8
        }
    ));
    assert_eq!(err.to_http_status(), 413);
    assert!(!store.has_source(&id).await);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_media_type() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path(), UploadLimits::default());

    let err = store
        .store_upload(&session("s"), "image/webp", Bytes::from_static(b"RIFF"))
        .await
        .unwrap_err();
    assert_eq!(err.to_http_status(), 415);
}

#[tokio::test]
async fn test_forbidden_regardless_of_existence() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path(), UploadLimits::default());
    std::fs::write(dir.path().join("watermarked_victim.png"), b"x").unwrap();

    let caller = session("attacker");
    for name in ["watermarked_victim.png", "watermarked_ghost.png"] {
        let err = store.open_download(&caller, name).await.unwrap_err();
        assert!(matches!(err, WatermarkError::Forbidden(_)), "{}", name);
        assert_eq!(err.to_http_status(), 403);
    }
}

#[tokio::test]
async fn test_download_of_own_source_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path(), UploadLimits::default());
    let id = session("owner");

    store
        .store_upload(&id, "image/png", Bytes::from_static(b"\x89PNG"))
        .await
        .unwrap();

    let data = store.open_download(&id, "owner").await.unwrap();
    assert_eq!(&data[..], b"\x89PNG");
}

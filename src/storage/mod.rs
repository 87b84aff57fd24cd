//! Per-session file storage.
//!
//! All files live in one flat directory:
//!
//! - `<base>/<session-id>` holds the uploaded photo (PNG or JPEG bytes)
//! - `<base>/watermarked_<session-id>.png` holds the last render
//!
//! There is no index; a file exists or it does not. Both names are derived
//! from the session id alone. Concurrent writes for one session follow
//! last-write-wins.

use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::constants::{ACCEPTED_UPLOAD_TYPES, DEFAULT_MAX_UPLOAD_BYTES};
use crate::session::SessionId;
use crate::watermark::{output_filename, WatermarkError};

/// Limits applied to uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_bytes: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Check an upload's declared MIME type and size.
pub fn validate_upload(mime: &str, size: usize, limits: &UploadLimits) -> Result<(), WatermarkError> {
    let mime_lower = mime.trim().to_ascii_lowercase();
    let essence = mime_lower.split(';').next().unwrap_or_default().trim();

    if !ACCEPTED_UPLOAD_TYPES.contains(&essence) {
        return Err(WatermarkError::UnsupportedMediaType {
            mime: mime.to_string(),
        });
    }

    if size == 0 {
        return Err(WatermarkError::EmptyUpload);
    }

    if size > limits.max_bytes {
        return Err(WatermarkError::UploadTooLarge {
            size,
            max_size: limits.max_bytes,
        });
    }

    Ok(())
}

/// Flat directory of per-session uploads and renders.
#[derive(Debug, Clone)]
pub struct SessionStore {
    base_dir: PathBuf,
    limits: UploadLimits,
}

impl SessionStore {
    pub fn new(base_dir: impl Into<PathBuf>, limits: UploadLimits) -> Self {
        Self {
            base_dir: base_dir.into(),
            limits,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Create the storage directory if needed.
    pub async fn ensure_ready(&self) -> Result<(), WatermarkError> {
        tokio::fs::create_dir_all(&self.base_dir).await?;
        Ok(())
    }

    /// Where the session's uploaded photo lives.
    pub fn source_path(&self, session: &SessionId) -> PathBuf {
        self.base_dir.join(session.as_str())
    }

    /// File name of the session's rendered output.
    pub fn output_filename(&self, session: &SessionId) -> String {
        output_filename(session.as_str())
    }

    pub fn output_path(&self, session: &SessionId) -> PathBuf {
        self.base_dir.join(self.output_filename(session))
    }

    pub async fn has_source(&self, session: &SessionId) -> bool {
        tokio::fs::metadata(self.source_path(session))
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Validate and store an uploaded photo, replacing any previous one.
    pub async fn store_upload(
        &self,
        session: &SessionId,
        mime: &str,
        data: Bytes,
    ) -> Result<PathBuf, WatermarkError> {
        validate_upload(mime, data.len(), &self.limits)?;

        let path = self.source_path(session);
        write_file_atomic(&path, &data).await?;

        tracing::info!(
            session = %session,
            mime = %mime,
            size = data.len(),
            "Photo uploaded"
        );
        Ok(path)
    }

    /// Read a file for download.
    ///
    /// The requested name must contain the caller's session id. That check
    /// happens before the filesystem is touched, so a forbidden request
    /// learns nothing about which files exist.
    pub async fn open_download(
        &self,
        session: &SessionId,
        filename: &str,
    ) -> Result<Bytes, WatermarkError> {
        if !filename.contains(session.as_str()) {
            tracing::warn!(session = %session, filename = %filename, "Download forbidden");
            return Err(WatermarkError::Forbidden(filename.to_string()));
        }

        if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
            tracing::warn!(session = %session, filename = %filename, "Download path rejected");
            return Err(WatermarkError::Forbidden(filename.to_string()));
        }

        match tokio::fs::read(self.base_dir.join(filename)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(WatermarkError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Write via a uniquely named temp file and rename into place.
async fn write_file_atomic(path: &Path, data: &[u8]) -> Result<(), WatermarkError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        file_name,
        uuid::Uuid::new_v4().simple()
    ));

    tokio::fs::write(&temp_path, data).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

//! Watermark error types.
//!
//! Every failure in the upload, render and download paths is a
//! `WatermarkError`. Most variants are per-request and recoverable; the
//! service turns them into a status message. `FontUnavailable` and `Config`
//! are startup-class errors and should stop the process before it serves.

use thiserror::Error;

/// Errors that can occur while uploading, rendering or downloading.
#[derive(Error, Debug)]
pub enum WatermarkError {
    // === Style errors ===
    /// A raw style signal could not be turned into a typed parameter
    #[error("Invalid style parameter '{param}': {message}")]
    InvalidStyleParameter { param: String, message: String },

    // === Render errors ===
    /// Decoding, drawing or encoding failed
    #[error("Failed to render watermark: {0}")]
    Render(String),

    /// Source image exceeds the configured size bound
    #[error("Image dimensions {width}x{height} exceed limit of {max_pixels} pixels")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// Render did not finish before its deadline
    #[error("Render timed out after {timeout_ms}ms")]
    RenderTimeout { timeout_ms: u64 },

    // === Storage errors ===
    /// Reading or writing a session file failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Upload is not one of the accepted image types
    #[error("Unsupported media type: {mime}")]
    UnsupportedMediaType { mime: String },

    /// Upload exceeds the configured size ceiling
    #[error("Upload size {size} bytes exceeds maximum {max_size} bytes")]
    UploadTooLarge { size: usize, max_size: usize },

    /// Upload carried no data
    #[error("Upload is empty")]
    EmptyUpload,

    /// Upload payload could not be decoded
    #[error("Invalid upload payload: {0}")]
    InvalidUpload(String),

    /// Session identifier is missing or unsafe
    #[error("Invalid session identifier: {0}")]
    InvalidSession(String),

    /// No uploaded photo exists for the session
    #[error("No source image for session {0}")]
    MissingSource(String),

    /// Requested file does not exist
    #[error("File not found: {0}")]
    NotFound(String),

    /// Requested file does not belong to the caller's session
    #[error("Access to '{0}' is forbidden")]
    Forbidden(String),

    // === Startup errors ===
    /// The watermark font could not be loaded
    #[error("Font unavailable at {path}: {reason}")]
    FontUnavailable { path: String, reason: String },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WatermarkError {
    pub fn invalid_param(param: impl Into<String>, message: impl Into<String>) -> Self {
        WatermarkError::InvalidStyleParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    pub fn render(message: impl Into<String>) -> Self {
        WatermarkError::Render(message.into())
    }

    pub fn font_unavailable(path: impl Into<String>, reason: impl Into<String>) -> Self {
        WatermarkError::FontUnavailable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors that must fail the service at startup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WatermarkError::FontUnavailable { .. } | WatermarkError::Config(_)
        )
    }

    /// Maps errors to HTTP status codes for the request layer.
    ///
    /// - InvalidStyleParameter, EmptyUpload, InvalidUpload, InvalidSession → 400
    /// - Forbidden → 403
    /// - MissingSource, NotFound → 404
    /// - ImageTooLarge, UploadTooLarge → 413
    /// - UnsupportedMediaType → 415
    /// - RenderTimeout → 504
    /// - everything else → 500
    pub fn to_http_status(&self) -> u16 {
        match self {
            WatermarkError::InvalidStyleParameter { .. }
            | WatermarkError::EmptyUpload
            | WatermarkError::InvalidUpload(_)
            | WatermarkError::InvalidSession(_) => 400,

            WatermarkError::Forbidden(_) => 403,

            WatermarkError::MissingSource(_) | WatermarkError::NotFound(_) => 404,

            WatermarkError::ImageTooLarge { .. } | WatermarkError::UploadTooLarge { .. } => 413,

            WatermarkError::UnsupportedMediaType { .. } => 415,

            WatermarkError::RenderTimeout { .. } => 504,

            WatermarkError::Render(_)
            | WatermarkError::Storage(_)
            | WatermarkError::FontUnavailable { .. }
            | WatermarkError::Config(_) => 500,
        }
    }
}

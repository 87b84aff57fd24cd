// Watermark service: the async facade a request layer calls.
//
// Uploads and downloads go straight to the session store. Renders are
// CPU-bound, so they run on the blocking pool behind a semaphore and a
// deadline. Per-request errors are returned as `WatermarkError` and turned
// into user-facing text by `status_message`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::Engine as _;
use bytes::Bytes;
use tokio::sync::Semaphore;
use tracing::Instrument;

use crate::config::Config;
use crate::logging::{render_span, upload_span};
use crate::session::SessionId;
use crate::storage::SessionStore;
use crate::watermark::{
    parse_style, FontProvider, RawStyleParams, RenderedOutput, WatermarkError, WatermarkRenderer,
};

/// Async entry point for upload, render and download.
#[derive(Debug, Clone)]
pub struct WatermarkService {
    store: SessionStore,
    renderer: Arc<WatermarkRenderer>,
    render_timeout: Duration,
    permits: Arc<Semaphore>,
}

impl WatermarkService {
    /// Build a service from validated configuration and a loaded font.
    pub fn new(config: &Config, font: Arc<dyn FontProvider>) -> Result<Self, WatermarkError> {
        config.validate().map_err(WatermarkError::Config)?;
        let background = config
            .render
            .background_color()
            .map_err(WatermarkError::Config)?;

        let renderer = WatermarkRenderer::new(font, config.render.limits()).with_background(background);

        Ok(Self {
            store: SessionStore::new(config.storage.base_dir.clone(), config.upload.limits()),
            renderer: Arc::new(renderer),
            render_timeout: config.render.timeout(),
            permits: Arc::new(Semaphore::new(config.render.max_concurrent_renders)),
        })
    }

    /// Override the render deadline.
    pub fn with_render_timeout(mut self, timeout: Duration) -> Self {
        self.render_timeout = timeout;
        self
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Render permits not currently held.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Create the storage directory.
    pub async fn ensure_ready(&self) -> Result<(), WatermarkError> {
        self.store.ensure_ready().await
    }

    /// Store a raw photo upload for the session.
    pub async fn upload(
        &self,
        session: &SessionId,
        mime: &str,
        data: Bytes,
    ) -> Result<(), WatermarkError> {
        self.store
            .store_upload(session, mime, data)
            .instrument(upload_span(session.as_str(), mime))
            .await
            .map(|_| ())
    }

    /// Store a base64 photo upload as sent in browser signals.
    ///
    /// A `data:<mime>;base64,` prefix is accepted and stripped.
    pub async fn upload_base64(
        &self,
        session: &SessionId,
        mime: &str,
        encoded: &str,
    ) -> Result<(), WatermarkError> {
        let (_, data) = decode_base64_photo(encoded)?;
        self.upload(session, mime, Bytes::from(data)).await
    }

    /// Store the photo carried by a browser signal object, if any.
    ///
    /// Reads the first entry of the `photo` array. Its type comes from
    /// `photoMimes[0]`, then from a data URL prefix, then from the decoded
    /// bytes. A missing or empty `photo` array stores nothing and returns
    /// `false`.
    pub async fn upload_signals(
        &self,
        session: &SessionId,
        signals: &serde_json::Value,
    ) -> Result<bool, WatermarkError> {
        let Some(encoded) = first_string(signals, SIGNAL_PHOTO) else {
            return Ok(false);
        };

        let (data_url_mime, data) = decode_base64_photo(encoded)?;
        let mime = first_string(signals, SIGNAL_PHOTO_MIMES)
            .or(data_url_mime)
            .unwrap_or_else(|| sniff_mime(&data));

        self.upload(session, mime, Bytes::from(data)).await?;
        Ok(true)
    }

    /// Render the session's photo with the given style signals.
    ///
    /// Style errors are reported before any file is touched. On timeout the
    /// blocking render keeps its permit until it notices it was abandoned,
    /// and it does not write its output.
    pub async fn render(
        &self,
        session: &SessionId,
        raw: &RawStyleParams,
    ) -> Result<RenderedOutput, WatermarkError> {
        async move {
            let style = parse_style(raw)?;

            if !self.store.has_source(session).await {
                return Err(WatermarkError::MissingSource(session.to_string()));
            }

            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| WatermarkError::render("render pool is closed"))?;

            let renderer = Arc::clone(&self.renderer);
            let source = self.store.source_path(session);
            let output_dir = self.store.base_dir().to_path_buf();
            let name = session.as_str().to_string();
            let span = tracing::Span::current();
            let started = Instant::now();
            let cancelled = Arc::new(AtomicBool::new(false));
            let worker_cancelled = Arc::clone(&cancelled);

            let task = tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let _entered = span.enter();
                renderer.render_file_unless(
                    &source,
                    &style,
                    &output_dir,
                    &name,
                    &worker_cancelled,
                )
            });

            match tokio::time::timeout(self.render_timeout, task).await {
                Ok(Ok(result)) => result,
                Ok(Err(join_error)) => Err(WatermarkError::render(format!(
                    "render task failed: {}",
                    join_error
                ))),
                Err(_) => {
                    cancelled.store(true, Ordering::Release);
                    tracing::warn!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        timeout_ms = self.render_timeout.as_millis() as u64,
                        "Render timed out"
                    );
                    Err(WatermarkError::RenderTimeout {
                        timeout_ms: self.render_timeout.as_millis() as u64,
                    })
                }
            }
        }
        .instrument(render_span(session.as_str()))
        .await
    }

    /// Render from a JSON signal object such as `{"text": "x", "font": {"size": "2px"}}`.
    pub async fn render_signals(
        &self,
        session: &SessionId,
        signals: &serde_json::Value,
    ) -> Result<RenderedOutput, WatermarkError> {
        let raw = RawStyleParams::from_signals(signals);
        self.render(session, &raw).await
    }

    /// Fetch a file belonging to the session.
    pub async fn download(
        &self,
        session: &SessionId,
        filename: &str,
    ) -> Result<Bytes, WatermarkError> {
        self.store.open_download(session, filename).await
    }

    /// User-facing status text for a failed request.
    pub fn status_message(err: &WatermarkError) -> String {
        match err {
            WatermarkError::InvalidStyleParameter { param, message } => format!(
                "Please correct the '{}' setting and try again: {}",
                param, message
            ),
            _ => "Something went wrong while creating your watermark. Please try again."
                .to_string(),
        }
    }
}

const SIGNAL_PHOTO: &str = "photo";
const SIGNAL_PHOTO_MIMES: &str = "photoMimes";

fn first_string<'a>(signals: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    signals
        .get(key)?
        .as_array()?
        .first()?
        .as_str()
        .filter(|s| !s.trim().is_empty())
}

/// Decode a base64 payload, returning the data URL media type if present.
fn decode_base64_photo(encoded: &str) -> Result<(Option<&str>, Vec<u8>), WatermarkError> {
    let (mime, payload) = match encoded.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => {
            (Some(&prefix["data:".len()..]).filter(|m| !m.is_empty()), rest)
        }
        _ => (None, encoded),
    };
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| WatermarkError::InvalidUpload(format!("bad base64: {}", e)))?;
    Ok((mime, data))
}

/// Media type from magic bytes. Unknown content is left for upload
/// validation to reject.
fn sniff_mime(data: &[u8]) -> &'static str {
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        "image/png"
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else {
        "application/octet-stream"
    }
}

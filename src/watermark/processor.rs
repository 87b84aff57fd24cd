//! Watermark processor: the full render pipeline.
//!
//! Takes a source photo and a parsed [`WatermarkStyle`] and produces the
//! flattened, tiled output:
//!
//! normalize to RGBA → render text tile → rotate → tile over a transparent
//! overlay → composite → flatten → encode PNG → persist.
//!
//! Everything here is synchronous and CPU-bound. Callers on an async
//! runtime should run it on the blocking pool (see `crate::service`).
//!
//! # Example
//!
//! ```ignore
//! use tilemark::watermark::processor::{RenderLimits, WatermarkRenderer};
//!
//! let renderer = WatermarkRenderer::new(font_provider, RenderLimits::default());
//! let output = renderer.render_file(&source, &style, &out_dir, session.as_str())?;
//! println!("{}", output.path.display());
//! ```

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, RgbaImage};

use super::color::parse_color;
use super::compositor::{composite_over, flatten, TiledOverlay};
use super::font::FontProvider;
use super::rotate::rotate_expand;
use super::style::WatermarkStyle;
use super::text_renderer::{render_text, TextRenderOptions};
use super::WatermarkError;
use crate::constants::{
    DEFAULT_MAX_SOURCE_HEIGHT, DEFAULT_MAX_SOURCE_PIXELS, DEFAULT_MAX_SOURCE_WIDTH,
    OUTPUT_EXTENSION, OUTPUT_PREFIX, STROKE_WIDTH, TILE_GUTTER,
};

/// Size bounds applied to decoded source images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderLimits {
    pub max_source_width: u32,
    pub max_source_height: u32,
    pub max_source_pixels: u64,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            max_source_width: DEFAULT_MAX_SOURCE_WIDTH,
            max_source_height: DEFAULT_MAX_SOURCE_HEIGHT,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
        }
    }
}

/// Reject sources whose dimensions exceed `limits`.
pub fn validate_dimensions(
    width: u32,
    height: u32,
    limits: &RenderLimits,
) -> Result<(), WatermarkError> {
    let pixels = width as u64 * height as u64;

    if width > limits.max_source_width
        || height > limits.max_source_height
        || pixels > limits.max_source_pixels
    {
        return Err(WatermarkError::ImageTooLarge {
            width,
            height,
            max_pixels: limits.max_source_pixels,
        });
    }

    Ok(())
}

/// Output file name for a given per-session name.
pub fn output_filename(name_hint: &str) -> String {
    format!("{}{}.{}", OUTPUT_PREFIX, name_hint, OUTPUT_EXTENSION)
}

/// A rendered, flattened image still in memory.
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub image: RgbImage,
    /// Size of the rotated tile that was repeated.
    pub tile_size: (u32, u32),
    pub tile_count: usize,
}

/// A rendered image persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedOutput {
    pub path: PathBuf,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub tile_count: usize,
}

/// Renders tiled text watermarks.
#[derive(Clone)]
pub struct WatermarkRenderer {
    font: Arc<dyn FontProvider>,
    limits: RenderLimits,
    background: Rgb<u8>,
}

impl std::fmt::Debug for WatermarkRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkRenderer")
            .field("font", &self.font.name())
            .field("limits", &self.limits)
            .field("background", &self.background)
            .finish()
    }
}

impl WatermarkRenderer {
    /// Create a renderer that flattens onto white.
    pub fn new(font: Arc<dyn FontProvider>, limits: RenderLimits) -> Self {
        Self {
            font,
            limits,
            background: Rgb([255, 255, 255]),
        }
    }

    /// Set the background used when flattening transparent sources.
    pub fn with_background(mut self, background: Rgb<u8>) -> Self {
        self.background = background;
        self
    }

    pub fn limits(&self) -> &RenderLimits {
        &self.limits
    }

    /// Render one rotated watermark tile.
    pub fn render_tile(&self, style: &WatermarkStyle) -> Result<RgbaImage, WatermarkError> {
        let fill = parse_color(&style.fill_color)?;
        let stroke = parse_color(&style.stroke_color)?;

        let options = TextRenderOptions {
            text: style.text.clone(),
            point_size: style.point_size(),
            fill,
            stroke,
            stroke_width: STROKE_WIDTH,
        };

        let tile = render_text(self.font.font(), &options)?;
        rotate_expand(&tile, style.internal_rotation())
    }

    /// Watermark a decoded image.
    pub fn render_image(
        &self,
        source: &DynamicImage,
        style: &WatermarkStyle,
    ) -> Result<RenderedImage, WatermarkError> {
        validate_dimensions(source.width(), source.height(), &self.limits)?;

        let mut canvas = source.to_rgba8();
        let tile = self.render_tile(style)?;

        let overlay = TiledOverlay::build(&tile, canvas.width(), canvas.height(), TILE_GUTTER);
        composite_over(&mut canvas, overlay.image());

        Ok(RenderedImage {
            image: flatten(&canvas, self.background),
            tile_size: tile.dimensions(),
            tile_count: overlay.tile_count(),
        })
    }

    /// Watermark encoded image bytes (PNG or JPEG) and return PNG bytes.
    pub fn render_bytes(
        &self,
        source: &[u8],
        style: &WatermarkStyle,
    ) -> Result<(Vec<u8>, RenderedImage), WatermarkError> {
        let decoded = decode_source(source, &self.limits)?;
        let rendered = self.render_image(&decoded, style)?;
        let encoded = encode_png(&rendered.image)?;
        Ok((encoded, rendered))
    }

    /// Watermark the image at `source_path` and write the result into
    /// `output_dir` as `watermarked_<name_hint>.png`.
    ///
    /// The output is written to a unique temporary file and renamed into
    /// place, so a concurrent render for the same name never leaves a torn
    /// file; the last rename wins.
    pub fn render_file(
        &self,
        source_path: &Path,
        style: &WatermarkStyle,
        output_dir: &Path,
        name_hint: &str,
    ) -> Result<RenderedOutput, WatermarkError> {
        let never = AtomicBool::new(false);
        self.render_file_unless(source_path, style, output_dir, name_hint, &never)
    }

    /// Same as [`render_file`](Self::render_file), but gives up once
    /// `cancelled` is set. The flag is checked before decoding and again
    /// before the output is written, so an abandoned render leaves no file
    /// unless its write had already started.
    pub fn render_file_unless(
        &self,
        source_path: &Path,
        style: &WatermarkStyle,
        output_dir: &Path,
        name_hint: &str,
        cancelled: &AtomicBool,
    ) -> Result<RenderedOutput, WatermarkError> {
        let started = Instant::now();
        let check = || {
            if cancelled.load(Ordering::Acquire) {
                Err(WatermarkError::render("render abandoned"))
            } else {
                Ok(())
            }
        };

        check()?;
        let bytes = fs::read(source_path)?;
        let (encoded, rendered) = self.render_bytes(&bytes, style)?;

        let filename = output_filename(name_hint);
        let path = output_dir.join(&filename);
        check()?;
        write_atomic(&path, &encoded)?;

        tracing::info!(
            output = %filename,
            width = rendered.image.width(),
            height = rendered.image.height(),
            tile_width = rendered.tile_size.0,
            tile_height = rendered.tile_size.1,
            tiles = rendered.tile_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Watermark rendered"
        );

        Ok(RenderedOutput {
            path,
            filename,
            width: rendered.image.width(),
            height: rendered.image.height(),
            tile_count: rendered.tile_count,
        })
    }
}

/// Decode image bytes, checking dimensions before the pixel data is
/// allocated.
fn decode_source(data: &[u8], limits: &RenderLimits) -> Result<DynamicImage, WatermarkError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::render(format!("unreadable source image: {}", e)))?;

    match reader.format() {
        Some(ImageFormat::Png) | Some(ImageFormat::Jpeg) => {}
        Some(other) => {
            return Err(WatermarkError::render(format!(
                "unsupported source format {:?}",
                other
            )))
        }
        None => return Err(WatermarkError::render("unrecognized source image format")),
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| WatermarkError::render(format!("corrupt source image: {}", e)))?;
    validate_dimensions(width, height, limits)?;

    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::render(format!("unreadable source image: {}", e)))?
        .decode()
        .map_err(|e| WatermarkError::render(format!("corrupt source image: {}", e)))
}

fn encode_png(image: &RgbImage) -> Result<Vec<u8>, WatermarkError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| WatermarkError::render(format!("failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<(), WatermarkError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
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

    fs::write(&temp_path, data)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }

    Ok(())
}

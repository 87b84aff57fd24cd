//! Text watermark rendering.
//!
//! This module rasterizes the watermark text into a tight, transparent RGBA
//! tile that can be rotated and tiled over a photo.
//!
//! # Features
//!
//! - Tight ink bounds measured from real glyph outlines (kerning applied)
//! - Outline stroke drawn as a halo behind the fill
//! - Empty or whitespace-only text yields a 1x1 transparent tile
//!
//! # Example
//!
//! ```ignore
//! use tilemark::watermark::text_renderer::{render_text, TextRenderOptions};
//!
//! let options = TextRenderOptions {
//!     text: "Confidential".to_string(),
//!     point_size: 40.0,
//!     fill: Rgba([0, 0, 0, 255]),
//!     stroke: Rgba([255, 255, 255, 255]),
//!     stroke_width: 2,
//! };
//!
//! let tile = render_text(provider.font(), &options)?;
//! ```

use ab_glyph::{point, Font, FontArc, GlyphId, OutlinedGlyph, PxScale, ScaleFont};
use image::{Rgba, RgbaImage};

use super::compositor::blend_pixels;
use super::WatermarkError;
use crate::constants::MAX_TILE_PIXELS;

/// Options for text rendering.
#[derive(Debug, Clone)]
pub struct TextRenderOptions {
    /// The text to render.
    pub text: String,
    /// Em size in pixels.
    pub point_size: f32,
    /// Glyph fill.
    pub fill: Rgba<u8>,
    /// Glyph outline.
    pub stroke: Rgba<u8>,
    /// Outline thickness in pixels. Zero disables the outline.
    pub stroke_width: u32,
}

/// Pixel bounding box of rendered ink, relative to the text origin.
///
/// The origin is the left end of the line at the top of the ascent, so
/// `min_y` is usually positive and `min_x` may be negative for glyphs with
/// a negative left bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InkBounds {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl InkBounds {
    pub fn width(&self) -> u32 {
        (self.max_x - self.min_x).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.max_y - self.min_y).max(0) as u32
    }

    fn union(self, other: InkBounds) -> InkBounds {
        InkBounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// Pixel scale whose em square is `point_size` pixels tall.
fn px_scale(font: &FontArc, point_size: f32) -> PxScale {
    match font.units_per_em() {
        Some(units_per_em) if units_per_em > 0.0 => {
            PxScale::from(point_size * font.height_unscaled() / units_per_em)
        }
        _ => PxScale::from(point_size),
    }
}

/// Lay out a single line of text and outline every visible glyph.
fn outline_text(font: &FontArc, text: &str, point_size: f32) -> Vec<OutlinedGlyph> {
    let scale = px_scale(font, point_size);
    let scaled_font = font.as_scaled(scale);
    let baseline_y = scaled_font.ascent();

    let mut outlined = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut prev_glyph: Option<GlyphId> = None;

    for c in text.chars().filter(|c| !c.is_control()) {
        let glyph_id = scaled_font.glyph_id(c);

        if let Some(prev) = prev_glyph {
            cursor_x += scaled_font.kern(prev, glyph_id);
        }

        let glyph = glyph_id.with_scale_and_position(scale, point(cursor_x, baseline_y));
        if let Some(glyph) = font.outline_glyph(glyph) {
            outlined.push(glyph);
        }

        cursor_x += scaled_font.h_advance(glyph_id);
        prev_glyph = Some(glyph_id);
    }

    outlined
}

fn glyph_bounds(glyph: &OutlinedGlyph) -> InkBounds {
    let bounds = glyph.px_bounds();
    InkBounds {
        min_x: bounds.min.x.floor() as i32,
        min_y: bounds.min.y.floor() as i32,
        max_x: bounds.max.x.ceil() as i32,
        max_y: bounds.max.y.ceil() as i32,
    }
}

/// Measure the tight ink bounds of `text`.
///
/// Returns `None` when nothing would be drawn (empty or whitespace-only
/// text).
pub fn measure_text(font: &FontArc, text: &str, point_size: f32) -> Option<InkBounds> {
    outline_text(font, text, point_size)
        .iter()
        .map(glyph_bounds)
        .reduce(InkBounds::union)
}

/// Render text to a transparent RGBA tile.
///
/// The tile is the ink box grown by `stroke_width` on every side. The
/// outline is drawn first and the fill on top of it.
pub fn render_text(font: &FontArc, options: &TextRenderOptions) -> Result<RgbaImage, WatermarkError> {
    let glyphs = outline_text(font, &options.text, options.point_size);

    let bounds = match glyphs.iter().map(glyph_bounds).reduce(InkBounds::union) {
        Some(bounds) => bounds,
        None => return Ok(RgbaImage::new(1, 1)),
    };

    let pad = options.stroke_width;
    let width = (bounds.width() + 2 * pad).max(1);
    let height = (bounds.height() + 2 * pad).max(1);

    if width as u64 * height as u64 > MAX_TILE_PIXELS {
        return Err(WatermarkError::render(format!(
            "watermark tile {}x{} is too large",
            width, height
        )));
    }

    let fill_mask = rasterize_coverage(&glyphs, &bounds, pad, width, height);
    let stroke_mask = dilate(&fill_mask, width, height, options.stroke_width);

    let mut tile = RgbaImage::new(width, height);
    for (i, pixel) in tile.pixels_mut().enumerate() {
        let stroke = with_coverage(options.stroke, stroke_mask[i]);
        let fill = with_coverage(options.fill, fill_mask[i]);
        let under = blend_pixels(Rgba([0, 0, 0, 0]), stroke, 1.0);
        *pixel = blend_pixels(under, fill, 1.0);
    }

    Ok(tile)
}

/// Accumulate glyph coverage (0.0..=1.0) into a row-major mask.
fn rasterize_coverage(
    glyphs: &[OutlinedGlyph],
    bounds: &InkBounds,
    pad: u32,
    width: u32,
    height: u32,
) -> Vec<f32> {
    let mut mask = vec![0.0f32; width as usize * height as usize];

    for glyph in glyphs {
        let gb = glyph_bounds(glyph);
        let origin_x = gb.min_x - bounds.min_x + pad as i32;
        let origin_y = gb.min_y - bounds.min_y + pad as i32;

        glyph.draw(|px, py, coverage| {
            let x = origin_x + px as i32;
            let y = origin_y + py as i32;

            if x >= 0 && y >= 0 && x < width as i32 && y < height as i32 {
                let idx = y as usize * width as usize + x as usize;
                mask[idx] = (mask[idx] + coverage).min(1.0);
            }
        });
    }

    mask
}

/// Grow a coverage mask by `radius` pixels (max filter over a disc).
fn dilate(mask: &[f32], width: u32, height: u32, radius: u32) -> Vec<f32> {
    if radius == 0 {
        return mask.to_vec();
    }

    let r = radius as i32;
    let reach = (radius as f32 + 0.5).powi(2);
    let offsets: Vec<(i32, i32)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| ((dx * dx + dy * dy) as f32) <= reach)
        .collect();

    let (w, h) = (width as i32, height as i32);
    let mut out = vec![0.0f32; mask.len()];

    for y in 0..h {
        for x in 0..w {
            let mut best = 0.0f32;
            for (dx, dy) in &offsets {
                let sx = x + dx;
                let sy = y + dy;
                if sx >= 0 && sy >= 0 && sx < w && sy < h {
                    best = best.max(mask[(sy * w + sx) as usize]);
                }
            }
            out[(y * w + x) as usize] = best;
        }
    }

    out
}

fn with_coverage(color: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let alpha = (coverage.clamp(0.0, 1.0) * color[3] as f32).round() as u8;
    Rgba([color[0], color[1], color[2], alpha])
}

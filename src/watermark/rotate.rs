//! Tile rotation with an expanded canvas.
//!
//! Positive angles turn the image counter-clockwise as seen on screen. The
//! output canvas is the axis-aligned box of the rotated source, so no corner
//! is clipped. Pixels are sampled bilinearly in premultiplied space so the
//! transparent surround does not darken antialiased edges.

use image::{Rgba, RgbaImage};

use super::WatermarkError;
use crate::constants::MAX_TILE_PIXELS;

/// Slack absorbed before rounding the rotated box up, so that angles like
/// 90° do not grow the canvas by a pixel from floating point noise.
const SIZE_EPSILON: f32 = 1e-3;

/// Canvas size needed to hold a `width` x `height` image rotated by `degrees`.
pub fn rotated_size(width: u32, height: u32, degrees: f32) -> (u32, u32) {
    let radians = degrees.to_radians();
    let cos = radians.cos().abs();
    let sin = radians.sin().abs();

    let w = width as f32 * cos + height as f32 * sin;
    let h = width as f32 * sin + height as f32 * cos;

    (
        ((w - SIZE_EPSILON).ceil().max(1.0)) as u32,
        ((h - SIZE_EPSILON).ceil().max(1.0)) as u32,
    )
}

/// Rotate `image` by `degrees` (counter-clockwise) about its center.
///
/// A rotation that is a whole number of turns returns an unchanged copy.
/// Fails without allocating when the expanded canvas would exceed
/// `MAX_TILE_PIXELS`.
pub fn rotate_expand(image: &RgbaImage, degrees: f32) -> Result<RgbaImage, WatermarkError> {
    if degrees.rem_euclid(360.0) == 0.0 {
        return Ok(image.clone());
    }

    let radians = degrees.to_radians();
    let cos = radians.cos();
    let sin = radians.sin();

    let (dst_w, dst_h) = rotated_size(image.width(), image.height(), degrees);
    if dst_w as u64 * dst_h as u64 > MAX_TILE_PIXELS {
        return Err(WatermarkError::render(format!(
            "rotated watermark tile {}x{} is too large",
            dst_w, dst_h
        )));
    }

    let mut rotated = RgbaImage::new(dst_w, dst_h);

    let src_cx = image.width() as f32 / 2.0;
    let src_cy = image.height() as f32 / 2.0;
    let dst_cx = dst_w as f32 / 2.0;
    let dst_cy = dst_h as f32 / 2.0;

    for dy in 0..dst_h {
        for dx in 0..dst_w {
            // Destination pixel center relative to the canvas center
            let u = dx as f32 + 0.5 - dst_cx;
            let v = dy as f32 + 0.5 - dst_cy;

            // Inverse rotation back into source space (y axis points down)
            let sx = u * cos - v * sin + src_cx;
            let sy = u * sin + v * cos + src_cy;

            rotated.put_pixel(dx, dy, sample_bilinear(image, sx - 0.5, sy - 0.5));
        }
    }

    Ok(rotated)
}

/// Sample at fractional pixel-index coordinates; outside pixels are
/// transparent.
fn sample_bilinear(image: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let x0 = x0 as i64;
    let y0 = y0 as i64;

    let taps = [
        (x0, y0, (1.0 - fx) * (1.0 - fy)),
        (x0 + 1, y0, fx * (1.0 - fy)),
        (x0, y0 + 1, (1.0 - fx) * fy),
        (x0 + 1, y0 + 1, fx * fy),
    ];

    let mut acc = [0.0f32; 4];
    for (px, py, weight) in taps {
        if weight <= 0.0
            || px < 0
            || py < 0
            || px >= image.width() as i64
            || py >= image.height() as i64
        {
            continue;
        }
        let p = image.get_pixel(px as u32, py as u32);
        let alpha = p[3] as f32 / 255.0;
        acc[0] += p[0] as f32 * alpha * weight;
        acc[1] += p[1] as f32 * alpha * weight;
        acc[2] += p[2] as f32 * alpha * weight;
        acc[3] += alpha * weight;
    }

    if acc[3] < 1e-4 {
        return Rgba([0, 0, 0, 0]);
    }

    let unpremultiply = |c: f32| (c / acc[3]).round().clamp(0.0, 255.0) as u8;
    Rgba([
        unpremultiply(acc[0]),
        unpremultiply(acc[1]),
        unpremultiply(acc[2]),
        (acc[3] * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

//! Watermark compositor for blending tiled watermarks onto images.
//!
//! The compositor works in three stages:
//!
//! 1. [`TiledOverlay::build`] repeats a tile over a transparent canvas the
//!    size of the photo.
//! 2. [`composite_over`] blends that overlay onto the photo with the
//!    Porter-Duff "over" operator.
//! 3. [`flatten`] resolves any remaining transparency against an opaque
//!    background and drops the alpha channel.
//!
//! # Example
//!
//! ```ignore
//! use tilemark::watermark::compositor::{composite_over, flatten, TiledOverlay};
//!
//! let overlay = TiledOverlay::build(&tile, photo.width(), photo.height(), 40);
//! composite_over(&mut photo, overlay.image());
//! let output = flatten(&photo, Rgb([255, 255, 255]));
//! ```

use image::{Rgb, RgbImage, Rgba, RgbaImage};

use super::position::{
    clamp_to_bounds, ImageDimensions, PlacementPosition, TileGrid, WatermarkDimensions,
};

/// Full-canvas transparent layer holding every tile placement.
pub struct TiledOverlay {
    image: RgbaImage,
    grid: TileGrid,
    tile: WatermarkDimensions,
}

impl std::fmt::Debug for TiledOverlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TiledOverlay")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("tile", &self.tile)
            .field("grid", &self.grid)
            .finish()
    }
}

impl TiledOverlay {
    /// Tile `tile` over a `width` x `height` transparent canvas with
    /// `spacing` pixels between tiles, starting at (0, 0).
    pub fn build(tile: &RgbaImage, width: u32, height: u32, spacing: u32) -> Self {
        let image_dims = ImageDimensions { width, height };
        let tile_dims = WatermarkDimensions {
            width: tile.width(),
            height: tile.height(),
        };
        let grid = TileGrid::new(&image_dims, &tile_dims, spacing);

        let mut image = RgbaImage::new(width, height);
        for position in grid.positions() {
            blend_layer(&mut image, tile, position);
        }

        Self {
            image,
            grid,
            tile: tile_dims,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Number of tile instances placed.
    pub fn tile_count(&self) -> usize {
        self.grid.len()
    }
}

/// Blend a single tile onto the target at `position`, clipped to the target.
pub fn blend_layer(target: &mut RgbaImage, tile: &RgbaImage, position: PlacementPosition) {
    let image_dims = ImageDimensions {
        width: target.width(),
        height: target.height(),
    };
    let tile_dims = WatermarkDimensions {
        width: tile.width(),
        height: tile.height(),
    };

    let Some((x_start, y_start, x_end, y_end)) = clamp_to_bounds(&position, &tile_dims, &image_dims)
    else {
        return;
    };

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let wx = (tx as i32 - position.x) as u32;
            let wy = (ty as i32 - position.y) as u32;

            let tile_pixel = tile.get_pixel(wx, wy);
            if tile_pixel[3] == 0 {
                continue;
            }

            let target_pixel = target.get_pixel(tx, ty);
            let blended = blend_pixels(*target_pixel, *tile_pixel, 1.0);
            target.put_pixel(tx, ty, blended);
        }
    }
}

/// Composite a same-sized overlay onto the base image in place.
///
/// Overlay pixels with zero alpha leave the base untouched; opaque overlay
/// pixels replace it.
pub fn composite_over(base: &mut RgbaImage, overlay: &RgbaImage) {
    debug_assert_eq!(base.dimensions(), overlay.dimensions());

    for (base_pixel, overlay_pixel) in base.pixels_mut().zip(overlay.pixels()) {
        if overlay_pixel[3] == 0 {
            continue;
        }
        *base_pixel = blend_pixels(*base_pixel, *overlay_pixel, 1.0);
    }
}

/// Flatten an RGBA image onto an opaque background.
pub fn flatten(image: &RgbaImage, background: Rgb<u8>) -> RgbImage {
    let backdrop = Rgba([background[0], background[1], background[2], 255]);

    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let pixel = image.get_pixel(x, y);
        let resolved = if pixel[3] == 255 {
            *pixel
        } else {
            blend_pixels(backdrop, *pixel, 1.0)
        };
        Rgb([resolved[0], resolved[1], resolved[2]])
    })
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
pub(crate) fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    // Apply additional opacity to foreground alpha
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    // Porter-Duff "over" operator
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

//! Tile placement for the watermark grid.
//!
//! Tiles start at the top-left corner and repeat every `tile + gutter`
//! pixels along each axis for as long as the tile origin lies inside the
//! image. Tiles that hang past the right or bottom edge are still placed;
//! the compositor clips them.
//!
//! # Example
//!
//! ```ignore
//! use tilemark::watermark::position::{calculate_tiled_positions, ImageDimensions, WatermarkDimensions};
//!
//! let image = ImageDimensions { width: 800, height: 600 };
//! let tile = WatermarkDimensions { width: 160, height: 60 };
//!
//! let positions = calculate_tiled_positions(&image, &tile, 40);
//! assert_eq!(positions.len(), 4 * 6); // ceil(800/200) * ceil(600/100)
//! ```

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

/// Dimensions of the watermark tile to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// A single position where a watermark tile should be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Shape of a tile grid: how many tiles along each axis and their stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    pub step_x: u32,
    pub step_y: u32,
}

impl TileGrid {
    /// Compute the grid for `watermark` tiles over `image` with `spacing`
    /// pixels between tiles.
    pub fn new(image: &ImageDimensions, watermark: &WatermarkDimensions, spacing: u32) -> Self {
        let step_x = (watermark.width + spacing).max(1);
        let step_y = (watermark.height + spacing).max(1);

        Self {
            columns: image.width.div_ceil(step_x),
            rows: image.height.div_ceil(step_y),
            step_x,
            step_y,
        }
    }

    /// Total number of placements.
    pub fn len(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Placements in row-major order, starting at (0, 0).
    pub fn positions(&self) -> impl Iterator<Item = PlacementPosition> + '_ {
        (0..self.rows).flat_map(move |row| {
            (0..self.columns).map(move |col| {
                PlacementPosition::new((col * self.step_x) as i32, (row * self.step_y) as i32)
            })
        })
    }
}

/// Calculate positions for tiled watermark placement.
///
/// # Arguments
///
/// * `image` - Dimensions of the target image
/// * `watermark` - Dimensions of the watermark tile
/// * `spacing` - Gutter between tiles in pixels
///
/// # Returns
///
/// A vector of positions for each tile instance, row by row.
pub fn calculate_tiled_positions(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    spacing: u32,
) -> Vec<PlacementPosition> {
    TileGrid::new(image, watermark, spacing).positions().collect()
}

/// Clamp a tile placement to the region of the image it actually covers.
///
/// Returns `(x_start, y_start, x_end, y_end)` in image coordinates, or
/// `None` when the tile is entirely outside.
pub fn clamp_to_bounds(
    position: &PlacementPosition,
    watermark: &WatermarkDimensions,
    image: &ImageDimensions,
) -> Option<(u32, u32, u32, u32)> {
    let x_start = position.x.max(0);
    let y_start = position.y.max(0);
    let x_end = (position.x + watermark.width as i32).min(image.width as i32);
    let y_end = (position.y + watermark.height as i32).min(image.height as i32);

    if x_start >= x_end || y_start >= y_end {
        return None;
    }

    Some((
        x_start as u32,
        y_start as u32,
        x_end as u32,
        y_end as u32,
    ))
}

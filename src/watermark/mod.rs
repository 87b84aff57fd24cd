//! Watermark module for tiling styled text over photos.
//!
//! A render takes a source photo and a set of style signals from the
//! browser and produces an opaque PNG with the text repeated across it.
//!
//! # Pipeline
//!
//! 1. [`parse_style`] turns raw signals into a [`WatermarkStyle`]
//! 2. [`render_text`] rasterizes the text with its outline into a tile
//! 3. [`rotate_expand`] rotates the tile without clipping its corners
//! 4. [`TiledOverlay`] repeats the tile over a transparent full-size layer
//! 5. [`composite_over`] and [`flatten`] merge the layer into the photo
//!
//! [`WatermarkRenderer`] runs the whole pipeline against a file.
//!
//! # Style signals
//!
//! - `text` - text to repeat (may be empty)
//! - `font.size` - size selector such as `2px`; point size is the number × 20
//! - `color` / `stroke` - fill and outline colors (`#RRGGBB`, names, `rgb()`)
//! - `rotation` - degrees, positive turns the text clockwise on screen

pub mod color;
pub mod compositor;
pub mod error;
pub mod font;
pub mod position;
pub mod processor;
pub mod rotate;
pub mod style;
pub mod text_renderer;

// Re-export main types for convenience
pub use color::parse_color;
pub use compositor::{blend_layer, composite_over, flatten, TiledOverlay};
pub use error::WatermarkError;
pub use font::{FileFontProvider, FontProvider};
pub use position::{
    calculate_tiled_positions, clamp_to_bounds, ImageDimensions, PlacementPosition, TileGrid,
    WatermarkDimensions,
};
pub use processor::{
    output_filename, validate_dimensions, RenderLimits, RenderedImage, RenderedOutput,
    WatermarkRenderer,
};
pub use rotate::{rotate_expand, rotated_size};
pub use style::{parse_style, FontScale, RawStyleParams, WatermarkStyle};
pub use text_renderer::{measure_text, render_text, InkBounds, TextRenderOptions};

// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Rendering constants that define the look of the watermark are fixed here
// and are not configurable.

// =============================================================================
// Watermark rendering
// =============================================================================

/// Multiplier applied to the font-size token to get the point size
pub const FONT_SIZE_MULTIPLIER: u32 = 20;

/// Font scale factors accepted from the size selector
pub const RECOGNIZED_FONT_SCALES: &[u32] = &[1, 2, 3, 4, 5, 10];

/// Outline thickness around each glyph, in pixels
pub const STROKE_WIDTH: u32 = 2;

/// Gap between successive tile origins, in pixels (both axes)
pub const TILE_GUTTER: u32 = 40;

/// Rotation accepted from the UI, in degrees (symmetric around zero)
pub const MAX_ROTATION_DEGREES: f32 = 50.0;

/// Longest watermark text accepted, in characters
pub const MAX_TEXT_CHARS: usize = 200;

/// Upper bound on the area of a watermark tile, before and after rotation
pub const MAX_TILE_PIXELS: u64 = 40_000_000;

/// Prefix of every rendered output file
pub const OUTPUT_PREFIX: &str = "watermarked_";

/// Extension of every rendered output file
pub const OUTPUT_EXTENSION: &str = "png";

// =============================================================================
// Render defaults
// =============================================================================

/// Default render deadline in seconds
pub const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Default number of renders allowed to run at once
pub const DEFAULT_MAX_CONCURRENT_RENDERS: usize = 4;

/// Default maximum source width in pixels
pub const DEFAULT_MAX_SOURCE_WIDTH: u32 = 10_000;

/// Default maximum source height in pixels
pub const DEFAULT_MAX_SOURCE_HEIGHT: u32 = 10_000;

/// Default maximum source area (40 megapixels)
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 40_000_000;

/// Default flatten background
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

// =============================================================================
// Storage and upload defaults
// =============================================================================

/// Default directory for per-session files
pub const DEFAULT_BASE_DIR: &str = "./photos";

/// Default maximum upload size (1 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 1024 * 1024;

/// Upload MIME types accepted by the session store
pub const ACCEPTED_UPLOAD_TYPES: &[&str] = &["image/png", "image/jpeg", "image/jpg"];

/// Maximum length of a session identifier
pub const MAX_SESSION_ID_LEN: usize = 64;

// =============================================================================
// Font discovery
// =============================================================================

/// System font files tried in order when no font path is configured
pub const DEFAULT_FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

// =============================================================================
// Logging defaults
// =============================================================================

/// Default log level filter
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log output format
pub const DEFAULT_LOG_FORMAT: &str = "pretty";

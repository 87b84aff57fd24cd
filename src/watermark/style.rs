//! Watermark style parameter parsing.
//!
//! The browser sends its watermark controls as a bag of signals:
//!
//! ```json
//! { "text": "Confidential", "color": "#000000", "stroke": "#FFFFFF",
//!   "font": { "size": "2px" }, "rotation": 45 }
//! ```
//!
//! [`RawStyleParams`] flattens those into dotted keys and [`parse_style`]
//! turns them into a typed [`WatermarkStyle`].

use std::collections::HashMap;
use std::str::FromStr;

use serde_json::Value;

use super::WatermarkError;
use crate::constants::{
    FONT_SIZE_MULTIPLIER, MAX_ROTATION_DEGREES, MAX_TEXT_CHARS, RECOGNIZED_FONT_SCALES,
};

/// Signal keys read by the parser.
pub const KEY_TEXT: &str = "text";
pub const KEY_FILL: &str = "color";
pub const KEY_STROKE: &str = "stroke";
pub const KEY_FONT_SIZE: &str = "font.size";
pub const KEY_ROTATION: &str = "rotation";

/// Raw, untyped style signals keyed by dotted name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStyleParams {
    values: HashMap<String, String>,
}

impl RawStyleParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a signal value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Flatten a JSON signal object into dotted keys.
    ///
    /// Nested objects become `parent.child`. Numbers and booleans are
    /// stringified, nulls are dropped, arrays are ignored.
    pub fn from_signals(signals: &Value) -> Self {
        let mut raw = Self::new();
        flatten_into(&mut raw.values, "", signals);
        raw
    }
}

fn flatten_into(out: &mut HashMap<String, String>, prefix: &str, value: &Value) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(out, &path, child);
            }
        }
        Value::String(s) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), s.clone());
        }
        Value::Number(n) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), n.to_string());
        }
        Value::Bool(b) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), b.to_string());
        }
        _ => {}
    }
}

/// Integer multiplier selected by the font-size control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontScale(u32);

impl FontScale {
    pub fn factor(&self) -> u32 {
        self.0
    }

    /// Point size used for glyph rendering.
    pub fn point_size(&self) -> f32 {
        (self.0 * FONT_SIZE_MULTIPLIER) as f32
    }
}

impl FromStr for FontScale {
    type Err = WatermarkError;

    /// Parse a token such as `"2px"`. The unit suffix is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let numeric = strip_unit(trimmed).trim();

        let factor: u32 = numeric.parse().map_err(|_| {
            WatermarkError::invalid_param(
                KEY_FONT_SIZE,
                format!("'{}' is not an integer size", trimmed),
            )
        })?;

        if !RECOGNIZED_FONT_SCALES.contains(&factor) {
            return Err(WatermarkError::invalid_param(
                KEY_FONT_SIZE,
                format!("unrecognized size '{}'", trimmed),
            ));
        }

        Ok(FontScale(factor))
    }
}

fn strip_unit(token: &str) -> &str {
    let len = token.len();
    if len >= 2 && token.is_char_boundary(len - 2) && token[len - 2..].eq_ignore_ascii_case("px")
    {
        &token[..len - 2]
    } else {
        token
    }
}

/// Typed watermark style for a single render.
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStyle {
    /// Text to render. May be empty.
    pub text: String,
    pub font_scale: FontScale,
    /// Color spec for the glyph fill, resolved at draw time.
    pub fill_color: String,
    /// Color spec for the glyph outline, resolved at draw time.
    pub stroke_color: String,
    /// Rotation as entered in the UI, in degrees.
    pub rotation_degrees: f32,
}

impl WatermarkStyle {
    pub fn point_size(&self) -> f32 {
        self.font_scale.point_size()
    }

    /// Rotation handed to the rasterizer.
    ///
    /// Positive UI angles turn the text clockwise on screen, so the sign is
    /// flipped before the counter-clockwise rotation is applied.
    pub fn internal_rotation(&self) -> f32 {
        -self.rotation_degrees
    }
}

/// Parse raw signals into a [`WatermarkStyle`].
pub fn parse_style(raw: &RawStyleParams) -> Result<WatermarkStyle, WatermarkError> {
    let text = raw.get(KEY_TEXT).unwrap_or_default().to_string();
    let chars = text.chars().count();
    if chars > MAX_TEXT_CHARS {
        return Err(WatermarkError::invalid_param(
            KEY_TEXT,
            format!("text is {} characters, limit is {}", chars, MAX_TEXT_CHARS),
        ));
    }

    let size_token = raw
        .get(KEY_FONT_SIZE)
        .ok_or_else(|| WatermarkError::invalid_param(KEY_FONT_SIZE, "missing size"))?;
    let font_scale = size_token.parse::<FontScale>()?;

    let fill_color = required_color(raw, KEY_FILL)?;
    let stroke_color = required_color(raw, KEY_STROKE)?;
    let rotation_degrees = parse_rotation(raw.get(KEY_ROTATION))?;

    Ok(WatermarkStyle {
        text,
        font_scale,
        fill_color,
        stroke_color,
        rotation_degrees,
    })
}

fn required_color(raw: &RawStyleParams, key: &str) -> Result<String, WatermarkError> {
    match raw.get(key).map(str::trim) {
        Some(color) if !color.is_empty() => Ok(color.to_string()),
        _ => Err(WatermarkError::invalid_param(key, "color is required")),
    }
}

/// Absent or blank rotation means no rotation.
fn parse_rotation(value: Option<&str>) -> Result<f32, WatermarkError> {
    let value = match value.map(str::trim) {
        None | Some("") => return Ok(0.0),
        Some(v) => v,
    };

    let degrees: f32 = value.parse().map_err(|_| {
        WatermarkError::invalid_param(KEY_ROTATION, format!("'{}' is not a number", value))
    })?;

    if !degrees.is_finite() {
        return Err(WatermarkError::invalid_param(
            KEY_ROTATION,
            format!("'{}' is not a finite angle", value),
        ));
    }

    let clamped = degrees.clamp(-MAX_ROTATION_DEGREES, MAX_ROTATION_DEGREES);
    if clamped != degrees {
        tracing::debug!(requested = degrees, applied = clamped, "Rotation clamped");
    }
    Ok(clamped)
}

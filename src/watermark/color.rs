//! Color specification parsing.
//!
//! Accepts the formats a browser color control or a hand-typed value may
//! produce:
//!
//! - `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - `rgb(r, g, b)` and `rgba(r, g, b, a)`, where `a` is either a 0.0-1.0
//!   fraction or a 0-255 integer
//! - CSS basic color keywords (case-insensitive) and `transparent`

use image::Rgba;

use super::WatermarkError;

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("silver", [192, 192, 192]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("white", [255, 255, 255]),
    ("maroon", [128, 0, 0]),
    ("red", [255, 0, 0]),
    ("purple", [128, 0, 128]),
    ("fuchsia", [255, 0, 255]),
    ("magenta", [255, 0, 255]),
    ("green", [0, 128, 0]),
    ("lime", [0, 255, 0]),
    ("olive", [128, 128, 0]),
    ("yellow", [255, 255, 0]),
    ("navy", [0, 0, 128]),
    ("blue", [0, 0, 255]),
    ("teal", [0, 128, 128]),
    ("aqua", [0, 255, 255]),
    ("cyan", [0, 255, 255]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
    ("gold", [255, 215, 0]),
];

/// Parse a color spec into an RGBA pixel.
pub fn parse_color(spec: &str) -> Result<Rgba<u8>, WatermarkError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(WatermarkError::render("color is empty"));
    }

    if let Some(hex) = spec.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| invalid(spec));
    }

    let lower = spec.to_ascii_lowercase();
    if let Some(args) = function_args(&lower, "rgba") {
        return parse_rgb_function(args, true).ok_or_else(|| invalid(spec));
    }
    if let Some(args) = function_args(&lower, "rgb") {
        return parse_rgb_function(args, false).ok_or_else(|| invalid(spec));
    }

    if lower == "transparent" {
        return Ok(Rgba([0, 0, 0, 0]));
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, [r, g, b])| Rgba([*r, *g, *b, 255]))
        .ok_or_else(|| invalid(spec))
}

fn invalid(spec: &str) -> WatermarkError {
    WatermarkError::render(format!("unrecognized color '{}'", spec))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    // from_str_radix alone would accept a leading '+'
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok();
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        // Short forms double each digit: 0xF -> 0xFF
        3 => Some(Rgba([nibble(0)? * 17, nibble(1)? * 17, nibble(2)? * 17, 255])),
        4 => Some(Rgba([
            nibble(0)? * 17,
            nibble(1)? * 17,
            nibble(2)? * 17,
            nibble(3)? * 17,
        ])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn function_args<'a>(spec: &'a str, name: &str) -> Option<&'a str> {
    spec.strip_prefix(name)?
        .trim_start()
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn parse_rgb_function(args: &str, with_alpha: bool) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let expected = if with_alpha { 4 } else { 3 };
    if parts.len() != expected {
        return None;
    }

    let alpha = if with_alpha {
        parse_alpha(parts[3])?
    } else {
        255
    };

    Some(Rgba([
        parse_decimal_u8(parts[0])?,
        parse_decimal_u8(parts[1])?,
        parse_decimal_u8(parts[2])?,
        alpha,
    ]))
}

fn parse_decimal_u8(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_alpha(s: &str) -> Option<u8> {
    if s.contains('.') {
        if !s.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
            return None;
        }
        let fraction: f32 = s.parse().ok()?;
        if !(0.0..=1.0).contains(&fraction) {
            return None;
        }
        Some((fraction * 255.0).round() as u8)
    } else {
        parse_decimal_u8(s)
    }
}

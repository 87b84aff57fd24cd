//! Font provider for watermark text.
//!
//! The renderer never opens font files itself. A [`FontProvider`] is built
//! once at startup and shared; if no font can be loaded the service must not
//! start, since there is no fallback face.

use std::path::Path;

use ab_glyph::FontArc;

use super::WatermarkError;

/// Supplies the single font face used for every watermark.
pub trait FontProvider: Send + Sync {
    /// The loaded font.
    fn font(&self) -> &FontArc;

    /// Human-readable name for logs (usually the file path).
    fn name(&self) -> &str;
}

/// Font loaded from a TrueType/OpenType file or an in-memory buffer.
#[derive(Clone)]
pub struct FileFontProvider {
    font: FontArc,
    name: String,
}

impl std::fmt::Debug for FileFontProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFontProvider")
            .field("name", &self.name)
            .finish()
    }
}

impl FileFontProvider {
    /// Load a font file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let bytes = std::fs::read(path)
            .map_err(|e| WatermarkError::font_unavailable(&display, e.to_string()))?;

        Self::from_bytes(display, bytes)
    }

    /// Build a provider from font bytes already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, WatermarkError> {
        let name = name.into();
        let font = FontArc::try_from_vec(bytes)
            .map_err(|e| WatermarkError::font_unavailable(&name, e.to_string()))?;

        tracing::debug!(font = %name, "Watermark font loaded");
        Ok(Self { font, name })
    }

    /// Load the first readable font among `candidates`.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, WatermarkError> {
        let mut last_error = None;

        for candidate in candidates {
            match Self::load(candidate) {
                Ok(provider) => return Ok(provider),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            WatermarkError::font_unavailable("<none>", "no font candidates configured")
        }))
    }
}

impl FontProvider for FileFontProvider {
    fn font(&self) -> &FontArc {
        &self.font
    }

    fn name(&self) -> &str {
        &self.name
    }
}

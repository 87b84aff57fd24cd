// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use image::Rgb;

use crate::constants::{
    DEFAULT_BACKGROUND, DEFAULT_BASE_DIR, DEFAULT_LOG_FORMAT, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_CONCURRENT_RENDERS, DEFAULT_MAX_SOURCE_HEIGHT, DEFAULT_MAX_SOURCE_PIXELS,
    DEFAULT_MAX_SOURCE_WIDTH, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_RENDER_TIMEOUT_SECS,
};
use crate::storage::UploadLimits;
use crate::watermark::{parse_color, RenderLimits};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub font: FontConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        // First, check that all referenced environment variables exist
        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        // An empty document means "all defaults"
        if substituted.trim().is_empty() {
            return Ok(Config::default());
        }

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.storage.base_dir.as_os_str().is_empty() {
            return Err("storage.base_dir cannot be empty".to_string());
        }

        if let Some(path) = &self.font.path {
            if path.as_os_str().is_empty() {
                return Err("font.path cannot be empty when set".to_string());
            }
        }

        if self.render.timeout_secs == 0 {
            return Err("render.timeout_secs must be greater than 0".to_string());
        }

        if self.render.max_concurrent_renders == 0 {
            return Err("render.max_concurrent_renders must be greater than 0".to_string());
        }

        if self.render.max_source_width == 0
            || self.render.max_source_height == 0
            || self.render.max_source_pixels == 0
        {
            return Err("render source limits must be greater than 0".to_string());
        }

        self.render.background_color()?;

        if self.upload.max_bytes == 0 {
            return Err("upload.max_bytes must be greater than 0".to_string());
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(format!(
                    "logging.format must be 'pretty' or 'json', got '{}'",
                    other
                ))
            }
        }

        if self.logging.level.trim().is_empty() {
            return Err("logging.level cannot be empty".to_string());
        }

        Ok(())
    }
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BASE_DIR)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Flat directory holding uploads and rendered outputs
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FontConfig {
    /// TTF/OTF file to render with. When absent, well-known system paths
    /// are searched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_RENDER_TIMEOUT_SECS
}

fn default_max_concurrent_renders() -> usize {
    DEFAULT_MAX_CONCURRENT_RENDERS
}

fn default_max_source_width() -> u32 {
    DEFAULT_MAX_SOURCE_WIDTH
}

fn default_max_source_height() -> u32 {
    DEFAULT_MAX_SOURCE_HEIGHT
}

fn default_max_source_pixels() -> u64 {
    DEFAULT_MAX_SOURCE_PIXELS
}

fn default_background() -> String {
    DEFAULT_BACKGROUND.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_concurrent_renders")]
    pub max_concurrent_renders: usize,
    #[serde(default = "default_max_source_width")]
    pub max_source_width: u32,
    #[serde(default = "default_max_source_height")]
    pub max_source_height: u32,
    #[serde(default = "default_max_source_pixels")]
    pub max_source_pixels: u64,
    /// Color transparent sources are flattened onto
    #[serde(default = "default_background")]
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_concurrent_renders: default_max_concurrent_renders(),
            max_source_width: default_max_source_width(),
            max_source_height: default_max_source_height(),
            max_source_pixels: default_max_source_pixels(),
            background: default_background(),
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn limits(&self) -> RenderLimits {
        RenderLimits {
            max_source_width: self.max_source_width,
            max_source_height: self.max_source_height,
            max_source_pixels: self.max_source_pixels,
        }
    }

    pub fn background_color(&self) -> Result<Rgb<u8>, String> {
        let rgba = parse_color(&self.background)
            .map_err(|e| format!("render.background is invalid: {}", e))?;
        Ok(Rgb([rgba[0], rgba[1], rgba[2]]))
    }
}

fn default_max_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

impl UploadConfig {
    pub fn limits(&self) -> UploadLimits {
        UploadLimits {
            max_bytes: self.max_bytes,
        }
    }
}

fn default_log_format() -> String {
    DEFAULT_LOG_FORMAT.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write default config to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn default_capture_interval() -> f64 {
    5.0
}

fn default_extraction_radius() -> u32 {
    100
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("screenshots_output")
}

fn default_tesseract_config() -> String {
    "--psm 6".into()
}

fn default_tesseract_path() -> String {
    "tesseract".into()
}

fn default_image_format() -> String {
    "PNG".into()
}

fn default_true() -> bool {
    true
}

fn default_unchanged_frame_threshold() -> u32 {
    8
}

/// Immutable run configuration. Loaded once before anything starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_capture_interval")]
    pub capture_interval: f64,
    #[serde(default = "default_extraction_radius")]
    pub extraction_radius: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "default_tesseract_config")]
    pub tesseract_config: String,
    #[serde(default = "default_tesseract_path")]
    pub tesseract_path: String,
    #[serde(default)]
    pub tesseract_lang: Option<String>,
    #[serde(default = "default_image_format")]
    pub image_format: String,
    #[serde(default = "default_true")]
    pub save_full_screenshots: bool,
    #[serde(default = "default_true")]
    pub save_extracted_regions: bool,
    #[serde(default = "default_true")]
    pub save_ocr_text: bool,
    #[serde(default)]
    pub skip_unchanged_frames: bool,
    #[serde(default = "default_unchanged_frame_threshold")]
    pub unchanged_frame_threshold: u32,
    #[serde(default = "default_true")]
    pub catalog: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            capture_interval: default_capture_interval(),
            extraction_radius: default_extraction_radius(),
            output_dir: default_output_dir(),
            tesseract_config: default_tesseract_config(),
            tesseract_path: default_tesseract_path(),
            tesseract_lang: None,
            image_format: default_image_format(),
            save_full_screenshots: true,
            save_extracted_regions: true,
            save_ocr_text: true,
            skip_unchanged_frames: false,
            unchanged_frame_threshold: default_unchanged_frame_threshold(),
            catalog: true,
        }
    }
}

impl RunConfig {
    /// Reads `path`, filling missing keys with defaults.
    ///
    /// A missing file is created with the defaults. Anything malformed is a
    /// startup failure; there is no fallback once a file exists.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            let config = Self::default();
            config.write_to(path)?;
            log::info!("Wrote default config to {}", path.display());
            config
        };

        config.validate()?;
        Ok(config)
    }

    /// Parses a config from a JSON string without touching the filesystem.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.capture_interval.is_finite() || self.capture_interval <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "capture_interval",
                reason: format!(
                    "must be a positive number of seconds, got {}",
                    self.capture_interval
                ),
            });
        }

        if parse_image_format(&self.image_format).is_none() {
            return Err(ConfigError::Invalid {
                key: "image_format",
                reason: format!("unsupported image format '{}'", self.image_format),
            });
        }

        if self.tesseract_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "tesseract_path",
                reason: "must not be empty".into(),
            });
        }

        Ok(())
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs_f64(self.capture_interval)
    }

    /// Encoder for persisted images. Validated at load time.
    pub fn image_format(&self) -> ImageFormat {
        parse_image_format(&self.image_format).unwrap_or(ImageFormat::Png)
    }

    /// File extension matching [`Self::image_format`].
    pub fn image_extension(&self) -> &'static str {
        self.image_format()
            .extensions_str()
            .first()
            .copied()
            .unwrap_or("png")
    }

    /// Extra recognition-engine arguments, split on whitespace.
    pub fn engine_args(&self) -> Vec<String> {
        self.tesseract_config
            .split_whitespace()
            .map(String::from)
            .collect()
    }

    fn write_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let serialized = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, serialized).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn parse_image_format(name: &str) -> Option<ImageFormat> {
    let format = ImageFormat::from_extension(name.trim().to_ascii_lowercase())?;
    format.can_write().then_some(format)
}

//! Persistence of frames, crops, recognized text and the click log.
//!
//! Every sink call is fire-and-forget from the core's point of view: callers
//! go through [`persist_or_log`] and carry on without the artifact on failure.

mod file_sink;

pub use file_sink::FileSink;

use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::path::PathBuf;

use crate::models::{BoundingBox, ClickEvent};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Image encoding to {path} failed: {message}")]
    Encoding { path: PathBuf, message: String },

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageCategory {
    Screenshot,
    Region,
}

impl ImageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageCategory::Screenshot => "screenshot",
            ImageCategory::Region => "region",
        }
    }
}

/// Where a click-derived artifact came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickContext {
    pub x: i32,
    pub y: i32,
    pub radius: u32,
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactMeta {
    pub timestamp: DateTime<Utc>,
    /// `None` for full-frame artifacts.
    pub click: Option<ClickContext>,
}

impl ArtifactMeta {
    pub fn full_frame(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            click: None,
        }
    }

    pub fn region(timestamp: DateTime<Utc>, click: ClickContext) -> Self {
        Self {
            timestamp,
            click: Some(click),
        }
    }
}

/// Durable storage for artifacts. Must tolerate concurrent calls from the
/// capture loop and the click handler.
pub trait PersistenceSink: Send + Sync {
    fn save_image(
        &self,
        image: &RgbaImage,
        category: ImageCategory,
        meta: &ArtifactMeta,
    ) -> Result<PathBuf, PersistenceError>;

    fn save_text(&self, text: &str, meta: &ArtifactMeta) -> Result<PathBuf, PersistenceError>;

    fn save_event_log(&self, entries: &[ClickEvent]) -> Result<PathBuf, PersistenceError>;
}

/// Logs a failed write and drops the error.
pub fn persist_or_log(result: Result<PathBuf, PersistenceError>, what: &str) -> Option<PathBuf> {
    match result {
        Ok(path) => Some(path),
        Err(err) => {
            log::error!("Failed to persist {what}: {err}");
            None
        }
    }
}

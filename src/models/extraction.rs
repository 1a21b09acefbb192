use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Crop rectangle in frame-local pixels; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// Outcome of one click extraction, handed to the sink and then dropped.
#[derive(Debug, Clone)]
pub struct ExtractionResult {
    pub image: RgbaImage,
    pub annotated: RgbaImage,
    pub text: String,
    pub bounds: BoundingBox,
    pub timestamp: DateTime<Utc>,
}

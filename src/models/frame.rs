use chrono::{DateTime, Utc};
use image::RgbaImage;
use std::sync::Arc;

/// One captured desktop raster.
///
/// Pixels sit behind an `Arc` and are never mutated after construction, so a
/// clone handed to a reader can't be invalidated by the next capture.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
    origin: (i32, i32),
    captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbaImage, captured_at: DateTime<Utc>) -> Self {
        Self {
            image: Arc::new(image),
            origin: (0, 0),
            captured_at,
        }
    }

    /// Position of the frame's top-left pixel in global desktop coordinates.
    /// Pointer events arrive in global coordinates and are shifted by this.
    pub fn with_origin(mut self, x: i32, y: i32) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Converts a global desktop point into frame-local pixel coordinates.
    /// The result may lie outside the frame.
    pub fn to_local(&self, x: i32, y: i32) -> (i64, i64) {
        (
            i64::from(x) - i64::from(self.origin.0),
            i64::from(y) - i64::from(self.origin.1),
        )
    }
}

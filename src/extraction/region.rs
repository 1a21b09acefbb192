//! Pure region cropping logic.
//!
//! Takes a frame and a point, returns pixels. No I/O happens here;
//! persisting the crop is the caller's job.

use image::{Rgba, RgbaImage};

use crate::models::{BoundingBox, Frame};

/// Outer radius of the click marker drawn on persisted crops.
pub const MARKER_RADIUS: i64 = 5;
const MARKER_STROKE: i64 = 2;
pub const MARKER_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Result of [`extract`]. A degenerate box is a normal outcome meaning
/// "nothing to look at", not a failure.
#[derive(Debug, Clone)]
pub enum Extraction {
    Region(RegionCrop),
    Empty(BoundingBox),
}

#[derive(Debug, Clone)]
pub struct RegionCrop {
    pub image: RgbaImage,
    pub bounds: BoundingBox,
    /// The requested point in crop-local coordinates. May be outside the crop
    /// when the point itself was outside the frame.
    pub marker: (i64, i64),
}

impl RegionCrop {
    /// Copy of the crop with a ring drawn at the click point. The source
    /// pixels, which go to recognition, are left untouched.
    pub fn annotated(&self) -> RgbaImage {
        let mut marked = self.image.clone();
        draw_ring(&mut marked, self.marker, MARKER_RADIUS, MARKER_STROKE, MARKER_COLOR);
        marked
    }
}

/// Box of half-size `radius` around `(x, y)`, clamped into `[0, width) × [0, height)`.
///
/// Always satisfies `left <= right <= width` and `top <= bottom <= height`,
/// including for points entirely outside the frame.
pub fn compute_box(width: u32, height: u32, x: i64, y: i64, radius: u32) -> BoundingBox {
    let radius = i64::from(radius);
    let (w, h) = (i64::from(width), i64::from(height));

    let left = (x - radius).clamp(0, w);
    let top = (y - radius).clamp(0, h);
    let right = (x + radius).clamp(0, w).max(left);
    let bottom = (y + radius).clamp(0, h).max(top);

    // Each value was clamped into [0, u32::MAX].
    BoundingBox {
        left: left as u32,
        top: top as u32,
        right: right as u32,
        bottom: bottom as u32,
    }
}

/// Crops `frame` around the frame-local point `(x, y)`.
pub fn extract(frame: &Frame, x: i64, y: i64, radius: u32) -> Extraction {
    let bounds = compute_box(frame.width(), frame.height(), x, y, radius);
    if bounds.is_empty() {
        return Extraction::Empty(bounds);
    }

    let image = image::imageops::crop_imm(
        frame.image(),
        bounds.left,
        bounds.top,
        bounds.width(),
        bounds.height(),
    )
    .to_image();

    Extraction::Region(RegionCrop {
        image,
        bounds,
        marker: (x - i64::from(bounds.left), y - i64::from(bounds.top)),
    })
}

fn draw_ring(image: &mut RgbaImage, center: (i64, i64), radius: i64, stroke: i64, color: Rgba<u8>) {
    let outer = radius * radius;
    let inner = (radius - stroke).max(0).pow(2);
    let (width, height) = (i64::from(image.width()), i64::from(image.height()));

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let d2 = dx * dx + dy * dy;
            if d2 > outer || d2 <= inner {
                continue;
            }
            let (px, py) = (center.0 + dx, center.1 + dy);
            if (0..width).contains(&px) && (0..height).contains(&py) {
                image.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

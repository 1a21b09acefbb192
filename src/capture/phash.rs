use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig, ImageHash};

use crate::models::Frame;

/// Perceptual hash of a frame, used to detect an unchanged desktop.
pub fn frame_hash(frame: &Frame) -> ImageHash {
    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::DoubleGradient)
        .hash_size(8, 8)
        .to_hasher();

    let image = DynamicImage::ImageRgba8(frame.image().clone());
    hasher.hash_image(&image)
}

pub fn frame_distance(lhs: &ImageHash, rhs: &ImageHash) -> u32 {
    lhs.dist(rhs)
}

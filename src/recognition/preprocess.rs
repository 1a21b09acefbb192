//! Gray-scale + global Otsu binarization applied before recognition.
//! Raw desktop pixels (anti-aliasing, colored UI chrome) recognize poorly.

use image::{GrayImage, Luma, RgbaImage};

/// Gray-scale conversion followed by binarization at the Otsu threshold.
pub fn preprocess(image: &RgbaImage) -> GrayImage {
    let gray = image::imageops::grayscale(image);
    let threshold = otsu_threshold(&gray);
    binarize(&gray, threshold)
}

/// Threshold maximizing between-class variance of the luma histogram.
/// Pixels `<= threshold` form the background class.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[usize::from(pixel.0[0])] += 1;
    }

    let total = u64::from(gray.width()) * u64::from(gray.height());
    if total == 0 {
        return 0;
    }

    let sum_all: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut weight_bg = 0u64;
    let mut sum_bg = 0.0;
    let mut best_level = 0u8;
    let mut best_variance = 0.0;

    for (level, &count) in histogram.iter().enumerate() {
        weight_bg += count;
        if weight_bg == 0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0 {
            break;
        }

        sum_bg += level as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg as f64;
        let mean_fg = (sum_all - sum_bg) / weight_fg as f64;
        let variance = weight_bg as f64 * weight_fg as f64 * (mean_bg - mean_fg).powi(2);

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Pixels strictly above `threshold` become white, the rest black.
pub fn binarize(gray: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        if gray.get_pixel(x, y).0[0] > threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

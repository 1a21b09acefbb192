//! Text recognition behind a narrow interface.
//!
//! The core only ever calls [`recognize_or_empty`]; engine failures never
//! travel further than that function.

mod preprocess;
mod tesseract;

pub use preprocess::{binarize, otsu_threshold, preprocess};
pub use tesseract::TesseractCli;

use image::RgbaImage;
use std::time::Instant;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("Image has zero width or height")]
    EmptyImage,

    #[error("Image encoding failed: {0}")]
    Encoding(String),

    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Recognition engine failed ({status}): {stderr}")]
    EngineFailed { status: String, stderr: String },
}

/// Converts an image into text.
///
/// Implementations own their preprocessing and engine parameters and must be
/// safe to call from several threads at once.
pub trait RecognitionAdapter: Send + Sync {
    fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError>;
}

/// Runs `adapter` and folds any failure into an empty string.
pub fn recognize_or_empty(
    adapter: &dyn RecognitionAdapter,
    image: &RgbaImage,
    context: &str,
) -> String {
    let start = Instant::now();
    match adapter.recognize(image) {
        Ok(text) => {
            log_debug!(
                "[OCR] {context}: {} chars from {}x{} in {}ms",
                text.len(),
                image.width(),
                image.height(),
                start.elapsed().as_millis()
            );
            text
        }
        Err(err) => {
            log_warn!("[OCR] {context}: recognition failed, treating as no text: {err}");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl RecognitionAdapter for Failing {
        fn recognize(&self, _image: &RgbaImage) -> Result<String, RecognitionError> {
            Err(RecognitionError::EngineUnavailable("not installed".into()))
        }
    }

    struct Echo;

    impl RecognitionAdapter for Echo {
        fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
            Ok(format!("{}x{}", image.width(), image.height()))
        }
    }

    #[test]
    fn failures_become_empty_text() {
        assert_eq!(recognize_or_empty(&Failing, &RgbaImage::new(3, 3), "test"), "");
    }

    #[test]
    fn success_passes_text_through() {
        assert_eq!(recognize_or_empty(&Echo, &RgbaImage::new(3, 2), "test"), "3x2");
    }
}

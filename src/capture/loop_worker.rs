use image_hasher::ImageHash;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Instant;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{frame_distance, frame_hash, DisplaySource, FrameStore};
use crate::{
    recognition::{recognize_or_empty, RecognitionAdapter},
    settings::RunConfig,
    storage::{persist_or_log, ArtifactMeta, ImageCategory, PersistenceSink},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// What one pass of the capture loop did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The display source failed; nothing was stored.
    CaptureFailed,
    /// Frame stored. `text_chars` is 0 when recognition failed or found nothing.
    Captured { text_chars: usize },
    /// Frame stored, recognition skipped because the desktop hadn't changed.
    Unchanged,
}

#[derive(Debug, Default)]
pub struct CaptureStats {
    frames: AtomicU64,
    failures: AtomicU64,
}

impl CaptureStats {
    pub fn frames_captured(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    pub fn capture_failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// Everything one capture iteration needs. Blocking; driven by [`capture_loop`].
pub struct CapturePipeline {
    config: Arc<RunConfig>,
    display: Arc<dyn DisplaySource>,
    recognizer: Arc<dyn RecognitionAdapter>,
    sink: Arc<dyn PersistenceSink>,
    frames: Arc<FrameStore>,
    stats: CaptureStats,
    last_ocr_hash: Mutex<Option<ImageHash>>,
}

impl CapturePipeline {
    pub fn new(
        config: Arc<RunConfig>,
        display: Arc<dyn DisplaySource>,
        recognizer: Arc<dyn RecognitionAdapter>,
        sink: Arc<dyn PersistenceSink>,
        frames: Arc<FrameStore>,
    ) -> Self {
        Self {
            config,
            display,
            recognizer,
            sink,
            frames,
            stats: CaptureStats::default(),
            last_ocr_hash: Mutex::new(None),
        }
    }

    pub fn stats(&self) -> &CaptureStats {
        &self.stats
    }

    pub fn interval(&self) -> Duration {
        self.config.capture_interval()
    }

    /// Capture, store, persist, recognize, persist text.
    ///
    /// Every failure is logged and absorbed; the loop keeps going.
    pub fn run_iteration(&self) -> IterationOutcome {
        let capture_start = Instant::now();

        let frame = match self.display.capture_full_screen() {
            Ok(frame) => frame,
            Err(err) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                log_warn!("screen capture failed, skipping iteration: {err}");
                return IterationOutcome::CaptureFailed;
            }
        };
        let capture_ms = capture_start.elapsed().as_millis();

        self.frames.put(frame.clone());
        self.stats.frames.fetch_add(1, Ordering::Relaxed);

        let meta = ArtifactMeta::full_frame(frame.captured_at());

        if self.config.save_full_screenshots {
            if let Some(path) = persist_or_log(
                self.sink.save_image(frame.image(), ImageCategory::Screenshot, &meta),
                "screenshot",
            ) {
                log_info!("Screenshot saved: {}", path.display());
            }
        }

        if self.config.skip_unchanged_frames && self.is_unchanged(&frame) {
            log_debug!("frame unchanged since last recognition, skipping OCR");
            return IterationOutcome::Unchanged;
        }

        let ocr_start = Instant::now();
        let text = recognize_or_empty(self.recognizer.as_ref(), frame.image(), "full frame");
        let ocr_ms = ocr_start.elapsed().as_millis();

        if self.config.save_ocr_text && !text.is_empty() {
            persist_or_log(self.sink.save_text(&text, &meta), "full-frame text");
        }

        log_info!(
            "Capture completed in {}ms ({}x{}, capture: {}ms, ocr: {}ms, {} chars)",
            capture_start.elapsed().as_millis(),
            frame.width(),
            frame.height(),
            capture_ms,
            ocr_ms,
            text.len()
        );

        IterationOutcome::Captured {
            text_chars: text.len(),
        }
    }

    fn is_unchanged(&self, frame: &crate::models::Frame) -> bool {
        let hash = frame_hash(frame);
        let mut last = match self.last_ocr_hash.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let unchanged = last
            .as_ref()
            .map(|prev| frame_distance(prev, &hash) < self.config.unchanged_frame_threshold)
            .unwrap_or(false);
        if !unchanged {
            *last = Some(hash);
        }
        unchanged
    }
}

/// Runs iterations until `cancel_token` fires.
///
/// The token is checked before every capture and raced against the sleep,
/// so a stop is observed within one interval and no frame is captured after it.
pub async fn capture_loop(pipeline: Arc<CapturePipeline>, cancel_token: CancellationToken) {
    let interval = pipeline.interval();
    log_info!("capture loop started ({}s interval)", interval.as_secs_f64());

    loop {
        if cancel_token.is_cancelled() {
            break;
        }

        let worker = Arc::clone(&pipeline);
        match tokio::task::spawn_blocking(move || worker.run_iteration()).await {
            Ok(outcome) => log_debug!("capture iteration finished: {outcome:?}"),
            Err(err) => log_error!("capture iteration worker join failed: {err}"),
        }

        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    log_info!("capture loop shutting down");
}

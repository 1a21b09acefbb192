use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedReceiver;

use super::{ClickLog, ClickObserver, InputEvent, PointerAction};
use crate::{
    capture::FrameStore,
    extraction::{extract, Extraction},
    models::{BoundingBox, ClickEvent, ExtractionResult},
    recognition::{recognize_or_empty, RecognitionAdapter},
    settings::RunConfig,
    storage::{persist_or_log, ArtifactMeta, ClickContext, ImageCategory, PersistenceSink},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug)]
pub enum ClickOutcome {
    /// Release events are filtered out and never logged.
    Ignored,
    /// Logged, but no frame has been captured yet.
    NoFrame,
    /// Logged; the clamped box had zero area so recognition was skipped.
    EmptyRegion(BoundingBox),
    Extracted(ExtractionResult),
}

/// Turns press events into logged clicks and region recognitions.
pub struct ClickHandler {
    config: Arc<RunConfig>,
    frames: Arc<FrameStore>,
    clicks: Arc<ClickLog>,
    recognizer: Arc<dyn RecognitionAdapter>,
    sink: Arc<dyn PersistenceSink>,
    observer: Arc<dyn ClickObserver>,
}

impl ClickHandler {
    pub fn new(
        config: Arc<RunConfig>,
        frames: Arc<FrameStore>,
        clicks: Arc<ClickLog>,
        recognizer: Arc<dyn RecognitionAdapter>,
        sink: Arc<dyn PersistenceSink>,
        observer: Arc<dyn ClickObserver>,
    ) -> Self {
        Self {
            config,
            frames,
            clicks,
            recognizer,
            sink,
            observer,
        }
    }

    /// Appends a press to the click log and returns it. Releases are dropped.
    ///
    /// Cheap and non-blocking, so it runs on the input source's thread as the
    /// event arrives; the log never waits on recognition.
    pub fn record(&self, event: InputEvent) -> Option<ClickEvent> {
        if event.action == PointerAction::Release {
            return None;
        }

        let click = ClickEvent {
            x: event.x,
            y: event.y,
            button: event.button,
            timestamp: event.at,
        };
        let count = self.clicks.append(click.clone());
        log_info!(
            "Mouse clicked at ({}, {}) with {} (#{count})",
            click.x,
            click.y,
            click.button
        );
        Some(click)
    }

    /// [`Self::record`] followed by [`Self::process`]. Blocking.
    pub fn handle_event(&self, event: InputEvent) -> ClickOutcome {
        match self.record(event) {
            Some(click) => self.process(&click),
            None => ClickOutcome::Ignored,
        }
    }

    /// Extracts, recognizes, persists and reports the region around a
    /// recorded click, using the latest frame. Blocking.
    pub fn process(&self, click: &ClickEvent) -> ClickOutcome {
        let Some(frame) = self.frames.get() else {
            log_warn!("No screenshot available yet for region extraction");
            self.observer.on_click(click, "");
            return ClickOutcome::NoFrame;
        };

        let start = Instant::now();
        let radius = self.config.extraction_radius;
        let (local_x, local_y) = frame.to_local(click.x, click.y);

        let crop = match extract(&frame, local_x, local_y, radius) {
            Extraction::Region(crop) => crop,
            Extraction::Empty(bounds) => {
                log_debug!(
                    "click ({}, {}) maps to an empty region {:?}",
                    click.x,
                    click.y,
                    bounds
                );
                self.observer.on_click(click, "");
                return ClickOutcome::EmptyRegion(bounds);
            }
        };

        let text = recognize_or_empty(self.recognizer.as_ref(), &crop.image, "click region");
        let result = ExtractionResult {
            annotated: crop.annotated(),
            image: crop.image,
            text,
            bounds: crop.bounds,
            timestamp: click.timestamp,
        };

        self.persist(click, &result);
        self.observer.on_click(click, &result.text);

        log_info!(
            "Click region {:?} processed in {}ms ({} chars)",
            result.bounds,
            start.elapsed().as_millis(),
            result.text.len()
        );
        ClickOutcome::Extracted(result)
    }

    fn persist(&self, click: &ClickEvent, result: &ExtractionResult) {
        let meta = ArtifactMeta::region(
            result.timestamp,
            ClickContext {
                x: click.x,
                y: click.y,
                radius: self.config.extraction_radius,
                bounds: result.bounds,
            },
        );

        if self.config.save_extracted_regions {
            if let Some(path) = persist_or_log(
                self.sink.save_image(&result.annotated, ImageCategory::Region, &meta),
                "extracted region",
            ) {
                log_info!("Extracted region saved: {}", path.display());
            }
        }

        if self.config.save_ocr_text && !result.text.is_empty() {
            if let Some(path) =
                persist_or_log(self.sink.save_text(&result.text, &meta), "region text")
            {
                log_info!("OCR text saved: {}", path.display());
            }
        }
    }
}

/// Processes recorded clicks one at a time until the sender side closes.
///
/// Rapid clicks queue up behind a slow recognition instead of being dropped.
pub async fn click_worker(handler: Arc<ClickHandler>, mut clicks: UnboundedReceiver<ClickEvent>) {
    while let Some(click) = clicks.recv().await {
        let handler = Arc::clone(&handler);
        match tokio::task::spawn_blocking(move || handler.process(&click)).await {
            Ok(outcome) => log_debug!("click processed: {}", outcome_label(&outcome)),
            Err(err) => log_error!("click handler worker join failed: {err}"),
        }
    }
    log_info!("click worker drained and stopped");
}

fn outcome_label(outcome: &ClickOutcome) -> &'static str {
    match outcome {
        ClickOutcome::Ignored => "ignored",
        ClickOutcome::NoFrame => "no frame",
        ClickOutcome::EmptyRegion(_) => "empty region",
        ClickOutcome::Extracted(_) => "extracted",
    }
}

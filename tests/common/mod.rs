#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use image::{Rgba, RgbaImage};
use screenshot_ocr_lib::{
    capture::{CaptureError, DisplaySource},
    input::{ClickObserver, InputCallback, InputError, InputEvent, InputSource},
    models::{ClickEvent, Frame, MouseButton},
    recognition::{RecognitionAdapter, RecognitionError},
    settings::RunConfig,
    storage::{ArtifactMeta, ImageCategory, PersistenceError, PersistenceSink},
    supervisor::{Collaborators, Supervisor, SHUTDOWN_TIMEOUT},
};

pub struct SolidDisplay {
    pub width: u32,
    pub height: u32,
    pub calls: AtomicUsize,
    pub captured_at: Mutex<Vec<Instant>>,
}

impl SolidDisplay {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            calls: AtomicUsize::new(0),
            captured_at: Mutex::new(Vec::new()),
        }
    }

    /// Captures that began at or after `instant`.
    pub fn captures_since(&self, instant: Instant) -> usize {
        self.captured_at
            .lock()
            .unwrap()
            .iter()
            .filter(|at| **at >= instant)
            .count()
    }
}

impl DisplaySource for SolidDisplay {
    fn capture_full_screen(&self) -> Result<Frame, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.captured_at.lock().unwrap().push(Instant::now());
        let image = RgbaImage::from_pixel(self.width, self.height, Rgba([200, 200, 200, 255]));
        Ok(Frame::new(image, Utc::now()))
    }
}

/// Returns `text` for every image, or fails when `text` is `None`.
pub struct ScriptedRecognizer {
    pub text: Option<&'static str>,
    pub calls: AtomicUsize,
    /// Extra latency for click crops (anything narrower than a full frame).
    pub region_delay: Duration,
}

impl ScriptedRecognizer {
    pub fn ok(text: &'static str) -> Self {
        Self {
            text: Some(text),
            calls: AtomicUsize::new(0),
            region_delay: Duration::ZERO,
        }
    }

    pub fn failing() -> Self {
        Self {
            text: None,
            ..Self::ok("")
        }
    }

    pub fn slow_regions(text: &'static str, delay: Duration) -> Self {
        Self {
            region_delay: delay,
            ..Self::ok(text)
        }
    }
}

impl RecognitionAdapter for ScriptedRecognizer {
    fn recognize(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.width() < FRAME_WIDTH {
            std::thread::sleep(self.region_delay);
        }
        match self.text {
            Some(text) => Ok(text.to_string()),
            None => Err(RecognitionError::EngineUnavailable("not installed".into())),
        }
    }
}

#[derive(Default)]
pub struct MemorySink {
    pub images: Mutex<Vec<(ImageCategory, ArtifactMeta)>>,
    pub texts: Mutex<Vec<String>>,
    pub event_logs: Mutex<Vec<Vec<ClickEvent>>>,
    pub flushed_at: Mutex<Option<Instant>>,
}

impl MemorySink {
    pub fn count(&self, category: ImageCategory) -> usize {
        self.images
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| *c == category)
            .count()
    }
}

impl PersistenceSink for MemorySink {
    fn save_image(
        &self,
        _image: &RgbaImage,
        category: ImageCategory,
        meta: &ArtifactMeta,
    ) -> Result<PathBuf, PersistenceError> {
        self.images.lock().unwrap().push((category, meta.clone()));
        Ok(PathBuf::from(category.as_str()))
    }

    fn save_text(&self, text: &str, _meta: &ArtifactMeta) -> Result<PathBuf, PersistenceError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(PathBuf::from("text"))
    }

    fn save_event_log(&self, entries: &[ClickEvent]) -> Result<PathBuf, PersistenceError> {
        self.event_logs.lock().unwrap().push(entries.to_vec());
        *self.flushed_at.lock().unwrap() = Some(Instant::now());
        Ok(PathBuf::from("click_summary.json"))
    }
}

/// Input source driven by the test.
#[derive(Default)]
pub struct ManualInput {
    slot: Mutex<Option<InputCallback>>,
    pub unsubscribed_at: Mutex<Option<Instant>>,
}

impl ManualInput {
    /// Press then release at `(x, y)`. Returns false when nobody is subscribed.
    pub fn click(&self, x: i32, y: i32) -> bool {
        let slot = self.slot.lock().unwrap();
        match slot.as_ref() {
            Some(callback) => {
                callback(InputEvent::press(x, y, MouseButton::Left));
                callback(InputEvent::release(x, y, MouseButton::Left));
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.slot.lock().unwrap().is_some()
    }
}

impl InputSource for ManualInput {
    fn subscribe(&self, callback: InputCallback) -> Result<(), InputError> {
        let mut slot = self.slot.lock().unwrap();
        if slot.is_some() {
            return Err(InputError::AlreadySubscribed);
        }
        *slot = Some(callback);
        Ok(())
    }

    fn unsubscribe(&self) {
        self.slot.lock().unwrap().take();
        self.unsubscribed_at.lock().unwrap().get_or_insert_with(Instant::now);
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    pub texts: Mutex<Vec<String>>,
}

impl ClickObserver for RecordingObserver {
    fn on_click(&self, _click: &ClickEvent, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }
}

pub struct Harness {
    pub supervisor: Supervisor,
    pub display: Arc<SolidDisplay>,
    pub recognizer: Arc<ScriptedRecognizer>,
    pub sink: Arc<MemorySink>,
    pub input: Arc<ManualInput>,
    pub observer: Arc<RecordingObserver>,
}

pub fn config(interval_secs: f64) -> RunConfig {
    RunConfig {
        capture_interval: interval_secs,
        ..RunConfig::default()
    }
}

pub const FRAME_WIDTH: u32 = 800;
pub const FRAME_HEIGHT: u32 = 600;

pub fn harness(config: RunConfig, recognizer: ScriptedRecognizer) -> Harness {
    harness_with_timeout(config, recognizer, SHUTDOWN_TIMEOUT)
}

pub fn harness_with_timeout(
    config: RunConfig,
    recognizer: ScriptedRecognizer,
    shutdown_timeout: Duration,
) -> Harness {
    let display = Arc::new(SolidDisplay::new(FRAME_WIDTH, FRAME_HEIGHT));
    let recognizer = Arc::new(recognizer);
    let sink = Arc::new(MemorySink::default());
    let input = Arc::new(ManualInput::default());
    let observer = Arc::new(RecordingObserver::default());

    let supervisor = Supervisor::new(
        config,
        Collaborators {
            display: display.clone(),
            recognizer: recognizer.clone(),
            sink: sink.clone(),
            input: input.clone(),
            observer: observer.clone(),
        },
    )
    .with_shutdown_timeout(shutdown_timeout);

    Harness {
        supervisor,
        display,
        recognizer,
        sink,
        input,
        observer,
    }
}

/// Polls `condition` every 10ms until it holds or `timeout` passes.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

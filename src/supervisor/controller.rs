use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use log::{error, info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use super::{StatusReport, SupervisorStatus};
use crate::{
    capture::{CaptureController, CapturePipeline, DisplaySource, FrameStore},
    input::{click_worker, ClickHandler, ClickLog, ClickObserver, InputSource},
    models::ClickEvent,
    recognition::RecognitionAdapter,
    settings::RunConfig,
    storage::{persist_or_log, PersistenceSink},
};

/// Default bounded wait for the click worker and the capture loop on shutdown.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborators the supervisor wires together.
pub struct Collaborators {
    pub display: Arc<dyn DisplaySource>,
    pub recognizer: Arc<dyn RecognitionAdapter>,
    pub sink: Arc<dyn PersistenceSink>,
    pub input: Arc<dyn InputSource>,
    pub observer: Arc<dyn ClickObserver>,
}

struct Lifecycle {
    status: SupervisorStatus,
    capture: CaptureController,
    click_worker: Option<JoinHandle<()>>,
}

/// Composes the capture loop and the click path and owns their ordering.
///
/// Holds no business logic; each component guards its own state.
pub struct Supervisor {
    config: Arc<RunConfig>,
    frames: Arc<FrameStore>,
    clicks: Arc<ClickLog>,
    pipeline: Arc<CapturePipeline>,
    handler: Arc<ClickHandler>,
    sink: Arc<dyn PersistenceSink>,
    input: Arc<dyn InputSource>,
    shutdown_timeout: Duration,
    lifecycle: Mutex<Lifecycle>,
}

impl Supervisor {
    pub fn new(config: RunConfig, collaborators: Collaborators) -> Self {
        let config = Arc::new(config);
        let frames = Arc::new(FrameStore::new());
        let clicks = Arc::new(ClickLog::new());

        let pipeline = Arc::new(CapturePipeline::new(
            Arc::clone(&config),
            collaborators.display,
            Arc::clone(&collaborators.recognizer),
            Arc::clone(&collaborators.sink),
            Arc::clone(&frames),
        ));
        let handler = Arc::new(ClickHandler::new(
            Arc::clone(&config),
            Arc::clone(&frames),
            Arc::clone(&clicks),
            collaborators.recognizer,
            Arc::clone(&collaborators.sink),
            collaborators.observer,
        ));

        Self {
            lifecycle: Mutex::new(Lifecycle {
                status: SupervisorStatus::Idle,
                capture: CaptureController::new(Arc::clone(&pipeline)),
                click_worker: None,
            }),
            config,
            frames,
            clicks,
            pipeline,
            handler,
            sink: collaborators.sink,
            input: collaborators.input,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }

    /// Overrides the per-stage wait used by [`Self::stop`].
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn clicks(&self) -> &Arc<ClickLog> {
        &self.clicks
    }

    pub fn frames(&self) -> &Arc<FrameStore> {
        &self.frames
    }

    pub async fn status(&self) -> SupervisorStatus {
        self.lifecycle.lock().await.status
    }

    /// Starts capture first so a frame is likely stored before the first
    /// click, then subscribes to input. A run cannot be restarted.
    pub async fn start(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.status {
            SupervisorStatus::Running => bail!("supervisor already running"),
            SupervisorStatus::Stopped => bail!("supervisor was stopped and cannot be restarted"),
            SupervisorStatus::Idle => {}
        }

        lifecycle.capture.start()?;

        // Presses are logged on delivery; only extraction waits in the queue.
        let (tx, rx) = mpsc::unbounded_channel::<ClickEvent>();
        let handler = Arc::clone(&self.handler);
        let subscribed = self.input.subscribe(Box::new(move |event| {
            if let Some(click) = handler.record(event) {
                // Closed only after unsubscribe, so a failed send has nowhere to go.
                let _ = tx.send(click);
            }
        }));
        if let Err(err) = subscribed {
            error!("Failed to subscribe to input events: {err}");
            lifecycle.capture.stop(self.shutdown_timeout).await;
            lifecycle.status = SupervisorStatus::Stopped;
            return Err(err.into());
        }

        lifecycle.click_worker = Some(tokio::spawn(click_worker(Arc::clone(&self.handler), rx)));
        lifecycle.status = SupervisorStatus::Running;

        info!(
            "Supervisor started (interval {}s, radius {}px)",
            self.config.capture_interval,
            self.config.extraction_radius
        );
        Ok(())
    }

    /// Unsubscribes input and cancels capture, then waits (bounded) for queued
    /// clicks and the capture loop before flushing the click log. Calling it
    /// again is a no-op.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        match lifecycle.status {
            SupervisorStatus::Stopped => return,
            SupervisorStatus::Idle => {
                lifecycle.status = SupervisorStatus::Stopped;
                return;
            }
            SupervisorStatus::Running => {}
        }

        // Dropping the callback closes the channel; queued clicks still run.
        self.input.unsubscribe();
        lifecycle.capture.signal();

        if let Some(worker) = lifecycle.click_worker.take() {
            match tokio::time::timeout(self.shutdown_timeout, worker).await {
                Ok(Ok(())) => info!("click worker stopped"),
                Ok(Err(err)) => warn!("click worker task failed to join: {err}"),
                Err(_) => warn!(
                    "click worker did not drain within {}s; pending extractions are abandoned",
                    self.shutdown_timeout.as_secs_f64()
                ),
            }
        }

        lifecycle.capture.join(self.shutdown_timeout).await;
        self.flush_click_log();

        lifecycle.status = SupervisorStatus::Stopped;
        info!("Supervisor stopped after {} clicks", self.clicks.len());
    }

    fn flush_click_log(&self) {
        let entries = self.clicks.snapshot();
        if entries.is_empty() {
            return;
        }
        if let Some(path) = persist_or_log(self.sink.save_event_log(&entries), "click log") {
            info!("Click summary saved: {}", path.display());
        }
    }

    pub async fn status_report(&self) -> StatusReport {
        let running = self.status().await == SupervisorStatus::Running;
        let frame = self.frames.get();
        let stats = self.pipeline.stats();

        StatusReport {
            running,
            capture_interval_secs: self.config.capture_interval,
            extraction_radius: self.config.extraction_radius,
            output_dir: self.config.output_dir.clone(),
            click_count: self.clicks.len(),
            last_frame_available: frame.is_some(),
            last_frame_size: frame.map(|f| (f.width(), f.height())),
            frames_captured: stats.frames_captured(),
            capture_failures: stats.capture_failures(),
        }
    }
}

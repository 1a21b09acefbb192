use anyhow::{bail, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::loop_worker::{capture_loop, CapturePipeline};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CaptureStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Owns the capture loop task. `Idle → Running → Stopped`, no restarts.
pub struct CaptureController {
    pipeline: Arc<CapturePipeline>,
    status: CaptureStatus,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl CaptureController {
    pub fn new(pipeline: Arc<CapturePipeline>) -> Self {
        Self {
            pipeline,
            status: CaptureStatus::Idle,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn status(&self) -> CaptureStatus {
        self.status
    }

    pub fn start(&mut self) -> Result<()> {
        match self.status {
            CaptureStatus::Running => bail!("capture loop already running"),
            CaptureStatus::Stopped => bail!("capture loop was stopped and cannot be restarted"),
            CaptureStatus::Idle => {}
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            Arc::clone(&self.pipeline),
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.status = CaptureStatus::Running;
        Ok(())
    }

    /// Cancels the loop without waiting. A sleep in progress ends at once and
    /// no new capture begins; an iteration already running finishes.
    pub fn signal(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }

    /// Waits up to `timeout` for a signalled loop to exit. Overrunning the
    /// timeout is logged, not an error. Leaves the controller `Stopped`.
    pub async fn join(&mut self, timeout: Duration) {
        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!("capture loop stopped"),
                Ok(Err(err)) => warn!("capture loop task failed to join: {err}"),
                Err(_) => warn!(
                    "capture loop did not stop within {}s; leaving it to finish in the background",
                    timeout.as_secs_f64()
                ),
            }
        }

        self.status = CaptureStatus::Stopped;
    }

    /// [`Self::signal`] then [`Self::join`]. Idempotent.
    pub async fn stop(&mut self, timeout: Duration) {
        self.signal();
        self.join(timeout).await;
    }
}

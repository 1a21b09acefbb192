//! Screen capture: display source, latest-frame handoff and the capture loop.

mod controller;
mod frame_store;
mod loop_worker;
mod phash;
mod xcap_backend;

pub use controller::{CaptureController, CaptureStatus};
pub use frame_store::FrameStore;
pub use loop_worker::{capture_loop, CapturePipeline, CaptureStats, IterationOutcome};
pub use phash::{frame_distance, frame_hash};
pub use xcap_backend::XcapDisplay;

use crate::models::Frame;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Failed to enumerate monitors: {0}")]
    MonitorEnumeration(String),

    #[error("No monitor available")]
    NoMonitor,

    #[error("Screen capture failed: {0}")]
    CaptureFailed(String),

    #[error("Captured an empty image - possible permission issue or no display")]
    EmptyImage,
}

/// Source of full-desktop frames.
pub trait DisplaySource: Send + Sync {
    fn capture_full_screen(&self) -> Result<Frame, CaptureError>;
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SupervisorStatus {
    #[default]
    Idle,
    Running,
    Stopped,
}

/// Point-in-time view of a run, as served by `status` and written to
/// `status.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub running: bool,
    pub capture_interval_secs: f64,
    pub extraction_radius: u32,
    pub output_dir: PathBuf,
    pub click_count: usize,
    pub last_frame_available: bool,
    /// `(width, height)` of the latest frame.
    pub last_frame_size: Option<(u32, u32)>,
    pub frames_captured: u64,
    pub capture_failures: u64,
}

//! Full-screen capture using the `xcap` crate.
//!
//! This is the only file that talks to the OS display server.

use chrono::Utc;
use xcap::Monitor;

use super::{CaptureError, DisplaySource};
use crate::models::Frame;

/// Captures the primary monitor, falling back to the first one listed.
#[derive(Debug, Default, Clone, Copy)]
pub struct XcapDisplay;

impl XcapDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl DisplaySource for XcapDisplay {
    fn capture_full_screen(&self) -> Result<Frame, CaptureError> {
        let monitors =
            Monitor::all().map_err(|e| CaptureError::MonitorEnumeration(e.to_string()))?;

        let mut primary = None;
        let mut first = None;
        for monitor in monitors {
            if monitor.is_primary().unwrap_or(false) {
                primary = Some(monitor);
                break;
            }
            if first.is_none() {
                first = Some(monitor);
            }
        }
        let monitor = primary.or(first).ok_or(CaptureError::NoMonitor)?;

        let image = monitor
            .capture_image()
            .map_err(|e| CaptureError::CaptureFailed(e.to_string()))?;
        if image.width() == 0 || image.height() == 0 {
            return Err(CaptureError::EmptyImage);
        }

        let origin = (monitor.x().unwrap_or(0), monitor.y().unwrap_or(0));
        Ok(Frame::new(image, Utc::now()).with_origin(origin.0, origin.1))
    }
}

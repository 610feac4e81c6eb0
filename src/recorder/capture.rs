use image::RgbaImage;
use xcap::Monitor;

use super::backend::FrameSource;
use super::errors::CaptureError;
use super::types::{CaptureRegion, Frame};

/// Returns the primary monitor, or the first one when none is flagged primary.
fn primary_monitor() -> Result<Monitor, CaptureError> {
    let monitors = Monitor::all().map_err(|e| CaptureError::MonitorError(e.to_string()))?;

    let index = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);

    monitors
        .into_iter()
        .nth(index)
        .ok_or_else(|| CaptureError::MonitorNotFound("No monitors found".to_string()))
}

/// Full size of the primary monitor.
pub fn primary_region() -> Result<CaptureRegion, CaptureError> {
    let monitor = primary_monitor()?;
    let (width, height) = (monitor.width(), monitor.height());

    CaptureRegion::new(width, height).map_err(|_| {
        CaptureError::MonitorNotFound(format!(
            "Monitor {} reports an empty size {}x{}",
            monitor.name(),
            width,
            height
        ))
    })
}

/// Single capture of the primary monitor at its native resolution.
pub fn grab_primary() -> Result<RgbaImage, CaptureError> {
    primary_monitor()?
        .capture_image()
        .map_err(|e| CaptureError::GrabFailed(e.to_string()))
}

/// Frame source backed by the OS screen-grab primitive.
pub struct MonitorSource {
    monitor: Monitor,
}

impl MonitorSource {
    pub fn open() -> Result<Self, CaptureError> {
        let monitor = primary_monitor()?;
        tracing::info!(target: "recorder",
            "[CAPTURE] Using monitor {:?} ({}x{})", monitor.name(), monitor.width(), monitor.height());
        Ok(Self { monitor })
    }
}

impl FrameSource for MonitorSource {
    fn grab(&mut self) -> Result<Frame, CaptureError> {
        self.monitor
            .capture_image()
            .map(Frame::new)
            .map_err(|e| CaptureError::GrabFailed(e.to_string()))
    }
}

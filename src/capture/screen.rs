//! Monitor enumeration and capture through xcap.

use std::sync::Arc;

use log::{debug, warn};
use xcap::Monitor;

use super::backend::{scale_to_thumbnail, CaptureSource, SourceKind, ThumbnailSize};
use crate::display::Display;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::LogicalRect;

/// Raw monitor geometry as xcap reports it
#[derive(Debug, Clone)]
pub struct MonitorInfo {
    pub id: u32,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub is_primary: bool,
    pub scale_factor: f32,
}

impl MonitorInfo {
    fn from_xcap(monitor: &Monitor) -> Result<Self, String> {
        Ok(Self {
            id: monitor.id().map_err(|e| e.to_string())?,
            name: monitor.name().unwrap_or_default(),
            x: monitor.x().map_err(|e| e.to_string())?,
            y: monitor.y().map_err(|e| e.to_string())?,
            width: monitor.width().map_err(|e| e.to_string())?,
            height: monitor.height().map_err(|e| e.to_string())?,
            is_primary: monitor.is_primary().unwrap_or(false),
            scale_factor: monitor.scale_factor().unwrap_or(1.0),
        })
    }

    /// Geometry in logical pixels.
    ///
    /// xcap reports points on macOS and device pixels elsewhere.
    pub fn to_display(&self) -> Display {
        let scale = if self.scale_factor > 0.0 {
            self.scale_factor as f64
        } else {
            1.0
        };

        #[cfg(target_os = "macos")]
        let divisor = 1.0;
        #[cfg(not(target_os = "macos"))]
        let divisor = scale;

        Display::new(
            self.id,
            self.name.clone(),
            LogicalRect::new(
                self.x as f64 / divisor,
                self.y as f64 / divisor,
                self.width as f64 / divisor,
                self.height as f64 / divisor,
            ),
            scale,
            self.is_primary,
        )
    }
}

fn all_monitors() -> CaptureResult<Vec<Monitor>> {
    Monitor::all().map_err(|e| CaptureError::CaptureFailed(format!("Failed to get monitors: {}", e)))
}

/// Current display topology
pub fn list_displays() -> CaptureResult<Vec<Display>> {
    let mut displays = Vec::new();
    for monitor in all_monitors()? {
        match MonitorInfo::from_xcap(&monitor) {
            Ok(info) => displays.push(info.to_display()),
            Err(e) => warn!("Failed to get info for a monitor: {}", e),
        }
    }
    Ok(displays)
}

/// One source per monitor, with a frame scaled to `thumbnail_size`.
pub fn screen_sources(thumbnail_size: Option<ThumbnailSize>) -> CaptureResult<Vec<CaptureSource>> {
    let mut sources = Vec::new();

    for monitor in all_monitors()? {
        let info = match MonitorInfo::from_xcap(&monitor) {
            Ok(info) => info,
            Err(e) => {
                warn!("Skipping monitor: {}", e);
                continue;
            }
        };

        // one unreadable output must not take the other displays down with it
        let image = match monitor.capture_image() {
            Ok(image) => image,
            Err(e) => {
                warn!("Skipping monitor {} '{}': {}", info.id, info.name, e);
                continue;
            }
        };
        debug!(
            "Monitor {} '{}' captured at {}x{}",
            info.id,
            info.name,
            image.width(),
            image.height()
        );

        sources.push(CaptureSource {
            id: SourceKind::Screen.source_id(info.id),
            kind: SourceKind::Screen,
            display_id: Some(info.id),
            name: info.name,
            thumbnail: Arc::new(scale_to_thumbnail(image, thumbnail_size)),
        });
    }

    Ok(sources)
}

//! Window enumeration and capture through xcap.

use std::sync::Arc;

use log::{debug, warn};
use xcap::Window;

use super::backend::{scale_to_thumbnail, CaptureSource, SourceKind, ThumbnailSize};
use crate::error::{CaptureError, CaptureResult};

#[derive(Debug, Clone)]
pub struct WindowInfo {
    pub id: u32,
    pub app_name: String,
    pub title: String,
    pub display_id: Option<u32>,
    pub is_minimized: bool,
}

impl WindowInfo {
    fn from_xcap_window(window: &Window) -> Result<Self, String> {
        Ok(Self {
            id: window.id().map_err(|e| e.to_string())?,
            app_name: window.app_name().unwrap_or_default(),
            title: window.title().unwrap_or_default(),
            display_id: window
                .current_monitor()
                .ok()
                .and_then(|monitor| monitor.id().ok()),
            is_minimized: window.is_minimized().unwrap_or(false),
        })
    }

    pub fn display_label(&self) -> String {
        if self.title.is_empty() {
            format!("{} (ID: {})", self.app_name, self.id)
        } else {
            format!("{} - {}", self.title, self.app_name)
        }
    }
}

/// Every visible window, each with a frame scaled to `thumbnail_size`.
///
/// Minimized windows have nothing to capture and are skipped, as are windows
/// whose contents the OS refuses to hand out.
pub fn window_sources(thumbnail_size: Option<ThumbnailSize>) -> CaptureResult<Vec<CaptureSource>> {
    let windows = Window::all()
        .map_err(|e| CaptureError::CaptureFailed(format!("Failed to enumerate windows: {}", e)))?;

    let mut sources = Vec::new();
    for window in &windows {
        let info = match WindowInfo::from_xcap_window(window) {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to get info for a window: {}", e);
                continue;
            }
        };
        if info.is_minimized {
            continue;
        }

        let image = match window.capture_image() {
            Ok(image) if image.width() > 0 && image.height() > 0 => image,
            Ok(_) => continue,
            Err(e) => {
                debug!("Skipping window '{}': {}", info.display_label(), e);
                continue;
            }
        };

        sources.push(CaptureSource {
            id: SourceKind::Window.source_id(info.id),
            kind: SourceKind::Window,
            display_id: info.display_id,
            name: info.display_label(),
            thumbnail: Arc::new(scale_to_thumbnail(image, thumbnail_size)),
        });
    }

    Ok(sources)
}

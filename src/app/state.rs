//! Application state types
//!
//! [`ScreenshotApp`] is the host-facing entry point: it checks permission,
//! resolves displays, runs region selection and routes finished captures to a
//! sink or the editor.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::config::{CaptureConfig, ShortcutConfig};
use crate::capture::{
    CaptureBackend, CaptureEngine, CaptureScheduler, CaptureSource, OutputFormat, ScreenshotData,
    SourceFilter,
};
use crate::display::{Display, DisplayRegistry};
use crate::editor::{ClipboardSink, EditorHost};
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::{selection_to_capture_bounds, PhysicalRect};
use crate::overlay::{RegionSelection, SelectionOutcome};

/// The capture mode - how to capture the screenshot
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Capture the entire screen
    #[default]
    Fullscreen,
    /// Capture a rectangle, optionally picked interactively
    Region,
    /// Capture a specific window
    Window,
}

/// Parameters of a capture request. Everything is optional.
#[derive(Default, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureOptions {
    /// Target display; the primary display when absent
    pub display_id: Option<u32>,
    /// Crop rectangle in the target display's physical pixels
    pub bounds: Option<PhysicalRect>,
    /// `window:<id>`, required in window mode
    pub source_id: Option<String>,
    pub format: OutputFormat,
    pub quality: Option<u8>,
}

/// Asked before every capture.
pub trait PermissionGate: Send + Sync {
    fn request(&self) -> bool;
}

/// Grants every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionGate for AllowAll {
    fn request(&self) -> bool {
        true
    }
}

/// Main application state
pub struct ScreenshotApp {
    scheduler: CaptureScheduler,
    permission: Box<dyn PermissionGate>,
    shortcuts: ShortcutConfig,
}

impl ScreenshotApp {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        permission: impl PermissionGate + 'static,
        config: CaptureConfig,
    ) -> CaptureResult<Self> {
        let registry = Arc::new(DisplayRegistry::new(backend.clone())?);
        let engine = CaptureEngine::new(backend, registry, config);
        Ok(Self {
            scheduler: CaptureScheduler::new(engine),
            permission: Box::new(permission),
            shortcuts: ShortcutConfig::default(),
        })
    }

    pub fn with_shortcuts(mut self, shortcuts: ShortcutConfig) -> Self {
        self.shortcuts = shortcuts;
        self
    }

    pub fn shortcuts(&self) -> &ShortcutConfig {
        &self.shortcuts
    }

    pub fn scheduler(&self) -> &CaptureScheduler {
        &self.scheduler
    }

    pub fn registry(&self) -> &Arc<DisplayRegistry> {
        self.scheduler.engine().registry()
    }

    pub fn displays(&self) -> Vec<Display> {
        self.registry().all()
    }

    pub fn sources(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>> {
        self.scheduler.sources(filter)
    }

    fn check_permission(&self) -> CaptureResult<()> {
        if self.permission.request() {
            Ok(())
        } else {
            warn!("Screen capture permission denied");
            Err(CaptureError::PermissionDenied)
        }
    }

    /// Capture without user interaction. Region mode needs explicit bounds;
    /// use [`begin_region_selection`](Self::begin_region_selection) to let
    /// the user draw them.
    pub fn take_screenshot(
        &self,
        mode: CaptureMode,
        options: &CaptureOptions,
    ) -> CaptureResult<ScreenshotData> {
        self.check_permission()?;
        info!("Taking {:?} screenshot", mode);

        match mode {
            CaptureMode::Fullscreen => self.scheduler.capture_screen(
                options.display_id,
                None,
                options.format,
                options.quality,
            ),
            CaptureMode::Region => {
                let bounds = options.bounds.ok_or_else(|| {
                    CaptureError::InvalidBounds("region capture requires bounds".to_string())
                })?;
                self.scheduler.capture_screen(
                    options.display_id,
                    Some(bounds),
                    options.format,
                    options.quality,
                )
            }
            CaptureMode::Window => {
                let source_id = options.source_id.as_deref().ok_or_else(|| {
                    CaptureError::SourceNotFound("window capture requires a source id".to_string())
                })?;
                self.scheduler
                    .capture_window(source_id, options.format, options.quality)
            }
        }
    }

    /// Capture and hand the result straight to `sink`.
    pub fn capture_to_clipboard(
        &self,
        mode: CaptureMode,
        options: &CaptureOptions,
        sink: &dyn ClipboardSink,
    ) -> CaptureResult<ScreenshotData> {
        let screenshot = self.take_screenshot(mode, options)?;
        sink.write_image(&screenshot)?;
        Ok(screenshot)
    }

    /// Open a selection overlay on every display.
    pub fn begin_region_selection(&self) -> CaptureResult<RegionSelection> {
        self.check_permission()?;
        RegionSelection::start(
            &self.displays(),
            self.scheduler.engine().config(),
            self.shortcuts.clone(),
        )
    }

    /// Capture what a finished selection covers. A cancelled selection
    /// captures nothing.
    pub fn capture_selection(
        &self,
        outcome: &SelectionOutcome,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<Option<ScreenshotData>> {
        let (display_id, bounds) = match outcome {
            SelectionOutcome::Completed { display_id, bounds } => (*display_id, *bounds),
            SelectionOutcome::Cancelled { .. } => {
                info!("Region selection cancelled, nothing to capture");
                return Ok(None);
            }
        };
        self.check_permission()?;

        let display = self.registry().by_id(display_id)?;
        let physical = selection_to_capture_bounds(&bounds, &display);
        info!(
            "Capturing selection {:?} on display {} as {:?}",
            bounds, display_id, physical
        );
        self.scheduler
            .capture_screen(Some(display_id), Some(physical), format, quality)
            .map(Some)
    }

    /// Capture a finished selection and open it in `editor`. Returns whether
    /// the editor was opened.
    pub fn capture_region_to_editor(
        &self,
        outcome: &SelectionOutcome,
        editor: &mut dyn EditorHost,
    ) -> CaptureResult<bool> {
        let SelectionOutcome::Completed { bounds, .. } = outcome else {
            return Ok(false);
        };
        match self.capture_selection(outcome, OutputFormat::Png, None)? {
            Some(screenshot) => {
                editor.open(screenshot, *bounds)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-read the display topology and drop cached sources.
    pub fn on_topology_changed(&self) -> CaptureResult<usize> {
        let count = self.registry().refresh()?;
        self.scheduler.engine().invalidate_sources();
        info!("Display topology changed, {} display(s)", count);
        Ok(count)
    }
}

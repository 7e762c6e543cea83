//! Screen region capture with lightweight editing.
//!
//! A capture request flows through a permission check, display resolution,
//! optional interactive region selection, the single-flight capture scheduler
//! and finally a sink (clipboard, file) or the editor.

pub mod app;
pub mod capture;
pub mod display;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod overlay;

pub use app::{AllowAll, CaptureConfig, CaptureMode, CaptureOptions, PermissionGate, ScreenshotApp};
pub use capture::{
    CaptureBackend, CaptureEngine, CaptureScheduler, OutputFormat, ScreenshotData, XcapBackend,
};
pub use display::{Display, DisplayRegistry};
pub use editor::{EditCommandStack, EditOperation, EditorHost, EditorSession, ImageCompositor};
pub use error::{CaptureError, CaptureResult};
pub use geometry::{LogicalPoint, LogicalRect, PhysicalRect};
pub use overlay::{OverlayEvent, RegionSelection, SelectionOutcome};

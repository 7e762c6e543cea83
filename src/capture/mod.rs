//! Capture module for screen and window capture functionality
//!
//! The pipeline is layered: a [`CaptureBackend`] talks to the OS, the
//! [`CaptureEngine`] enumerates, crops and encodes, and the
//! [`CaptureScheduler`] decides whether a capture may run at all.
//! [`XcapBackend`] is the production backend.

pub mod backend;
pub mod encode;
pub mod engine;
pub mod memory;
pub mod scheduler;
pub mod screen;
pub mod window;

use std::fmt;
use std::time::SystemTime;

use image::RgbaImage;
use log::info;

pub use backend::{CaptureBackend, CaptureSource, SourceFilter, SourceKind, ThumbnailSize};
pub use encode::OutputFormat;
pub use engine::CaptureEngine;
pub use memory::{MemoryBackend, MemoryWindow};
pub use scheduler::{CaptureGuard, CaptureScheduler};

use crate::display::Display;
use crate::error::CaptureResult;

/// An encoded capture, owned by the caller until a sink or editor consumes it.
#[derive(Clone)]
pub struct ScreenshotData {
    /// Encoded image bytes
    pub buffer: Vec<u8>,
    pub format: OutputFormat,
    /// Width in physical pixels
    pub width: u32,
    /// Height in physical pixels
    pub height: u32,
    pub source_display_id: Option<u32>,
    pub scale_factor: f64,
    pub timestamp: SystemTime,
    /// The requested bounds had to be clamped into the frame
    pub bounds_clamped: bool,
}

impl ScreenshotData {
    /// Decode the buffer back into RGBA pixels.
    pub fn decode(&self) -> CaptureResult<RgbaImage> {
        Ok(image::load_from_memory(&self.buffer)?.to_rgba8())
    }
}

impl fmt::Debug for ScreenshotData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenshotData")
            .field("buffer_len", &self.buffer.len())
            .field("format", &self.format)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("source_display_id", &self.source_display_id)
            .field("scale_factor", &self.scale_factor)
            .field("timestamp", &self.timestamp)
            .field("bounds_clamped", &self.bounds_clamped)
            .finish()
    }
}

/// Captures through the `xcap` crate.
#[derive(Debug, Default)]
pub struct XcapBackend;

impl XcapBackend {
    pub fn new() -> Self {
        info!("Using xcap capture backend");
        Self
    }
}

impl CaptureBackend for XcapBackend {
    fn displays(&self) -> CaptureResult<Vec<Display>> {
        screen::list_displays()
    }

    fn enumerate(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>> {
        let mut sources = Vec::new();
        if filter.includes(SourceKind::Screen) {
            sources.extend(screen::screen_sources(filter.thumbnail_size)?);
        }
        if filter.includes(SourceKind::Window) {
            sources.extend(window::window_sources(filter.thumbnail_size)?);
        }
        Ok(sources)
    }
}

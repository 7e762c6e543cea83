//! Source enumeration, frame acquisition, cropping and encoding.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use super::backend::{CaptureBackend, CaptureSource, SourceFilter, SourceKind};
use super::encode::{self, OutputFormat};
use super::ScreenshotData;
use crate::app::config::CaptureConfig;
use crate::display::DisplayRegistry;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::PhysicalRect;

struct CachedSources {
    sources: Vec<CaptureSource>,
    fetched_at: Instant,
}

pub struct CaptureEngine {
    backend: Arc<dyn CaptureBackend>,
    registry: Arc<DisplayRegistry>,
    config: CaptureConfig,
    source_cache: Mutex<HashMap<String, CachedSources>>,
    last_capture: Mutex<Option<Instant>>,
}

impl CaptureEngine {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        registry: Arc<DisplayRegistry>,
        config: CaptureConfig,
    ) -> Self {
        Self {
            backend,
            registry,
            config,
            source_cache: Mutex::new(HashMap::new()),
            last_capture: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<DisplayRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Enumerate capture sources, served from a short-lived cache keyed by
    /// the serialized filter. Expired entries are swept on every call.
    pub fn sources(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>> {
        let mut filter = filter.clone();
        if filter.thumbnail_size.is_none() {
            filter.thumbnail_size = Some(self.config.default_thumbnail_size);
        }

        let key = serde_json::to_string(&filter)
            .map_err(|e| CaptureError::CaptureFailed(format!("Invalid source filter: {}", e)))?;
        let ttl = self.config.source_cache_ttl;

        {
            let mut cache = self.source_cache.lock();
            cache.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
            if let Some(entry) = cache.get(&key) {
                debug!("Source cache hit for {}", key);
                return Ok(entry.sources.clone());
            }
        }

        let sources = self.backend.enumerate(&filter)?;
        debug!("Enumerated {} source(s) for {}", sources.len(), key);

        self.source_cache.lock().insert(
            key,
            CachedSources {
                sources: sources.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(sources)
    }

    /// Drop every cached source list, e.g. after a topology change.
    pub fn invalidate_sources(&self) {
        self.source_cache.lock().clear();
    }

    /// Capture a display, optionally cropped to `bounds` in the display's
    /// physical pixels. Defaults to the primary display.
    pub fn capture_screen(
        &self,
        display_id: Option<u32>,
        bounds: Option<PhysicalRect>,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        let result = self.capture_screen_inner(display_id, bounds, format, quality);
        self.mark_captured();
        if let Err(e) = &result {
            error!("Screen capture failed: {}", e);
        }
        result
    }

    fn capture_screen_inner(
        &self,
        display_id: Option<u32>,
        bounds: Option<PhysicalRect>,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        let display = match display_id {
            Some(id) => self.registry.by_id(id)?,
            None => self.registry.primary()?,
        };

        // enumerate at full physical resolution to get a real frame rather
        // than a downscaled preview
        let (width, height) = display.physical_size();
        let filter = SourceFilter::screens().with_thumbnail_size(width, height);
        let sources = self.backend.enumerate(&filter)?;
        if sources.is_empty() {
            return Err(CaptureError::NoSourcesAvailable);
        }

        let source = sources
            .into_iter()
            .find(|source| source.display_id == Some(display.id))
            .ok_or_else(|| {
                CaptureError::SourceNotFound(SourceKind::Screen.source_id(display.id))
            })?;
        let frame = source.thumbnail;

        let (region, bounds_clamped) = match bounds {
            Some(requested) => {
                let (clamped, changed) = requested
                    .clamp_into(frame.width(), frame.height())
                    .ok_or_else(|| {
                        CaptureError::InvalidBounds(format!(
                            "{:?} lies outside the {}x{} frame of display {}",
                            requested,
                            frame.width(),
                            frame.height(),
                            display.id
                        ))
                    })?;
                if changed {
                    warn!(
                        "Capture bounds {:?} clamped to {:?} for {}x{} frame",
                        requested,
                        clamped,
                        frame.width(),
                        frame.height()
                    );
                }
                (clamped, changed)
            }
            None => (PhysicalRect::new(0, 0, frame.width(), frame.height()), false),
        };

        let buffer = if bounds.is_some() {
            encode::encode(&encode::crop(&frame, &region), format, self.quality(quality))?
        } else {
            encode::encode(&frame, format, self.quality(quality))?
        };

        info!(
            "Captured {}x{} from display {} as {:?}",
            region.width, region.height, display.id, format
        );

        Ok(ScreenshotData {
            buffer,
            format,
            width: region.width,
            height: region.height,
            source_display_id: Some(display.id),
            scale_factor: display.scale_factor,
            timestamp: SystemTime::now(),
            bounds_clamped,
        })
    }

    /// Capture a whole window by source id (`window:<id>`).
    pub fn capture_window(
        &self,
        source_id: &str,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        let result = self.capture_window_inner(source_id, format, quality);
        self.mark_captured();
        if let Err(e) = &result {
            error!("Window capture failed: {}", e);
        }
        result
    }

    fn capture_window_inner(
        &self,
        source_id: &str,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        match SourceKind::parse_source_id(source_id) {
            Some((SourceKind::Window, _)) => {}
            _ => return Err(CaptureError::SourceNotFound(source_id.to_string())),
        }

        let sources = self.backend.enumerate(&SourceFilter::windows())?;
        if sources.is_empty() {
            return Err(CaptureError::NoSourcesAvailable);
        }

        let source = sources
            .into_iter()
            .find(|source| source.kind == SourceKind::Window && source.id == source_id)
            .ok_or_else(|| CaptureError::SourceNotFound(source_id.to_string()))?;

        let frame = source.thumbnail;
        let buffer = encode::encode(&frame, format, self.quality(quality))?;
        let scale_factor = source
            .display_id
            .and_then(|id| self.registry.by_id(id).ok())
            .map(|display| display.scale_factor)
            .unwrap_or(1.0);

        info!(
            "Captured window '{}' ({}x{})",
            source.name,
            frame.width(),
            frame.height()
        );

        Ok(ScreenshotData {
            buffer,
            format,
            width: frame.width(),
            height: frame.height(),
            source_display_id: source.display_id,
            scale_factor,
            timestamp: SystemTime::now(),
            bounds_clamped: false,
        })
    }

    fn quality(&self, quality: Option<u8>) -> u8 {
        encode::clamp_quality(quality.unwrap_or(self.config.default_jpeg_quality))
    }

    fn mark_captured(&self) {
        *self.last_capture.lock() = Some(Instant::now());
    }

    /// Time elapsed since the last capture attempt finished, successful or not.
    pub fn since_last_capture(&self) -> Option<Duration> {
        self.last_capture.lock().map(|at| at.elapsed())
    }
}

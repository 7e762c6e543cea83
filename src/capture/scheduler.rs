//! Process-wide capture admission.
//!
//! At most one capture runs at a time, and a new capture must wait a minimum
//! interval after the previous one. Rejected requests fail immediately; there
//! is no queue and no fairness.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, warn};

use super::backend::{CaptureSource, SourceFilter};
use super::encode::OutputFormat;
use super::engine::CaptureEngine;
use super::ScreenshotData;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::PhysicalRect;

/// Marks a capture as in flight until dropped.
///
/// Released on every exit path, including unwinding.
pub struct CaptureGuard<'a> {
    in_flight: &'a AtomicBool,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

pub struct CaptureScheduler {
    engine: CaptureEngine,
    in_flight: AtomicBool,
    min_interval: Duration,
}

impl CaptureScheduler {
    pub fn new(engine: CaptureEngine) -> Self {
        let min_interval = engine.config().min_capture_interval;
        Self {
            engine,
            in_flight: AtomicBool::new(false),
            min_interval,
        }
    }

    pub fn engine(&self) -> &CaptureEngine {
        &self.engine
    }

    pub fn is_capturing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Admit a capture, or fail with `AlreadyInProgress` / `TooFrequent`.
    pub fn begin(&self) -> CaptureResult<CaptureGuard<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Capture rejected: another capture is in progress");
            return Err(CaptureError::AlreadyInProgress);
        }
        let guard = CaptureGuard {
            in_flight: &self.in_flight,
        };

        if let Some(elapsed) = self.engine.since_last_capture() {
            if elapsed < self.min_interval {
                let retry_after = self.min_interval - elapsed;
                debug!(
                    "Capture rejected: {} ms since the last one",
                    elapsed.as_millis()
                );
                return Err(CaptureError::TooFrequent {
                    retry_after_ms: retry_after.as_millis().max(1) as u64,
                });
            }
        }

        Ok(guard)
    }

    pub fn capture_screen(
        &self,
        display_id: Option<u32>,
        bounds: Option<PhysicalRect>,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        let _guard = self.begin()?;
        self.engine
            .capture_screen(display_id, bounds, format, quality)
    }

    pub fn capture_window(
        &self,
        source_id: &str,
        format: OutputFormat,
        quality: Option<u8>,
    ) -> CaptureResult<ScreenshotData> {
        let _guard = self.begin()?;
        self.engine.capture_window(source_id, format, quality)
    }

    /// Source listing is cached and cheap, so it bypasses admission.
    pub fn sources(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>> {
        self.engine.sources(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::CaptureConfig;
    use crate::capture::MemoryBackend;
    use crate::display::{Display, DisplayRegistry};
    use crate::geometry::LogicalRect;
    use std::panic::{self, AssertUnwindSafe};
    use std::sync::mpsc;
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn scheduler(config: CaptureConfig) -> (Arc<MemoryBackend>, Arc<CaptureScheduler>) {
        let backend = Arc::new(MemoryBackend::new(vec![Display::new(
            1,
            "main",
            LogicalRect::new(0.0, 0.0, 64.0, 48.0),
            1.0,
            true,
        )]));
        let registry = Arc::new(DisplayRegistry::new(backend.clone()).unwrap());
        let engine = CaptureEngine::new(backend.clone(), registry, config);
        (backend, Arc::new(CaptureScheduler::new(engine)))
    }

    #[test]
    fn test_rapid_second_capture_is_too_frequent() {
        let (_, scheduler) = scheduler(CaptureConfig::default());
        scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .unwrap();

        let err = scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .unwrap_err();
        assert!(matches!(err, CaptureError::TooFrequent { .. }));
        assert!(!scheduler.is_capturing());
    }

    #[test]
    fn test_capture_allowed_after_interval() {
        let config = CaptureConfig::default().with_min_capture_interval(Duration::from_millis(20));
        let (_, scheduler) = scheduler(config);
        scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .unwrap();
        thread::sleep(Duration::from_millis(40));
        assert!(scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .is_ok());
    }

    #[test]
    fn test_failed_capture_counts_toward_interval() {
        let (_, scheduler) = scheduler(CaptureConfig::default());
        let err = scheduler
            .capture_screen(Some(5), None, OutputFormat::Png, None)
            .unwrap_err();
        assert_eq!(err, CaptureError::DisplayNotFound(Some(5)));

        let err = scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .unwrap_err();
        assert!(matches!(err, CaptureError::TooFrequent { .. }));
    }

    #[test]
    fn test_concurrent_capture_is_rejected() {
        let (backend, scheduler) = scheduler(CaptureConfig::default());

        let (entered_tx, entered_rx) = mpsc::channel::<()>();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);
        backend.set_enumerate_hook(move || {
            let _ = entered_tx.lock().unwrap().send(());
            let _ = release_rx.lock().unwrap().recv();
        });

        let worker = {
            let scheduler = scheduler.clone();
            thread::spawn(move || scheduler.capture_screen(None, None, OutputFormat::Png, None))
        };

        entered_rx.recv().unwrap();
        assert!(scheduler.is_capturing());
        let err = scheduler
            .capture_screen(None, None, OutputFormat::Png, None)
            .unwrap_err();
        assert_eq!(err, CaptureError::AlreadyInProgress);
        assert_eq!(backend.enumerations(), 1);

        release_tx.send(()).unwrap();
        assert!(worker.join().unwrap().is_ok());
        assert!(!scheduler.is_capturing());
    }

    #[test]
    fn test_guard_released_on_panic() {
        let (_, scheduler) = scheduler(CaptureConfig::default());
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = scheduler.begin().unwrap();
            panic!("backend blew up");
        }));
        assert!(result.is_err());
        assert!(!scheduler.is_capturing());
        assert!(scheduler.begin().is_ok());
    }
}

//! In-memory capture backend.
//!
//! Serves synthetic frames for a configurable topology. Used for headless
//! hosts and throughout the test suite.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use log::warn;
use parking_lot::Mutex;

use super::backend::{scale_to_thumbnail, CaptureBackend, CaptureSource, SourceFilter, SourceKind};
use crate::display::Display;
use crate::error::CaptureResult;

type EnumerateHook = Box<dyn Fn() + Send + Sync>;

/// A window served by [`MemoryBackend`]
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    pub id: u32,
    pub title: String,
    pub display_id: Option<u32>,
    pub frame: RgbaImage,
}

pub struct MemoryBackend {
    displays: Mutex<Vec<Display>>,
    windows: Mutex<Vec<MemoryWindow>>,
    unreadable: Mutex<HashSet<u32>>,
    enumerations: AtomicUsize,
    hook: Mutex<Option<Arc<EnumerateHook>>>,
}

impl MemoryBackend {
    pub fn new(displays: Vec<Display>) -> Self {
        Self {
            displays: Mutex::new(displays),
            windows: Mutex::new(Vec::new()),
            unreadable: Mutex::new(HashSet::new()),
            enumerations: AtomicUsize::new(0),
            hook: Mutex::new(None),
        }
    }

    pub fn set_displays(&self, displays: Vec<Display>) {
        *self.displays.lock() = displays;
    }

    pub fn add_window(&self, window: MemoryWindow) {
        self.windows.lock().push(window);
    }

    /// Make frame acquisition fail for `display_id`, as an output that is
    /// listed but cannot be read. Enumeration skips it.
    pub fn set_unreadable(&self, display_id: u32, unreadable: bool) {
        let mut ids = self.unreadable.lock();
        if unreadable {
            ids.insert(display_id);
        } else {
            ids.remove(&display_id);
        }
    }

    /// Run `hook` at the start of every enumeration, before any frame is
    /// produced. Lets callers hold an enumeration open.
    pub fn set_enumerate_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.hook.lock() = Some(Arc::new(Box::new(hook)));
    }

    /// How many times `enumerate` has been called.
    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// The deterministic frame served for `display` at full resolution.
    pub fn frame_for(display: &Display) -> RgbaImage {
        let (width, height) = display.physical_size();
        let tint = (display.id.wrapping_mul(40) % 256) as u8;
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, tint, 255])
        })
    }
}

impl CaptureBackend for MemoryBackend {
    fn displays(&self) -> CaptureResult<Vec<Display>> {
        Ok(self.displays.lock().clone())
    }

    fn enumerate(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        // cloned out so the hook can block without holding the lock
        let hook = self.hook.lock().clone();
        if let Some(hook) = hook {
            hook();
        }

        let mut sources = Vec::new();

        if filter.includes(SourceKind::Screen) {
            let unreadable = self.unreadable.lock().clone();
            for display in self.displays.lock().iter() {
                if unreadable.contains(&display.id) {
                    warn!("Skipping display {}: frame unavailable", display.id);
                    continue;
                }
                let frame = scale_to_thumbnail(Self::frame_for(display), filter.thumbnail_size);
                sources.push(CaptureSource {
                    id: SourceKind::Screen.source_id(display.id),
                    kind: SourceKind::Screen,
                    display_id: Some(display.id),
                    name: display.name.clone(),
                    thumbnail: Arc::new(frame),
                });
            }
        }

        if filter.includes(SourceKind::Window) {
            for window in self.windows.lock().iter() {
                let frame = scale_to_thumbnail(window.frame.clone(), filter.thumbnail_size);
                sources.push(CaptureSource {
                    id: SourceKind::Window.source_id(window.id),
                    kind: SourceKind::Window,
                    display_id: window.display_id,
                    name: window.title.clone(),
                    thumbnail: Arc::new(frame),
                });
            }
        }

        Ok(sources)
    }
}

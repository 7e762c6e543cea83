//! Attached displays and the registry that tracks them.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::capture::CaptureBackend;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::{to_physical, LogicalPoint, LogicalRect, PhysicalRect};

/// A single attached display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Display {
    pub id: u32,
    pub name: String,
    /// Position and size in the global logical coordinate space
    pub logical_bounds: LogicalRect,
    /// Physical pixels per logical pixel
    pub scale_factor: f64,
    pub is_primary: bool,
}

impl Display {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        logical_bounds: LogicalRect,
        scale_factor: f64,
        is_primary: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            logical_bounds,
            scale_factor,
            is_primary,
        }
    }

    pub fn physical_bounds(&self) -> PhysicalRect {
        to_physical(&self.logical_bounds, self.scale_factor)
    }

    /// Full frame-buffer resolution of this display.
    pub fn physical_size(&self) -> (u32, u32) {
        let bounds = self.physical_bounds();
        (bounds.width, bounds.height)
    }

    pub fn contains_logical_point(&self, point: LogicalPoint) -> bool {
        self.logical_bounds.contains(point)
    }

    fn is_valid(&self) -> bool {
        self.scale_factor > 0.0 && self.scale_factor.is_finite() && !self.logical_bounds.is_empty()
    }
}

/// Tracks the attached displays.
///
/// Readers always get an immutable snapshot. A topology change builds a
/// complete new display set and swaps it in, so nobody ever sees a partially
/// rebuilt list.
pub struct DisplayRegistry {
    backend: Arc<dyn CaptureBackend>,
    snapshot: RwLock<Arc<Vec<Display>>>,
    writer: Mutex<()>,
}

impl DisplayRegistry {
    /// Create a registry and load the current topology from `backend`.
    pub fn new(backend: Arc<dyn CaptureBackend>) -> CaptureResult<Self> {
        let registry = Self {
            backend,
            snapshot: RwLock::new(Arc::new(Vec::new())),
            writer: Mutex::new(()),
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Re-query the backend and replace the display set.
    ///
    /// Returns the number of displays in the new snapshot.
    pub fn refresh(&self) -> CaptureResult<usize> {
        let _writer = self.writer.lock();
        let displays = self.backend.displays()?;
        Ok(self.install(displays))
    }

    /// Replace the display set with an externally observed topology.
    pub fn apply_topology(&self, displays: Vec<Display>) -> usize {
        let _writer = self.writer.lock();
        self.install(displays)
    }

    fn install(&self, displays: Vec<Display>) -> usize {
        let accepted: Vec<Display> = displays
            .into_iter()
            .filter(|display| {
                let valid = display.is_valid();
                if !valid {
                    warn!(
                        "Ignoring display {} ({}) with scale {} and bounds {:?}",
                        display.id, display.name, display.scale_factor, display.logical_bounds
                    );
                }
                valid
            })
            .collect();

        for display in &accepted {
            debug!(
                "Display {} '{}': {:?} @ {}{}",
                display.id,
                display.name,
                display.logical_bounds,
                display.scale_factor,
                if display.is_primary { " (primary)" } else { "" }
            );
        }

        let count = accepted.len();
        *self.snapshot.write() = Arc::new(accepted);
        info!("Display topology rebuilt with {} display(s)", count);
        count
    }

    /// Consistent view of every display at this moment.
    pub fn snapshot(&self) -> Arc<Vec<Display>> {
        self.snapshot.read().clone()
    }

    pub fn all(&self) -> Vec<Display> {
        self.snapshot().as_ref().clone()
    }

    pub fn by_id(&self, id: u32) -> CaptureResult<Display> {
        self.snapshot()
            .iter()
            .find(|display| display.id == id)
            .cloned()
            .ok_or(CaptureError::DisplayNotFound(Some(id)))
    }

    /// The display flagged primary, or the first one when none is flagged.
    pub fn primary(&self) -> CaptureResult<Display> {
        let displays = self.snapshot();
        displays
            .iter()
            .find(|display| display.is_primary)
            .or(displays.first())
            .cloned()
            .ok_or(CaptureError::DisplayNotFound(None))
    }

    /// The display containing a global logical point. Resolution is by
    /// containment only; a point in a gap between displays yields `None`.
    pub fn at_logical_point(&self, x: f64, y: f64) -> Option<Display> {
        let point = LogicalPoint::new(x, y);
        self.snapshot()
            .iter()
            .find(|display| display.contains_logical_point(point))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::MemoryBackend;

    fn dual_head() -> Vec<Display> {
        vec![
            Display::new(1, "left", LogicalRect::new(0.0, 0.0, 1920.0, 1080.0), 1.0, false),
            Display::new(2, "right", LogicalRect::new(1920.0, 0.0, 1280.0, 800.0), 2.0, true),
        ]
    }

    #[test]
    fn test_lookup() {
        let backend = Arc::new(MemoryBackend::new(dual_head()));
        let registry = DisplayRegistry::new(backend).unwrap();

        assert_eq!(registry.all().len(), 2);
        assert_eq!(registry.by_id(2).unwrap().name, "right");
        assert_eq!(
            registry.by_id(9).unwrap_err(),
            CaptureError::DisplayNotFound(Some(9))
        );
        assert_eq!(registry.primary().unwrap().id, 2);
    }

    #[test]
    fn test_primary_falls_back_to_first() {
        let mut displays = dual_head();
        displays[1].is_primary = false;
        let registry = DisplayRegistry::new(Arc::new(MemoryBackend::new(displays))).unwrap();
        assert_eq!(registry.primary().unwrap().id, 1);
    }

    #[test]
    fn test_primary_on_empty_topology() {
        let registry = DisplayRegistry::new(Arc::new(MemoryBackend::new(Vec::new()))).unwrap();
        assert_eq!(
            registry.primary().unwrap_err(),
            CaptureError::DisplayNotFound(None)
        );
    }

    #[test]
    fn test_at_logical_point_uses_containment() {
        let registry = DisplayRegistry::new(Arc::new(MemoryBackend::new(dual_head()))).unwrap();
        assert_eq!(registry.at_logical_point(100.0, 100.0).unwrap().id, 1);
        assert_eq!(registry.at_logical_point(1920.0, 10.0).unwrap().id, 2);
        // below the shorter right-hand display
        assert!(registry.at_logical_point(2000.0, 900.0).is_none());
    }

    #[test]
    fn test_topology_change_replaces_snapshot() {
        let backend = Arc::new(MemoryBackend::new(dual_head()));
        let registry = DisplayRegistry::new(backend.clone()).unwrap();
        let before = registry.snapshot();

        backend.set_displays(vec![Display::new(
            3,
            "laptop",
            LogicalRect::new(0.0, 0.0, 1440.0, 900.0),
            2.0,
            true,
        )]);
        assert_eq!(registry.refresh().unwrap(), 1);

        // readers holding the old snapshot keep a consistent view
        assert_eq!(before.len(), 2);
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.by_id(1).is_err());
    }

    #[test]
    fn test_invalid_displays_are_rejected() {
        let registry = DisplayRegistry::new(Arc::new(MemoryBackend::new(Vec::new()))).unwrap();
        let count = registry.apply_topology(vec![
            Display::new(1, "ok", LogicalRect::new(0.0, 0.0, 800.0, 600.0), 1.0, true),
            Display::new(2, "zero-scale", LogicalRect::new(800.0, 0.0, 800.0, 600.0), 0.0, false),
            Display::new(3, "empty", LogicalRect::new(0.0, 600.0, 0.0, 600.0), 1.0, false),
        ]);
        assert_eq!(count, 1);
        assert_eq!(registry.all()[0].id, 1);
    }

    #[test]
    fn test_physical_size() {
        let display = Display::new(1, "hidpi", LogicalRect::new(0.0, 0.0, 1440.0, 900.0), 2.0, true);
        assert_eq!(display.physical_size(), (2880, 1800));
    }
}

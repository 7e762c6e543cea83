//! Logical and physical pixel geometry.
//!
//! Pointer events arrive in logical (device-independent) pixels while frames
//! are addressed in physical pixels. The two units get distinct types so a
//! rectangle can never carry both.
//!
//! ```text
//! physical = logical × scale_factor
//! origin: floor    extent: round
//! ```

use serde::{Deserialize, Serialize};

use crate::display::Display;

/// A point in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalPoint {
    pub x: f64,
    pub y: f64,
}

impl LogicalPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A rectangle in logical pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LogicalRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LogicalRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanning two corners, in any drag direction.
    pub fn from_corners(a: LogicalPoint, b: LogicalPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn origin(&self) -> LogicalPoint {
        LogicalPoint::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not.
    pub fn contains(&self, point: LogicalPoint) -> bool {
        point.x >= self.x && point.x < self.right() && point.y >= self.y && point.y < self.bottom()
    }

    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    pub fn intersect(&self, other: &LogicalRect) -> Option<LogicalRect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(LogicalRect::new(left, top, right - left, bottom - top))
    }
}

/// A rectangle in physical (frame-buffer) pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PhysicalRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PhysicalRect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.x as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y as i64 + self.height as i64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Half-open containment.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (x as i64, y as i64);
        x >= self.x as i64 && x < self.right() && y >= self.y as i64 && y < self.bottom()
    }

    /// Intersection with a `width × height` image anchored at the origin.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<PhysicalRect> {
        let left = (self.x as i64).max(0);
        let top = (self.y as i64).max(0);
        let right = self.right().min(width as i64);
        let bottom = self.bottom().min(height as i64);

        if right <= left || bottom <= top {
            return None;
        }

        Some(PhysicalRect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }

    /// Clamp into a `width × height` frame: the origin is pinned to
    /// `[0, size - 1]` and the extent shrinks to the remaining frame.
    ///
    /// Returns the clamped rectangle and whether anything changed, or `None`
    /// when less than one pixel survives in either dimension.
    pub fn clamp_into(&self, width: u32, height: u32) -> Option<(PhysicalRect, bool)> {
        if width == 0 || height == 0 {
            return None;
        }

        let x = (self.x as i64).clamp(0, width as i64 - 1);
        let y = (self.y as i64).clamp(0, height as i64 - 1);
        let w = (self.width as i64).min(width as i64 - x);
        let h = (self.height as i64).min(height as i64 - y);

        if w < 1 || h < 1 {
            return None;
        }

        let clamped = PhysicalRect::new(x as i32, y as i32, w as u32, h as u32);
        Some((clamped, clamped != *self))
    }
}

/// Convert logical to physical pixels: floor on origin, round on extent, so
/// adjacent tiles never open a systematic one-pixel gap.
pub fn to_physical(rect: &LogicalRect, scale: f64) -> PhysicalRect {
    PhysicalRect {
        x: (rect.x * scale).floor() as i32,
        y: (rect.y * scale).floor() as i32,
        width: (rect.width * scale).round().max(0.0) as u32,
        height: (rect.height * scale).round().max(0.0) as u32,
    }
}

pub fn to_logical(rect: &PhysicalRect, scale: f64) -> LogicalRect {
    LogicalRect {
        x: rect.x as f64 / scale,
        y: rect.y as f64 / scale,
        width: rect.width as f64 / scale,
        height: rect.height as f64 / scale,
    }
}

/// The first display whose physical bounds contain the point.
///
/// No fallback: a point outside every display resolves to `None`.
pub fn display_for_physical_point(displays: &[Display], x: i32, y: i32) -> Option<&Display> {
    displays
        .iter()
        .find(|display| display.physical_bounds().contains(x, y))
}

/// Convert a global logical selection to the physical crop rectangle inside
/// the frame of `display`: first relative to the display origin, then scaled
/// by that display's own factor.
pub fn selection_to_capture_bounds(selection: &LogicalRect, display: &Display) -> PhysicalRect {
    let origin = display.logical_bounds.origin();
    let local = selection.translate(-origin.x, -origin.y);
    to_physical(&local, display.scale_factor)
}

//! The seam between the capture pipeline and the operating system.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::display::Display;
use crate::error::CaptureResult;

/// What kind of surface a capture source represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Screen,
    Window,
}

impl SourceKind {
    fn prefix(&self) -> &'static str {
        match self {
            SourceKind::Screen => "screen",
            SourceKind::Window => "window",
        }
    }

    /// Stable source identifier, e.g. `screen:3` or `window:4711`.
    pub fn source_id(&self, native_id: u32) -> String {
        format!("{}:{}", self.prefix(), native_id)
    }

    /// Split a source identifier back into its kind and native id.
    pub fn parse_source_id(source_id: &str) -> Option<(SourceKind, u32)> {
        let (prefix, id) = source_id.split_once(':')?;
        let kind = match prefix {
            "screen" => SourceKind::Screen,
            "window" => SourceKind::Window,
            _ => return None,
        };
        id.parse().ok().map(|id| (kind, id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Selects which sources to enumerate and how large their thumbnails are.
///
/// The serialized form doubles as the source cache key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFilter {
    pub kinds: Vec<SourceKind>,
    /// `None` keeps every thumbnail at native resolution
    pub thumbnail_size: Option<ThumbnailSize>,
}

impl SourceFilter {
    pub fn screens() -> Self {
        Self {
            kinds: vec![SourceKind::Screen],
            thumbnail_size: None,
        }
    }

    pub fn windows() -> Self {
        Self {
            kinds: vec![SourceKind::Window],
            thumbnail_size: None,
        }
    }

    pub fn all() -> Self {
        Self {
            kinds: vec![SourceKind::Screen, SourceKind::Window],
            thumbnail_size: None,
        }
    }

    pub fn with_thumbnail_size(mut self, width: u32, height: u32) -> Self {
        self.thumbnail_size = Some(ThumbnailSize::new(width, height));
        self
    }

    pub fn includes(&self, kind: SourceKind) -> bool {
        self.kinds.contains(&kind)
    }
}

/// A capturable screen or window, with a frame scaled to the requested
/// thumbnail size.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    pub id: String,
    pub kind: SourceKind,
    /// The display this source lives on, when known
    pub display_id: Option<u32>,
    pub name: String,
    pub thumbnail: Arc<RgbaImage>,
}

/// Operating-system access used by the registry and the capture engine.
pub trait CaptureBackend: Send + Sync {
    /// Current display topology.
    fn displays(&self) -> CaptureResult<Vec<Display>>;

    /// Enumerate the sources matching `filter`. Acquiring thumbnails may block
    /// on the OS.
    fn enumerate(&self, filter: &SourceFilter) -> CaptureResult<Vec<CaptureSource>>;
}

/// Size of a `width × height` frame scaled to fit inside `bounds` while
/// keeping its aspect ratio. Frames are never upscaled.
pub fn fit_within(width: u32, height: u32, bounds: ThumbnailSize) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= bounds.width && height <= bounds.height {
        return (width, height);
    }

    let scale_x = bounds.width as f64 / width as f64;
    let scale_y = bounds.height as f64 / height as f64;
    let scale = scale_x.min(scale_y);

    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

/// Downscale `frame` to the filter's thumbnail size, if one was requested.
pub fn scale_to_thumbnail(frame: RgbaImage, size: Option<ThumbnailSize>) -> RgbaImage {
    let Some(size) = size else {
        return frame;
    };
    let (width, height) = fit_within(frame.width(), frame.height(), size);
    if (width, height) == frame.dimensions() {
        frame
    } else {
        image::imageops::thumbnail(&frame, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_round_trip() {
        assert_eq!(SourceKind::Screen.source_id(3), "screen:3");
        assert_eq!(
            SourceKind::parse_source_id("window:4711"),
            Some((SourceKind::Window, 4711))
        );
        assert_eq!(SourceKind::parse_source_id("tab:1"), None);
        assert_eq!(SourceKind::parse_source_id("screen:abc"), None);
    }

    #[test]
    fn test_fit_within_keeps_aspect_ratio() {
        assert_eq!(fit_within(1920, 1080, ThumbnailSize::new(150, 150)), (150, 84));
        assert_eq!(fit_within(1080, 1920, ThumbnailSize::new(150, 150)), (84, 150));
    }

    #[test]
    fn test_fit_within_never_upscales() {
        assert_eq!(fit_within(100, 50, ThumbnailSize::new(3840, 2160)), (100, 50));
        assert_eq!(fit_within(3840, 2160, ThumbnailSize::new(3840, 2160)), (3840, 2160));
    }

    #[test]
    fn test_filter_cache_key_is_stable() {
        let a = serde_json::to_string(&SourceFilter::screens().with_thumbnail_size(150, 150)).unwrap();
        let b = serde_json::to_string(&SourceFilter::screens().with_thumbnail_size(150, 150)).unwrap();
        let c = serde_json::to_string(&SourceFilter::windows().with_thumbnail_size(150, 150)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.contains("\"thumbnailSize\""));
    }
}

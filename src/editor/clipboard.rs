//! Destinations for finished screenshots.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::info;
use parking_lot::Mutex;

use crate::capture::ScreenshotData;
use crate::error::{CaptureError, CaptureResult};

/// Receives a capture once it is final.
pub trait ClipboardSink {
    fn write_image(&self, data: &ScreenshotData) -> CaptureResult<()>;
}

/// The system clipboard, through `arboard`.
pub struct SystemClipboard {
    clipboard: Mutex<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> CaptureResult<Self> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| CaptureError::CaptureFailed(format!("Clipboard unavailable: {}", e)))?;
        Ok(Self {
            clipboard: Mutex::new(clipboard),
        })
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_image(&self, data: &ScreenshotData) -> CaptureResult<()> {
        let rgba = data.decode()?;
        let image = arboard::ImageData {
            width: rgba.width() as usize,
            height: rgba.height() as usize,
            bytes: Cow::Owned(rgba.into_raw()),
        };
        self.clipboard
            .lock()
            .set_image(image)
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to copy image: {}", e)))?;
        info!("Copied {}x{} image to clipboard", data.width, data.height);
        Ok(())
    }
}

/// Writes each capture as `screenshot_<unix seconds>.<ext>` into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` and return the path it landed at.
    pub fn save(&self, data: &ScreenshotData) -> CaptureResult<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            CaptureError::CaptureFailed(format!("Failed to create {:?}: {}", self.dir, e))
        })?;

        let secs = data
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);
        let path = self.free_path(secs, data.format.extension());

        fs::write(&path, &data.buffer)
            .map_err(|e| CaptureError::CaptureFailed(format!("Failed to save image: {}", e)))?;
        info!("Image saved to {:?}", path);
        Ok(path)
    }

    // captures within the same second get a numeric suffix
    fn free_path(&self, secs: u64, extension: &str) -> PathBuf {
        let mut path = self.dir.join(format!("screenshot_{}.{}", secs, extension));
        let mut n = 1;
        while path.exists() {
            path = self
                .dir
                .join(format!("screenshot_{}_{}.{}", secs, n, extension));
            n += 1;
        }
        path
    }
}

impl ClipboardSink for FileSink {
    fn write_image(&self, data: &ScreenshotData) -> CaptureResult<()> {
        self.save(data).map(|_| ())
    }
}

/// Keeps every capture in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    images: Mutex<Vec<ScreenshotData>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn images(&self) -> Vec<ScreenshotData> {
        self.images.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.images.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.lock().is_empty()
    }
}

impl ClipboardSink for MemorySink {
    fn write_image(&self, data: &ScreenshotData) -> CaptureResult<()> {
        self.images.lock().push(data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::encode::encode;
    use crate::capture::OutputFormat;
    use image::{Rgba, RgbaImage};
    use std::time::{Duration, SystemTime};

    fn screenshot(format: OutputFormat) -> ScreenshotData {
        let image = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        ScreenshotData {
            buffer: encode(&image, format, 90).unwrap(),
            format,
            width: 4,
            height: 3,
            source_display_id: Some(1),
            scale_factor: 1.0,
            timestamp: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            bounds_clamped: false,
        }
    }

    #[test]
    fn test_file_sink_names_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let first = sink.save(&screenshot(OutputFormat::Png)).unwrap();
        assert_eq!(first, dir.path().join("screenshot_1700000000.png"));
        assert_eq!(fs::read(&first).unwrap(), screenshot(OutputFormat::Png).buffer);

        let second = sink.save(&screenshot(OutputFormat::Png)).unwrap();
        assert_eq!(second, dir.path().join("screenshot_1700000000_1.png"));
    }

    #[test]
    fn test_file_sink_uses_format_extension() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("nested"));
        let mut data = screenshot(OutputFormat::Jpeg);
        data.timestamp = SystemTime::now();

        sink.write_image(&data).unwrap();
        let names: Vec<_> = fs::read_dir(sink.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].ends_with(".jpg"));
    }

    #[test]
    fn test_memory_sink() {
        let sink = MemorySink::new();
        sink.write_image(&screenshot(OutputFormat::Png)).unwrap();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.images()[0].width, 4);
    }
}

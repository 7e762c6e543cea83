//! Pure crop and encode helpers.
//!
//! No OS access here: pixels in, encoded bytes out.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::error::{CaptureError, CaptureResult};
use crate::geometry::PhysicalRect;

pub const MIN_JPEG_QUALITY: u8 = 10;
pub const MAX_JPEG_QUALITY: u8 = 100;

/// Encoding of a captured buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Lossless
    #[default]
    Png,
    Jpeg,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

/// Copy `region` out of `frame`. The region must already lie inside the frame.
pub fn crop(frame: &RgbaImage, region: &PhysicalRect) -> RgbaImage {
    image::imageops::crop_imm(
        frame,
        region.x.max(0) as u32,
        region.y.max(0) as u32,
        region.width,
        region.height,
    )
    .to_image()
}

/// Encode `image` as PNG, or as JPEG at `quality` (clamped to `[10, 100]`).
pub fn encode(image: &RgbaImage, format: OutputFormat, quality: u8) -> CaptureResult<Vec<u8>> {
    if image.width() == 0 || image.height() == 0 {
        return Err(CaptureError::InvalidBounds(
            "cannot encode an empty image".to_string(),
        ));
    }

    let mut bytes: Vec<u8> = Vec::new();
    match format {
        OutputFormat::Png => {
            image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        }
        OutputFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
                let pixel = image.get_pixel(x, y);
                image::Rgb([pixel[0], pixel[1], pixel[2]])
            });
            let mut encoder = JpegEncoder::new_with_quality(&mut bytes, clamp_quality(quality));
            encoder.encode_image(&rgb)?;
        }
    }
    Ok(bytes)
}

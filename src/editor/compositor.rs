//! CPU rasterization of edit operations onto an RGBA buffer.

use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, SwashCache};
use image::{Rgba, RgbaImage};
use log::{debug, info};

use super::color_picker;
use super::operations::{Color, EditOperation, Point};
use crate::error::CaptureResult;
use crate::geometry::PhysicalRect;

/// Smallest mosaic cell edge in pixels
pub const MIN_MOSAIC_BLOCK: u32 = 5;

/// Line advance as a multiple of the font size
pub const LINE_SPACING: f64 = 1.2;

struct TextRasterizer {
    font_system: FontSystem,
    swash_cache: SwashCache,
}

impl TextRasterizer {
    fn new() -> Self {
        let font_system = FontSystem::new();
        info!(
            "Loaded {} font faces for text rendering",
            font_system.db().len()
        );
        Self {
            font_system,
            swash_cache: SwashCache::new(),
        }
    }

    fn has_family(&self, name: &str) -> bool {
        self.font_system.db().faces().any(|face| {
            face.families
                .iter()
                .any(|(family, _)| family.eq_ignore_ascii_case(name))
        })
    }
}

/// Applies edit operations to a raster.
///
/// The font system is loaded on first use, since scanning system fonts is
/// slow and most edits never draw text.
#[derive(Default)]
pub struct ImageCompositor {
    text: Option<TextRasterizer>,
}

impl ImageCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, image: &mut RgbaImage, operation: &EditOperation) {
        match operation {
            EditOperation::Brush {
                color,
                width,
                points,
            } => apply_brush(image, *color, *width, points),
            EditOperation::Text {
                color,
                font_size,
                font_family,
                text,
                position,
            } => self.apply_text(image, *color, *font_size, font_family, text, *position),
            EditOperation::Mosaic { block_size, bounds } => {
                apply_mosaic(image, *block_size, bounds)
            }
        }
    }

    /// Whether any font is available to draw text with.
    pub fn has_fonts(&mut self) -> bool {
        !self.rasterizer().font_system.db().is_empty()
    }

    fn rasterizer(&mut self) -> &mut TextRasterizer {
        self.text.get_or_insert_with(TextRasterizer::new)
    }

    pub fn apply_text(
        &mut self,
        image: &mut RgbaImage,
        color: Color,
        font_size: f64,
        font_family: &str,
        text: &str,
        position: Point,
    ) {
        if text.is_empty() || font_size.is_nan() || font_size <= 0.0 || color.a == 0 {
            return;
        }

        let rasterizer = self.rasterizer();
        let family = if !font_family.is_empty() && rasterizer.has_family(font_family) {
            Family::Name(font_family)
        } else {
            debug!("Font family '{}' unavailable, using sans-serif", font_family);
            Family::SansSerif
        };
        let attrs = Attrs::new().family(family);
        let size = font_size as f32;
        let base = cosmic_text::Color::rgba(color.r, color.g, color.b, color.a);

        let TextRasterizer {
            font_system,
            swash_cache,
        } = rasterizer;

        for (i, line) in text.split('\n').enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let metrics = Metrics::new(size, size * LINE_SPACING as f32);
            let mut buffer = Buffer::new(font_system, metrics);
            buffer.set_text(font_system, line, &attrs, Shaping::Advanced);
            buffer.shape_until_scroll(font_system, false);

            // offset from the buffer top to the first baseline
            let Some(ascent) = buffer.layout_runs().next().map(|run| run.line_y) else {
                continue;
            };
            let baseline = position.y + i as f64 * font_size * LINE_SPACING;
            let origin_x = position.x.round() as i64;
            let origin_y = (baseline - ascent as f64).round() as i64;

            buffer.draw(font_system, swash_cache, base, |x, y, w, h, glyph| {
                let coverage = glyph.a() as f64 / 255.0;
                let paint = [glyph.r(), glyph.g(), glyph.b(), color.a];
                for dy in 0..h as i64 {
                    for dx in 0..w as i64 {
                        blend_at(
                            image,
                            origin_x + x as i64 + dx,
                            origin_y + y as i64 + dy,
                            paint,
                            coverage,
                        );
                    }
                }
            });
        }
    }

    /// Sample the pixel at `(x, y)` as `#RRGGBB`.
    pub fn pick_color(&self, image: &RgbaImage, x: i64, y: i64) -> CaptureResult<String> {
        Ok(color_picker::pick_color(image, x, y)?.to_hex())
    }
}

/// Round-capped, round-joined polyline. Every pixel is blended once with the
/// best coverage of any segment, so overlapping segments never darken.
pub fn apply_brush(image: &mut RgbaImage, color: Color, width: f64, points: &[Point]) {
    if points.len() < 2 || width.is_nan() || width <= 0.0 || color.a == 0 {
        return;
    }

    let operation = EditOperation::Brush {
        color,
        width,
        points: points.to_vec(),
    };
    let Some(area) = operation
        .bounding_box()
        .and_then(|bbox| bbox.clip_to(image.width(), image.height()))
    else {
        return;
    };

    let radius = width / 2.0;
    let paint = color.to_rgba();
    for py in area.y..area.y + area.height as i32 {
        for px in area.x..area.x + area.width as i32 {
            let center = Point::new(px as f64 + 0.5, py as f64 + 0.5);
            let distance = points
                .windows(2)
                .map(|segment| center.distance_to_segment(segment[0], segment[1]))
                .fold(f64::INFINITY, f64::min);

            // one pixel of linear falloff at the edge
            let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
            if coverage > 0.0 {
                blend_at(image, px as i64, py as i64, paint, coverage);
            }
        }
    }
}

/// Pixelate `bounds`. The cell grid is anchored at the bounds origin and cells
/// are clipped to the image; each cell takes the RGB of its top-left pixel and
/// keeps its own alpha values.
pub fn apply_mosaic(image: &mut RgbaImage, block_size: u32, bounds: &PhysicalRect) {
    let block = block_size.max(MIN_MOSAIC_BLOCK) as i64;
    let Some(area) = bounds.clip_to(image.width(), image.height()) else {
        return;
    };
    let (area_right, area_bottom) = (area.right(), area.bottom());
    let (origin_x, origin_y) = (bounds.x as i64, bounds.y as i64);

    // first grid cell touching the clipped area; the grid stays anchored at
    // the bounds origin
    let first_x = origin_x + (area.x as i64 - origin_x) / block * block;
    let first_y = origin_y + (area.y as i64 - origin_y) / block * block;

    let mut cell_y = first_y;
    while cell_y < area_bottom {
        let top = cell_y.max(area.y as i64);
        let bottom = (cell_y + block).min(area_bottom);

        let mut cell_x = first_x;
        while cell_x < area_right {
            let left = cell_x.max(area.x as i64);
            let right = (cell_x + block).min(area_right);

            if left < right && top < bottom {
                let sample = *image.get_pixel(left as u32, top as u32);
                for y in top..bottom {
                    for x in left..right {
                        let pixel = image.get_pixel_mut(x as u32, y as u32);
                        pixel.0[..3].copy_from_slice(&sample.0[..3]);
                    }
                }
            }
            cell_x += block;
        }
        cell_y += block;
    }
}

/// Source-over blend of straight-alpha `paint` scaled by `coverage`.
fn blend_at(image: &mut RgbaImage, x: i64, y: i64, paint: [u8; 4], coverage: f64) {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return;
    }
    let src_a = paint[3] as f64 / 255.0 * coverage;
    if src_a <= 0.0 {
        return;
    }

    let Rgba(dst) = image.get_pixel_mut(x as u32, y as u32);
    let dst_a = dst[3] as f64 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    for channel in 0..3 {
        let src = paint[channel] as f64;
        let below = dst[channel] as f64;
        let out = (src * src_a + below * dst_a * (1.0 - src_a)) / out_a;
        dst[channel] = out.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
}

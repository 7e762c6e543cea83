use image::RgbaImage;

use super::operations::Color;
use crate::error::{CaptureError, CaptureResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PickedColor {
    pub color: Color,
    pub x: u32,
    pub y: u32,
}

impl PickedColor {
    /// `#RRGGBB`, alpha dropped
    pub fn to_hex(&self) -> String {
        format!(
            "#{:02X}{:02X}{:02X}",
            self.color.r, self.color.g, self.color.b
        )
    }

    pub fn to_rgb(&self) -> (u8, u8, u8) {
        (self.color.r, self.color.g, self.color.b)
    }

    pub fn to_rgba(&self) -> (u8, u8, u8, u8) {
        (self.color.r, self.color.g, self.color.b, self.color.a)
    }
}

fn check_bounds(image: &RgbaImage, x: i64, y: i64) -> CaptureResult<(u32, u32)> {
    if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
        return Err(CaptureError::InvalidBounds(format!(
            "({}, {}) is outside the {}x{} image",
            x,
            y,
            image.width(),
            image.height()
        )));
    }
    Ok((x as u32, y as u32))
}

pub fn pick_color(image: &RgbaImage, x: i64, y: i64) -> CaptureResult<PickedColor> {
    let (x, y) = check_bounds(image, x, y)?;
    let [r, g, b, a] = image.get_pixel(x, y).0;
    Ok(PickedColor {
        color: Color::rgba(r, g, b, a),
        x,
        y,
    })
}

/// Mean color of the square of `radius` around the center, clipped to the image.
pub fn pick_average_color(
    image: &RgbaImage,
    center_x: i64,
    center_y: i64,
    radius: u32,
) -> CaptureResult<PickedColor> {
    let (cx, cy) = check_bounds(image, center_x, center_y)?;

    let start_x = cx.saturating_sub(radius);
    let end_x = cx.saturating_add(radius).min(image.width() - 1);
    let start_y = cy.saturating_sub(radius);
    let end_y = cy.saturating_add(radius).min(image.height() - 1);

    let mut totals = [0u64; 4];
    let mut count = 0u64;
    for py in start_y..=end_y {
        for px in start_x..=end_x {
            for (total, channel) in totals.iter_mut().zip(image.get_pixel(px, py).0) {
                *total += channel as u64;
            }
            count += 1;
        }
    }

    let avg = |i: usize| ((totals[i] as f64 / count as f64).round()) as u8;
    Ok(PickedColor {
        color: Color::rgba(avg(0), avg(1), avg(2), avg(3)),
        x: cx,
        y: cy,
    })
}

#[derive(Clone, Debug, Default)]
pub struct ColorPickerState {
    pub picked_color: Option<PickedColor>,
    pub is_active: bool,
}

impl ColorPickerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    pub fn set_picked_color(&mut self, color: PickedColor) {
        self.picked_color = Some(color);
    }

    pub fn clear(&mut self) {
        self.picked_color = None;
    }

    pub fn get_color(&self) -> Option<Color> {
        self.picked_color.map(|picked| picked.color)
    }
}

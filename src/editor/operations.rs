//! Edit operations recorded by the history and replayed by the compositor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::PhysicalRect;

/// Straight (non-premultiplied) RGBA color, serialized as `#RRGGBB[AA]`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`; the leading `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_rgba(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::RED
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value).ok_or_else(|| format!("invalid color '{}'", value))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// A point in image (physical pixel) coordinates
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Distance from this point to the segment `a`-`b`.
    pub fn distance_to_segment(&self, a: Point, b: Point) -> f64 {
        let dx = b.x - a.x;
        let dy = b.y - a.y;
        let length_sq = dx * dx + dy * dy;

        if length_sq == 0.0 {
            return (self.x - a.x).hypot(self.y - a.y);
        }

        let t = (((self.x - a.x) * dx + (self.y - a.y) * dy) / length_sq).clamp(0.0, 1.0);
        let proj_x = a.x + t * dx;
        let proj_y = a.y + t * dy;
        (self.x - proj_x).hypot(self.y - proj_y)
    }
}

/// One irreversible pixel mutation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditOperation {
    /// Freehand stroke with round caps and joins
    #[serde(rename_all = "camelCase")]
    Brush {
        color: Color,
        width: f64,
        points: Vec<Point>,
    },
    /// Left-aligned text; `position` is the first line's baseline origin
    #[serde(rename_all = "camelCase")]
    Text {
        color: Color,
        font_size: f64,
        font_family: String,
        text: String,
        position: Point,
    },
    /// Pixelation of `bounds` in cells of `block_size` pixels
    #[serde(rename_all = "camelCase")]
    Mosaic { block_size: u32, bounds: PhysicalRect },
}

impl EditOperation {
    pub fn kind(&self) -> &'static str {
        match self {
            EditOperation::Brush { .. } => "brush",
            EditOperation::Text { .. } => "text",
            EditOperation::Mosaic { .. } => "mosaic",
        }
    }

    /// Pixel area the operation can touch, if it is known without shaping text.
    pub fn bounding_box(&self) -> Option<PhysicalRect> {
        match self {
            EditOperation::Brush { width, points, .. } => {
                let first = points.first()?;
                let (mut min_x, mut min_y, mut max_x, mut max_y) =
                    (first.x, first.y, first.x, first.y);
                for point in points {
                    min_x = min_x.min(point.x);
                    min_y = min_y.min(point.y);
                    max_x = max_x.max(point.x);
                    max_y = max_y.max(point.y);
                }
                let pad = width / 2.0 + 1.0;
                let x = (min_x - pad).floor();
                let y = (min_y - pad).floor();
                Some(PhysicalRect::new(
                    x as i32,
                    y as i32,
                    ((max_x + pad).ceil() - x).max(0.0) as u32,
                    ((max_y + pad).ceil() - y).max(0.0) as u32,
                ))
            }
            EditOperation::Mosaic { bounds, .. } => Some(*bounds),
            EditOperation::Text { .. } => None,
        }
    }
}

/// An operation as stored in the history, stamped with a monotonic sequence id
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EditRecord {
    pub sequence: u64,
    pub operation: EditOperation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_hex() {
        assert_eq!(Color::from_hex("#FF8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(Color::from_hex("ff800080"), Some(Color::rgba(255, 128, 0, 128)));
        assert_eq!(Color::from_hex("#FF80"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn test_operation_json() {
        let op = EditOperation::Text {
            color: Color::WHITE,
            font_size: 24.0,
            font_family: "Sans".to_string(),
            text: "hi".to_string(),
            position: Point::new(10.0, 20.0),
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["color"], "#FFFFFF");
        assert_eq!(json["fontSize"], 24.0);

        let back: EditOperation = serde_json::from_value(json).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn test_distance_to_segment() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert_eq!(Point::new(5.0, 3.0).distance_to_segment(a, b), 3.0);
        assert_eq!(Point::new(-4.0, 3.0).distance_to_segment(a, b), 5.0);
        assert_eq!(Point::new(3.0, 4.0).distance_to_segment(a, a), 5.0);
    }

    #[test]
    fn test_brush_bounding_box() {
        let op = EditOperation::Brush {
            color: Color::RED,
            width: 4.0,
            points: vec![Point::new(10.0, 10.0), Point::new(20.0, 30.0)],
        };
        assert_eq!(op.bounding_box(), Some(PhysicalRect::new(7, 7, 16, 26)));

        let empty = EditOperation::Brush {
            color: Color::RED,
            width: 4.0,
            points: vec![],
        };
        assert_eq!(empty.bounding_box(), None);
    }
}

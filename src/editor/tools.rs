use super::compositor::MIN_MOSAIC_BLOCK;
use super::operations::{Color, EditOperation, Point};
use crate::geometry::PhysicalRect;

/// The active editing tool
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditorTool {
    #[default]
    Brush,
    Text,
    Mosaic,
    ColorPicker,
}

/// State for the editor tools
#[derive(Clone, Debug)]
pub struct ToolState {
    /// Currently active tool
    pub active_tool: EditorTool,
    /// Current drawing color
    pub color: Color,
    /// Current line width for the brush
    pub line_width: f64,
    /// Current font size for text tool
    pub font_size: f64,
    pub font_family: String,
    /// Cell edge for the mosaic tool
    pub mosaic_block_size: u32,
    /// Whether the user is currently drawing/dragging
    pub is_drawing: bool,
    /// Points collected by the current brush stroke
    pub stroke: Vec<Point>,
    /// Start position of current drag operation
    pub drag_start: Option<Point>,
    /// Current position during drag
    pub drag_current: Option<Point>,
}

impl Default for ToolState {
    fn default() -> Self {
        Self {
            active_tool: EditorTool::Brush,
            color: Color::RED,
            line_width: 3.0,
            font_size: 24.0,
            font_family: "Sans".to_string(),
            mosaic_block_size: 10,
            is_drawing: false,
            stroke: Vec::new(),
            drag_start: None,
            drag_current: None,
        }
    }
}

impl ToolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tool(&mut self, tool: EditorTool) {
        self.active_tool = tool;
        self.reset_drag();
    }

    pub fn set_color(&mut self, color: Color) {
        self.color = color;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = width.clamp(1.0, 50.0);
    }

    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = size.clamp(8.0, 200.0);
    }

    pub fn set_font_family(&mut self, family: impl Into<String>) {
        self.font_family = family.into();
    }

    pub fn set_mosaic_block_size(&mut self, size: u32) {
        self.mosaic_block_size = size.max(MIN_MOSAIC_BLOCK);
    }

    pub fn start_drag(&mut self, x: f64, y: f64) {
        let point = Point::new(x, y);
        self.is_drawing = true;
        self.drag_start = Some(point);
        self.drag_current = Some(point);
        self.stroke.clear();
        if self.active_tool == EditorTool::Brush {
            self.stroke.push(point);
        }
    }

    pub fn update_drag(&mut self, x: f64, y: f64) {
        if !self.is_drawing {
            return;
        }
        let point = Point::new(x, y);
        self.drag_current = Some(point);
        if self.active_tool == EditorTool::Brush && self.stroke.last() != Some(&point) {
            self.stroke.push(point);
        }
    }

    /// Finish the drag, producing the operation it describes, if any.
    pub fn end_drag(&mut self) -> Option<EditOperation> {
        if !self.is_drawing {
            return None;
        }

        let operation = match self.active_tool {
            EditorTool::Brush if self.stroke.len() >= 2 => Some(EditOperation::Brush {
                color: self.color,
                width: self.line_width,
                points: std::mem::take(&mut self.stroke),
            }),
            EditorTool::Mosaic => self
                .get_drag_rect()
                .filter(|bounds| !bounds.is_empty())
                .map(|bounds| EditOperation::Mosaic {
                    block_size: self.mosaic_block_size,
                    bounds,
                }),
            _ => None,
        };

        self.reset_drag();
        operation
    }

    /// A text stamp at `(x, y)` with the current color and font.
    pub fn text_operation(&self, x: f64, y: f64, text: &str) -> Option<EditOperation> {
        if text.is_empty() {
            return None;
        }
        Some(EditOperation::Text {
            color: self.color,
            font_size: self.font_size,
            font_family: self.font_family.clone(),
            text: text.to_string(),
            position: Point::new(x, y),
        })
    }

    pub fn reset_drag(&mut self) {
        self.is_drawing = false;
        self.drag_start = None;
        self.drag_current = None;
        self.stroke.clear();
    }

    /// Get current drag rectangle in whole pixels (normalized to positive width/height)
    pub fn get_drag_rect(&self) -> Option<PhysicalRect> {
        let (start, current) = (self.drag_start?, self.drag_current?);
        let left = start.x.min(current.x).floor();
        let top = start.y.min(current.y).floor();
        let right = start.x.max(current.x).ceil();
        let bottom = start.y.max(current.y).ceil();
        Some(PhysicalRect::new(
            left as i32,
            top as i32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

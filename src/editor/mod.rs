//! Lightweight post-capture editing.
//!
//! [`EditorSession`] owns the buffer of one region capture and drives the
//! [`EditCommandStack`]; the stack hands each operation to the
//! [`ImageCompositor`].

pub mod clipboard;
pub mod color_picker;
pub mod compositor;
pub mod history;
pub mod operations;
pub mod tools;

pub use clipboard::{ClipboardSink, FileSink, MemorySink, SystemClipboard};
pub use color_picker::{pick_average_color, pick_color, ColorPickerState, PickedColor};
pub use compositor::ImageCompositor;
pub use history::EditCommandStack;
pub use operations::{Color, EditOperation, EditRecord, Point};
pub use tools::{EditorTool, ToolState};

use std::time::SystemTime;

use image::RgbaImage;
use log::{debug, info};

use crate::app::config::{Action, KeyChord, ShortcutConfig};
use crate::capture::{encode, OutputFormat, ScreenshotData};
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::LogicalRect;

/// Receives region captures for editing.
pub trait EditorHost {
    fn open(&mut self, screenshot: ScreenshotData, selection: LogicalRect) -> CaptureResult<()>;
}

/// What the editor was opened with
struct Loaded {
    stack: EditCommandStack,
    source_display_id: Option<u32>,
    scale_factor: f64,
    selection: Option<LogicalRect>,
}

pub struct EditorSession {
    pub tool_state: ToolState,

    pub color_picker: ColorPickerState,

    loaded: Option<Loaded>,

    pub display_scale: f64,
    pub display_offset_x: f64,
    pub display_offset_y: f64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self {
            tool_state: ToolState::default(),
            color_picker: ColorPickerState::new(),
            loaded: None,
            display_scale: 1.0,
            display_offset_x: 0.0,
            display_offset_y: 0.0,
        }
    }
}

impl EditorSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `screenshot` and start a fresh history on it.
    pub fn load(
        &mut self,
        screenshot: &ScreenshotData,
        selection: Option<LogicalRect>,
    ) -> CaptureResult<()> {
        let image = screenshot.decode()?;
        info!(
            "Editor loaded {}x{} image from display {:?}",
            image.width(),
            image.height(),
            screenshot.source_display_id
        );
        self.load_image(image);
        if let Some(loaded) = self.loaded.as_mut() {
            loaded.source_display_id = screenshot.source_display_id;
            loaded.scale_factor = screenshot.scale_factor;
            loaded.selection = selection;
        }
        Ok(())
    }

    /// Start editing a raw buffer.
    pub fn load_image(&mut self, image: RgbaImage) {
        self.tool_state.reset_drag();
        self.color_picker.clear();
        self.loaded = Some(Loaded {
            stack: EditCommandStack::new(image),
            source_display_id: None,
            scale_factor: 1.0,
            selection: None,
        });
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    fn loaded(&self) -> CaptureResult<&Loaded> {
        self.loaded.as_ref().ok_or(CaptureError::EditorNotInitialized)
    }

    fn stack_mut(&mut self) -> CaptureResult<&mut EditCommandStack> {
        self.loaded
            .as_mut()
            .map(|loaded| &mut loaded.stack)
            .ok_or(CaptureError::EditorNotInitialized)
    }

    pub fn history(&self) -> CaptureResult<&EditCommandStack> {
        Ok(&self.loaded()?.stack)
    }

    pub fn image(&self) -> CaptureResult<&RgbaImage> {
        Ok(self.loaded()?.stack.current())
    }

    /// The selection the capture was made from, in global logical pixels.
    pub fn selection(&self) -> Option<LogicalRect> {
        self.loaded.as_ref().and_then(|loaded| loaded.selection)
    }

    pub fn push(&mut self, operation: EditOperation) -> CaptureResult<u64> {
        Ok(self.stack_mut()?.push(operation))
    }

    pub fn undo(&mut self) -> CaptureResult<()> {
        debug!("Undo operation requested");
        self.stack_mut()?.undo()
    }

    pub fn redo(&mut self) -> CaptureResult<()> {
        debug!("Redo operation requested");
        self.stack_mut()?.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.history().map(|stack| stack.can_undo()).unwrap_or(false)
    }

    pub fn can_redo(&self) -> bool {
        self.history().map(|stack| stack.can_redo()).unwrap_or(false)
    }

    pub fn set_tool(&mut self, tool: EditorTool) {
        debug!("Setting tool to {:?}", tool);
        self.tool_state.set_tool(tool);
        if tool == EditorTool::ColorPicker {
            self.color_picker.activate();
        } else {
            self.color_picker.deactivate();
        }
    }

    pub fn current_tool(&self) -> EditorTool {
        self.tool_state.active_tool
    }

    pub fn set_color(&mut self, color: Color) {
        debug!("Setting color to {}", color);
        self.tool_state.set_color(color);
    }

    pub fn current_color(&self) -> Color {
        self.tool_state.color
    }

    pub fn update_display_transform(&mut self, scale: f64, offset_x: f64, offset_y: f64) {
        self.display_scale = scale;
        self.display_offset_x = offset_x;
        self.display_offset_y = offset_y;
    }

    pub fn display_to_image_coords(&self, display_x: f64, display_y: f64) -> (f64, f64) {
        let img_x = (display_x - self.display_offset_x) / self.display_scale;
        let img_y = (display_y - self.display_offset_y) / self.display_scale;
        (img_x, img_y)
    }

    pub fn image_to_display_coords(&self, img_x: f64, img_y: f64) -> (f64, f64) {
        let display_x = img_x * self.display_scale + self.display_offset_x;
        let display_y = img_y * self.display_scale + self.display_offset_y;
        (display_x, display_y)
    }

    /// Pointer pressed on the canvas, in canvas coordinates.
    pub fn pointer_down(&mut self, display_x: f64, display_y: f64) -> CaptureResult<()> {
        let (img_x, img_y) = self.display_to_image_coords(display_x, display_y);

        if self.tool_state.active_tool == EditorTool::ColorPicker {
            let picked = pick_color(self.image()?, img_x.floor() as i64, img_y.floor() as i64)?;
            debug!("Picked {} at ({}, {})", picked.to_hex(), picked.x, picked.y);
            self.color_picker.set_picked_color(picked);
            self.tool_state.set_color(picked.color);
            return Ok(());
        }

        self.loaded()?;
        self.tool_state.start_drag(img_x, img_y);
        Ok(())
    }

    pub fn pointer_move(&mut self, display_x: f64, display_y: f64) {
        let (img_x, img_y) = self.display_to_image_coords(display_x, display_y);
        self.tool_state.update_drag(img_x, img_y);
    }

    /// Pointer released; records whatever the drag produced.
    pub fn pointer_up(&mut self, display_x: f64, display_y: f64) -> CaptureResult<Option<u64>> {
        self.pointer_move(display_x, display_y);
        match self.tool_state.end_drag() {
            Some(operation) => self.push(operation).map(Some),
            None => Ok(None),
        }
    }

    /// Stamp `text` at a canvas position with the current font settings.
    pub fn commit_text(
        &mut self,
        display_x: f64,
        display_y: f64,
        text: &str,
    ) -> CaptureResult<Option<u64>> {
        debug!("Committing text: {}", text);
        let (img_x, img_y) = self.display_to_image_coords(display_x, display_y);
        match self.tool_state.text_operation(img_x, img_y, text) {
            Some(operation) => self.push(operation).map(Some),
            None => Ok(None),
        }
    }

    /// Encode the edited buffer, carrying over the capture's metadata.
    pub fn export(&self, format: OutputFormat, quality: u8) -> CaptureResult<ScreenshotData> {
        let loaded = self.loaded()?;
        let image = loaded.stack.current();
        Ok(ScreenshotData {
            buffer: encode::encode(image, format, quality)?,
            format,
            width: image.width(),
            height: image.height(),
            source_display_id: loaded.source_display_id,
            scale_factor: loaded.scale_factor,
            timestamp: SystemTime::now(),
            bounds_clamped: false,
        })
    }

    /// Hand the edited image, as PNG, to `sink`.
    pub fn save_to_clipboard(&self, sink: &dyn ClipboardSink) -> CaptureResult<ScreenshotData> {
        let data = self.export(OutputFormat::Png, encode::MAX_JPEG_QUALITY)?;
        sink.write_image(&data)?;
        info!("Edited image handed to sink ({}x{})", data.width, data.height);
        Ok(data)
    }

    /// Run the editor binding for `chord`. Undo, redo and copy are handled
    /// here, copy writing to `clipboard`; every other action is returned for
    /// the host to act on.
    pub fn handle_key(
        &mut self,
        chord: KeyChord,
        shortcuts: &ShortcutConfig,
        clipboard: &dyn ClipboardSink,
    ) -> CaptureResult<Option<Action>> {
        let Some(action) = shortcuts.get_action(chord) else {
            return Ok(None);
        };
        debug!("{} -> {}", chord, action.label());

        match action {
            Action::Undo => self.undo()?,
            Action::Redo => self.redo()?,
            Action::Copy => {
                self.save_to_clipboard(clipboard)?;
            }
            Action::Cancel | Action::Confirm | Action::Save => {}
        }
        Ok(Some(action))
    }

    pub fn reset(&mut self) {
        debug!("Resetting editor state");
        self.loaded = None;
        self.color_picker.clear();
        self.tool_state.reset_drag();
    }
}

impl EditorHost for EditorSession {
    fn open(&mut self, screenshot: ScreenshotData, selection: LogicalRect) -> CaptureResult<()> {
        self.load(&screenshot, Some(selection))
    }
}

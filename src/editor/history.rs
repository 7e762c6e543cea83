//! Truncating edit history with full-replay undo.
//!
//! Operations such as mosaic destroy information, so undo never tries to
//! invert a step. The buffer is rebuilt from the untouched origin by replaying
//! every operation up to the cursor instead.

use image::RgbaImage;
use log::debug;

use super::compositor::ImageCompositor;
use super::operations::{EditOperation, EditRecord};
use crate::capture::encode;
use crate::capture::OutputFormat;
use crate::error::{CaptureError, CaptureResult};

pub struct EditCommandStack {
    origin: RgbaImage,
    current: RgbaImage,
    records: Vec<EditRecord>,
    /// Number of records reflected in `current`
    applied: usize,
    next_sequence: u64,
    compositor: ImageCompositor,
}

impl EditCommandStack {
    pub fn new(origin: RgbaImage) -> Self {
        Self::with_compositor(origin, ImageCompositor::new())
    }

    pub fn with_compositor(origin: RgbaImage, compositor: ImageCompositor) -> Self {
        Self {
            current: origin.clone(),
            origin,
            records: Vec::new(),
            applied: 0,
            next_sequence: 0,
            compositor,
        }
    }

    /// Record and apply an operation, dropping anything that could have been
    /// redone. Returns the operation's sequence id.
    pub fn push(&mut self, operation: EditOperation) -> u64 {
        if self.applied < self.records.len() {
            debug!(
                "Discarding {} redoable operation(s)",
                self.records.len() - self.applied
            );
            self.records.truncate(self.applied);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.compositor.apply(&mut self.current, &operation);
        debug!("Applied {} operation #{}", operation.kind(), sequence);

        self.records.push(EditRecord {
            sequence,
            operation,
        });
        self.applied = self.records.len();
        sequence
    }

    pub fn undo(&mut self) -> CaptureResult<()> {
        if self.applied == 0 {
            return Err(CaptureError::NothingToUndo);
        }
        self.applied -= 1;
        self.rebuild();
        debug!("Undo, {} operation(s) applied", self.applied);
        Ok(())
    }

    pub fn redo(&mut self) -> CaptureResult<()> {
        if self.applied >= self.records.len() {
            return Err(CaptureError::NothingToRedo);
        }
        self.applied += 1;
        self.rebuild();
        debug!("Redo, {} operation(s) applied", self.applied);
        Ok(())
    }

    fn rebuild(&mut self) {
        self.current = self.origin.clone();
        for record in &self.records[..self.applied] {
            self.compositor.apply(&mut self.current, &record.operation);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.applied > 0
    }

    pub fn can_redo(&self) -> bool {
        self.applied < self.records.len()
    }

    /// Index of the last applied record, `None` when nothing is applied.
    pub fn cursor(&self) -> Option<usize> {
        self.applied.checked_sub(1)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every record, including the redoable tail.
    pub fn records(&self) -> &[EditRecord] {
        &self.records
    }

    /// The records reflected in the current buffer.
    pub fn applied(&self) -> &[EditRecord] {
        &self.records[..self.applied]
    }

    pub fn current(&self) -> &RgbaImage {
        &self.current
    }

    pub fn origin(&self) -> &RgbaImage {
        &self.origin
    }

    /// Start over from a new origin with an empty history.
    pub fn reset(&mut self, origin: RgbaImage) {
        debug!("Edit history reset");
        self.current = origin.clone();
        self.origin = origin;
        self.records.clear();
        self.applied = 0;
    }

    pub fn encode_png(&self) -> CaptureResult<Vec<u8>> {
        encode::encode(&self.current, OutputFormat::Png, encode::MAX_JPEG_QUALITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::operations::{Color, Point};
    use crate::geometry::PhysicalRect;
    use image::Rgba;

    fn origin() -> RgbaImage {
        RgbaImage::from_fn(64, 48, |x, y| {
            Rgba([(x * 4) as u8, (y * 5) as u8, ((x * y) % 256) as u8, 255])
        })
    }

    fn mosaic(x: i32) -> EditOperation {
        EditOperation::Mosaic {
            block_size: 6,
            bounds: PhysicalRect::new(x, 4, 30, 30),
        }
    }

    fn stroke() -> EditOperation {
        EditOperation::Brush {
            color: Color::rgba(0, 200, 0, 180),
            width: 5.0,
            points: vec![
                Point::new(3.0, 3.0),
                Point::new(40.0, 20.0),
                Point::new(10.0, 44.0),
            ],
        }
    }

    #[test]
    fn test_undo_on_empty_history() {
        let mut stack = EditCommandStack::new(origin());
        assert_eq!(stack.undo(), Err(CaptureError::NothingToUndo));
        assert_eq!(stack.redo(), Err(CaptureError::NothingToRedo));
        assert_eq!(stack.cursor(), None);
    }

    #[test]
    fn test_redo_at_tip() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(stroke());
        assert_eq!(stack.redo(), Err(CaptureError::NothingToRedo));
        assert_eq!(stack.cursor(), Some(0));
    }

    #[test]
    fn test_undo_restores_origin() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(mosaic(0));
        assert_ne!(stack.current(), stack.origin());

        stack.undo().unwrap();
        assert_eq!(stack.current(), &origin());
        assert!(stack.can_redo());
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_push_after_undo_drops_redo_tail() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(stroke());
        stack.push(mosaic(0));
        stack.undo().unwrap();

        let sequence = stack.push(mosaic(20));
        assert_eq!(sequence, 2);
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.redo(), Err(CaptureError::NothingToRedo));

        let kept: Vec<_> = stack.records().iter().map(|r| r.operation.clone()).collect();
        assert_eq!(kept, vec![stroke(), mosaic(20)]);
    }

    #[test]
    fn test_undo_redo_cycles_are_byte_identical() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(stroke());
        stack.push(mosaic(8));
        stack.push(mosaic(0));
        let tip = stack.current().clone();

        for _ in 0..5 {
            for _ in 0..3 {
                stack.undo().unwrap();
            }
            assert_eq!(stack.current(), &origin());
            for _ in 0..3 {
                stack.redo().unwrap();
            }
            assert_eq!(stack.current(), &tip);
        }
    }

    #[test]
    fn test_replay_matches_incremental_application() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(mosaic(0));
        stack.push(stroke());
        let incremental = stack.current().clone();

        stack.undo().unwrap();
        stack.redo().unwrap();
        assert_eq!(stack.current(), &incremental);
    }

    #[test]
    fn test_reset() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(stroke());
        let blank = RgbaImage::new(8, 8);
        stack.reset(blank.clone());
        assert!(stack.is_empty());
        assert_eq!(stack.current(), &blank);
        assert_eq!(stack.undo(), Err(CaptureError::NothingToUndo));
    }

    #[test]
    fn test_encode_png() {
        let mut stack = EditCommandStack::new(origin());
        stack.push(stroke());
        let png = stack.encode_png().unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(&decoded, stack.current());
    }
}

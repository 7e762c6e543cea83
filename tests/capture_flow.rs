use std::sync::Arc;
use std::time::Duration;

use image::Rgba;

use screensnap::app::config::{Key, KeyChord};
use screensnap::capture::{MemoryBackend, MemoryWindow, SourceFilter, SourceKind};
use screensnap::editor::{Color, EditOperation, EditorSession, EditorTool, MemorySink, Point};
use screensnap::overlay::Transition;
use screensnap::{
    AllowAll, CaptureConfig, CaptureError, CaptureMode, CaptureOptions, Display, LogicalPoint,
    LogicalRect, OutputFormat, OverlayEvent, PhysicalRect, ScreenshotApp, SelectionOutcome,
};

fn topology() -> Vec<Display> {
    vec![
        Display::new(1, "built-in", LogicalRect::new(0.0, 0.0, 200.0, 100.0), 2.0, true),
        Display::new(2, "external", LogicalRect::new(200.0, 0.0, 100.0, 100.0), 1.5, false),
    ]
}

fn app_with(config: CaptureConfig) -> (Arc<MemoryBackend>, ScreenshotApp) {
    let backend = Arc::new(MemoryBackend::new(topology()));
    let app = ScreenshotApp::new(backend.clone(), AllowAll, config).unwrap();
    (backend, app)
}

fn unthrottled() -> CaptureConfig {
    CaptureConfig::default().with_min_capture_interval(Duration::ZERO)
}

#[test]
fn test_region_selection_to_edited_clipboard_image() {
    let (_, app) = app_with(unthrottled());
    let selection = app.begin_region_selection().unwrap();

    // the built-in display sees a click that never becomes a drag
    selection
        .handle_event(1, OverlayEvent::PointerDown(LogicalPoint::new(5.0, 5.0)))
        .unwrap();

    selection
        .handle_event(2, OverlayEvent::PointerDown(LogicalPoint::new(10.0, 10.0)))
        .unwrap();
    selection
        .handle_event(2, OverlayEvent::PointerMove(LogicalPoint::new(30.0, 25.0)))
        .unwrap();
    let transition = selection
        .handle_event(2, OverlayEvent::PointerUp(LogicalPoint::new(50.0, 40.0)))
        .unwrap();
    assert_eq!(
        transition,
        Transition::Completed(LogicalRect::new(210.0, 10.0, 40.0, 30.0))
    );

    // late input on the other overlay is swallowed
    let late = selection
        .handle_event(1, OverlayEvent::PointerUp(LogicalPoint::new(80.0, 80.0)))
        .unwrap();
    assert_eq!(late, Transition::Ignored);

    let outcome = selection.wait();
    let mut editor = EditorSession::new();
    assert!(app.capture_region_to_editor(&outcome, &mut editor).unwrap());

    let captured = editor.image().unwrap().clone();
    assert_eq!(captured.dimensions(), (60, 45));
    // the external display's frame, cropped at physical (15, 15)
    assert_eq!(*captured.get_pixel(0, 0), Rgba([15, 15, 80, 255]));
    assert_eq!(
        editor.selection(),
        Some(LogicalRect::new(210.0, 10.0, 40.0, 30.0))
    );

    editor.set_tool(EditorTool::Mosaic);
    editor.pointer_down(0.0, 0.0).unwrap();
    editor.pointer_move(20.0, 20.0);
    assert_eq!(editor.pointer_up(30.0, 30.0).unwrap(), Some(0));
    let mosaicked = editor.image().unwrap().clone();
    assert_ne!(mosaicked, captured);

    editor
        .push(EditOperation::Brush {
            color: Color::RED,
            width: 4.0,
            points: vec![Point::new(0.0, 40.0), Point::new(59.0, 40.0)],
        })
        .unwrap();
    assert_eq!(*editor.image().unwrap().get_pixel(30, 40), Rgba([255, 0, 0, 255]));

    editor.undo().unwrap();
    assert_eq!(editor.image().unwrap(), &mosaicked);
    editor.undo().unwrap();
    assert_eq!(editor.image().unwrap(), &captured);
    assert_eq!(editor.undo(), Err(CaptureError::NothingToUndo));

    editor.redo().unwrap();
    assert_eq!(editor.image().unwrap(), &mosaicked);

    let sink = MemorySink::new();
    let exported = editor.save_to_clipboard(&sink).unwrap();
    assert_eq!(exported.format, OutputFormat::Png);
    assert_eq!(exported.source_display_id, Some(2));
    assert_eq!(sink.len(), 1);
    assert_eq!(sink.images()[0].decode().unwrap(), mosaicked);
}

#[test]
fn test_escape_cancels_every_overlay() {
    let (_, app) = app_with(unthrottled());
    let selection = app.begin_region_selection().unwrap();

    selection
        .handle_event(2, OverlayEvent::PointerDown(LogicalPoint::new(10.0, 10.0)))
        .unwrap();
    let transition = selection
        .handle_event(1, OverlayEvent::Key(KeyChord::plain(Key::Escape)))
        .unwrap();
    assert_eq!(transition, Transition::Cancelled);
    assert!(selection.is_finished());

    let outcome = selection.wait();
    assert_eq!(
        outcome,
        SelectionOutcome::Cancelled {
            display_id: Some(1)
        }
    );

    let mut editor = EditorSession::new();
    assert!(!app.capture_region_to_editor(&outcome, &mut editor).unwrap());
    assert!(!editor.is_loaded());
}

#[test]
fn test_back_to_back_captures_are_throttled() {
    let (_, app) = app_with(CaptureConfig::default());
    let options = CaptureOptions::default();

    let first = app
        .take_screenshot(CaptureMode::Fullscreen, &options)
        .unwrap();
    assert_eq!((first.width, first.height), (400, 200));

    match app.take_screenshot(CaptureMode::Fullscreen, &options) {
        Err(CaptureError::TooFrequent { retry_after_ms }) => {
            assert!(retry_after_ms > 0 && retry_after_ms <= 200);
        }
        other => panic!("expected TooFrequent, got {:?}", other.map(|d| d.width)),
    }

    std::thread::sleep(Duration::from_millis(220));
    assert!(app.take_screenshot(CaptureMode::Fullscreen, &options).is_ok());
}

#[test]
fn test_region_bounds_are_clamped_to_the_display() {
    let (_, app) = app_with(unthrottled());
    let options = CaptureOptions {
        display_id: Some(2),
        bounds: Some(PhysicalRect::new(100, 100, 200, 200)),
        format: OutputFormat::Jpeg,
        quality: Some(80),
        ..CaptureOptions::default()
    };

    let shot = app.take_screenshot(CaptureMode::Region, &options).unwrap();
    assert_eq!((shot.width, shot.height), (50, 50));
    assert!(shot.bounds_clamped);
    assert_eq!(&shot.buffer[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_window_capture_and_listing() {
    let (backend, app) = app_with(unthrottled());
    backend.add_window(MemoryWindow {
        id: 7,
        title: "Terminal".to_string(),
        display_id: Some(1),
        frame: image::RgbaImage::from_pixel(32, 24, Rgba([1, 2, 3, 255])),
    });

    let windows = app.sources(&SourceFilter::windows()).unwrap();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].id, SourceKind::Window.source_id(7));

    let options = CaptureOptions {
        source_id: Some(windows[0].id.clone()),
        ..CaptureOptions::default()
    };
    let sink = MemorySink::new();
    let shot = app
        .capture_to_clipboard(CaptureMode::Window, &options, &sink)
        .unwrap();
    assert_eq!((shot.width, shot.height), (32, 24));
    assert_eq!(sink.len(), 1);

    let missing = CaptureOptions {
        source_id: Some(SourceKind::Window.source_id(99)),
        ..CaptureOptions::default()
    };
    assert!(matches!(
        app.take_screenshot(CaptureMode::Window, &missing),
        Err(CaptureError::SourceNotFound(_))
    ));
}

#[test]
fn test_topology_change_drops_removed_display() {
    let (backend, app) = app_with(unthrottled());
    backend.set_displays(vec![Display::new(
        1,
        "built-in",
        LogicalRect::new(0.0, 0.0, 200.0, 100.0),
        2.0,
        true,
    )]);
    assert_eq!(app.on_topology_changed().unwrap(), 1);

    let options = CaptureOptions {
        display_id: Some(2),
        ..CaptureOptions::default()
    };
    assert_eq!(
        app.take_screenshot(CaptureMode::Fullscreen, &options).err(),
        Some(CaptureError::DisplayNotFound(Some(2)))
    );
}

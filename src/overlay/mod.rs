//! Multi-display region selection.
//!
//! A region request opens one overlay per display. Every overlay runs its own
//! [`SelectionSession`], and the first one to complete or cancel settles the
//! shared [`CompletionLatch`]; the rest are closed without reporting.

pub mod latch;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;

pub use latch::{CompletionLatch, SelectionOutcome};
pub use session::{SelectionSession, SessionState, Transition};

use crate::app::config::{Action, CaptureConfig, KeyChord, ShortcutConfig};
use crate::display::Display;
use crate::error::{CaptureError, CaptureResult};
use crate::geometry::LogicalPoint;

/// Input delivered to one overlay surface, in surface-local logical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    PointerDown(LogicalPoint),
    PointerMove(LogicalPoint),
    PointerUp(LogicalPoint),
    Key(KeyChord),
}

struct Surfaces {
    sessions: Vec<SelectionSession>,
    settled: bool,
}

pub struct RegionSelection {
    surfaces: Mutex<Surfaces>,
    latch: Arc<CompletionLatch>,
    shortcuts: ShortcutConfig,
}

impl RegionSelection {
    /// Open one session per display.
    pub fn start(
        displays: &[Display],
        config: &CaptureConfig,
        shortcuts: ShortcutConfig,
    ) -> CaptureResult<Self> {
        Self::with_latch(displays, config, shortcuts, CompletionLatch::new())
    }

    /// Like [`start`](Self::start), handing the outcome to `callback` once.
    pub fn with_callback(
        displays: &[Display],
        config: &CaptureConfig,
        shortcuts: ShortcutConfig,
        callback: impl FnOnce(&SelectionOutcome) + Send + 'static,
    ) -> CaptureResult<Self> {
        Self::with_latch(
            displays,
            config,
            shortcuts,
            CompletionLatch::with_callback(callback),
        )
    }

    fn with_latch(
        displays: &[Display],
        config: &CaptureConfig,
        shortcuts: ShortcutConfig,
        latch: CompletionLatch,
    ) -> CaptureResult<Self> {
        if displays.is_empty() {
            return Err(CaptureError::DisplayNotFound(None));
        }

        let sessions = displays
            .iter()
            .map(|display| SelectionSession::new(display.clone(), config.min_selection_size))
            .collect::<Vec<_>>();
        info!("Region selection started on {} display(s)", sessions.len());

        Ok(Self {
            surfaces: Mutex::new(Surfaces {
                sessions,
                settled: false,
            }),
            latch: Arc::new(latch),
            shortcuts,
        })
    }

    /// Route an event to the overlay on `display_id`.
    pub fn handle_event(&self, display_id: u32, event: OverlayEvent) -> CaptureResult<Transition> {
        self.drive(display_id, |session, shortcuts| match event {
            OverlayEvent::PointerDown(point) => session.pointer_down(point),
            OverlayEvent::PointerMove(point) => session.pointer_move(point),
            OverlayEvent::PointerUp(point) => session.pointer_up(point),
            OverlayEvent::Key(chord) => match shortcuts.get_action(chord) {
                Some(Action::Cancel) => session.cancel(),
                _ => Transition::Ignored,
            },
        })
    }

    /// The overlay on `display_id` went away before the request settled.
    pub fn surface_destroyed(&self, display_id: u32) -> CaptureResult<Transition> {
        debug!("Overlay surface on display {} destroyed", display_id);
        self.drive(display_id, |session, _| session.cancel())
    }

    fn drive(
        &self,
        display_id: u32,
        step: impl FnOnce(&mut SelectionSession, &ShortcutConfig) -> Transition,
    ) -> CaptureResult<Transition> {
        let (transition, outcome) = {
            let mut surfaces = self.surfaces.lock();
            let settled = surfaces.settled;
            let index = surfaces
                .sessions
                .iter()
                .position(|session| session.display().id == display_id)
                .ok_or(CaptureError::DisplayNotFound(Some(display_id)))?;

            let session = &mut surfaces.sessions[index];
            if settled {
                session.force_close();
                return Ok(Transition::Ignored);
            }

            let transition = step(session, &self.shortcuts);
            let outcome = match &transition {
                Transition::Completed(bounds) => Some(SelectionOutcome::Completed {
                    display_id,
                    bounds: *bounds,
                }),
                Transition::Cancelled => Some(SelectionOutcome::Cancelled {
                    display_id: Some(display_id),
                }),
                _ => None,
            };
            let Some(outcome) = outcome else {
                return Ok(transition);
            };

            surfaces.settled = true;
            for sibling in surfaces.sessions.iter_mut() {
                sibling.force_close();
            }
            (transition, outcome)
        };

        // settle outside the lock so a callback may call back in
        info!("Region selection finished: {:?}", outcome);
        self.latch.fulfill(outcome);
        Ok(transition)
    }

    pub fn is_finished(&self) -> bool {
        self.latch.is_fulfilled()
    }

    pub fn outcome(&self) -> Option<SelectionOutcome> {
        self.latch.outcome()
    }

    /// Block until some overlay settles the request.
    pub fn wait(&self) -> SelectionOutcome {
        self.latch.wait()
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<SelectionOutcome> {
        self.latch.wait_timeout(timeout)
    }

    pub fn latch(&self) -> Arc<CompletionLatch> {
        self.latch.clone()
    }

    /// Snapshot of the session on `display_id`.
    pub fn session(&self, display_id: u32) -> Option<SelectionSession> {
        self.surfaces
            .lock()
            .sessions
            .iter()
            .find(|session| session.display().id == display_id)
            .cloned()
    }
}

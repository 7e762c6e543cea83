//! Drag-to-rectangle state machine for one overlay surface.

use log::debug;

use crate::display::Display;
use crate::geometry::{LogicalPoint, LogicalRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Dragging,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }
}

/// What an input event did to a session
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The event had no effect in the current state
    Ignored,
    Started,
    /// Surface-local bounds of the drag so far
    Updated(LogicalRect),
    /// The drag was released too small and the session is idle again
    Discarded,
    /// Global logical bounds of the finished selection
    Completed(LogicalRect),
    Cancelled,
}

impl Transition {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Transition::Completed(_) | Transition::Cancelled)
    }
}

/// Selection state for the overlay covering one display.
///
/// Points are logical pixels relative to the overlay surface; only a completed
/// selection is translated into global coordinates.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    display: Display,
    state: SessionState,
    anchor: Option<LogicalPoint>,
    current: Option<LogicalPoint>,
    min_size: f64,
}

impl SelectionSession {
    pub fn new(display: Display, min_size: f64) -> Self {
        Self {
            display,
            state: SessionState::Idle,
            anchor: None,
            current: None,
            min_size,
        }
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Surface-local bounds of the current drag.
    pub fn bounds(&self) -> Option<LogicalRect> {
        match (self.anchor, self.current) {
            (Some(anchor), Some(current)) => Some(LogicalRect::from_corners(anchor, current)),
            _ => None,
        }
    }

    pub fn pointer_down(&mut self, point: LogicalPoint) -> Transition {
        if self.state != SessionState::Idle {
            return Transition::Ignored;
        }
        self.anchor = Some(point);
        self.current = Some(point);
        self.state = SessionState::Dragging;
        debug!("Display {}: drag started at {:?}", self.display.id, point);
        Transition::Started
    }

    pub fn pointer_move(&mut self, point: LogicalPoint) -> Transition {
        if self.state != SessionState::Dragging {
            return Transition::Ignored;
        }
        self.current = Some(point);
        match self.bounds() {
            Some(bounds) => Transition::Updated(bounds),
            None => Transition::Ignored,
        }
    }

    pub fn pointer_up(&mut self, point: LogicalPoint) -> Transition {
        if self.state != SessionState::Dragging {
            return Transition::Ignored;
        }
        self.current = Some(point);

        let Some(bounds) = self.bounds() else {
            return self.discard();
        };
        if bounds.width > self.min_size && bounds.height > self.min_size {
            self.state = SessionState::Completed;
            let origin = self.display.logical_bounds.origin();
            let global = bounds.translate(origin.x, origin.y);
            debug!("Display {}: selection completed {:?}", self.display.id, global);
            Transition::Completed(global)
        } else {
            debug!(
                "Display {}: selection {}x{} too small, discarded",
                self.display.id, bounds.width, bounds.height
            );
            self.discard()
        }
    }

    pub fn cancel(&mut self) -> Transition {
        if self.state.is_terminal() {
            return Transition::Ignored;
        }
        self.state = SessionState::Cancelled;
        debug!("Display {}: selection cancelled", self.display.id);
        Transition::Cancelled
    }

    /// Close the session because a sibling already settled the request.
    pub fn force_close(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Cancelled;
        }
    }

    fn discard(&mut self) -> Transition {
        self.state = SessionState::Idle;
        self.anchor = None;
        self.current = None;
        Transition::Discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_on(origin_x: f64) -> SelectionSession {
        SelectionSession::new(
            Display::new(1, "main", LogicalRect::new(origin_x, 0.0, 1920.0, 1080.0), 1.0, true),
            5.0,
        )
    }

    fn p(x: f64, y: f64) -> LogicalPoint {
        LogicalPoint::new(x, y)
    }

    #[test]
    fn test_drag_completes() {
        let mut session = session_on(0.0);
        assert_eq!(session.pointer_down(p(100.0, 100.0)), Transition::Started);
        assert_eq!(session.state(), SessionState::Dragging);
        assert_eq!(
            session.pointer_move(p(300.0, 250.0)),
            Transition::Updated(LogicalRect::new(100.0, 100.0, 200.0, 150.0))
        );
        assert_eq!(
            session.pointer_up(p(300.0, 250.0)),
            Transition::Completed(LogicalRect::new(100.0, 100.0, 200.0, 150.0))
        );
        assert_eq!(session.state(), SessionState::Completed);
    }

    #[test]
    fn test_reverse_drag_is_normalized() {
        let mut session = session_on(0.0);
        session.pointer_down(p(300.0, 250.0));
        assert_eq!(
            session.pointer_move(p(100.0, 100.0)),
            Transition::Updated(LogicalRect::new(100.0, 100.0, 200.0, 150.0))
        );
    }

    #[test]
    fn test_small_drag_returns_to_idle() {
        let mut session = session_on(0.0);
        session.pointer_down(p(10.0, 10.0));
        session.pointer_move(p(200.0, 15.0));
        assert_eq!(session.pointer_up(p(200.0, 15.0)), Transition::Discarded);
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.bounds().is_none());

        // exactly the threshold is still too small
        session.pointer_down(p(10.0, 10.0));
        assert_eq!(session.pointer_up(p(15.0, 15.0)), Transition::Discarded);

        // and the session can start over
        assert_eq!(session.pointer_down(p(0.0, 0.0)), Transition::Started);
        assert!(matches!(session.pointer_up(p(6.0, 6.0)), Transition::Completed(_)));
    }

    #[test]
    fn test_completed_bounds_are_global() {
        let mut session = session_on(1920.0);
        session.pointer_down(p(10.0, 20.0));
        assert_eq!(
            session.pointer_up(p(110.0, 70.0)),
            Transition::Completed(LogicalRect::new(1930.0, 20.0, 100.0, 50.0))
        );
    }

    #[test]
    fn test_cancel_from_any_state() {
        let mut idle = session_on(0.0);
        assert_eq!(idle.cancel(), Transition::Cancelled);

        let mut dragging = session_on(0.0);
        dragging.pointer_down(p(1.0, 1.0));
        assert_eq!(dragging.cancel(), Transition::Cancelled);
        assert_eq!(dragging.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_terminal_states_ignore_events() {
        let mut session = session_on(0.0);
        session.cancel();
        assert_eq!(session.pointer_down(p(1.0, 1.0)), Transition::Ignored);
        assert_eq!(session.cancel(), Transition::Ignored);
        assert_eq!(session.state(), SessionState::Cancelled);
    }

    #[test]
    fn test_moves_while_idle_are_ignored() {
        let mut session = session_on(0.0);
        assert_eq!(session.pointer_move(p(5.0, 5.0)), Transition::Ignored);
        assert_eq!(session.pointer_up(p(5.0, 5.0)), Transition::Ignored);
    }
}

//! One-shot completion shared by every overlay of a region request.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::geometry::LogicalRect;

/// How a multi-display region request ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SelectionOutcome {
    Completed {
        display_id: u32,
        /// Global logical coordinates
        bounds: LogicalRect,
    },
    Cancelled {
        /// The overlay that cancelled, if one did
        display_id: Option<u32>,
    },
}

type CompletionCallback = Box<dyn FnOnce(&SelectionOutcome) + Send>;

/// Fulfilled exactly once, by the first overlay to reach a terminal state.
#[derive(Default)]
pub struct CompletionLatch {
    outcome: Mutex<Option<SelectionOutcome>>,
    ready: Condvar,
    callback: Mutex<Option<CompletionCallback>>,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A latch that hands the winning outcome to `callback` once.
    pub fn with_callback(callback: impl FnOnce(&SelectionOutcome) + Send + 'static) -> Self {
        Self {
            callback: Mutex::new(Some(Box::new(callback))),
            ..Self::default()
        }
    }

    /// Try to settle the latch. Returns `false` if another overlay already did.
    pub fn fulfill(&self, outcome: SelectionOutcome) -> bool {
        {
            let mut slot = self.outcome.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome.clone());
        }
        self.ready.notify_all();

        if let Some(callback) = self.callback.lock().take() {
            callback(&outcome);
        }
        true
    }

    pub fn is_fulfilled(&self) -> bool {
        self.outcome.lock().is_some()
    }

    pub fn outcome(&self) -> Option<SelectionOutcome> {
        self.outcome.lock().clone()
    }

    /// Block until an outcome is available.
    pub fn wait(&self) -> SelectionOutcome {
        let mut slot = self.outcome.lock();
        loop {
            if let Some(outcome) = slot.as_ref() {
                return outcome.clone();
            }
            self.ready.wait(&mut slot);
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<SelectionOutcome> {
        let mut slot = self.outcome.lock();
        if slot.is_none() {
            self.ready.wait_for(&mut slot, timeout);
        }
        slot.clone()
    }
}

//! Pointer-drag progress editing
//!
//! Maps a horizontal drag over a bounded track to a value in `[0, 100]`.
//! Moves only update the live value; the commit happens once, on release,
//! and only if the value differs from what the server last confirmed.

use super::model::Task;

/// Horizontal extent of the progress track
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackBounds {
    pub left: f64,
    pub width: f64,
}

impl TrackBounds {
    pub fn new(left: f64, width: f64) -> Self {
        Self { left, width }
    }

    /// `round(100 * (x - left) / width)`, clamped to `[0, 100]`.
    /// A track with no width yields `None`.
    pub fn value_at(&self, x: f64) -> Option<u8> {
        if !(self.width > 0.0) || !x.is_finite() {
            return None;
        }
        let ratio = (x - self.left) / self.width;
        Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    Idle,
    /// Pointer captured; moves update the live value
    Dragging,
}

#[derive(Debug, Clone)]
pub struct ProgressGesture {
    bounds: TrackBounds,
    editable: bool,
    state: GestureState,
    committed: u8,
    live: u8,
}

impl ProgressGesture {
    pub fn new(bounds: TrackBounds, committed: u8, editable: bool) -> Self {
        Self {
            bounds,
            editable,
            state: GestureState::Idle,
            committed,
            live: committed,
        }
    }

    /// Bind to a task's current progress; editable only while in progress
    pub fn for_task(bounds: TrackBounds, task: &Task) -> Self {
        Self::new(bounds, task.progress, task.is_progress_editable())
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        self.state == GestureState::Dragging
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Value to render: the live drag value, or the committed one when idle
    pub fn live_value(&self) -> u8 {
        self.live
    }

    pub fn committed_value(&self) -> u8 {
        self.committed
    }

    pub fn set_bounds(&mut self, bounds: TrackBounds) {
        self.bounds = bounds;
    }

    /// Pointer down on the track. Inert when the task is not editable.
    /// Returns whether the pointer was captured.
    pub fn start(&mut self, x: f64) -> bool {
        if !self.editable {
            return false;
        }
        self.state = GestureState::Dragging;
        self.track(x);
        true
    }

    /// Pointer moved. Ignored unless dragging.
    pub fn move_to(&mut self, x: f64) {
        if self.is_dragging() {
            self.track(x);
        }
    }

    /// Pointer released. Returns the value to commit, if it changed.
    pub fn end(&mut self) -> Option<u8> {
        if !self.is_dragging() {
            return None;
        }
        self.state = GestureState::Idle;
        (self.live != self.committed).then_some(self.live)
    }

    /// Follow the externally committed value. While dragging, the live
    /// value is left alone until release.
    pub fn sync(&mut self, committed: u8, editable: bool) {
        self.committed = committed;
        self.editable = editable;
        if !self.is_dragging() {
            self.live = committed;
        }
    }

    /// Resynchronize from the task as currently known
    pub fn sync_with(&mut self, task: &Task) {
        self.sync(task.progress, task.is_progress_editable());
    }

    fn track(&mut self, x: f64) {
        if let Some(value) = self.bounds.value_at(x) {
            self.live = value;
        }
    }
}

//! Drag-and-drop between columns
//!
//! Two-phase protocol: `begin_drag(task)` then `drop_on(column)`. The drop
//! turns into a status change on the task engine. Hover state exists only
//! for highlighting and is cleared when the drag ends, whatever the outcome.

use tracing::debug;

use super::engine::TaskSyncEngine;
use super::model::{TaskMutation, TaskStatus};
use crate::Result;

#[derive(Debug, Default)]
pub struct DragReorderController {
    dragged: Option<String>,
    hovered: Option<TaskStatus>,
}

impl DragReorderController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_drag(&mut self, task_id: impl Into<String>) {
        let task_id = task_id.into();
        debug!("Drag started for task {}", task_id);
        self.dragged = Some(task_id);
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    /// Column currently highlighted as a drop target
    pub fn hovered(&self) -> Option<TaskStatus> {
        self.hovered
    }

    pub fn hover(&mut self, column: TaskStatus) {
        self.hovered = Some(column);
    }

    pub fn leave(&mut self) {
        self.hovered = None;
    }

    /// Drag ended without a drop, or after one
    pub fn end_drag(&mut self) {
        self.dragged = None;
        self.hovered = None;
    }

    /// Drop the dragged task on a column. Returns `Ok(false)` when nothing
    /// was being dragged.
    pub async fn drop_on(&mut self, column: TaskStatus, engine: &TaskSyncEngine) -> Result<bool> {
        let dragged = self.dragged.take();
        self.hovered = None;

        let Some(task_id) = dragged else {
            return Ok(false);
        };
        debug!("Dropped task {} on {}", task_id, column);
        engine.update(&task_id, TaskMutation::status(column)).await?;
        Ok(true)
    }
}

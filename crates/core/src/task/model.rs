//! Task model definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Progress assigned when a task enters `inprogress` without an explicit value
pub const DEFAULT_IN_PROGRESS: u8 = 25;

/// Task status in the kanban board, in column order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Todo
    }
}

impl TaskStatus {
    /// All columns, left to right
    pub const ALL: [TaskStatus; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Column heading
    pub fn title(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Wire name, as used in payloads and drop targets
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "inprogress",
            Self::Done => "done",
        }
    }

    /// The column to the right, if any
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Todo => Some(Self::InProgress),
            Self::InProgress => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// The column to the left, if any
    pub fn previous(self) -> Option<Self> {
        match self {
            Self::Todo => None,
            Self::InProgress => Some(Self::Todo),
            Self::Done => Some(Self::InProgress),
        }
    }

    /// Progress a task must carry after entering this status.
    /// `requested` only matters for `inprogress`.
    pub fn canonical_progress(self, requested: Option<i32>) -> u8 {
        match self {
            Self::Todo => 0,
            Self::Done => 100,
            Self::InProgress => requested.map(clamp_progress).unwrap_or(DEFAULT_IN_PROGRESS),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "inprogress" | "in-progress" | "doing" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(crate::Error::Validation(format!("unknown column: {}", other))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clamp an arbitrary progress input into `[0, 100]`
pub fn clamp_progress(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

/// A task as returned by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_finish_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reminder_date_time: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a task with the given server id and title
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            board_id: None,
            title: title.into(),
            description: None,
            status: TaskStatus::default(),
            progress: 0,
            start_date: None,
            estimated_finish_date: None,
            reminder_date_time: None,
        }
    }

    /// Set the status together with its canonical progress
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.progress = status.canonical_progress(None);
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_reminder(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_date_time = Some(at);
        self
    }

    /// Progress can only be dragged while the task is in progress
    pub fn is_progress_editable(&self) -> bool {
        self.status == TaskStatus::InProgress
    }
}

/// Creation payload for `POST /boards/:id/tasks`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_finish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_date_time: Option<DateTime<Utc>>,
    pub progress: u8,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = (!description.trim().is_empty()).then_some(description);
        self
    }

    pub fn with_start_date(mut self, at: DateTime<Utc>) -> Self {
        self.start_date = Some(at);
        self
    }

    pub fn with_estimated_finish_date(mut self, at: DateTime<Utc>) -> Self {
        self.estimated_finish_date = Some(at);
        self
    }

    pub fn with_reminder(mut self, at: DateTime<Utc>) -> Self {
        self.reminder_date_time = Some(at);
        self
    }

    /// Reject drafts the server would refuse anyway
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::Error::Validation("Task title is required.".into()));
        }
        Ok(())
    }
}

/// Free-form field edits that never touch status or progress
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub estimated_finish_date: Option<DateTime<Utc>>,
    pub reminder_date_time: Option<DateTime<Utc>>,
}

/// One requested change to a task.
///
/// Each kind normalizes into a [`TaskPatch`] that already satisfies the
/// status/progress rule: `todo` carries 0, `done` carries 100, and
/// `inprogress` carries the clamped request or 25.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMutation {
    StatusChange { to: TaskStatus, progress: Option<i32> },
    ProgressChange { to: i32 },
    FieldEdit(FieldEdit),
}

impl TaskMutation {
    /// Move to a column, letting the canonical progress apply
    pub fn status(to: TaskStatus) -> Self {
        Self::StatusChange { to, progress: None }
    }

    pub fn progress(to: i32) -> Self {
        Self::ProgressChange { to }
    }

    /// Reject edits that would blank a required field
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Self::FieldEdit(FieldEdit {
                title: Some(title), ..
            }) if title.trim().is_empty() => {
                Err(crate::Error::Validation("Task title is required.".into()))
            }
            _ => Ok(()),
        }
    }

    pub fn normalize(&self) -> TaskPatch {
        match self {
            Self::StatusChange { to, progress } => TaskPatch {
                status: Some(*to),
                progress: Some(to.canonical_progress(*progress)),
                ..TaskPatch::default()
            },
            Self::ProgressChange { to } => TaskPatch {
                progress: Some(clamp_progress(*to)),
                ..TaskPatch::default()
            },
            Self::FieldEdit(edit) => TaskPatch {
                title: edit.title.clone(),
                description: edit.description.clone(),
                start_date: edit.start_date,
                estimated_finish_date: edit.estimated_finish_date,
                reminder_date_time: edit.reminder_date_time,
                ..TaskPatch::default()
            },
        }
    }
}

/// Normalized partial update sent as the `PUT /tasks/:id` body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_finish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_date_time: Option<DateTime<Utc>>,
}

impl TaskPatch {
    /// Apply the patch to a local task
    pub fn apply(&self, task: &mut Task) {
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(at) = self.start_date {
            task.start_date = Some(at);
        }
        if let Some(at) = self.estimated_finish_date {
            task.estimated_finish_date = Some(at);
        }
        if let Some(at) = self.reminder_date_time {
            task.reminder_date_time = Some(at);
        }
    }

    /// True when this patch moves the task into `done`
    pub fn completes(&self) -> bool {
        self.status == Some(TaskStatus::Done)
    }
}

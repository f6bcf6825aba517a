//! Reminder notices
//!
//! At most one notice is shown at a time. It disappears on its own after
//! a short delay or when dismissed; each task's reminder fires only once.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::task::Task;

pub const REMINDER_DISMISS_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderNotice {
    pub task_id: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ReminderTracker {
    fired: HashSet<String>,
    active: Option<(ReminderNotice, Instant)>,
    dismiss_after: Duration,
}

impl Default for ReminderTracker {
    fn default() -> Self {
        Self::new(REMINDER_DISMISS_AFTER)
    }
}

impl ReminderTracker {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            fired: HashSet::new(),
            active: None,
            dismiss_after,
        }
    }

    /// Raise a notice for the first due reminder that has not fired yet.
    /// Nothing is raised while another notice is still showing.
    pub fn scan(&mut self, tasks: &[Task], now: DateTime<Utc>, at: Instant) -> Option<ReminderNotice> {
        if self.active(at).is_some() {
            return None;
        }

        let task = tasks.iter().find(|t| {
            t.reminder_date_time.is_some_and(|due| due <= now) && !self.fired.contains(&t.id)
        })?;

        debug!("Reminder due for task {}", task.id);
        self.fired.insert(task.id.clone());
        let notice = ReminderNotice {
            task_id: task.id.clone(),
            message: format!("Reminder: {}", task.title),
        };
        self.active = Some((notice.clone(), at));
        Some(notice)
    }

    /// The notice still showing at `at`, if any
    pub fn active(&mut self, at: Instant) -> Option<&ReminderNotice> {
        let expired = self
            .active
            .as_ref()
            .is_some_and(|(_, shown)| at.saturating_duration_since(*shown) >= self.dismiss_after);
        if expired {
            self.active = None;
        }
        self.active.as_ref().map(|(notice, _)| notice)
    }

    pub fn dismiss(&mut self) {
        self.active = None;
    }

    /// Forget fired reminders and the active notice, as when the session ends
    pub fn reset(&mut self) {
        self.fired.clear();
        self.active = None;
    }
}

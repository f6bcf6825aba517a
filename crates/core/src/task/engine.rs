//! Optimistic task synchronization for one board
//!
//! Local state is mutated before the remote call is issued. When the call
//! fails the engine does not try to undo the individual change; it reloads
//! the whole task set from the server instead.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use super::gesture::ProgressGesture;
use super::model::{Task, TaskDraft, TaskMutation, TaskStatus};
use crate::error::Error;
use crate::remote::TaskApi;
use crate::sync::{Confirm, LoadStatus, SyncFailure};
use crate::Result;

pub const DELETE_TASK_PROMPT: &str = "Are you sure you want to delete this task?";

/// Task operations that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOp {
    Load,
    Add,
    Update,
    Delete,
}

impl TaskOp {
    fn fallback_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load tasks.",
            Self::Add => "Failed to add task.",
            Self::Update => "Failed to update task.",
            Self::Delete => "Failed to delete task.",
        }
    }
}

/// Side effects for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    /// An update moving the task to `done` was accepted by the server
    Completed { task_id: String },
}

/// Snapshot of the tasks for the selected board
#[derive(Debug, Clone)]
pub struct TaskSet {
    pub board_id: Option<String>,
    pub tasks: Vec<Task>,
    pub status: LoadStatus,
    pub last_error: Option<SyncFailure<TaskOp>>,
    pending: HashMap<String, usize>,
    loaded_once: bool,
}

impl Default for TaskSet {
    fn default() -> Self {
        Self {
            board_id: None,
            tasks: Vec::new(),
            status: LoadStatus::Idle,
            last_error: None,
            pending: HashMap::new(),
            loaded_once: false,
        }
    }
}

impl TaskSet {
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks in one column, in server order
    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// True while a request for this task is outstanding
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|f| f.message.as_str())
    }

    fn begin_request(&mut self, id: &str) {
        *self.pending.entry(id.to_string()).or_insert(0) += 1;
    }

    fn finish_request(&mut self, id: &str) {
        if let Some(count) = self.pending.get_mut(id) {
            *count -= 1;
            if *count == 0 {
                self.pending.remove(id);
            }
        }
    }
}

/// Owns the optimistically mutated task set of the open board
#[derive(Clone)]
pub struct TaskSyncEngine {
    api: Arc<dyn TaskApi>,
    state: Arc<RwLock<TaskSet>>,
    events: broadcast::Sender<TaskEvent>,
}

impl TaskSyncEngine {
    pub fn new(api: Arc<dyn TaskApi>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            api,
            state: Arc::new(RwLock::new(TaskSet::default())),
            events,
        }
    }

    /// Subscribe to completion events
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> TaskSet {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    /// Forget the selected board and its tasks, as when the session ends.
    /// Lists still in flight for the old board are discarded on arrival.
    pub async fn reset(&self) {
        debug!("Resetting task set");
        *self.state.write().await = TaskSet::default();
    }

    async fn current_board(&self) -> Result<String> {
        self.state
            .read()
            .await
            .board_id
            .clone()
            .ok_or_else(|| Error::BoardNotFound("no board selected".into()))
    }

    async fn record_failure(&self, op: TaskOp, err: &Error) {
        let message = err.display_message(op.fallback_message());
        self.state.write().await.last_error = Some(SyncFailure { op, message });
    }

    /// Replace the task set with the server's list for `board_id`.
    ///
    /// Selecting a different board discards the previous set. On failure
    /// the prior set is kept, unless nothing was ever loaded.
    pub async fn load(&self, board_id: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            if state.board_id.as_deref() != Some(board_id) {
                *state = TaskSet {
                    board_id: Some(board_id.to_string()),
                    ..TaskSet::default()
                };
            }
            state.status = LoadStatus::Loading;
            state.last_error = None;
        }
        debug!("Fetching tasks for board {}", board_id);
        self.fetch(board_id).await
    }

    /// Reload after a failed mutation, keeping the mutation's error message
    async fn resync(&self, board_id: &str) {
        warn!("Rolling back board {} by full reload", board_id);
        if let Err(e) = self.fetch(board_id).await {
            error!("Rollback reload failed: {}", e);
        }
    }

    async fn fetch(&self, board_id: &str) -> Result<()> {
        let result = self.api.list_tasks(board_id).await;

        let mut state = self.state.write().await;
        if state.board_id.as_deref() != Some(board_id) {
            debug!("Discarding task list for board {} after board switch", board_id);
            return Ok(());
        }

        match result {
            Ok(tasks) => {
                debug!("Loaded {} tasks for board {}", tasks.len(), board_id);
                state.tasks = tasks;
                state.status = LoadStatus::Loaded;
                state.loaded_once = true;
                Ok(())
            }
            Err(e) => {
                error!("Error fetching tasks for board {}: {}", board_id, e);
                if !state.loaded_once {
                    state.tasks.clear();
                }
                state.status = LoadStatus::Error;
                state.last_error = Some(SyncFailure {
                    op: TaskOp::Load,
                    message: e.display_message(TaskOp::Load.fallback_message()),
                });
                Err(e)
            }
        }
    }

    /// Create a task, then reload to pick up its server-assigned id.
    ///
    /// Nothing is inserted locally before the server answers.
    pub async fn add(&self, draft: TaskDraft) -> Result<()> {
        draft.validate()?;
        let board_id = self.current_board().await?;

        info!("Adding task '{}' to board {}", draft.title, board_id);
        if let Err(e) = self.api.create_task(&board_id, &draft).await {
            error!("Add task failed: {}", e);
            self.record_failure(TaskOp::Add, &e).await;
            return Err(e);
        }

        // The task exists now; a failed reload is recorded on its own.
        if let Err(e) = self.load(&board_id).await {
            warn!("Reload after add failed: {}", e);
        }
        Ok(())
    }

    /// Apply a mutation locally, then send it.
    ///
    /// The mutation is normalized first, so status changes always carry
    /// their canonical progress. On failure the set is reloaded from the
    /// server and the error is returned.
    pub async fn update(&self, id: &str, mutation: TaskMutation) -> Result<()> {
        mutation.validate()?;
        let board_id = self.current_board().await?;
        let patch = mutation.normalize();

        {
            let mut state = self.state.write().await;
            match state.tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => patch.apply(task),
                None => warn!("Optimistic update skipped: task {} not in local set", id),
            }
            state.begin_request(id);
        }

        info!("Updating task {}: {:?}", id, patch);
        let result = self.api.update_task(id, &patch).await;
        self.state.write().await.finish_request(id);

        match result {
            Ok(()) => {
                if patch.completes() {
                    debug!("Task {} completed", id);
                    let _ = self.events.send(TaskEvent::Completed {
                        task_id: id.to_string(),
                    });
                }
                Ok(())
            }
            Err(e) => {
                error!("Update task {} failed: {}", id, e);
                self.record_failure(TaskOp::Update, &e).await;
                self.resync(&board_id).await;
                Err(e)
            }
        }
    }

    /// Move a task one column to the right. Returns `false` at the last column.
    pub async fn advance(&self, id: &str) -> Result<bool> {
        let status = self.status_of(id).await?;
        match status.next() {
            Some(to) => self.update(id, TaskMutation::status(to)).await.map(|_| true),
            None => Ok(false),
        }
    }

    /// Move a task one column to the left. Returns `false` at the first column.
    pub async fn retreat(&self, id: &str) -> Result<bool> {
        let status = self.status_of(id).await?;
        match status.previous() {
            Some(to) => self.update(id, TaskMutation::status(to)).await.map(|_| true),
            None => Ok(false),
        }
    }

    async fn status_of(&self, id: &str) -> Result<TaskStatus> {
        self.state
            .read()
            .await
            .get(id)
            .map(|t| t.status)
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    /// Finish a progress gesture, committing its value if it changed.
    /// Returns whether a request was issued.
    ///
    /// The gesture follows the task afterwards, whether the update landed
    /// or the set was reloaded, so its next comparison uses the value the
    /// engine now holds.
    pub async fn commit_gesture(&self, id: &str, gesture: &mut ProgressGesture) -> Result<bool> {
        let Some(value) = gesture.end() else {
            return Ok(false);
        };
        let result = self.update(id, TaskMutation::progress(i32::from(value))).await;
        if let Some(task) = self.state.read().await.get(id) {
            gesture.sync_with(task);
        }
        result.map(|_| true)
    }

    /// Delete a task after the user confirms.
    ///
    /// Returns `Ok(false)` when the user declines. The task leaves the
    /// local set before the request is sent; a failure reloads the set.
    pub async fn remove(&self, id: &str, confirm: &dyn Confirm) -> Result<bool> {
        let board_id = self.current_board().await?;
        {
            let state = self.state.read().await;
            if state.get(id).is_none() || state.is_pending(id) {
                return Err(Error::TaskNotFound(id.to_string()));
            }
        }

        if !confirm.confirm(DELETE_TASK_PROMPT).await {
            debug!("Delete of task {} declined", id);
            return Ok(false);
        }

        {
            let mut state = self.state.write().await;
            state.tasks.retain(|t| t.id != id);
            state.begin_request(id);
        }

        info!("Deleting task {}", id);
        let result = self.api.delete_task(id).await;
        self.state.write().await.finish_request(id);

        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                error!("Delete task {} failed: {}", id, e);
                self.record_failure(TaskOp::Delete, &e).await;
                self.resync(&board_id).await;
                Err(e)
            }
        }
    }
}

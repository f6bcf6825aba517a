//! Board list synchronization
//!
//! Boards are edited one at a time from a visible list, so mutations are
//! not applied locally: each successful create, rename or delete is
//! followed by a full reload of the list.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::model::{validate_board_name, Board};
use crate::error::Error;
use crate::remote::BoardApi;
use crate::sync::{Confirm, LoadStatus, SyncFailure};
use crate::Result;

/// Board operations that can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardOp {
    Load,
    Create,
    Rename,
    Delete,
}

impl BoardOp {
    fn fallback_message(self) -> &'static str {
        match self {
            Self::Load => "Failed to load boards.",
            Self::Create => "Failed to create board.",
            Self::Rename => "Failed to update board.",
            Self::Delete => "Failed to delete board.",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BoardSet {
    pub boards: Vec<Board>,
    pub status: LoadStatus,
    pub last_error: Option<SyncFailure<BoardOp>>,
    /// A create request is outstanding
    pub creating: bool,
    /// Boards with a rename or delete outstanding
    pending: HashSet<String>,
}

impl Default for BoardSet {
    fn default() -> Self {
        Self {
            boards: Vec::new(),
            status: LoadStatus::Idle,
            last_error: None,
            creating: false,
            pending: HashSet::new(),
        }
    }
}

impl BoardSet {
    pub fn get(&self, id: &str) -> Option<&Board> {
        self.boards.iter().find(|b| b.id == id)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.last_error.as_ref().map(|f| f.message.as_str())
    }

    /// True while a rename or delete for this board is outstanding
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }
}

/// Owns the board list shown on the dashboard
#[derive(Clone)]
pub struct BoardSyncEngine {
    api: Arc<dyn BoardApi>,
    state: Arc<RwLock<BoardSet>>,
}

impl BoardSyncEngine {
    pub fn new(api: Arc<dyn BoardApi>) -> Self {
        Self {
            api,
            state: Arc::new(RwLock::new(BoardSet::default())),
        }
    }

    pub async fn snapshot(&self) -> BoardSet {
        self.state.read().await.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.last_error = None;
    }

    /// Drop the list, as when the session ends
    pub async fn reset(&self) {
        debug!("Resetting board list");
        *self.state.write().await = BoardSet::default();
    }

    async fn record_failure(&self, op: BoardOp, err: &Error) {
        let message = err.display_message(op.fallback_message());
        self.state.write().await.last_error = Some(SyncFailure { op, message });
    }

    /// Replace the list with the server's
    pub async fn load(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.status = LoadStatus::Loading;
            state.last_error = None;
        }
        debug!("Fetching boards");

        match self.api.list_boards().await {
            Ok(boards) => {
                debug!("Loaded {} boards", boards.len());
                let mut state = self.state.write().await;
                state.boards = boards;
                state.status = LoadStatus::Loaded;
                Ok(())
            }
            Err(e) => {
                error!("Error fetching boards: {}", e);
                self.state.write().await.status = LoadStatus::Error;
                self.record_failure(BoardOp::Load, &e).await;
                Err(e)
            }
        }
    }

    /// The board, if it is listed and has no request outstanding
    async fn require(&self, id: &str) -> Result<Board> {
        let state = self.state.read().await;
        match state.get(id) {
            Some(board) if !state.is_pending(id) => Ok(board.clone()),
            _ => Err(Error::BoardNotFound(id.to_string())),
        }
    }

    async fn finish_request(&self, id: &str) {
        self.state.write().await.pending.remove(id);
    }

    pub async fn create(&self, name: &str) -> Result<()> {
        let name = validate_board_name(name)?;
        {
            let mut state = self.state.write().await;
            state.creating = true;
            state.last_error = None;
        }

        info!("Creating board '{}'", name);
        let result = self.api.create_board(name).await;
        self.state.write().await.creating = false;

        match result {
            Ok(()) => self.load().await,
            Err(e) => {
                error!("Create board failed: {}", e);
                self.record_failure(BoardOp::Create, &e).await;
                Err(e)
            }
        }
    }

    /// Rename a board that is in the current list
    pub async fn rename(&self, id: &str, name: &str) -> Result<()> {
        let name = validate_board_name(name)?;
        self.require(id).await?;

        if !self.state.write().await.pending.insert(id.to_string()) {
            return Err(Error::BoardNotFound(id.to_string()));
        }
        info!("Renaming board {} to '{}'", id, name);
        let result = self.api.rename_board(id, name).await;
        self.finish_request(id).await;

        match result {
            Ok(()) => self.load().await,
            Err(e) => {
                error!("Rename board {} failed: {}", id, e);
                self.record_failure(BoardOp::Rename, &e).await;
                Err(e)
            }
        }
    }

    /// Delete a board after the user confirms. The server removes its tasks.
    /// Returns `Ok(false)` when the user declines.
    pub async fn delete(&self, id: &str, confirm: &dyn Confirm) -> Result<bool> {
        let board = self.require(id).await?;

        let prompt = format!("Delete \"{}\"? This cannot be undone.", board.name);
        if !confirm.confirm(&prompt).await {
            debug!("Delete of board {} declined", id);
            return Ok(false);
        }

        if !self.state.write().await.pending.insert(id.to_string()) {
            return Err(Error::BoardNotFound(id.to_string()));
        }
        info!("Deleting board {}", id);
        let result = self.api.delete_board(id).await;
        self.finish_request(id).await;

        match result {
            Ok(()) => self.load().await.map(|_| true),
            Err(e) => {
                error!("Delete board {} failed: {}", id, e);
                self.record_failure(BoardOp::Delete, &e).await;
                Err(e)
            }
        }
    }
}

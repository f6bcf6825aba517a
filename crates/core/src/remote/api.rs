//! Typed operations against the task-board API

use async_trait::async_trait;
use serde::Serialize;

use crate::board::Board;
use crate::session::Credential;
use crate::task::{Task, TaskDraft, TaskPatch};
use crate::Result;

/// Email and password pair for `/auth/login` and `/auth/signup`
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account operations. These do not require a session.
#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange email and password for a bearer credential
    async fn login(&self, credentials: &Credentials) -> Result<Credential>;

    /// Create an account
    async fn signup(&self, credentials: &Credentials) -> Result<()>;

    /// URL that starts the Google OAuth flow
    fn google_auth_url(&self) -> String;
}

/// Board list operations for the current session
#[async_trait]
pub trait BoardApi: Send + Sync {
    async fn list_boards(&self) -> Result<Vec<Board>>;

    async fn create_board(&self, name: &str) -> Result<()>;

    async fn rename_board(&self, id: &str, name: &str) -> Result<()>;

    async fn delete_board(&self, id: &str) -> Result<()>;
}

/// Task operations scoped to one board
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list_tasks(&self, board_id: &str) -> Result<Vec<Task>>;

    async fn create_task(&self, board_id: &str, draft: &TaskDraft) -> Result<()>;

    async fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<()>;

    async fn delete_task(&self, id: &str) -> Result<()>;
}

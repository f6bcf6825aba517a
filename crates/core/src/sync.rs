//! Types shared by the task and board sync engines

use async_trait::async_trait;

/// Load state of an engine's collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing requested yet
    Idle,
    Loading,
    Loaded,
    Error,
}

/// The most recent failed operation and the message shown for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure<Op> {
    pub op: Op,
    pub message: String,
}

/// Asks the user before a destructive call is issued
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

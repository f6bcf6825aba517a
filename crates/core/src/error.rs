//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a response
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered with a non-success status
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("request rejected"))]
    Http { status: u16, message: Option<String> },

    /// Client-side validation blocked the request from being issued
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Board not found: {0}")]
    BoardNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create an Http error
    pub fn http(status: u16, message: Option<String>) -> Self {
        Self::Http { status, message }
    }

    /// True when the server rejected the credential
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Http { status: 401, .. })
    }

    /// The `message` field the server sent with a rejection, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Http { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for display, falling back when the server gave none
    pub fn display_message(&self, fallback: &str) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            _ => self
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
        }
    }
}

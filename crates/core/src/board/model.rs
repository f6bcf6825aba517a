//! Board model definitions

use serde::{Deserialize, Serialize};

/// A named container of tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
}

impl Board {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Body for `POST /boards` and `PUT /boards/:id`
#[derive(Debug, Clone, Serialize)]
pub struct BoardName<'a> {
    pub name: &'a str,
}

/// Trim a user-entered board name, rejecting blanks
pub fn validate_board_name(name: &str) -> crate::Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(crate::Error::Validation("Board name is required.".into()));
    }
    Ok(trimmed)
}

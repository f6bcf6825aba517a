//! Board list management
//!
//! Boards are listed, created, renamed and deleted from the dashboard.
//! Every successful mutation is followed by a full reload of the list.

mod engine;
mod model;

pub use engine::*;
pub use model::*;

//! Task module
//!
//! Task types, the optimistic sync engine for a board's tasks, and the two
//! interaction controllers that feed it: progress dragging and
//! drag-and-drop between columns.

mod drag;
mod engine;
mod gesture;
mod model;

pub use drag::DragReorderController;
pub use engine::*;
pub use gesture::*;
pub use model::*;

//! Core library for the TaskCircuit client
//!
//! This crate contains the client-side state synchronization layer:
//! - Session handling and the OAuth callback
//! - Optimistic board and task sync against the REST API
//! - Progress dragging and column drag-and-drop
//! - Screen routing

pub mod app;
pub mod board;
pub mod config;
pub mod error;
pub mod reminder;
pub mod remote;
pub mod session;
pub mod sync;
pub mod task;

#[cfg(test)]
mod testing;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

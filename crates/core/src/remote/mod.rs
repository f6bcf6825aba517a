//! Remote API boundary
//!
//! The traits here are the only I/O seam the sync engines see.
//! `HttpRemoteClient` implements all of them over REST.

mod api;
mod http;

pub use api::*;
pub use http::HttpRemoteClient;

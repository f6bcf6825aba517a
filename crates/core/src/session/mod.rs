//! Session management
//!
//! A single bearer credential, owned by [`SessionStore`] and read by the
//! remote client through a [`SessionHandle`].

pub mod callback;
mod storage;
mod store;

pub use callback::{CallbackOutcome, Location, CALLBACK_PATH};
pub use storage::{CredentialStorage, FileCredentialStore, MemoryCredentialStore, STORAGE_KEY};
pub use store::*;

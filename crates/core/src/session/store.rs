//! Session store and read-only handle

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{info, warn};

use super::storage::CredentialStorage;
use crate::Result;

/// Bearer credential. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for the `Authorization` header and storage only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Out-of-band notices sent to the session owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// A protected call carrying the credential came back 401
    Unauthorized,
}

/// Read-only view of the session handed to components that issue requests
#[derive(Clone)]
pub struct SessionHandle {
    credential: Arc<RwLock<Option<Credential>>>,
    signals: mpsc::UnboundedSender<SessionSignal>,
}

impl SessionHandle {
    /// The credential to attach to the next request, if any
    pub async fn credential(&self) -> Option<Credential> {
        self.credential.read().await.clone()
    }

    /// Tell the owner the server rejected the current credential
    pub fn report_unauthorized(&self) {
        let _ = self.signals.send(SessionSignal::Unauthorized);
    }
}

/// Owner of the process-wide credential.
///
/// Only this type mutates the credential; everything else reads it
/// through a [`SessionHandle`].
pub struct SessionStore {
    credential: Arc<RwLock<Option<Credential>>>,
    storage: Arc<dyn CredentialStorage>,
    signal_tx: mpsc::UnboundedSender<SessionSignal>,
    signal_rx: mpsc::UnboundedReceiver<SessionSignal>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn CredentialStorage>) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            credential: Arc::new(RwLock::new(None)),
            storage,
            signal_tx,
            signal_rx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            credential: Arc::clone(&self.credential),
            signals: self.signal_tx.clone(),
        }
    }

    pub async fn state(&self) -> SessionState {
        if self.credential.read().await.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Load the persisted credential into memory. The token is not
    /// validated here; a stale one surfaces as a 401 on first use.
    pub async fn restore(&self) -> Result<Option<Credential>> {
        let restored = self.storage.load().await?.map(Credential::new);
        if restored.is_some() {
            info!("Restored persisted session");
        }
        *self.credential.write().await = restored.clone();
        Ok(restored)
    }

    /// Store the credential in memory and durable storage.
    ///
    /// The in-memory credential is kept even if persisting fails.
    pub async fn set(&self, credential: Credential) -> Result<()> {
        *self.credential.write().await = Some(credential.clone());
        info!("Session established");
        self.storage.save(credential.expose()).await.map_err(|e| {
            warn!("Failed to persist session: {}", e);
            e
        })
    }

    /// Drop the credential from memory and durable storage
    pub async fn clear(&self) -> Result<()> {
        *self.credential.write().await = None;
        info!("Session cleared");
        self.storage.remove().await
    }

    /// Next pending signal without waiting
    pub fn try_next_signal(&mut self) -> Option<SessionSignal> {
        self.signal_rx.try_recv().ok()
    }

    /// Wait for the next signal
    pub async fn next_signal(&mut self) -> Option<SessionSignal> {
        self.signal_rx.recv().await
    }
}

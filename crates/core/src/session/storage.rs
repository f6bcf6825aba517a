//! Durable credential storage

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::Error;
use crate::Result;

/// Fixed key the credential is stored under
pub const STORAGE_KEY: &str = "taskCircuitToken";

/// Where the credential survives process restarts
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    async fn load(&self) -> Result<Option<String>>;

    async fn save(&self, token: &str) -> Result<()>;

    async fn remove(&self) -> Result<()>;
}

/// Stores the credential as a one-key JSON object on disk
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStorage for FileCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to read session file: {}", e)))?;
        let entries: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("Failed to parse session file: {}", e)))?;
        Ok(entries
            .get(STORAGE_KEY)
            .filter(|token| !token.trim().is_empty())
            .cloned())
    }

    async fn save(&self, token: &str) -> Result<()> {
        let entries = HashMap::from([(STORAGE_KEY, token)]);
        let content = serde_json::to_string_pretty(&entries)?;

        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write session file: {}", e)))?;
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("Failed to remove session file: {}", e))),
        }
    }
}

/// Process-local storage, for embedding and tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(token.into())),
        }
    }
}

#[async_trait]
impl CredentialStorage for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<String>> {
        Ok(self.token.lock().await.clone())
    }

    async fn save(&self, token: &str) -> Result<()> {
        *self.token.lock().await = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

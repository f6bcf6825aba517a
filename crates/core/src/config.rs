//! Client configuration loaded from the environment

use std::path::PathBuf;

/// Default API base used when `TC_API_URL` is unset
pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Default directory for persisted client state
pub const DEFAULT_DATA_DIR: &str = ".tc-data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL every API path is appended to, without a trailing slash
    pub api_base_url: String,
    /// Directory holding the persisted session
    pub data_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
        _ => None,
    }
}

impl ClientConfig {
    /// Load from `TC_API_URL` and `TC_DATA_DIR`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_value("TC_API_URL")
                .map(|url| normalize_base_url(&url))
                .unwrap_or(defaults.api_base_url),
            data_dir: env_value("TC_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        }
    }

    pub fn with_api_base_url(mut self, url: impl AsRef<str>) -> Self {
        self.api_base_url = normalize_base_url(url.as_ref());
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Path of the persisted credential file
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

//! Export settings.

use crate::model::ShareMode;
use crate::splice::SpliceOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Default bound on the persistent store query.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 1000;

/// Default delay before a browser download's object URL is released.
pub const DEFAULT_RELEASE_DELAY_MS: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Export configuration. Every field has a default, so partial JSON works.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Milliseconds to wait for the store before exporting without it.
    pub store_timeout_ms: u64,
    /// Milliseconds before a download's object URL is revoked.
    pub release_delay_ms: u32,
    /// Database to open when the page exposes no open connection.
    pub db_name: Option<String>,
    /// Object store holding the editor's shapes.
    pub store_name: String,
    pub editable_file_name: String,
    pub view_only_file_name: String,
    pub splice: SpliceOptions,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            release_delay_ms: DEFAULT_RELEASE_DELAY_MS,
            db_name: None,
            store_name: "shapes".to_string(),
            editable_file_name: ShareMode::Editable.default_file_name().to_string(),
            view_only_file_name: ShareMode::ViewOnly.default_file_name().to_string(),
            splice: SpliceOptions::default(),
        }
    }
}

impl ShareConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a JSON config file.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn file_name(&self, mode: ShareMode) -> &str {
        match mode {
            ShareMode::Editable => &self.editable_file_name,
            ShareMode::ViewOnly => &self.view_only_file_name,
        }
    }
}

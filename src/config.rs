//! Machine configuration.
//!
//! Options are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. A JSON document, from a string or a file
//! 3. Environment variables (`STATEWALK_RECORD_HISTORY`,
//!    `STATEWALK_PROPAGATE_HISTORY`)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Per-machine options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineOptions {
    /// Append a history record for every committed state change.
    pub record_history: bool,
    /// Forward history records of spawned submachines to the parent's log.
    pub propagate_history: bool,
    /// Extra data copied into every history record.
    pub history_data: Option<Value>,
}

impl Default for MachineOptions {
    fn default() -> Self {
        Self {
            record_history: true,
            propagate_history: false,
            history_data: None,
        }
    }
}

impl MachineOptions {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
        Self::from_json(&content)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        options.apply_env_overrides();
        options
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(flag) = env_flag("STATEWALK_RECORD_HISTORY") {
            self.record_history = flag;
        }
        if let Some(flag) = env_flag("STATEWALK_PROPAGATE_HISTORY") {
            self.propagate_history = flag;
        }
    }

    pub fn with_history_data(mut self, data: Value) -> Self {
        self.history_data = Some(data);
        self
    }

    pub fn without_history(mut self) -> Self {
        self.record_history = false;
        self
    }

    pub fn propagating_history(mut self) -> Self {
        self.propagate_history = true;
        self
    }
}

fn env_flag(name: &str) -> Option<bool> {
    parse_flag(&std::env::var(name).ok()?)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Errors from loading [`MachineOptions`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),
}

//! Persistence seam for the settings record.
//!
//! The use cases in this layer only see [`SettingsRepository`]; the JSON file
//! implementation lives in `infrastructure::storage::settings_file`.

use std::path::PathBuf;

use async_trait::async_trait;
use kubedesk_core::{MergeError, Settings};
use serde_json::Value;
use thiserror::Error;

/// Error type for reading and writing the settings record.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The persisted file is not valid JSON.
    #[error("failed to parse settings JSON: {0}")]
    Parse(#[source] serde_json::Error),

    /// The persisted JSON does not describe a settings record.
    #[error("invalid settings document: {0}")]
    InvalidData(#[from] MergeError),

    /// The record could not be serialized.
    #[error("failed to serialize settings: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Reads and writes the persisted settings document.
///
/// Infrastructure implementations use the file system; test implementations
/// keep the document in memory.
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Reads the persisted document.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet (first run).
    async fn load(&self) -> Result<Option<Value>, SettingsError>;

    /// Persists the full record, replacing whatever was stored before.
    async fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

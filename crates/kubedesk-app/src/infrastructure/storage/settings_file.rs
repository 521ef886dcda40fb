//! JSON-file persistence for the settings record.
//!
//! The record lives in `settings.json` under the platform config directory:
//! - Windows:  `%APPDATA%\kubedesk\settings.json`
//! - Linux:    `~/.config/kubedesk/settings.json`
//! - macOS:    `~/Library/Application Support/kubedesk/settings.json`
//!
//! Files are written as pretty-printed JSON via a temporary file and a rename,
//! so a crash mid-write never leaves a truncated `settings.json` behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use kubedesk_core::Settings;
use serde_json::Value;
use tracing::{debug, info};

use crate::application::settings_repository::{SettingsError, SettingsRepository};

/// Name of the directory created under the platform config directory.
pub const APP_DIR_NAME: &str = "kubedesk";

/// Name of the settings file inside the application directory.
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`SettingsError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, SettingsError> {
    dirs::config_dir()
        .map(|base| base.join(APP_DIR_NAME))
        .ok_or(SettingsError::NoPlatformConfigDir)
}

/// Reads and writes `settings.json` in one directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    dir: PathBuf,
    file_path: PathBuf,
}

impl JsonFileRepository {
    /// Repository rooted at the platform config directory.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NoPlatformConfigDir`] if it cannot be resolved.
    pub fn new() -> Result<Self, SettingsError> {
        Ok(Self::in_dir(config_dir()?))
    }

    /// Repository rooted at `dir`.  The directory is created on first save.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let file_path = dir.join(SETTINGS_FILE_NAME);
        Self { dir, file_path }
    }

    /// Full path of `settings.json`.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{SETTINGS_FILE_NAME}.tmp"))
    }
}

#[async_trait]
impl SettingsRepository for JsonFileRepository {
    async fn load(&self) -> Result<Option<Value>, SettingsError> {
        match tokio::fs::read_to_string(&self.file_path).await {
            Ok(content) => {
                debug!(path = %self.file_path.display(), "reading settings");
                let document = serde_json::from_str(&content).map_err(SettingsError::Parse)?;
                Ok(Some(document))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SettingsError::Io {
                path: self.file_path.clone(),
                source,
            }),
        }
    }

    async fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(settings).map_err(SettingsError::Serialize)?;

        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            info!(dir = %self.dir.display(), "creating settings directory");
        }
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| SettingsError::Io {
                path: self.dir.clone(),
                source,
            })?;

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|source| SettingsError::Io {
                path: temp_path.clone(),
                source,
            })?;
        tokio::fs::rename(&temp_path, &self.file_path)
            .await
            .map_err(|source| SettingsError::Io {
                path: self.file_path.clone(),
                source,
            })?;

        debug!(path = %self.file_path.display(), "settings written");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

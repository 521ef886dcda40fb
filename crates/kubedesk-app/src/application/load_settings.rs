//! Startup sequence for the settings record.
//!
//! 1. Read the persisted document through the [`SettingsRepository`].
//! 2. Shallow-merge it over the defaults and install it in the store without
//!    notifying anyone.
//! 3. Only if that succeeded, start autosave.
//!
//! A failed load leaves the defaults in the store and autosave off, so a
//! broken file on disk is never overwritten by defaults.

use std::sync::Arc;

use kubedesk_core::{Settings, SettingsStore};
use tracing::{debug, error, info, warn};

use super::autosave::AutosaveHandle;
use super::settings_repository::{SettingsError, SettingsRepository};

/// What the loader found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was persisted yet; the store holds the defaults.
    Defaults,
    /// A document was merged over the defaults.
    Merged {
        /// Top-level keys the schema does not know.  They are kept and
        /// written back unchanged.
        unknown_keys: Vec<String>,
    },
}

/// Loads the persisted document into `store`.
///
/// # Errors
///
/// - [`SettingsError::Io`] if the document exists but cannot be read.
/// - [`SettingsError::Parse`] if it is not valid JSON.
/// - [`SettingsError::InvalidData`] if it is not an object or a known key has
///   the wrong shape.
///
/// On error the store is left untouched.
pub async fn load_into<R>(
    store: &SettingsStore,
    repository: &R,
) -> Result<LoadOutcome, SettingsError>
where
    R: SettingsRepository + ?Sized,
{
    let Some(document) = repository.load().await? else {
        info!("no persisted settings found, using defaults");
        return Ok(LoadOutcome::Defaults);
    };

    let merged = Settings::merged_over_defaults(document)?;
    let unknown_keys = merged.unknown_keys();
    if !unknown_keys.is_empty() {
        warn!(?unknown_keys, "keeping unrecognised settings keys");
    }
    debug!(settings = ?merged, "loaded settings");

    store.replace_silently(merged);
    Ok(LoadOutcome::Merged { unknown_keys })
}

/// Result of [`initialize`].
pub struct SettingsBootstrap {
    /// What the load produced, or why it failed.
    pub outcome: Result<LoadOutcome, SettingsError>,
    /// Running autosave worker.  `None` when the load failed.
    pub autosave: Option<AutosaveHandle>,
}

/// Loads persisted settings into `store` and arms autosave.
///
/// Must be called from within a Tokio runtime.  Bindings handed out by the
/// store before this call observe the loaded record afterwards.
pub async fn initialize(
    store: Arc<SettingsStore>,
    repository: Arc<dyn SettingsRepository>,
) -> SettingsBootstrap {
    match load_into(&store, repository.as_ref()).await {
        Ok(outcome) => {
            let autosave = AutosaveHandle::spawn(store, repository);
            SettingsBootstrap {
                outcome: Ok(outcome),
                autosave: Some(autosave),
            }
        }
        Err(e) => {
            error!(error = %e, "failed to load settings; autosave disabled");
            SettingsBootstrap {
                outcome: Err(e),
                autosave: None,
            }
        }
    }
}

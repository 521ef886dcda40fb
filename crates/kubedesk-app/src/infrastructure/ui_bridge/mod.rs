//! UI command bridge: exposes application-layer operations to the web UI.
//!
//! Every command is a plain `async fn` taking the shared [`AppState`] and
//! returning a [`CommandResult`].  The desktop shell registers them as IPC
//! handlers; tests call them directly.
//!
//! # `CommandResult<T>` wrapper
//!
//! All commands return `CommandResult<T>` rather than `Result<T, E>`, so every
//! response has the same shape: `{ success: bool, data: T | null, error:
//! string | null }`.  The frontend can always read `result.success` without a
//! try/catch around the call.
//!
//! # Settings payloads
//!
//! [`Settings`] is sent as-is: camelCase keys, unknown keys included.  Partial
//! updates use [`update_settings`], which shallow-merges a JSON object over
//! the live record exactly as the loader merges the file over the defaults.

use std::sync::Arc;

use kubedesk_core::logs::{Facet, FilteredLogResult, LogQuery, MatchType, SessionId};
use kubedesk_core::{template_for_kind, Settings, SettingsStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::application::{
    autosave::{AutosaveError, AutosaveHandle},
    load_settings::{initialize, LoadOutcome},
    log_sessions::LogSessionRegistry,
    settings_repository::SettingsRepository,
};

// ── Shared application state ──────────────────────────────────────────────────

/// State shared by every command handler.
///
/// The settings store and the autosave handle do their own synchronisation.
/// The log registry sits behind an async Tokio mutex because command handlers
/// run as concurrent tasks.
pub struct AppState {
    /// The live settings record every UI view binds to.
    pub settings: Arc<SettingsStore>,
    /// Running autosave worker.  `None` if settings failed to load or the
    /// state was built without persistence.
    pub autosave: Option<AutosaveHandle>,
    /// Why loading failed, if it did.
    pub load_error: Option<String>,
    /// Open structured log sessions.
    pub log_sessions: Mutex<LogSessionRegistry>,
}

impl AppState {
    /// Loads persisted settings and starts autosave.
    ///
    /// A load failure does not fail startup: the defaults stay in place,
    /// autosave stays off and the error is reported by [`get_save_status`].
    pub async fn initialize(repository: Arc<dyn SettingsRepository>) -> Arc<Self> {
        let settings = Arc::new(SettingsStore::new());
        let bootstrap = initialize(Arc::clone(&settings), repository).await;

        let load_error = match bootstrap.outcome {
            Ok(LoadOutcome::Defaults) => None,
            Ok(LoadOutcome::Merged { unknown_keys }) => {
                info!(unknown = unknown_keys.len(), "settings loaded");
                None
            }
            Err(e) => Some(e.to_string()),
        };

        Arc::new(Self {
            settings,
            autosave: bootstrap.autosave,
            load_error,
            log_sessions: Mutex::new(LogSessionRegistry::new()),
        })
    }

    /// State over default settings with nothing persisted.
    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            settings: Arc::new(SettingsStore::new()),
            autosave: None,
            load_error: None,
            log_sessions: Mutex::new(LogSessionRegistry::new()),
        })
    }

    /// Stops autosave after writing any pending change.
    pub async fn shutdown(&self) -> Result<(), AutosaveError> {
        match &self.autosave {
            Some(autosave) => autosave.shutdown().await,
            None => Ok(()),
        }
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// DTO describing the persistence state shown in the settings footer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatusDto {
    pub autosave_enabled: bool,
    pub load_error: Option<String>,
    pub current_revision: u64,
    pub saved_revision: Option<u64>,
    pub last_save_error: Option<String>,
}

/// Unified response wrapper used by every command.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

impl<T: Serialize, E: std::fmt::Display> From<Result<T, E>> for CommandResult<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(e.to_string()),
        }
    }
}

fn parse_session_id(raw: &str) -> Result<SessionId, String> {
    raw.parse()
        .map_err(|_| format!("invalid log session id: {raw:?}"))
}

// ── Settings commands ─────────────────────────────────────────────────────────

/// Returns the full settings record.
///
/// # Example (frontend)
/// ```ts
/// const { data: settings } = await invoke<CommandResult<Settings>>('get_settings');
/// ```
pub async fn get_settings(state: Arc<AppState>) -> CommandResult<Settings> {
    CommandResult::ok(state.settings.snapshot())
}

/// Replaces the given top-level keys and returns the updated record.
///
/// `patch` must be a JSON object.  Nested objects replace the stored value
/// wholesale.  A rejected patch leaves the record unchanged.
pub async fn update_settings(state: Arc<AppState>, patch: Value) -> CommandResult<Settings> {
    let Value::Object(patch) = patch else {
        return CommandResult::err("settings patch must be a JSON object");
    };

    let applied = state.settings.update(|settings| {
        let patched = settings.with_patch(patch)?;
        *settings = patched;
        Ok::<(), kubedesk_core::MergeError>(())
    });

    match applied {
        Ok(()) => CommandResult::ok(state.settings.snapshot()),
        Err(e) => {
            warn!(error = %e, "rejected settings patch");
            CommandResult::err(e.to_string())
        }
    }
}

/// Stars or unstars a namespace for a context.  Returns `true` if now starred.
pub async fn toggle_favorite_namespace(
    state: Arc<AppState>,
    context: String,
    namespace: String,
) -> CommandResult<bool> {
    CommandResult::ok(
        state
            .settings
            .update(|settings| settings.toggle_favorite_namespace(&context, &namespace)),
    )
}

/// Collapses or expands a navigation group.  Returns `true` if now collapsed.
pub async fn toggle_navigation_group(state: Arc<AppState>, group: String) -> CommandResult<bool> {
    CommandResult::ok(
        state
            .settings
            .update(|settings| settings.toggle_navigation_group(&group)),
    )
}

/// Reports whether settings are being persisted and how far saving got.
pub async fn get_save_status(state: Arc<AppState>) -> CommandResult<SaveStatusDto> {
    let autosave = state.autosave.as_ref();
    let status = autosave.map(AutosaveHandle::status);

    CommandResult::ok(SaveStatusDto {
        autosave_enabled: autosave.is_some(),
        load_error: state.load_error.clone(),
        current_revision: state.settings.revision(),
        saved_revision: status.as_ref().and_then(|s| s.saved_revision),
        last_save_error: status.and_then(|s| s.last_error),
    })
}

/// Writes the current record to disk immediately.
pub async fn save_settings_now(state: Arc<AppState>) -> CommandResult<()> {
    match &state.autosave {
        Some(autosave) => autosave.save_now().await.into(),
        None => CommandResult::err("settings persistence is disabled"),
    }
}

// ── Template commands ─────────────────────────────────────────────────────────

/// Returns the YAML skeleton for a resource kind.
pub async fn get_spec_template(kind: String) -> CommandResult<String> {
    match template_for_kind(&kind) {
        Some(template) => CommandResult::ok(template.to_string()),
        None => CommandResult::err(format!("no template for kind {kind:?}")),
    }
}

// ── Structured log commands ───────────────────────────────────────────────────

/// Opens a log session and returns its id.
pub async fn start_log_session(state: Arc<AppState>, lines: Vec<String>) -> CommandResult<String> {
    let id = state.log_sessions.lock().await.start(lines);
    CommandResult::ok(id.to_string())
}

pub async fn add_log_lines(
    state: Arc<AppState>,
    session_id: String,
    lines: Vec<String>,
) -> CommandResult<()> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    state.log_sessions.lock().await.add_lines(id, lines).into()
}

/// Adds a facet.  `match_type` is `"AND"` or `"OR"`; anything else means OR.
pub async fn add_log_facet(
    state: Arc<AppState>,
    session_id: String,
    property: String,
    match_type: String,
) -> CommandResult<()> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    state
        .log_sessions
        .lock()
        .await
        .add_facet(id, &property, MatchType::parse_lenient(&match_type))
        .into()
}

pub async fn set_log_facet_match_type(
    state: Arc<AppState>,
    session_id: String,
    property: String,
    match_type: String,
) -> CommandResult<()> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    state
        .log_sessions
        .lock()
        .await
        .set_facet_match_type(id, &property, MatchType::parse_lenient(&match_type))
        .into()
}

pub async fn remove_log_facet(
    state: Arc<AppState>,
    session_id: String,
    property: String,
) -> CommandResult<bool> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    state.log_sessions.lock().await.remove_facet(id, &property).into()
}

pub async fn set_log_facet_value_filtered(
    state: Arc<AppState>,
    session_id: String,
    property: String,
    value: String,
    filtered: bool,
) -> CommandResult<()> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    state
        .log_sessions
        .lock()
        .await
        .set_value_filtered(id, &property, &value, filtered)
        .into()
}

pub async fn get_log_facets(state: Arc<AppState>, session_id: String) -> CommandResult<Vec<Facet>> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    CommandResult::ok(state.log_sessions.lock().await.facets(id))
}

/// Returns one page of filtered, searched and sorted rows.
pub async fn query_log_session(
    state: Arc<AppState>,
    session_id: String,
    query: LogQuery,
) -> CommandResult<FilteredLogResult> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    CommandResult::ok(state.log_sessions.lock().await.query(id, &query))
}

/// Closes a log session.  Returns `false` if it was already closed.
pub async fn end_log_session(state: Arc<AppState>, session_id: String) -> CommandResult<bool> {
    let id = match parse_session_id(&session_id) {
        Ok(id) => id,
        Err(e) => return CommandResult::err(e),
    };
    CommandResult::ok(state.log_sessions.lock().await.end(id))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::settings_repository::SettingsError;
    use async_trait::async_trait;
    use kubedesk_core::ColorScheme;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::{Notify, Semaphore};

    #[tokio::test]
    async fn test_get_settings_returns_defaults_for_fresh_state() {
        let state = AppState::in_memory();
        let result = get_settings(state).await;
        assert!(result.success);
        assert_eq!(result.data, Some(Settings::default()));
    }

    #[tokio::test]
    async fn test_update_settings_applies_shallow_patch() {
        // Arrange
        let state = AppState::in_memory();

        // Act
        let result = update_settings(
            Arc::clone(&state),
            json!({"appearance": {"colorScheme": "dark"}, "lastContext": "kind"}),
        )
        .await;

        // Assert
        assert!(result.success);
        let settings = state.settings.snapshot();
        assert_eq!(settings.color_scheme(), ColorScheme::Dark);
        assert_eq!(settings.last_context.as_deref(), Some("kind"));
        assert_eq!(state.settings.revision(), 1);
    }

    #[tokio::test]
    async fn test_update_settings_rejects_bad_patch_without_changing_record() {
        let state = AppState::in_memory();

        let not_object = update_settings(Arc::clone(&state), json!([1])).await;
        let wrong_shape = update_settings(Arc::clone(&state), json!({"shell": 7})).await;

        assert!(!not_object.success);
        assert!(!wrong_shape.success);
        assert_eq!(state.settings.revision(), 0);
        assert_eq!(state.settings.snapshot(), Settings::default());
    }

    #[tokio::test]
    async fn test_command_result_serializes_uniform_shape() {
        let result: CommandResult<u32> = CommandResult::err("boom");
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"success": false, "data": null, "error": "boom"})
        );
    }

    #[tokio::test]
    async fn test_save_status_without_persistence() {
        let state = AppState::in_memory();

        let status = get_save_status(Arc::clone(&state)).await.data.unwrap();
        let saved = save_settings_now(state).await;

        assert!(!status.autosave_enabled);
        assert_eq!(status.saved_revision, None);
        assert!(!saved.success);
    }

    #[tokio::test]
    async fn test_save_status_serializes_camel_case_keys() {
        let status = SaveStatusDto {
            autosave_enabled: true,
            load_error: None,
            current_revision: 3,
            saved_revision: Some(2),
            last_save_error: Some("denied".into()),
        };

        let value = serde_json::to_value(&status).unwrap();

        assert_eq!(
            value,
            json!({
                "autosaveEnabled": true,
                "loadError": null,
                "currentRevision": 3,
                "savedRevision": 2,
                "lastSaveError": "denied",
            })
        );
    }

    struct GatedRepository {
        entered: Notify,
        gate: Semaphore,
    }

    #[async_trait]
    impl SettingsRepository for GatedRepository {
        async fn load(&self) -> Result<Option<Value>, SettingsError> {
            Ok(None)
        }

        async fn save(&self, _settings: &Settings) -> Result<(), SettingsError> {
            self.entered.notify_one();
            let _permit = self.gate.acquire().await.expect("gate closed");
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_save_status_answers_while_manual_save_is_running() {
        // Arrange
        let repo = Arc::new(GatedRepository {
            entered: Notify::new(),
            gate: Semaphore::new(0),
        });
        let state = AppState::initialize(repo.clone()).await;

        // Act
        let saving = tokio::spawn(save_settings_now(Arc::clone(&state)));
        repo.entered.notified().await;
        let status = tokio::time::timeout(
            Duration::from_secs(1),
            get_save_status(Arc::clone(&state)),
        )
        .await;
        repo.gate.add_permits(1);

        // Assert
        let status = status.expect("status blocked behind the save").data.unwrap();
        assert!(status.autosave_enabled);
        assert_eq!(status.saved_revision, None);
        assert!(saving.await.unwrap().success);
        assert_eq!(
            get_save_status(Arc::clone(&state)).await.data.unwrap().saved_revision,
            Some(0)
        );
        assert!(state.shutdown().await.is_ok());
    }

    #[tokio::test]
    async fn test_get_spec_template() {
        assert_eq!(
            get_spec_template("pvc".into()).await.data.as_deref(),
            Some(kubedesk_core::PVC_TEMPLATE)
        );
        assert!(!get_spec_template("CronJob".into()).await.success);
    }

    #[tokio::test]
    async fn test_log_session_commands_end_to_end() {
        // Arrange
        let state = AppState::in_memory();
        let id = start_log_session(
            Arc::clone(&state),
            vec![
                r#"{"level":"info","msg":"ready"}"#.into(),
                r#"{"level":"warn","msg":"slow"}"#.into(),
            ],
        )
        .await
        .data
        .unwrap();

        // Act
        assert!(add_log_facet(Arc::clone(&state), id.clone(), "level".into(), "OR".into())
            .await
            .success);
        assert!(set_log_facet_value_filtered(
            Arc::clone(&state),
            id.clone(),
            "level".into(),
            "warn".into(),
            true
        )
        .await
        .success);
        let page = query_log_session(
            Arc::clone(&state),
            id.clone(),
            LogQuery {
                limit: 50,
                ..LogQuery::default()
            },
        )
        .await
        .data
        .unwrap();

        // Assert
        assert_eq!(page.total, 2);
        assert_eq!(page.filtered_total, 1);
        assert_eq!(page.data[0]["msg"], "slow");
        let facets = get_log_facets(Arc::clone(&state), id.clone()).await.data.unwrap();
        assert_eq!(facets[0].values.len(), 2);
        assert_eq!(end_log_session(state, id).await.data, Some(true));
    }

    #[tokio::test]
    async fn test_log_commands_reject_malformed_session_id() {
        let state = AppState::in_memory();
        let result = add_log_lines(state, "not-a-uuid".into(), vec![]).await;
        assert!(!result.success);
        assert!(result.error.unwrap().contains("not-a-uuid"));
    }
}

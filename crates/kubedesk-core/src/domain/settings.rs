//! User preference record and its merge rules.
//!
//! [`Settings`] is the single record persisted to `settings.json`.  Every
//! top-level field is always present in memory; a partial or legacy file is
//! completed from [`Settings::default()`] by a **shallow** merge:
//!
//! ```text
//! defaults  { tabProvider: { height: 50 }, shell: { executable: "/bin/sh" }, ... }
//! file      { tabProvider: {} }
//! merged    { tabProvider: {},             shell: { executable: "/bin/sh" }, ... }
//! ```
//!
//! A nested object found in the file replaces the default nested object as a
//! whole; its fields are never filled in one by one.  That is why the leaf
//! fields of the nested structs are `Option`s: `tabProvider: {}` must survive a
//! load/save cycle as `{}`.  Consumers that need a concrete value use the
//! effective accessors such as [`Settings::tab_height`], which fall back to the
//! documented defaults.
//!
//! Keys the schema does not know about are kept and written back on the next
//! save: top-level ones in [`Settings::extra`], keys inside a nested object in
//! that object's own `extra` map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Default height of the bottom tab panel.
pub const DEFAULT_TAB_HEIGHT: f64 = 50.0;

/// Shell used for exec sessions when the user has not picked one.
pub const DEFAULT_SHELL_EXECUTABLE: &str = "/bin/sh";

/// Errors produced while turning a persisted document into [`Settings`].
#[derive(Debug, Error)]
pub enum MergeError {
    /// The persisted document is valid JSON but not a JSON object.
    #[error("settings document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// A known key holds a value of the wrong shape (e.g. `"appearance": 5`).
    #[error("invalid settings value: {0}")]
    InvalidValue(#[from] serde_json::Error),
}

// ── Schema types ──────────────────────────────────────────────────────────────

/// UI colour scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    /// Follow the operating system.
    #[default]
    Auto,
    Light,
    Dark,
}

/// Favourite namespaces for one cluster context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSettings {
    /// Kubeconfig context name.
    pub context: String,
    /// Favourite namespaces, in the order the user added them.
    pub namespaces: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Layout of the bottom tab panel.
///
/// The height is kept as a JSON number so `50` is written back as `50`, not
/// `50.0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabProviderSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<Number>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TabProviderSettings {
    /// Panel settings with the given height.  Whole numbers are stored as
    /// integers.
    pub fn with_height(height: f64) -> Self {
        Self {
            height: number_from_f64(height),
            extra: Map::new(),
        }
    }
}

fn number_from_f64(value: f64) -> Option<Number> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Some(Number::from(value as i64))
    } else {
        Number::from_f64(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredLogViewerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppearanceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_scheme: Option<ColorScheme>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_on_startup: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The complete user preference record.
///
/// Field order here is the key order of the serialized file, followed by any
/// unknown keys in sorted order.  Keeping the order stable makes two saves of
/// an unchanged record byte-identical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Last cluster context the user selected.
    pub last_context: Option<String>,
    /// Last namespace the user selected.
    pub last_namespace: Option<String>,
    pub tab_provider: TabProviderSettings,
    pub shell: ShellSettings,
    pub structured_log_viewer: StructuredLogViewerSettings,
    /// Per-context namespace favourites.
    pub context_settings: Vec<ContextSettings>,
    /// Sidebar groups the user has collapsed.
    pub collapsed_navigation_groups: Vec<String>,
    pub appearance: AppearanceSettings,
    pub updates: UpdateSettings,
    /// Top-level keys not described by this schema, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for TabProviderSettings {
    fn default() -> Self {
        Self::with_height(DEFAULT_TAB_HEIGHT)
    }
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            executable: Some(DEFAULT_SHELL_EXECUTABLE.to_string()),
            extra: Map::new(),
        }
    }
}

impl Default for StructuredLogViewerSettings {
    fn default() -> Self {
        Self {
            enabled: Some(false),
            extra: Map::new(),
        }
    }
}

impl Default for AppearanceSettings {
    fn default() -> Self {
        Self {
            color_scheme: Some(ColorScheme::Auto),
            extra: Map::new(),
        }
    }
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            check_on_startup: Some(true),
            extra: Map::new(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            last_context: None,
            last_namespace: None,
            tab_provider: TabProviderSettings::default(),
            shell: ShellSettings::default(),
            structured_log_viewer: StructuredLogViewerSettings::default(),
            context_settings: Vec::new(),
            collapsed_navigation_groups: Vec::new(),
            appearance: AppearanceSettings::default(),
            updates: UpdateSettings::default(),
            extra: Map::new(),
        }
    }
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Overwrites top-level keys of `base` with those of `overlay`.
///
/// Nested objects are replaced, never merged.
pub fn shallow_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        base.insert(key, value);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Settings {
    /// Names of the top-level keys this schema understands, in file order.
    pub const KNOWN_KEYS: [&'static str; 9] = [
        "lastContext",
        "lastNamespace",
        "tabProvider",
        "shell",
        "structuredLogViewer",
        "contextSettings",
        "collapsedNavigationGroups",
        "appearance",
        "updates",
    ];

    /// Serializes the record into a JSON object map.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidValue`] if serialization fails.
    pub fn to_document(&self) -> Result<Map<String, Value>, MergeError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(MergeError::NotAnObject(json_kind(&other))),
        }
    }

    /// Builds a record from a persisted document by shallow-merging it over
    /// the defaults.
    ///
    /// # Errors
    ///
    /// - [`MergeError::NotAnObject`] if `document` is not a JSON object.
    /// - [`MergeError::InvalidValue`] if a known key has the wrong shape.
    pub fn merged_over_defaults(document: Value) -> Result<Self, MergeError> {
        let overlay = match document {
            Value::Object(map) => map,
            other => return Err(MergeError::NotAnObject(json_kind(&other))),
        };

        let mut merged = Settings::default().to_document()?;
        shallow_merge(&mut merged, overlay);
        Ok(serde_json::from_value(Value::Object(merged))?)
    }

    /// Returns a copy of `self` with the given top-level keys replaced.
    ///
    /// This is the same shallow merge used at load time, applied to the live
    /// record.  Used by the UI bridge to apply partial updates.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidValue`] if a patched key has the wrong shape.
    pub fn with_patch(&self, patch: Map<String, Value>) -> Result<Self, MergeError> {
        let mut document = self.to_document()?;
        shallow_merge(&mut document, patch);
        Ok(serde_json::from_value(Value::Object(document))?)
    }

    /// Top-level keys of `extra`, i.e. keys not described by the schema.
    pub fn unknown_keys(&self) -> Vec<String> {
        self.extra.keys().cloned().collect()
    }

    // ── Effective values ──────────────────────────────────────────────────────

    pub fn tab_height(&self) -> f64 {
        self.tab_provider
            .height
            .as_ref()
            .and_then(Number::as_f64)
            .unwrap_or(DEFAULT_TAB_HEIGHT)
    }

    pub fn shell_executable(&self) -> &str {
        self.shell
            .executable
            .as_deref()
            .unwrap_or(DEFAULT_SHELL_EXECUTABLE)
    }

    pub fn structured_log_viewer_enabled(&self) -> bool {
        self.structured_log_viewer.enabled.unwrap_or(false)
    }

    pub fn color_scheme(&self) -> ColorScheme {
        self.appearance.color_scheme.unwrap_or_default()
    }

    pub fn check_updates_on_startup(&self) -> bool {
        self.updates.check_on_startup.unwrap_or(true)
    }

    // ── Favourites and navigation ─────────────────────────────────────────────

    /// Favourite namespaces for `context`, empty when none are stored.
    pub fn namespaces_for(&self, context: &str) -> &[String] {
        self.context_settings
            .iter()
            .find(|c| c.context == context)
            .map(|c| c.namespaces.as_slice())
            .unwrap_or(&[])
    }

    /// Adds `namespace` to the favourites of `context`, or removes it if it is
    /// already there.
    ///
    /// Returns `true` when the namespace is a favourite afterwards.
    pub fn toggle_favorite_namespace(&mut self, context: &str, namespace: &str) -> bool {
        let entry = match self
            .context_settings
            .iter()
            .position(|c| c.context == context)
        {
            Some(idx) => &mut self.context_settings[idx],
            None => {
                self.context_settings.push(ContextSettings {
                    context: context.to_string(),
                    namespaces: Vec::new(),
                    extra: Map::new(),
                });
                let last = self.context_settings.len() - 1;
                &mut self.context_settings[last]
            }
        };

        if let Some(idx) = entry.namespaces.iter().position(|n| n == namespace) {
            entry.namespaces.remove(idx);
            false
        } else {
            entry.namespaces.push(namespace.to_string());
            true
        }
    }

    /// Collapses `group` in the sidebar, or expands it if already collapsed.
    ///
    /// Returns `true` when the group is collapsed afterwards.
    pub fn toggle_navigation_group(&mut self, group: &str) -> bool {
        if let Some(idx) = self
            .collapsed_navigation_groups
            .iter()
            .position(|g| g == group)
        {
            self.collapsed_navigation_groups.remove(idx);
            false
        } else {
            self.collapsed_navigation_groups.push(group.to_string());
            true
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

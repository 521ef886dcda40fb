//! # kubedesk-core
//!
//! Shared library for the Kubedesk desktop backend: the user preference model
//! and its observable store, the structured log session engine, and the
//! static spec templates offered by the "create resource" editor.
//!
//! This crate has no file system, network, or async runtime dependencies.
//! Loading and saving `settings.json` is the job of `kubedesk-app`, which
//! subscribes to the [`SettingsStore`] defined here.
//!
//! - **`domain`** – [`Settings`], defaults, shallow merge, and
//!   [`SettingsStore`] with its field bindings.
//! - **`logs`** – faceted filtering, search, sorting, and paging over JSON
//!   log lines.
//! - **`templates`** – YAML skeletons used to pre-fill the resource editor.

pub mod domain;
pub mod logs;
pub mod templates;

pub use domain::settings::{ColorScheme, MergeError, Settings};
pub use domain::store::{FieldRef, SettingsChange, SettingsRefs, SettingsStore};
pub use logs::{FilteredLogResult, LogQuery, LogSession, LogSessionError, SessionId};
pub use templates::{template_for_kind, PVC_TEMPLATE};

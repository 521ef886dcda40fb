//! Domain entities for Kubedesk user preferences.
//!
//! Pure data and rules with no file system or runtime dependencies:
//!
//! - **`settings`** – the [`settings::Settings`] record, its defaults, and the
//!   shallow merge applied when a persisted file is loaded.
//! - **`store`** – [`store::SettingsStore`], the observable container the UI
//!   reads and writes through, and the per-field bindings it hands out.
//!
//! Persistence lives in the application crate; it observes the store and
//! never the other way around.

pub mod settings;
pub mod store;

pub use settings::{
    AppearanceSettings, ColorScheme, ContextSettings, MergeError, Settings, ShellSettings,
    StructuredLogViewerSettings, TabProviderSettings, UpdateSettings,
};
pub use store::{FieldRef, SettingsChange, SettingsRefs, SettingsStore, SubscriptionId};

//! Storage infrastructure: settings file persistence.
//!
//! The `settings_file` sub-module implements
//! [`crate::application::settings_repository::SettingsRepository`] on top of a
//! JSON file in the platform config directory.

pub mod settings_file;

//! Application layer use cases for the desktop backend.
//!
//! Use cases here orchestrate the domain types from `kubedesk_core` and depend
//! on the [`settings_repository::SettingsRepository`] abstraction rather than
//! on the file system, so tests can swap in an in-memory or mocked store.
//!
//! # Sub-modules
//!
//! - **`settings_repository`** – The persistence seam and its error type.
//!
//! - **`load_settings`** – Startup sequence: read the persisted document,
//!   merge it over the defaults and arm autosave.
//!
//! - **`autosave`** – Background worker that writes the record back to disk
//!   after every change, one write at a time.
//!
//! - **`log_sessions`** – Registry of structured log sessions opened by the
//!   log viewer.

pub mod autosave;
pub mod load_settings;
pub mod log_sessions;
pub mod settings_repository;

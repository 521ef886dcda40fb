//! Infrastructure layer for the desktop backend.
//!
//! Contains the file-system storage adapter and the UI command bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `kubedesk_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod storage;
pub mod ui_bridge;

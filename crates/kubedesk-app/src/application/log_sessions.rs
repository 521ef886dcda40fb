//! Registry of live structured log sessions.
//!
//! The log viewer starts a session when it opens a pod's log stream, pushes
//! new lines as they arrive and ends the session when the tab closes.  Every
//! other call addresses a session by the [`SessionId`] returned from
//! [`LogSessionRegistry::start`].
//!
//! Reads against an unknown id return empty results; writes return
//! [`LogSessionError::UnknownSession`].

use std::collections::HashMap;

use kubedesk_core::logs::{Facet, LogQuery, LogSession, LogSessionError, MatchType, SessionId};
use kubedesk_core::FilteredLogResult;
use tracing::debug;
use uuid::Uuid;

/// In-memory registry of log sessions, stored behind a `Mutex` in `AppState`.
#[derive(Default)]
pub struct LogSessionRegistry {
    sessions: HashMap<SessionId, LogSession>,
}

impl LogSessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session over `lines` and returns its id.
    pub fn start<I>(&mut self, lines: I) -> SessionId
    where
        I: IntoIterator<Item = String>,
    {
        let id = Uuid::new_v4();
        let session = LogSession::new(lines);
        debug!(session = %id, rows = session.len(), "log session started");
        self.sessions.insert(id, session);
        id
    }

    /// Appends lines to a session.
    pub fn add_lines<I>(&mut self, id: SessionId, lines: I) -> Result<(), LogSessionError>
    where
        I: IntoIterator<Item = String>,
    {
        self.session_mut(id)?.push_lines(lines);
        Ok(())
    }

    /// Adds a facet, or updates the match type of an existing one.
    pub fn add_facet(
        &mut self,
        id: SessionId,
        property: &str,
        match_type: MatchType,
    ) -> Result<(), LogSessionError> {
        self.session_mut(id)?.add_facet(property, match_type);
        Ok(())
    }

    pub fn set_facet_match_type(
        &mut self,
        id: SessionId,
        property: &str,
        match_type: MatchType,
    ) -> Result<(), LogSessionError> {
        self.session_mut(id)?.set_match_type(property, match_type)
    }

    /// Removes a facet.  Returns `false` if the session had none on `property`.
    pub fn remove_facet(&mut self, id: SessionId, property: &str) -> Result<bool, LogSessionError> {
        Ok(self.session_mut(id)?.remove_facet(property))
    }

    pub fn set_value_filtered(
        &mut self,
        id: SessionId,
        property: &str,
        value: &str,
        filtered: bool,
    ) -> Result<(), LogSessionError> {
        self.session_mut(id)?.set_value_filtered(property, value, filtered)
    }

    /// Facets of a session, or an empty list if the id is unknown.
    pub fn facets(&self, id: SessionId) -> Vec<Facet> {
        self.sessions
            .get(&id)
            .map(|session| session.facets().to_vec())
            .unwrap_or_default()
    }

    /// Runs a query, or returns an empty page if the id is unknown.
    pub fn query(&self, id: SessionId, query: &LogQuery) -> FilteredLogResult {
        self.sessions
            .get(&id)
            .map(|session| session.query(query))
            .unwrap_or_default()
    }

    /// Drops a session.  Returns `false` if it was not registered.
    pub fn end(&mut self, id: SessionId) -> bool {
        let removed = self.sessions.remove(&id).is_some();
        if removed {
            debug!(session = %id, "log session ended");
        }
        removed
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut LogSession, LogSessionError> {
        self.sessions
            .get_mut(&id)
            .ok_or(LogSessionError::UnknownSession(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_registry_starts_empty() {
        let registry = LogSessionRegistry::new();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_start_and_end_session() {
        let mut registry = LogSessionRegistry::new();
        let id = registry.start(lines(&[r#"{"msg":"a"}"#]));

        assert_eq!(registry.len(), 1);
        assert!(registry.end(id));
        assert!(!registry.end(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut registry = LogSessionRegistry::new();
        let first = registry.start(lines(&[r#"{"level":"info"}"#]));
        let second = registry.start(lines(&[r#"{"level":"warn"}"#, r#"{"level":"warn"}"#]));

        registry.add_facet(first, "level", MatchType::Or).unwrap();

        assert_eq!(registry.facets(first).len(), 1);
        assert!(registry.facets(second).is_empty());
        assert_eq!(registry.query(second, &LogQuery::default()).total, 2);
    }

    #[test]
    fn test_filtering_through_registry() {
        // Arrange
        let mut registry = LogSessionRegistry::new();
        let id = registry.start(lines(&[
            r#"{"level":"info","msg":"boot"}"#,
            r#"{"level":"error","msg":"crash"}"#,
        ]));
        registry
            .add_lines(id, lines(&[r#"{"level":"error","msg":"again"}"#]))
            .unwrap();
        registry.add_facet(id, "level", MatchType::Or).unwrap();

        // Act
        registry.set_value_filtered(id, "level", "error", true).unwrap();
        let result = registry.query(
            id,
            &LogQuery {
                limit: 10,
                ..LogQuery::default()
            },
        );

        // Assert
        assert_eq!(result.total, 3);
        assert_eq!(result.filtered_total, 2);
        assert_eq!(result.data[0], json!({"level": "error", "msg": "crash"}));
        assert_eq!(result.data[1], json!({"level": "error", "msg": "again"}));
    }

    #[test]
    fn test_unknown_session_reads_are_empty_and_writes_fail() {
        let mut registry = LogSessionRegistry::new();
        let id = Uuid::new_v4();

        assert!(registry.facets(id).is_empty());
        assert_eq!(
            registry.query(id, &LogQuery::default()),
            FilteredLogResult::default()
        );
        assert_eq!(
            registry.add_lines(id, lines(&["x"])),
            Err(LogSessionError::UnknownSession(id))
        );
        assert_eq!(
            registry.remove_facet(id, "level"),
            Err(LogSessionError::UnknownSession(id))
        );
    }
}

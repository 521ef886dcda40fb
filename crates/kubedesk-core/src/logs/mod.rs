//! Structured log sessions.
//!
//! The structured log viewer streams pod log lines into a session, lets the
//! user pick *facets* (JSON properties such as `level` or `pod`) and filter by
//! their values, and pages through the result with free-text search and
//! multi-column sorting.  Everything here is in-memory and synchronous; the
//! application layer owns the registry of live sessions.
//!
//! See [`query`] for the exact filtering rules.

pub mod query;
pub mod session;

pub use query::{FilteredLogResult, LogQuery, SortKey};
pub use session::{parse_line, Facet, FacetValue, LogSession, LogSessionError, MatchType, SessionId};

//! A single structured log session: rows plus the facets defined over them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

/// Identifier handed to the UI when a session starts.
pub type SessionId = Uuid;

/// Errors raised by session operations.
#[derive(Debug, Error, PartialEq)]
pub enum LogSessionError {
    /// No session is registered under this id.
    #[error("unknown log session: {0}")]
    UnknownSession(SessionId),

    /// The session has no facet for this property.
    #[error("no facet for property {0:?}")]
    UnknownFacet(String),

    /// The facet has never seen this value.
    #[error("facet {property:?} has no value {value:?}")]
    UnknownFacetValue { property: String, value: String },
}

/// How a facet's matches combine with the facets before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchType {
    #[serde(rename = "AND")]
    And,
    #[default]
    #[serde(rename = "OR")]
    Or,
}

impl MatchType {
    /// Parses the UI's `"AND"` / `"OR"` strings.  Anything else means OR.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw {
            "AND" => MatchType::And,
            _ => MatchType::Or,
        }
    }
}

/// One distinct value of a faceted property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetValue {
    pub value: String,
    /// Whether the user selected this value as a filter.
    pub filtered: bool,
    /// Number of rows carrying this value.
    pub total: u32,
}

/// A property the user filters on, with its distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facet {
    pub property: String,
    pub match_type: MatchType,
    pub values: Vec<FacetValue>,
}

/// Parses a raw log line.  Lines that are not JSON are kept as JSON strings.
pub fn parse_line(line: String) -> Value {
    serde_json::from_str(&line).unwrap_or(Value::String(line))
}

/// Rows of one log stream and the facets defined over them.
#[derive(Debug, Default, Clone)]
pub struct LogSession {
    pub(crate) rows: Vec<Value>,
    pub(crate) facets: Vec<Facet>,
}

impl LogSession {
    /// Creates a session from raw lines.
    pub fn new<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            rows: lines.into_iter().map(parse_line).collect(),
            facets: Vec::new(),
        }
    }

    /// Number of rows in the session.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn facets(&self) -> &[Facet] {
        &self.facets
    }

    /// Appends raw lines and refreshes facet counts.
    pub fn push_lines<I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.rows.extend(lines.into_iter().map(parse_line));
        self.refresh_facet_values();
    }

    /// Adds a facet on `property`.
    ///
    /// If the property already has a facet only its match type is updated.
    pub fn add_facet(&mut self, property: &str, match_type: MatchType) {
        match self.facets.iter_mut().find(|f| f.property == property) {
            Some(facet) => facet.match_type = match_type,
            None => self.facets.push(Facet {
                property: property.to_string(),
                match_type,
                values: Vec::new(),
            }),
        }
        self.refresh_facet_values();
    }

    /// Changes how a facet combines with the facets before it.
    ///
    /// # Errors
    ///
    /// Returns [`LogSessionError::UnknownFacet`] if `property` has no facet.
    pub fn set_match_type(
        &mut self,
        property: &str,
        match_type: MatchType,
    ) -> Result<(), LogSessionError> {
        let facet = self.facet_mut(property)?;
        facet.match_type = match_type;
        Ok(())
    }

    /// Removes the facet on `property`.  Returns `false` if there was none.
    pub fn remove_facet(&mut self, property: &str) -> bool {
        let before = self.facets.len();
        self.facets.retain(|f| f.property != property);
        let removed = self.facets.len() != before;
        self.refresh_facet_values();
        removed
    }

    /// Selects or deselects one facet value as a filter.
    ///
    /// # Errors
    ///
    /// - [`LogSessionError::UnknownFacet`] if `property` has no facet.
    /// - [`LogSessionError::UnknownFacetValue`] if the facet never saw `value`.
    pub fn set_value_filtered(
        &mut self,
        property: &str,
        value: &str,
        filtered: bool,
    ) -> Result<(), LogSessionError> {
        let facet = self.facet_mut(property)?;
        let entry = facet
            .values
            .iter_mut()
            .find(|v| v.value == value)
            .ok_or_else(|| LogSessionError::UnknownFacetValue {
                property: property.to_string(),
                value: value.to_string(),
            })?;
        entry.filtered = filtered;
        Ok(())
    }

    fn facet_mut(&mut self, property: &str) -> Result<&mut Facet, LogSessionError> {
        self.facets
            .iter_mut()
            .find(|f| f.property == property)
            .ok_or_else(|| LogSessionError::UnknownFacet(property.to_string()))
    }

    /// Recounts every facet's values.
    ///
    /// Known values get their totals updated and keep their `filtered` flag;
    /// new values are appended in sorted order.  Only string-valued properties
    /// are faceted.
    fn refresh_facet_values(&mut self) {
        for facet in &mut self.facets {
            let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
            for row in &self.rows {
                if let Some(value) = row.get(&facet.property).and_then(Value::as_str) {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }

            for (value, total) in counts {
                match facet.values.iter_mut().find(|v| v.value == value) {
                    Some(existing) => existing.total = total,
                    None => facet.values.push(FacetValue {
                        value: value.to_string(),
                        filtered: false,
                        total,
                    }),
                }
            }
        }
    }
}

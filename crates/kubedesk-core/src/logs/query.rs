//! Filtering, search, sorting, and paging over a [`LogSession`].
//!
//! A query runs four stages in order:
//!
//! ```text
//! rows ─► facet filter ─► text search ─► multi-key sort ─► offset/limit
//! ```
//!
//! **Facet filter.**  For every facet with at least one selected value, the
//! rows whose property equals one of the selected values form that facet's
//! match set.  Facets whose selection matches no row are skipped.  The first
//! remaining facet seeds the result; each later facet is combined with it by
//! its own [`MatchType`]: `OR` takes the union, `AND` the intersection.  When
//! any value is selected, only the combined rows survive, so a selection that
//! matches nothing yields nothing.
//!
//! **Text search.**  Case-insensitive.  An object row matches if any string
//! field contains the needle, or the JSON text of any nested object field
//! does.  Non-object rows never match a non-empty search.
//!
//! **Sort.**  Keys apply in order.  For one key, rows that lack it or hold a
//! value that is neither a number nor a string come first, then numbers in
//! numeric order, then strings in lexical order; `desc` reverses the whole
//! sequence.  The sort is stable, so ties keep insertion order.
//!
//! **Paging.**  `filtered_total` is the number of rows after filtering, or 0
//! when `offset` is past the end.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::session::{LogSession, MatchType};

/// One sort key sent by the log table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    /// Property to sort by.
    pub id: String,
    /// `true` for descending order.
    pub desc: bool,
}

/// Parameters of a single query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    pub search: String,
    pub offset: usize,
    pub limit: usize,
    pub sorting: Vec<SortKey>,
}

/// One page of filtered rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredLogResult {
    pub data: Vec<Value>,
    /// Rows matching the filters, before paging.
    pub filtered_total: u32,
    /// All rows in the session.
    pub total: u32,
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

impl LogSession {
    /// Runs `query` against the session.
    pub fn query(&self, query: &LogQuery) -> FilteredLogResult {
        let needle = query.search.to_lowercase();
        let searching = !needle.is_empty();
        let keep = |row: &Value| !searching || row_matches_search(row, &needle);

        let filtered: Vec<&Value> = if self.any_value_filtered() {
            self.facet_matches()
                .into_iter()
                .map(|idx| &self.rows[idx])
                .filter(|row| keep(*row))
                .collect()
        } else {
            self.rows.iter().filter(|row| keep(*row)).collect()
        };

        let sorted = sort_rows(filtered, &query.sorting);
        let (data, filtered_total) = page(sorted, query.offset, query.limit);

        FilteredLogResult {
            data,
            filtered_total,
            total: saturating_u32(self.rows.len()),
        }
    }

    fn any_value_filtered(&self) -> bool {
        self.facets
            .iter()
            .any(|facet| facet.values.iter().any(|v| v.filtered))
    }

    /// Row indices selected by the facet filters, in insertion order.
    fn facet_matches(&self) -> BTreeSet<usize> {
        let mut combined: Option<BTreeSet<usize>> = None;

        for facet in &self.facets {
            let selected: Vec<&str> = facet
                .values
                .iter()
                .filter(|v| v.filtered)
                .map(|v| v.value.as_str())
                .collect();
            if selected.is_empty() {
                continue;
            }

            let hits: BTreeSet<usize> = self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| {
                    row.get(&facet.property)
                        .and_then(Value::as_str)
                        .is_some_and(|value| selected.contains(&value))
                })
                .map(|(idx, _)| idx)
                .collect();
            if hits.is_empty() {
                continue;
            }

            combined = Some(match combined {
                None => hits,
                Some(acc) => match facet.match_type {
                    MatchType::Or => acc.union(&hits).copied().collect(),
                    MatchType::And => acc.intersection(&hits).copied().collect(),
                },
            });
        }

        combined.unwrap_or_default()
    }
}

/// Case-insensitive search over an object row's string and object fields.
///
/// `needle` must already be lowercase.
fn row_matches_search(row: &Value, needle: &str) -> bool {
    let Some(fields) = row.as_object() else {
        return false;
    };

    fields.values().any(|value| match value {
        Value::String(text) => text.to_lowercase().contains(needle),
        Value::Object(_) => value.to_string().to_lowercase().contains(needle),
        _ => false,
    })
}

/// Position of a sort value's kind: missing or unsortable, number, string.
fn sort_rank(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        _ => 0,
    }
}

/// Total order over rows for one key.
fn compare_by_key(a: &Value, b: &Value, key: &SortKey) -> Ordering {
    let (va, vb) = (a.get(&key.id), b.get(&key.id));

    let order = match (va, vb) {
        (Some(Value::String(sa)), Some(Value::String(sb))) => sa.cmp(sb),
        (Some(Value::Number(na)), Some(Value::Number(nb))) => {
            let fa = na.as_f64().unwrap_or(f64::NAN);
            let fb = nb.as_f64().unwrap_or(f64::NAN);
            fa.total_cmp(&fb)
        }
        _ => sort_rank(va).cmp(&sort_rank(vb)),
    };

    if key.desc {
        order.reverse()
    } else {
        order
    }
}

fn sort_rows<'a>(mut rows: Vec<&'a Value>, sorting: &[SortKey]) -> Vec<&'a Value> {
    if sorting.is_empty() {
        return rows;
    }
    rows.sort_by(|a, b| {
        sorting
            .iter()
            .map(|key| compare_by_key(a, b, key))
            .find(|order| *order != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
    rows
}

fn page(rows: Vec<&Value>, offset: usize, limit: usize) -> (Vec<Value>, u32) {
    if offset >= rows.len() {
        return (Vec::new(), 0);
    }
    let end = offset.saturating_add(limit).min(rows.len());
    let data = rows[offset..end].iter().map(|row| (*row).clone()).collect();
    (data, saturating_u32(rows.len()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

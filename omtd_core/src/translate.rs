//! Translation of a connector [`Query`] into Solr request parameters.
//!
//! [`translate`] is pure: every call builds a fresh [`BackendQuery`], so one
//! connector can serve overlapping requests without sharing pagination state.

use crate::model::Query;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Solr's match-all query.
pub const MATCH_ALL: &str = "*:*";

/// Cursor mark that starts a deep-paging walk.
pub const CURSOR_MARK_START: &str = "*";

static YEAR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4}$").expect("valid year regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("asc") {
            Some(Self::Asc)
        } else if raw.eq_ignore_ascii_case("desc") {
            Some(Self::Desc)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A fully resolved Solr select request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendQuery {
    pub q: String,
    pub start: usize,
    pub rows: usize,
    pub filter_queries: Vec<String>,
    pub sort: Vec<(String, SortOrder)>,
    pub fields: Vec<String>,
    pub faceting: bool,
    pub facet_fields: Vec<String>,
    pub cursor_mark: Option<String>,
}

impl BackendQuery {
    pub fn with_cursor(mut self, mark: impl Into<String>) -> Self {
        self.cursor_mark = Some(mark.into());
        self
    }

    pub fn sort_clause(&self) -> Option<String> {
        if self.sort.is_empty() {
            return None;
        }
        let clause = self
            .sort
            .iter()
            .map(|(field, order)| format!("{} {}", field, order.as_str()))
            .collect::<Vec<_>>()
            .join(",");
        Some(clause)
    }

    /// Render as `/select` query parameters. Repeated keys (`fq`, `facet.field`)
    /// appear once per value.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        // Solr rejects cursorMark combined with a non-zero start.
        let start = if self.cursor_mark.is_some() {
            0
        } else {
            self.start
        };

        let mut params = vec![
            ("q", self.q.clone()),
            ("start", start.to_string()),
            ("rows", self.rows.to_string()),
        ];
        for fq in &self.filter_queries {
            params.push(("fq", fq.clone()));
        }
        if let Some(sort) = self.sort_clause() {
            params.push(("sort", sort));
        }
        if !self.fields.is_empty() {
            params.push(("fl", self.fields.join(",")));
        }
        if self.faceting {
            params.push(("facet", "true".to_string()));
            params.push(("facet.limit", "-1".to_string()));
            for field in &self.facet_fields {
                params.push(("facet.field", field.clone()));
            }
        }
        if let Some(mark) = &self.cursor_mark {
            params.push(("cursorMark", mark.clone()));
        }
        params.push(("wt", "json".to_string()));
        params
    }
}

pub fn translate(query: &Query) -> BackendQuery {
    let mut query = query.clone();
    query.fold_param_keys();
    let query = &query;

    let start = query.from;
    let rows = if query.to > 0 {
        query.to.saturating_sub(start)
    } else {
        0
    };

    let q = if query.keyword.trim().is_empty() {
        MATCH_ALL.to_string()
    } else {
        query.keyword.clone()
    };

    let mut backend = BackendQuery {
        q,
        start,
        rows,
        ..Default::default()
    };

    if !query.facets.is_empty() {
        backend.faceting = true;
        backend.facet_fields = query.facets.iter().cloned().collect();
    }

    for (key, values) in &query.params {
        if key.eq_ignore_ascii_case("sort") {
            for value in values {
                match parse_sort(value) {
                    Some(sort) => backend.sort.push(sort),
                    None => warn!(value = %value, "ignoring malformed sort value"),
                }
            }
        } else if key.eq_ignore_ascii_case("fl") {
            backend.fields.extend(values.iter().cloned());
        } else {
            let clause = if is_date_key(key) {
                date_filter(key, values)
            } else {
                field_filter(key, values)
            };
            if let Some(clause) = clause {
                backend.filter_queries.push(clause);
            }
        }
    }

    debug!(
        target: "connector.omtd",
        q = %backend.q,
        start = backend.start,
        rows = backend.rows,
        fq = ?backend.filter_queries,
        sort = ?backend.sort_clause(),
        facets = ?backend.facet_fields,
        "translated query"
    );

    backend
}

fn parse_sort(value: &str) -> Option<(String, SortOrder)> {
    let parts: Vec<&str> = value.split_whitespace().collect();
    match parts.as_slice() {
        [field] => Some((field.to_string(), SortOrder::Desc)),
        [field, order] => SortOrder::parse(order).map(|o| (field.to_string(), o)),
        _ => None,
    }
}

fn is_date_key(key: &str) -> bool {
    let key = key.to_lowercase();
    key.contains("year") || key.contains("date")
}

fn or_join(terms: Vec<String>) -> Option<String> {
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

fn field_filter(key: &str, values: &[String]) -> Option<String> {
    or_join(
        values
            .iter()
            .map(|value| format!("{}:{}", key, value))
            .collect(),
    )
}

fn date_filter(key: &str, values: &[String]) -> Option<String> {
    let terms = values
        .iter()
        .filter_map(|value| match parse_date_value(value) {
            Some(instant) => {
                let from = format_solr_date(&instant);
                Some(format!("{}:[{} TO {}+1YEAR]", key, from, from))
            }
            None => {
                warn!(field = %key, value = %value, "dropping unparseable date filter value");
                None
            }
        })
        .collect();
    or_join(terms)
}

/// Parse a bare year (`2020`) or a full timestamp (`2020-01-01T00:00:00.000Z`).
pub fn parse_date_value(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if YEAR_ONLY.is_match(raw) {
        let year: i32 = raw.parse().ok()?;
        return Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single();
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|instant| instant.with_timezone(&Utc))
}

pub fn format_solr_date(instant: &DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

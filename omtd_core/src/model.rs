//! Connector-neutral request and result types.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A metadata search request as received from the content service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(default)]
    pub keyword: String,
    /// Filter key → values. Keys are matched case-insensitively.
    #[serde(default, deserialize_with = "deserialize_params")]
    pub params: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub facets: BTreeSet<String>,
    #[serde(default)]
    pub from: usize,
    /// Exclusive upper bound; 0 means unbounded.
    #[serde(default)]
    pub to: usize,
}

impl Query {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Default::default()
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_param(key, value);
        self
    }

    pub fn with_facet(mut self, field: impl Into<String>) -> Self {
        self.facets.insert(field.into());
        self
    }

    pub fn with_window(mut self, from: usize, to: usize) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Append a value under `key`, reusing an existing key that differs only in case.
    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let existing = self.param_key(&key).map(str::to_string);
        self.params
            .entry(existing.unwrap_or(key))
            .or_default()
            .push(value.into());
    }

    /// The stored spelling of `key`, if present under any casing.
    pub fn param_key(&self, key: &str) -> Option<&str> {
        self.params
            .keys()
            .find(|k| k.eq_ignore_ascii_case(key))
            .map(String::as_str)
    }

    pub fn param(&self, key: &str) -> Option<&Vec<String>> {
        let stored = self.param_key(key)?;
        self.params.get(stored)
    }

    pub fn param_mut(&mut self, key: &str) -> Option<&mut Vec<String>> {
        let stored = self.param_key(key)?.to_string();
        self.params.get_mut(&stored)
    }

    pub fn remove_param(&mut self, key: &str) -> Option<Vec<String>> {
        let stored = self.param_key(key)?.to_string();
        self.params.remove(&stored)
    }

    /// Merge keys that differ only in case into their first spelling, keeping
    /// every value in key order.
    pub fn fold_param_keys(&mut self) {
        self.params = fold_keys(std::mem::take(&mut self.params));
    }

    pub fn remove_facet(&mut self, field: &str) {
        self.facets.retain(|f| !f.eq_ignore_ascii_case(field));
    }
}

fn fold_keys(params: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    let mut folded: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, values) in params {
        let existing = folded
            .keys()
            .find(|k| k.eq_ignore_ascii_case(&key))
            .cloned();
        folded.entry(existing.unwrap_or(key)).or_default().extend(values);
    }
    folded
}

fn deserialize_params<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::deserialize(deserializer).map(fold_keys)
}

/// A single facet bucket after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub value: String,
    pub label: String,
    pub count: u64,
}

impl Value {
    pub fn new(value: impl Into<String>, label: impl Into<String>, count: u64) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            count,
        }
    }

    pub fn same_value(&self, other: &str) -> bool {
        self.value.eq_ignore_ascii_case(other)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub field: String,
    pub label: String,
    pub values: Vec<Value>,
}

impl Facet {
    pub fn is_field(&self, field: &str) -> bool {
        self.field.eq_ignore_ascii_case(field)
    }

    pub fn value(&self, value: &str) -> Option<&Value> {
        self.values.iter().find(|v| v.same_value(value))
    }

    pub fn total_count(&self) -> u64 {
        self.values.iter().map(|v| v.count).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub from: usize,
    pub to: usize,
    pub total_hits: u64,
    pub facets: Vec<Facet>,
    /// Inline metadata records in backend order.
    pub publications: Vec<String>,
}

impl SearchResult {
    /// The degraded result returned when the backend cannot be reached.
    pub fn empty_at(from: usize) -> Self {
        Self {
            from,
            to: from,
            ..Default::default()
        }
    }

    pub fn facet(&self, field: &str) -> Option<&Facet> {
        self.facets.iter().find(|f| f.is_field(field))
    }
}

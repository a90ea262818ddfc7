//! The indexing backend seen as a query/response service.

use crate::error::ConnectorError;
use crate::translate::BackendQuery;
use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

pub mod solr;

pub use solr::SolrBackend;

/// One matched document as a field → value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    fields: Map<String, JsonValue>,
}

impl Document {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self { fields }
    }

    /// The field rendered as text. Multi-valued fields come back as `[a, b]`,
    /// which is how single-valued stored fields often arrive from Solr.
    pub fn field_text(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            JsonValue::Null => None,
            value => Some(render(value)),
        }
    }

    /// The field with literal `[` and `]` removed, as written to export output.
    pub fn record(&self, name: &str) -> Option<String> {
        self.field_text(name).map(|text| strip_brackets(&text))
    }

    /// Every string value of a field, flattening arrays.
    pub fn field_values(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(JsonValue::Array(items)) => items
                .iter()
                .filter(|item| !item.is_null())
                .map(render)
                .collect(),
            Some(JsonValue::Null) | None => Vec::new(),
            Some(value) => vec![render(value)],
        }
    }
}

impl From<JsonValue> for Document {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(fields) => Self { fields },
            _ => Self::default(),
        }
    }
}

fn render(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        JsonValue::Array(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", inner.join(", "))
        }
        other => other.to_string(),
    }
}

pub fn strip_brackets(text: &str) -> String {
    text.chars().filter(|c| *c != '[' && *c != ']').collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetCount {
    pub name: String,
    pub count: u64,
}

impl FacetCount {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Facet buckets for one field, exactly as the backend returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFacetField {
    pub name: String,
    pub counts: Vec<FacetCount>,
}

impl RawFacetField {
    pub fn new(name: impl Into<String>, counts: Vec<FacetCount>) -> Self {
        Self {
            name: name.into(),
            counts,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackendResponse {
    pub start: usize,
    pub num_found: u64,
    pub documents: Vec<Document>,
    pub facet_fields: Vec<RawFacetField>,
    pub next_cursor_mark: Option<String>,
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn query(&self, query: &BackendQuery) -> Result<BackendResponse, ConnectorError>;
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for Arc<T> {
    async fn query(&self, query: &BackendQuery) -> Result<BackendResponse, ConnectorError> {
        (**self).query(query).await
    }
}

use super::{BackendResponse, Document, FacetCount, RawFacetField, SearchBackend};
use crate::config::SolrConfig;
use crate::error::ConnectorError;
use crate::translate::BackendQuery;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::time::Instant;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: Option<ResultList>,
    facet_counts: Option<FacetCounts>,
    #[serde(rename = "nextCursorMark")]
    next_cursor_mark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    start: usize,
    #[serde(default)]
    docs: Vec<Map<String, JsonValue>>,
}

#[derive(Debug, Deserialize)]
struct FacetCounts {
    /// Solr's flat `[name, count, name, count, ...]` lists, keyed by field.
    #[serde(default)]
    facet_fields: Map<String, JsonValue>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<SolrError>,
}

#[derive(Debug, Deserialize)]
struct SolrError {
    msg: Option<String>,
}

/// HTTP client for a Solr collection's `/select` handler.
#[derive(Clone)]
pub struct SolrBackend {
    client: reqwest::Client,
    select_url: Url,
}

impl SolrBackend {
    pub fn new(config: &SolrConfig) -> Result<Self, ConnectorError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.timeout())
            .pool_max_idle_per_host(4)
            .user_agent(concat!("omtd-connector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectorError::Other(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            select_url: config.select_url()?,
        })
    }

    pub fn select_url(&self) -> &Url {
        &self.select_url
    }
}

#[async_trait]
impl SearchBackend for SolrBackend {
    async fn query(&self, query: &BackendQuery) -> Result<BackendResponse, ConnectorError> {
        let params = query.to_params();

        let t0 = Instant::now();
        let response = self
            .client
            .get(self.select_url.clone())
            .query(&params)
            .send()
            .await?;
        let status = response.status();
        let t1 = Instant::now();

        let body = response.text().await?;
        let t2 = Instant::now();

        debug!(
            target: "connector.omtd",
            url = %self.select_url,
            status = %status,
            body_len = body.len(),
            connect_send_ms = %((t1 - t0).as_millis()),
            read_body_ms = %((t2 - t1).as_millis()),
            "solr select round trip"
        );

        if !status.is_success() {
            return Err(ConnectorError::Backend {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        parse_select_response(&body)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .and_then(|error| error.msg)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

pub fn parse_select_response(body: &str) -> Result<BackendResponse, ConnectorError> {
    let parsed: SelectResponse = serde_json::from_str(body)
        .map_err(|e| ConnectorError::ParseError(format!("unexpected select response: {}", e)))?;

    let (start, num_found, documents) = match parsed.response {
        Some(list) => (
            list.start,
            list.num_found,
            list.docs.into_iter().map(Document::new).collect(),
        ),
        None => (0, 0, Vec::new()),
    };

    let facet_fields = parsed
        .facet_counts
        .map(|counts| {
            counts
                .facet_fields
                .into_iter()
                .map(|(name, buckets)| RawFacetField::new(name, parse_buckets(&buckets)))
                .collect()
        })
        .unwrap_or_default();

    Ok(BackendResponse {
        start,
        num_found,
        documents,
        facet_fields,
        next_cursor_mark: parsed.next_cursor_mark,
    })
}

fn parse_buckets(raw: &JsonValue) -> Vec<FacetCount> {
    let Some(items) = raw.as_array() else {
        return Vec::new();
    };
    items
        .chunks(2)
        .filter_map(|pair| match pair {
            [name, count] => {
                let name = match name {
                    JsonValue::String(s) => s.clone(),
                    JsonValue::Null => return None,
                    other => other.to_string(),
                };
                Some(FacetCount::new(name, count.as_u64().unwrap_or(0)))
            }
            _ => None,
        })
        .collect()
}

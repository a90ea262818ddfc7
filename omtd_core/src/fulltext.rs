//! Resolving a document identifier to a downloadable full-text body.

use crate::backend::{Document, SearchBackend};
use crate::config::FullTextConfig;
use crate::error::ConnectorError;
use crate::model::Query;
use crate::translate::{translate, BackendQuery, MATCH_ALL};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, error, info, warn};
use url::Url;

pub type FullTextStream = BoxStream<'static, Result<Bytes, ConnectorError>>;

/// Escape Solr's field separator so identifiers like `oai:repo:1` match literally.
pub fn escape_identifier(id: &str) -> String {
    id.replace(':', "\\:")
}

pub fn lookup_query(id: &str, config: &FullTextConfig) -> BackendQuery {
    let query = Query::new(MATCH_ALL)
        .with_param("id", escape_identifier(id))
        .with_param("fl", "id")
        .with_param("fl", config.location_field.clone())
        .with_window(0, config.max_candidates);
    translate(&query)
}

/// Distribution URLs of every matched document, in backend order.
pub fn candidate_urls(documents: &[Document], location_field: &str) -> Vec<String> {
    documents
        .iter()
        .flat_map(|doc| doc.field_values(location_field))
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .collect()
}

pub async fn resolve<B>(
    backend: &B,
    client: &reqwest::Client,
    config: &FullTextConfig,
    id: &str,
) -> Option<FullTextStream>
where
    B: SearchBackend + ?Sized,
{
    let response = match backend.query(&lookup_query(id, config)).await {
        Ok(response) => response,
        Err(e) => {
            error!(
                target: "connector.omtd",
                id = %id,
                error = %e,
                code = e.code_str(),
                "full-text lookup failed"
            );
            return None;
        }
    };

    let candidates = candidate_urls(&response.documents, &config.location_field);
    debug!(id = %id, candidates = candidates.len(), "resolving full text");

    for candidate in &candidates {
        match open_candidate(client, candidate).await {
            Ok(stream) => {
                info!(target: "connector.omtd", id = %id, url = %candidate, "serving full text");
                return Some(stream);
            }
            Err(e) => warn!(id = %id, url = %candidate, error = %e, "skipping full-text candidate"),
        }
    }

    info!(id = %id, "no usable full-text candidate");
    None
}

async fn open_candidate(
    client: &reqwest::Client,
    raw: &str,
) -> Result<FullTextStream, ConnectorError> {
    let url = Url::parse(raw)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConnectorError::InvalidInput(format!(
            "unsupported scheme: {}",
            url.scheme()
        )));
    }

    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConnectorError::Backend {
            status: status.as_u16(),
            message: "candidate rejected request".to_string(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    // Landing pages, not documents.
    if content_type.to_ascii_lowercase().contains("html") {
        return Err(ConnectorError::InvalidInput(format!(
            "unexpected content type: {}",
            content_type
        )));
    }

    Ok(response
        .bytes_stream()
        .map(|chunk| chunk.map_err(ConnectorError::from))
        .boxed())
}

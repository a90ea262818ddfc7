use crate::backend::{BackendResponse, SearchBackend, SolrBackend};
use crate::config::ConnectorConfig;
use crate::error::ConnectorError;
use crate::export::{start_export, ExportSettings, MetadataStream};
use crate::facets::{append_abstract_only, merge_all, FacetField, FacetNormalizer};
use crate::fulltext::{self, FullTextStream};
use crate::model::{Query, SearchResult};
use crate::translate::{translate, MATCH_ALL};
use crate::vocabulary::{DefaultVocabulary, Vocabulary};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

pub const SOURCE_NAME: &str = "OMTD";

/// The inbound surface a content service drives.
#[async_trait]
pub trait ContentConnector: Send + Sync {
    /// Never fails: backend errors degrade to an empty result.
    async fn search(&self, query: &Query) -> SearchResult;

    async fn download_full_text(&self, document_id: &str) -> Option<FullTextStream>;

    async fn fetch_metadata(&self, query: &Query) -> MetadataStream;

    fn source_name(&self) -> &'static str;
}

/// Copy of `query` ready for the backend: match-all keyword when empty, `id`
/// sort (needed for cursor paging), the output field projected, the local
/// `source` selector removed and language codes lowercased.
pub fn prepare_query(query: &Query, output_field: &str) -> Query {
    let mut prepared = query.clone();
    prepared.fold_param_keys();

    if prepared.keyword.trim().is_empty() {
        prepared.keyword = MATCH_ALL.to_string();
    }

    let sorts_on_id = prepared.param("sort").is_some_and(|values| {
        values.iter().any(|v| {
            v.split_whitespace()
                .next()
                .is_some_and(|field| field.eq_ignore_ascii_case("id"))
        })
    });
    if !sorts_on_id {
        prepared.add_param("sort", "id desc");
    }

    let projects_output = prepared.param("fl").is_some_and(|values| {
        values
            .iter()
            .flat_map(|v| v.split(','))
            .any(|field| field.trim() == output_field)
    });
    if !projects_output {
        prepared.add_param("fl", output_field);
    }

    let source = FacetField::Source.as_str();
    prepared.remove_param(source);
    prepared.remove_facet(source);

    if let Some(codes) = prepared.param_mut(FacetField::DocumentLanguage.as_str()) {
        for code in codes.iter_mut() {
            *code = code.to_lowercase();
        }
    }

    prepared
}

pub struct OmtdConnector<B: ?Sized = SolrBackend> {
    backend: Arc<B>,
    config: ConnectorConfig,
    vocabulary: Arc<dyn Vocabulary>,
    http: reqwest::Client,
}

impl OmtdConnector<SolrBackend> {
    pub fn new(config: ConnectorConfig) -> Result<Self, ConnectorError> {
        let backend = SolrBackend::new(&config.solr)?;
        Self::with_backend(Arc::new(backend), config)
    }
}

impl<B> OmtdConnector<B>
where
    B: SearchBackend + ?Sized + 'static,
{
    pub fn with_backend(backend: Arc<B>, config: ConnectorConfig) -> Result<Self, ConnectorError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.solr.connect_timeout())
            .user_agent(concat!("omtd-connector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConnectorError::Other(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            backend,
            config,
            vocabulary: Arc::new(DefaultVocabulary),
            http,
        })
    }

    pub fn with_vocabulary(mut self, vocabulary: impl Vocabulary + 'static) -> Self {
        self.vocabulary = Arc::new(vocabulary);
        self
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    fn assemble(&self, response: BackendResponse) -> SearchResult {
        let output_field = &self.config.solr.output_field;
        let publications: Vec<String> = response
            .documents
            .iter()
            .filter_map(|doc| doc.record(output_field))
            .collect();

        let normalizer = FacetNormalizer::new(self.vocabulary.as_ref());
        let mut facets = merge_all(
            response
                .facet_fields
                .iter()
                .map(|raw| normalizer.normalize(raw)),
        );
        append_abstract_only(&mut facets, response.num_found, self.vocabulary.as_ref());

        SearchResult {
            from: response.start,
            to: response.start + response.documents.len(),
            total_hits: response.num_found,
            facets,
            publications,
        }
    }
}

#[async_trait]
impl<B> ContentConnector for OmtdConnector<B>
where
    B: SearchBackend + ?Sized + 'static,
{
    async fn search(&self, query: &Query) -> SearchResult {
        let prepared = prepare_query(query, &self.config.solr.output_field);
        let backend_query = translate(&prepared);

        let t0 = Instant::now();
        match self.backend.query(&backend_query).await {
            Ok(response) => {
                let result = self.assemble(response);
                debug!(
                    target: "connector.omtd",
                    total_hits = result.total_hits,
                    returned = result.publications.len(),
                    facets = result.facets.len(),
                    elapsed_ms = %t0.elapsed().as_millis(),
                    "search complete"
                );
                result
            }
            Err(e) => {
                error!(
                    target: "connector.omtd",
                    error = %e,
                    code = e.code_str(),
                    keyword = %query.keyword,
                    "search failed, returning empty result"
                );
                SearchResult::empty_at(query.from)
            }
        }
    }

    async fn download_full_text(&self, document_id: &str) -> Option<FullTextStream> {
        fulltext::resolve(
            self.backend.as_ref(),
            &self.http,
            &self.config.fulltext,
            document_id,
        )
        .await
    }

    async fn fetch_metadata(&self, query: &Query) -> MetadataStream {
        let prepared = prepare_query(query, &self.config.solr.output_field);
        start_export(
            Arc::clone(&self.backend),
            prepared,
            ExportSettings::from(&self.config),
        )
    }

    fn source_name(&self) -> &'static str {
        SOURCE_NAME
    }
}

// src/lib.rs
pub mod backend;
pub mod cancel;
pub mod config;
pub mod connector;
pub mod error;
pub mod export;
pub mod facets;
pub mod fulltext;
pub mod model;
pub mod translate;
pub mod vocabulary;

pub use backend::{BackendResponse, Document, SearchBackend, SolrBackend};
pub use cancel::CancellationToken;
pub use config::ConnectorConfig;
pub use connector::{prepare_query, ContentConnector, OmtdConnector, SOURCE_NAME};
pub use error::ConnectorError;
pub use export::MetadataStream;
pub use fulltext::FullTextStream;
pub use model::{Facet, Query, SearchResult, Value};
pub use translate::{translate, BackendQuery};
pub use vocabulary::{DefaultVocabulary, Vocabulary};

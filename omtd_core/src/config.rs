use crate::error::ConnectorError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Connector settings, read from `connector.toml`. Every field has a default so
/// an empty file (or no file at all) yields a usable local setup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    pub solr: SolrConfig,
    pub export: ExportConfig,
    pub fulltext: FullTextConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    /// Base URL of the Solr node(s), e.g. `http://localhost:8983/solr/`.
    pub hosts: String,
    pub collection: String,
    /// Stored field holding each document's XML metadata record.
    pub output_field: String,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            hosts: "http://localhost:8983/solr/".to_string(),
            collection: "omtd".to_string(),
            output_field: "fullrecord".to_string(),
            connect_timeout_secs: 5,
            timeout_secs: 60,
        }
    }
}

impl SolrConfig {
    pub fn select_url(&self) -> Result<Url, ConnectorError> {
        let hosts = if self.hosts.ends_with('/') {
            self.hosts.clone()
        } else {
            format!("{}/", self.hosts)
        };
        let collection = self.collection.trim_matches('/');
        if collection.is_empty() {
            return Err(ConnectorError::Config(
                "solr.collection must not be empty".to_string(),
            ));
        }
        let base = Url::parse(&hosts)?;
        Ok(base.join(&format!("{}/select", collection))?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Stop after this many records; 0 exports everything.
    pub limit: usize,
    /// Chunks buffered between the export producer and the reader.
    pub channel_capacity: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            limit: 0,
            channel_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullTextConfig {
    pub location_field: String,
    pub max_candidates: usize,
}

impl Default for FullTextConfig {
    fn default() -> Self {
        Self {
            location_field: "distributionLocation".to_string(),
            max_candidates: 10,
        }
    }
}

impl ConnectorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConnectorError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConnectorError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides();
        debug!(path = %path.display(), "loaded connector config");
        Ok(config)
    }

    /// `~/.config/omtd/connector.toml` (or the platform equivalent); defaults
    /// when the file does not exist.
    pub fn load_default() -> Result<Self, ConnectorError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load(&path)
        } else {
            debug!(path = %path.display(), "no connector config found, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".config")))
            .unwrap_or_else(|| PathBuf::from("."));
        base.join("omtd").join("connector.toml")
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(hosts) = lookup("OMTD_SOLR_HOSTS") {
            self.solr.hosts = hosts;
        }
        if let Some(collection) = lookup("OMTD_SOLR_COLLECTION") {
            self.solr.collection = collection;
        }
        if let Some(field) = lookup("OMTD_SOLR_OUTPUT_FIELD") {
            self.solr.output_field = field;
        }
        if let Some(limit) = lookup("OMTD_CONTENT_LIMIT") {
            match limit.trim().parse() {
                Ok(limit) => self.export.limit = limit,
                Err(_) => warn!(value = %limit, "ignoring non-numeric OMTD_CONTENT_LIMIT"),
            }
        }
    }
}

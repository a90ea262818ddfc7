pub mod export;
pub mod fulltext;
pub mod search;
pub mod source;

use crate::cli::Cli;
use omtd_core::{ConnectorConfig, OmtdConnector, Query};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No full text available for '{0}'")]
    FullTextNotFound(String),

    #[error("Core library error: {0}")]
    Core(#[from] omtd_core::ConnectorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;

pub fn load_config(cli: &Cli) -> Result<ConnectorConfig> {
    let config = match &cli.config {
        Some(path) => ConnectorConfig::load(path)?,
        None => ConnectorConfig::load_default()?,
    };
    Ok(config)
}

pub fn create_connector(cli: &Cli) -> Result<OmtdConnector> {
    Ok(OmtdConnector::new(load_config(cli)?)?)
}

/// Split a `key=value` argument. The value may itself contain `=`.
pub fn parse_param(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(CommandError::InvalidInput(format!(
            "expected KEY=VALUE, got '{}'",
            raw
        ))),
    }
}

pub fn build_query(keyword: Option<&str>, params: &[String], facets: &[String]) -> Result<Query> {
    let mut query = Query::new(keyword.unwrap_or_default());
    for raw in params {
        let (key, value) = parse_param(raw)?;
        query.add_param(key, value);
    }
    for facet in facets {
        query.facets.insert(facet.clone());
    }
    Ok(query)
}

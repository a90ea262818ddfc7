use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "omtd")]
#[command(about = "OMTD content connector - search, export and fetch full text from a Solr index")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  omtd search \"gene expression\" -f rights -f documentLanguage
  omtd search -p rights=openAccess -p publicationYear=2020 --to 20
  omtd export -p documentLanguage=en -o records.xml
  omtd fulltext oai:europepmc.org:1234567 -o paper.pdf

\x1b[1;36mConfiguration:\x1b[0m
  ~/.config/omtd/connector.toml, or --config PATH
  OMTD_SOLR_HOSTS, OMTD_SOLR_COLLECTION, OMTD_SOLR_OUTPUT_FIELD, OMTD_CONTENT_LIMIT")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to connector.toml (defaults to the user config directory)
    #[arg(long, global = true, env = "OMTD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search metadata records and facet counts
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  omtd search \"protein folding\"
  omtd search -p publicationType=article -p publicationType=review -f publicationType
  omtd search -p sort=\"publicationYear asc\" --from 20 --to 40")]
    Search {
        /// Keyword query (match-all when omitted)
        keyword: Option<String>,

        /// Filter as key=value; repeat a key to OR its values
        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Facet field to count
        #[arg(short = 'f', long = "facet", value_name = "FIELD")]
        facets: Vec<String>,

        /// First result offset
        #[arg(long, default_value_t = 0)]
        from: usize,

        /// Exclusive end offset
        #[arg(long, default_value_t = 10)]
        to: usize,
    },

    /// Stream every matching record as one XML document
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  omtd export > all.xml
  omtd export \"climate\" -p rights=openAccess -o climate.xml")]
    Export {
        keyword: Option<String>,

        #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Write to a file instead of stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Download the full text of a document
    Fulltext {
        /// Document identifier
        id: String,

        /// Write to a file instead of stdout
        #[arg(short = 'o', long = "out")]
        out: Option<PathBuf>,
    },

    /// Print the connector's source name
    Source,
}

#[derive(Clone, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable formatted output
    Pretty,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

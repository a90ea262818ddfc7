use crate::cli::Cli;
use crate::commands::{build_query, create_connector, Result};
use crate::output::{format_output, OutputData};
use indicatif::{ProgressBar, ProgressStyle};
use omtd_core::ContentConnector;

pub async fn run(
    cli: &Cli,
    keyword: Option<&str>,
    params: &[String],
    facets: &[String],
    from: usize,
    to: usize,
) -> Result<()> {
    let query = build_query(keyword, params, facets)?.with_window(from, to);
    let connector = create_connector(cli)?;

    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(format!("Searching {}...", connector.source_name()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = connector.search(&query).await;
    spinner.finish_and_clear();

    let output = OutputData::SearchResults {
        keyword: query.keyword.clone(),
        result,
    };
    format_output(&output, &cli.output)
}

use crate::cli::Cli;
use crate::commands::{create_connector, Result};
use crate::output::{format_output, OutputData};
use omtd_core::ContentConnector;

pub async fn run(cli: &Cli) -> Result<()> {
    let connector = create_connector(cli)?;
    format_output(
        &OutputData::Source(connector.source_name().to_string()),
        &cli.output,
    )
}

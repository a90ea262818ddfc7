use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands, OutputFormat};
use commands::*;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose > 0 {
        "omtd_cli=debug,omtd_core=debug"
    } else {
        "omtd_cli=info,omtd_core=info"
    };
    // Logs go to stderr so exported XML on stdout stays clean.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = match &cli.command {
        Commands::Search {
            keyword,
            params,
            facets,
            from,
            to,
        } => search::run(&cli, keyword.as_deref(), params, facets, *from, *to).await,
        Commands::Export {
            keyword,
            params,
            out,
        } => export::run(&cli, keyword.as_deref(), params, out.as_deref()).await,
        Commands::Fulltext { id, out } => fulltext::run(&cli, id, out.as_deref()).await,
        Commands::Source => source::run(&cli).await,
    };

    if let Err(e) = result {
        match (&cli.output, &e) {
            (OutputFormat::Json, CommandError::Core(core)) => eprintln!("{}", core.to_json()),
            _ => eprintln!("{}: {}", "Error".red().bold(), e),
        }
        process::exit(1);
    }
}

use crate::cli::Cli;
use crate::commands::{create_connector, CommandError, Result};
use futures::StreamExt;
use omtd_core::ContentConnector;
use owo_colors::OwoColorize;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub async fn run(cli: &Cli, id: &str, out: Option<&Path>) -> Result<()> {
    let connector = create_connector(cli)?;
    let stream = connector
        .download_full_text(id)
        .await
        .ok_or_else(|| CommandError::FullTextNotFound(id.to_string()))?;

    let written = match out {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            let written = drain(stream, file).await?;
            eprintln!(
                "{} {} bytes written to {}",
                "✓".green(),
                written,
                path.display()
            );
            written
        }
        None => drain(stream, tokio::io::stdout()).await?,
    };
    tracing::debug!(id = %id, bytes = written, "full text downloaded");
    Ok(())
}

async fn drain<W: AsyncWrite + Unpin>(
    mut stream: omtd_core::FullTextStream,
    mut sink: W,
) -> Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        sink.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;
    Ok(written)
}

use crate::cli::Cli;
use crate::commands::{build_query, create_connector, Result};
use futures::{Stream, StreamExt};
use omtd_core::ContentConnector;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::info;

pub async fn run(
    cli: &Cli,
    keyword: Option<&str>,
    params: &[String],
    out: Option<&Path>,
) -> Result<()> {
    let query = build_query(keyword, params, &[])?;
    let connector = create_connector(cli)?;
    let stream = connector.fetch_metadata(&query).await;

    let written = match out {
        Some(path) => {
            let file = tokio::fs::File::create(path).await?;
            let written = copy_stream(stream, file).await?;
            info!(path = %path.display(), bytes = written, "export written");
            written
        }
        None => copy_stream(stream, tokio::io::stdout()).await?,
    };
    info!(bytes = written, "export finished");
    Ok(())
}

/// Write chunks as they arrive so large exports never sit in memory.
async fn copy_stream<S, W>(mut stream: S, mut sink: W) -> Result<u64>
where
    S: Stream + Unpin,
    S::Item: AsRef<[u8]>,
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.as_ref();
        sink.write_all(chunk).await?;
        written += chunk.len() as u64;
    }
    sink.flush().await?;
    Ok(written)
}

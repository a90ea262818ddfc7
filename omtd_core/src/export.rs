//! Streamed bulk export of metadata records as one XML document.
//!
//! [`start_export`] returns a [`MetadataStream`] immediately. A spawned producer
//! walks the backend with cursor paging and pushes each record down a bounded
//! channel, so memory use stays flat however large the result set is. Dropping
//! the stream cancels the producer.

use crate::backend::{Document, SearchBackend};
use crate::cancel::CancellationToken;
use crate::config::ConnectorConfig;
use crate::model::Query;
use crate::translate::{translate, CURSOR_MARK_START};
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Rows fetched per cursor page.
pub const EXPORT_PAGE_SIZE: usize = 10;

pub const XML_PROLOG: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
pub const ROOT_OPEN: &str = "<omtdMetadataRecords>\n";
pub const ROOT_CLOSE: &str = "</omtdMetadataRecords>\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSettings {
    pub output_field: String,
    /// 0 exports everything.
    pub limit: usize,
    pub channel_capacity: usize,
}

impl From<&ConnectorConfig> for ExportSettings {
    fn from(config: &ConnectorConfig) -> Self {
        Self {
            output_field: config.solr.output_field.clone(),
            limit: config.export.limit,
            channel_capacity: config.export.channel_capacity,
        }
    }
}

/// Position of an export walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorState {
    pub mark: String,
    pub rows: usize,
    pub emitted: usize,
    pub limit: usize,
}

impl CursorState {
    pub fn start(rows: usize, limit: usize) -> Self {
        Self {
            mark: CURSOR_MARK_START.to_string(),
            rows,
            emitted: 0,
            limit,
        }
    }

    pub fn limit_reached(&self) -> bool {
        self.limit > 0 && self.emitted >= self.limit
    }

    /// Move to the backend's next mark. Returns `false` when the cursor did not
    /// move, which means the result set is exhausted.
    pub fn advance(&mut self, next: Option<String>) -> bool {
        match next {
            Some(next) if next != self.mark => {
                self.mark = next;
                true
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExportOutcome {
    Completed,
    BackendFailed,
    Cancelled,
}

enum Written {
    Record,
    Skipped,
    Closed,
}

/// Sends chunks to the reader, giving up as soon as the reader is gone.
struct RecordWriter {
    tx: mpsc::Sender<Bytes>,
    token: CancellationToken,
    output_field: String,
}

impl RecordWriter {
    async fn send(&self, chunk: Bytes) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        tokio::select! {
            _ = self.token.cancelled() => false,
            sent = self.tx.send(chunk) => sent.is_ok(),
        }
    }

    async fn write(&self, document: &Document) -> Written {
        let Some(record) = document.record(&self.output_field) else {
            warn!(
                id = ?document.field_text("id"),
                field = %self.output_field,
                "skipping document without output field"
            );
            return Written::Skipped;
        };
        if self.send(Bytes::from(record)).await {
            Written::Record
        } else {
            Written::Closed
        }
    }
}

/// Begin exporting every document matching `query`, which must already carry
/// the search preparation (id sort, output field projection).
pub fn start_export<B>(backend: Arc<B>, query: Query, settings: ExportSettings) -> MetadataStream
where
    B: SearchBackend + ?Sized + 'static,
{
    let (tx, rx) = mpsc::channel(settings.channel_capacity.max(1));
    let token = CancellationToken::new();

    let header = Bytes::from([XML_PROLOG, ROOT_OPEN].concat());
    if tx.try_send(header).is_err() {
        // Unreachable on a fresh channel with capacity >= 1.
        warn!("could not queue export header");
    }

    let producer_token = token.clone();
    tokio::spawn(async move {
        let outcome = run_export(backend.as_ref(), query, &settings, tx, producer_token).await;
        debug!(outcome = ?outcome, "export producer finished");
    });

    MetadataStream { rx, token }
}

async fn run_export<B>(
    backend: &B,
    mut query: Query,
    settings: &ExportSettings,
    tx: mpsc::Sender<Bytes>,
    token: CancellationToken,
) -> ExportOutcome
where
    B: SearchBackend + ?Sized,
{
    let mut cursor = CursorState::start(EXPORT_PAGE_SIZE, settings.limit);
    query.from = 0;
    query.to = cursor.rows;
    let base = translate(&query);

    let writer = RecordWriter {
        tx,
        token: token.clone(),
        output_field: settings.output_field.clone(),
    };
    let mut pages = 0usize;

    loop {
        if token.is_cancelled() {
            return ExportOutcome::Cancelled;
        }

        let page = base.clone().with_cursor(cursor.mark.clone());
        let response = tokio::select! {
            _ = token.cancelled() => return ExportOutcome::Cancelled,
            response = backend.query(&page) => response,
        };
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!(
                    target: "connector.omtd",
                    error = %e,
                    code = e.code_str(),
                    mark = %cursor.mark,
                    emitted = cursor.emitted,
                    "export page failed, stream left unterminated"
                );
                return ExportOutcome::BackendFailed;
            }
        };
        pages += 1;

        for document in &response.documents {
            if token.is_cancelled() {
                return ExportOutcome::Cancelled;
            }
            match writer.write(document).await {
                Written::Record => cursor.emitted += 1,
                Written::Skipped => {}
                Written::Closed => return ExportOutcome::Cancelled,
            }
            if cursor.limit_reached() {
                break;
            }
        }

        if cursor.limit_reached() || !cursor.advance(response.next_cursor_mark) {
            break;
        }
    }

    if !writer.send(Bytes::from_static(ROOT_CLOSE.as_bytes())).await {
        return ExportOutcome::Cancelled;
    }
    info!(
        target: "connector.omtd",
        records = cursor.emitted,
        pages,
        "export complete"
    );
    ExportOutcome::Completed
}

/// The reading end of an export. Yields XML chunks in order.
pub struct MetadataStream {
    rx: mpsc::Receiver<Bytes>,
    token: CancellationToken,
}

impl MetadataStream {
    /// Collect the whole document. Only sensible for bounded exports.
    pub async fn read_to_end(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = self.rx.recv().await {
            out.extend_from_slice(&chunk);
        }
        out
    }

    /// Stop the producer. Chunks already queued can still be read.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl Stream for MetadataStream {
    type Item = Bytes;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for MetadataStream {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

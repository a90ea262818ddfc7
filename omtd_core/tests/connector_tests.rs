use async_trait::async_trait;
use futures::StreamExt;
use omtd_core::backend::{BackendResponse, Document, FacetCount, RawFacetField, SearchBackend};
use omtd_core::translate::BackendQuery;
use omtd_core::{ConnectorConfig, ConnectorError, ContentConnector, OmtdConnector, Query};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<omtdMetadataRecords>\n";
const FOOTER: &str = "</omtdMetadataRecords>\n";

/// Replays canned responses in order and records every query it receives.
/// Once the script runs out it keeps answering with an empty page.
#[derive(Default)]
struct ScriptedBackend {
    script: Mutex<VecDeque<Result<BackendResponse, ConnectorError>>>,
    seen: Mutex<Vec<BackendQuery>>,
}

impl ScriptedBackend {
    fn new(script: Vec<Result<BackendResponse, ConnectorError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<BackendQuery> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn query(&self, query: &BackendQuery) -> Result<BackendResponse, ConnectorError> {
        self.seen.lock().unwrap().push(query.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(BackendResponse::default()))
    }
}

fn record_doc(n: usize) -> Document {
    Document::from(json!({
        "id": format!("oai:repo:{}", n),
        "fullrecord": [format!("<record>{}</record>", n)],
    }))
}

fn page(range: std::ops::Range<usize>, next_mark: &str) -> Result<BackendResponse, ConnectorError> {
    Ok(BackendResponse {
        start: 0,
        num_found: 100,
        documents: range.map(record_doc).collect(),
        facet_fields: Vec::new(),
        next_cursor_mark: Some(next_mark.to_string()),
    })
}

fn connector(backend: Arc<ScriptedBackend>) -> OmtdConnector<ScriptedBackend> {
    OmtdConnector::with_backend(backend, ConnectorConfig::default()).unwrap()
}

fn connector_with_limit(backend: Arc<ScriptedBackend>, limit: usize) -> OmtdConnector<ScriptedBackend> {
    let mut config = ConnectorConfig::default();
    config.export.limit = limit;
    OmtdConnector::with_backend(backend, config).unwrap()
}

async fn read_all(connector: &OmtdConnector<ScriptedBackend>, query: &Query) -> String {
    let stream = connector.fetch_metadata(query).await;
    let bytes = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end())
        .await
        .expect("export finished");
    String::from_utf8(bytes).unwrap()
}

#[tokio::test]
async fn test_search_assembles_records_and_facets() {
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse {
        start: 0,
        num_found: 100,
        documents: vec![record_doc(1), record_doc(2)],
        facet_fields: vec![
            RawFacetField::new(
                "rights",
                vec![FacetCount::new("CC-BY", 20), FacetCount::new("openAccess", 5)],
            ),
            RawFacetField::new("documentType", vec![FacetCount::new("fulltext", 30)]),
            RawFacetField::new("publicationYear", vec![]),
        ],
        next_cursor_mark: None,
    })]);
    let connector = connector(backend.clone());

    let query = Query::new("")
        .with_param("rights", "CC-BY")
        .with_param("source", "OMTD")
        .with_facet("rights")
        .with_facet("documentType")
        .with_window(0, 20);
    let result = connector.search(&query).await;

    assert_eq!(result.from, 0);
    assert_eq!(result.to, 2);
    assert_eq!(result.total_hits, 100);
    assert_eq!(
        result.publications,
        vec!["<record>1</record>".to_string(), "<record>2</record>".to_string()]
    );

    // empty facets are dropped
    assert_eq!(result.facets.len(), 2);
    let rights = result.facet("rights").unwrap();
    assert_eq!(rights.label, "Rights");
    assert_eq!(rights.value("Open access").unwrap().count, 25);

    let doc_type = result.facet("documenttype").unwrap();
    assert_eq!(doc_type.value("has full text").unwrap().count, 30);
    assert_eq!(doc_type.value("with abstract only").unwrap().count, 70);

    let seen = backend.seen();
    assert_eq!(seen.len(), 1);
    let sent = &seen[0];
    assert_eq!(sent.q, "*:*");
    assert_eq!(sent.rows, 20);
    assert_eq!(sent.filter_queries, vec!["rights:CC-BY".to_string()]);
    assert_eq!(sent.sort_clause().as_deref(), Some("id desc"));
    assert_eq!(sent.fields, vec!["fullrecord".to_string()]);
    assert!(sent.faceting);
    assert!(!sent.facet_fields.iter().any(|f| f.eq_ignore_ascii_case("source")));
    assert_eq!(sent.cursor_mark, None);

    // the caller's query is not modified
    assert!(query.param("source").is_some());
}

#[tokio::test]
async fn test_search_degrades_on_backend_error() {
    let backend = ScriptedBackend::new(vec![Err(ConnectorError::Backend {
        status: 500,
        message: "boom".to_string(),
    })]);
    let connector = connector(backend);

    let result = connector
        .search(&Query::new("rna").with_facet("rights").with_window(40, 60))
        .await;
    assert_eq!(result.from, 40);
    assert_eq!(result.to, 40);
    assert_eq!(result.total_hits, 0);
    assert!(result.facets.is_empty());
    assert!(result.publications.is_empty());
}

#[tokio::test]
async fn test_export_frames_records_and_follows_cursor() {
    let backend = ScriptedBackend::new(vec![
        page(0..10, "AoE1"),
        page(10..15, "AoE2"),
        page(15..15, "AoE2"),
    ]);
    let connector = connector(backend.clone());

    let body = read_all(&connector, &Query::new("").with_window(30, 35)).await;

    assert!(body.starts_with(HEADER));
    assert!(body.ends_with(FOOTER));
    for n in 0..15 {
        assert!(body.contains(&format!("<record>{}</record>", n)));
    }
    assert!(!body.contains('['));

    let seen = backend.seen();
    assert_eq!(seen.len(), 3);
    let marks: Vec<_> = seen.iter().map(|q| q.cursor_mark.clone().unwrap()).collect();
    assert_eq!(marks, vec!["*", "AoE1", "AoE2"]);
    for query in &seen {
        assert_eq!(query.rows, 10);
        assert_eq!(query.start, 0);
        assert_eq!(query.sort_clause().as_deref(), Some("id desc"));
        assert!(query.fields.contains(&"fullrecord".to_string()));
    }
}

#[tokio::test]
async fn test_export_stops_without_next_mark() {
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse {
        documents: vec![record_doc(1)],
        num_found: 1,
        ..Default::default()
    })]);
    let connector = connector(backend.clone());

    let body = read_all(&connector, &Query::new("")).await;
    assert_eq!(body, format!("{}<record>1</record>{}", HEADER, FOOTER));
    assert_eq!(backend.seen().len(), 1);
}

#[tokio::test]
async fn test_export_honours_limit() {
    let backend = ScriptedBackend::new(vec![
        page(0..10, "AoE1"),
        page(10..20, "AoE2"),
        page(20..30, "AoE3"),
    ]);
    let connector = connector_with_limit(backend.clone(), 12);

    let body = read_all(&connector, &Query::new("")).await;
    assert_eq!(body.matches("<record>").count(), 12);
    assert!(body.ends_with(FOOTER));
    assert_eq!(backend.seen().len(), 2);
}

#[tokio::test]
async fn test_export_skips_documents_without_output_field() {
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse {
        documents: vec![
            record_doc(1),
            Document::from(json!({"id": "oai:repo:bare"})),
            record_doc(2),
        ],
        num_found: 3,
        ..Default::default()
    })]);
    let connector = connector(backend);

    let body = read_all(&connector, &Query::new("")).await;
    assert_eq!(
        body,
        format!("{}<record>1</record><record>2</record>{}", HEADER, FOOTER)
    );
}

#[tokio::test]
async fn test_export_backend_failure_leaves_stream_unterminated() {
    let backend = ScriptedBackend::new(vec![
        page(0..10, "AoE1"),
        Err(ConnectorError::Backend {
            status: 503,
            message: "unavailable".to_string(),
        }),
    ]);
    let connector = connector(backend);

    let body = read_all(&connector, &Query::new("")).await;
    assert!(body.starts_with(HEADER));
    assert_eq!(body.matches("<record>").count(), 10);
    assert!(!body.contains("</omtdMetadataRecords>"));
}

#[tokio::test]
async fn test_export_header_is_readable_before_any_page() {
    let backend = ScriptedBackend::new(vec![Err(ConnectorError::Other("down".to_string()))]);
    let connector = connector(backend);

    let mut stream = connector.fetch_metadata(&Query::new("")).await;
    let first = stream.next().await.unwrap();
    assert_eq!(&first[..], HEADER.as_bytes());
}

#[tokio::test]
async fn test_export_stops_when_reader_goes_away() {
    // Endless backend: every page advances the cursor.
    struct Endless {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl SearchBackend for Endless {
        async fn query(&self, _query: &BackendQuery) -> Result<BackendResponse, ConnectorError> {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            let n = *calls;
            Ok(BackendResponse {
                documents: (0..10).map(|i| record_doc(n * 10 + i)).collect(),
                num_found: u64::MAX,
                next_cursor_mark: Some(format!("mark-{}", n)),
                ..Default::default()
            })
        }
    }

    let backend = Arc::new(Endless {
        calls: Mutex::new(0),
    });
    let mut config = ConnectorConfig::default();
    config.export.channel_capacity = 2;
    let connector = OmtdConnector::with_backend(backend.clone(), config).unwrap();

    let mut stream = connector.fetch_metadata(&Query::new("")).await;
    let _header = stream.next().await.unwrap();
    let _first = stream.next().await.unwrap();
    drop(stream);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let calls_after_drop = *backend.calls.lock().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*backend.calls.lock().unwrap(), calls_after_drop);
    assert!(calls_after_drop <= 2);
}

#[tokio::test]
async fn test_full_text_without_candidates_is_none() {
    let backend = ScriptedBackend::new(vec![
        Ok(BackendResponse::default()),
        Ok(BackendResponse {
            documents: vec![Document::from(json!({
                "id": "oai:repo:1",
                "distributionLocation": ["not a url", "ftp://mirror.example.org/1.pdf"],
            }))],
            num_found: 1,
            ..Default::default()
        }),
        Err(ConnectorError::Other("down".to_string())),
    ]);
    let connector = connector(backend.clone());

    assert!(connector.download_full_text("oai:repo:404").await.is_none());
    assert!(connector.download_full_text("oai:repo:1").await.is_none());
    assert!(connector.download_full_text("oai:repo:1").await.is_none());

    let seen = backend.seen();
    assert_eq!(seen.len(), 3);
    assert_eq!(seen[0].filter_queries, vec!["id:oai\\:repo\\:404".to_string()]);
    assert_eq!(seen[0].q, "*:*");
}

const PDF_BODY: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

/// Minimal HTTP/1.1 server standing in for repository download endpoints.
/// `/landing` is an HTML page, `/paper.pdf` a document, anything else 404.
async fn serve_candidates() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }
                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, content_type, body): (&str, &str, &[u8]) = match path.as_str() {
                    "/landing" => ("200 OK", "text/html; charset=utf-8", b"<html>landing</html>"),
                    "/paper.pdf" => ("200 OK", "application/pdf", PDF_BODY),
                    _ => ("404 Not Found", "text/plain", b"missing"),
                };
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    content_type,
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(body).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_full_text_skips_missing_and_html_candidates() {
    let base = serve_candidates().await;
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse {
        documents: vec![
            Document::from(json!({
                "id": "oai:repo:1",
                "distributionLocation": [format!("{}/gone.pdf", base), format!("{}/landing", base)],
            })),
            Document::from(json!({
                "id": "oai:repo:1",
                "distributionLocation": format!("{}/paper.pdf", base),
            })),
        ],
        num_found: 2,
        ..Default::default()
    })]);
    let connector = connector(backend);

    let mut stream = connector
        .download_full_text("oai:repo:1")
        .await
        .expect("pdf candidate served");
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(body, PDF_BODY);
}

#[tokio::test]
async fn test_full_text_with_only_html_candidates_is_none() {
    let base = serve_candidates().await;
    let backend = ScriptedBackend::new(vec![Ok(BackendResponse {
        documents: vec![Document::from(json!({
            "id": "oai:repo:2",
            "distributionLocation": [format!("{}/landing", base), format!("{}/gone.pdf", base)],
        }))],
        num_found: 1,
        ..Default::default()
    })]);
    let connector = connector(backend);

    assert!(connector.download_full_text("oai:repo:2").await.is_none());
}

#[tokio::test]
async fn test_search_with_year_filter_returns_result() {
    let backend = ScriptedBackend::new(vec![page(0..2, "AoE1")]);
    let connector = connector(backend.clone());

    let result = connector
        .search(
            &Query::new("")
                .with_param("publicationYear", "2020")
                .with_window(0, 20),
        )
        .await;
    assert_eq!(result.total_hits, 100);
    assert_eq!(result.publications.len(), 2);
    assert_eq!(
        backend.seen()[0].filter_queries,
        vec![
            "publicationYear:[2020-01-01T00:00:00.000Z TO 2020-01-01T00:00:00.000Z+1YEAR]"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn test_export_with_date_filter_completes() {
    let backend = ScriptedBackend::new(vec![page(0..3, "AoE1"), page(3..3, "AoE1")]);
    let connector = connector(backend);

    let body = read_all(&connector, &Query::new("").with_param("date_accepted", "2018")).await;
    assert!(body.starts_with(HEADER));
    assert_eq!(body.matches("<record>").count(), 3);
    assert!(body.ends_with(FOOTER));
}

#[test]
fn test_source_name() {
    let connector = connector(ScriptedBackend::new(Vec::new()));
    assert_eq!(connector.source_name(), "OMTD");
}

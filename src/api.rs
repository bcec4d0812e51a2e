//! HTTP surface for SDS Digest.
//!
//! This module exposes a compact Axum router:
//!
//! - `GET /` and `GET /health` – liveness and version.
//! - `POST /api/upload` – multipart upload (field `file`); the document is extracted, processed,
//!   and stored. Returns the new `sds_id`.
//! - `GET /api/sds/:sds_id/structured` – structured sections plus their titles.
//! - `GET /api/sds/:sds_id/summary` – prose summary.
//! - `POST /api/sds/:sds_id/ask` – answer `{ "question": ... }` against the stored text.
//! - `GET /metrics` – pipeline counters.
//! - `GET /commands` – machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same service with the MCP server, so behavior is identical across
//! interfaces. Errors carry a `{ "detail": ... }` body.

use crate::metrics::MetricsSnapshot;
use crate::pipeline::StructuredSectionList;
use crate::service::{DigestApi, ServiceError, parse_sds_id};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Largest accepted upload body.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Build the HTTP router exposing the digest API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DigestApi + 'static,
{
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route(
            "/api/upload",
            post(upload_sds::<S>).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/sds/:sds_id/structured", get(get_structured::<S>))
        .route("/api/sds/:sds_id/summary", get(get_summary::<S>))
        .route("/api/sds/:sds_id/ask", post(ask_question::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "message": "SDS Digest API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Success response for `POST /api/upload`.
#[derive(Serialize)]
struct UploadResponse {
    sds_id: String,
    message: String,
    status: &'static str,
}

/// Accept a multipart upload and run it through the pipeline.
///
/// Only the `file` field is read; other fields are ignored.
async fn upload_sds<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DigestApi,
{
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ServiceError::InvalidInput(error.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ServiceError::InvalidInput(error.body_text()))?;

        let outcome = service.ingest_upload(file_name, bytes.to_vec()).await?;
        tracing::info!(
            sds_id = %outcome.sds_id,
            file = %outcome.file_name,
            sections = outcome.section_count,
            "Upload request completed"
        );
        return Ok(Json(UploadResponse {
            sds_id: outcome.sds_id.to_string(),
            message: format!(
                "SDS uploaded and processed successfully: {}",
                outcome.file_name
            ),
            status: "success",
        }));
    }

    Err(ServiceError::InvalidInput("multipart field `file` is required".into()).into())
}

/// Nested wrapper matching the `structured_content` envelope.
#[derive(Serialize)]
struct StructuredContent {
    structured_sections: StructuredSectionList,
}

/// Response body for `GET /api/sds/:sds_id/structured`.
#[derive(Serialize)]
struct StructuredResponse {
    sds_id: String,
    structured_content: StructuredContent,
    sections: Vec<String>,
}

async fn get_structured<S>(
    State(service): State<Arc<S>>,
    Path(sds_id): Path<String>,
) -> Result<Json<StructuredResponse>, AppError>
where
    S: DigestApi,
{
    let id = parse_sds_id(&sds_id)?;
    let structured = service.structured(&id).await?;
    let sections = structured.iter().map(|s| s.title.clone()).collect();
    Ok(Json(StructuredResponse {
        sds_id: id.to_string(),
        structured_content: StructuredContent {
            structured_sections: structured,
        },
        sections,
    }))
}

/// Response body for `GET /api/sds/:sds_id/summary`.
#[derive(Serialize)]
struct SummaryResponse {
    sds_id: String,
    summary: String,
}

async fn get_summary<S>(
    State(service): State<Arc<S>>,
    Path(sds_id): Path<String>,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: DigestApi,
{
    let id = parse_sds_id(&sds_id)?;
    let summary = service.summary(&id).await?;
    Ok(Json(SummaryResponse {
        sds_id: id.to_string(),
        summary,
    }))
}

/// Request body for `POST /api/sds/:sds_id/ask`.
#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

/// Response body for `POST /api/sds/:sds_id/ask`.
#[derive(Serialize)]
struct AskResponse {
    sds_id: String,
    question: String,
    answer: String,
}

async fn ask_question<S>(
    State(service): State<Arc<S>>,
    Path(sds_id): Path<String>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: DigestApi,
{
    let id = parse_sds_id(&sds_id)?;
    let answer = service.ask(&id, &request.question).await?;
    Ok(Json(AskResponse {
        sds_id: id.to_string(),
        question: request.question,
        answer,
    }))
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DigestApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/api/upload",
                description: "Upload an SDS (PDF, markdown, or text) as multipart field `file`. The document is split into sections, structured, and summarized. Response returns { \"sds_id\": string }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "structured",
                method: "GET",
                path: "/api/sds/:sds_id/structured",
                description: "Return the structured sections of a processed SDS in document order.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summary",
                method: "GET",
                path: "/api/sds/:sds_id/summary",
                description: "Return the prose summary of a processed SDS.",
                request_example: None,
            },
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/api/sds/:sds_id/ask",
                description: "Answer a question using the full text of a processed SDS.",
                request_example: Some(json!({
                    "question": "What is the flash point?"
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(ServiceError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Processing(_) | ServiceError::Model(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Store(_) | ServiceError::Io(_) | ServiceError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(inner: ServiceError) -> Self {
        Self(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::extraction::ExtractionError;
    use crate::llm::ModelCallError;
    use crate::metrics::MetricsSnapshot;
    use crate::pipeline::{ProcessedRecord, StructuredSection, StructuredSectionList};
    use crate::service::{DigestApi, IngestOutcome, ServiceError, ServiceProfile};
    use crate::store::{RecordMetadata, SdsId, StoreError, StoredRecord};
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    #[tokio::test]
    async fn commands_catalog_exposes_upload_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let upload = commands
            .iter()
            .find(|cmd| cmd.name == "upload")
            .expect("upload command present");

        assert_eq!(upload.method, "POST");
        assert_eq!(upload.path, "/api/upload");
        assert!(commands.len() >= 4);
    }

    #[tokio::test]
    async fn root_and_health_report_liveness() {
        let app = create_router(Arc::new(StubDigestService::new()));

        let (status, body) = send(app.clone(), Method::GET, "/", Body::empty(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "SDS Digest API");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));

        let (status, body) = send(app, Method::GET, "/health", Body::empty(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn upload_route_reads_the_file_field() {
        let service = Arc::new(StubDigestService::new());
        let app = create_router(service.clone());

        let boundary = "sds-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"note\"\r\n\r\n\
             ignored\r\n\
             --{boundary}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"acetone.md\"\r\n\
             Content-Type: text/markdown\r\n\r\n\
             # Acetone\r\n\
             --{boundary}--\r\n"
        );

        let (status, json) = send(
            app,
            Method::POST,
            "/api/upload",
            Body::from(body),
            Some(format!("multipart/form-data; boundary={boundary}")),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sds_id"], service.id.to_string());
        assert_eq!(json["status"], "success");
        assert_eq!(
            json["message"],
            "SDS uploaded and processed successfully: acetone.md"
        );

        let uploads = service.uploads.lock().await;
        assert_eq!(uploads.as_slice(), [("acetone.md".to_string(), b"# Acetone".to_vec())]);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let app = create_router(Arc::new(StubDigestService::new()));
        let boundary = "sds-boundary";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"other\"\r\n\r\n\
             value\r\n\
             --{boundary}--\r\n"
        );

        let (status, json) = send(
            app,
            Method::POST,
            "/api/upload",
            Body::from(body),
            Some(format!("multipart/form-data; boundary={boundary}")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["detail"].as_str().unwrap_or_default().contains("file"));
    }

    #[tokio::test]
    async fn structured_route_wraps_sections_and_lists_titles() {
        let service = Arc::new(StubDigestService::new());
        let app = create_router(service.clone());

        let uri = format!("/api/sds/{}/structured", service.id);
        let (status, json) = send(app, Method::GET, &uri, Body::empty(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["sds_id"], service.id.to_string());
        assert_eq!(json["sections"], json!(["Section 1: ID"]));
        let section = &json["structured_content"]["structured_sections"][0];
        assert_eq!(section["title"], "Section 1: ID");
        assert_eq!(section["structuredContent"]["chemical_name"], "Foo");
    }

    #[tokio::test]
    async fn summary_route_returns_summary() {
        let service = Arc::new(StubDigestService::new());
        let app = create_router(service.clone());

        let uri = format!("/api/sds/{}/summary", service.id);
        let (status, json) = send(app, Method::GET, &uri, Body::empty(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "Foo is a test chemical.");
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_are_not_found() {
        let app = create_router(Arc::new(StubDigestService::new()));

        for uri in [
            format!("/api/sds/{}/summary", SdsId::new()),
            "/api/sds/not-a-uuid/structured".to_string(),
        ] {
            let (status, json) = send(app.clone(), Method::GET, &uri, Body::empty(), None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert!(json["detail"].as_str().unwrap_or_default().contains("not found"));
        }
    }

    #[tokio::test]
    async fn ask_route_echoes_question_and_answer() {
        let service = Arc::new(StubDigestService::new());
        let app = create_router(service.clone());

        let uri = format!("/api/sds/{}/ask", service.id);
        let (status, json) = send(
            app,
            Method::POST,
            &uri,
            Body::from(json!({ "question": "What is it?" }).to_string()),
            Some("application/json".into()),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["question"], "What is it?");
        assert_eq!(json["answer"], "Foo.");
    }

    #[tokio::test]
    async fn service_errors_map_to_statuses() {
        let cases = [
            (ServiceError::InvalidInput("bad".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Extraction(ExtractionError::UnsupportedFormat("x.docx".into())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::Model(ModelCallError::ProviderUnavailable("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Store(StoreError::Backend("offline".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServiceError::Task("panicked".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (error, expected) in cases {
            assert_eq!(super::AppError(error).status(), expected);
        }
    }

    #[tokio::test]
    async fn metrics_route_serializes_snapshot() {
        let app = create_router(Arc::new(StubDigestService::new()));
        let (status, json) = send(app, Method::GET, "/metrics", Body::empty(), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documents_processed"], 1);
        assert_eq!(json["last_section_count"], 1);
    }

    async fn send(
        app: axum::Router,
        method: Method,
        uri: &str,
        body: Body,
        content_type: Option<String>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let response = app
            .oneshot(request.body(body).expect("request"))
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    struct StubDigestService {
        id: SdsId,
        record: Arc<StoredRecord>,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl StubDigestService {
        fn new() -> Self {
            let section = StructuredSection {
                title: "Section 1: ID".into(),
                short_summary: "Identifies the product".into(),
                structured_content: json!({ "chemical_name": "Foo" })
                    .as_object()
                    .cloned()
                    .expect("object"),
            };
            Self {
                id: SdsId::new(),
                record: Arc::new(StoredRecord {
                    record: ProcessedRecord::new(
                        "Chemical: Foo".into(),
                        StructuredSectionList::new(vec![section]),
                        "Foo is a test chemical.".into(),
                    ),
                    metadata: RecordMetadata {
                        file_name: "foo.md".into(),
                        source_sha256: "00".into(),
                        processed_at: "2024-01-01T00:00:00Z".into(),
                    },
                }),
                uploads: Mutex::new(Vec::new()),
            }
        }

        fn lookup(&self, id: &SdsId) -> Result<Arc<StoredRecord>, ServiceError> {
            if *id == self.id {
                Ok(Arc::clone(&self.record))
            } else {
                Err(ServiceError::NotFound(id.to_string()))
            }
        }
    }

    #[async_trait]
    impl DigestApi for StubDigestService {
        async fn ingest_upload(
            &self,
            file_name: String,
            bytes: Vec<u8>,
        ) -> Result<IngestOutcome, ServiceError> {
            self.uploads.lock().await.push((file_name.clone(), bytes));
            Ok(IngestOutcome {
                sds_id: self.id,
                file_name,
                section_count: 1,
                fallback_count: 0,
            })
        }

        async fn ingest_path(&self, path: PathBuf) -> Result<IngestOutcome, ServiceError> {
            Err(ServiceError::InvalidInput(path.display().to_string()))
        }

        async fn structured(&self, id: &SdsId) -> Result<StructuredSectionList, ServiceError> {
            Ok(self.lookup(id)?.record.structured_sections().clone())
        }

        async fn summary(&self, id: &SdsId) -> Result<String, ServiceError> {
            Ok(self.lookup(id)?.record.summary().to_string())
        }

        async fn record(&self, id: &SdsId) -> Result<Arc<StoredRecord>, ServiceError> {
            self.lookup(id)
        }

        async fn ask(&self, id: &SdsId, _question: &str) -> Result<String, ServiceError> {
            self.lookup(id).map(|_| "Foo.".to_string())
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_processed: 1,
                sections_structured: 1,
                structuring_fallbacks: 0,
                questions_answered: 0,
                last_section_count: Some(1),
            }
        }

        fn profile(&self) -> ServiceProfile {
            ServiceProfile {
                provider: "stub".into(),
                model: "stub".into(),
                structuring_concurrency: 5,
            }
        }
    }
}

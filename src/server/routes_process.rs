//! `/process`: run one filter over an uploaded or stored image.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Query, State},
    routing::post,
    Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use super::error::AppError;
use super::multipart::MixedBody;
use super::AppContext;
use crate::pipeline::{ProcessOutcome, ProcessRequest, Source, Stage};

pub fn process_routes(max_upload_bytes: usize) -> Router<AppContext> {
    Router::new()
        .route("/process", post(process_upload).get(process_stored))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

/// Query parameters of the legacy `GET /process`.
#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    pub file: Option<String>,
    pub action: Option<String>,
    pub name: Option<String>,
}

/// `POST /process` with form fields `file`, `action` and optional `name`.
async fn process_upload(
    State(ctx): State<AppContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<MixedBody, AppError> {
    let mut multipart = multipart.map_err(|e| {
        AppError::new(e.status(), e.body_text(), "invalid_multipart").at_stage(Stage::Received)
    })?;

    let mut filename = None;
    let mut bytes = Bytes::new();
    let mut action = None;
    let mut name = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::new(e.status(), e.body_text(), "invalid_multipart").at_stage(Stage::Received)
    })? {
        let field_name = field.name().unwrap_or_default().to_string();
        let read = match field_name.as_str() {
            "file" => {
                filename = field.file_name().map(str::to_string);
                field.bytes().await.map(|b| bytes = b)
            }
            "action" => field.text().await.map(|t| action = Some(t)),
            "name" => field.text().await.map(|t| name = Some(t)),
            other => {
                tracing::debug!(field = %other, "Ignoring unknown form field");
                Ok(())
            }
        };
        read.map_err(|e| {
            AppError::new(e.status(), e.body_text(), "invalid_multipart")
                .at_stage(Stage::Received)
        })?;
    }

    let request = ProcessRequest {
        source: Source::Upload { filename, bytes },
        action,
        name,
    };
    run(&ctx, request).await
}

/// `GET /process?file=&action=&name=`, reading the source from the image
/// directory.
async fn process_stored(
    State(ctx): State<AppContext>,
    Query(query): Query<ProcessQuery>,
) -> Result<MixedBody, AppError> {
    let request = ProcessRequest {
        source: Source::Stored {
            filename: query.file.unwrap_or_default(),
        },
        action: query.action,
        name: query.name,
    };
    run(&ctx, request).await
}

async fn run(ctx: &AppContext, request: ProcessRequest) -> Result<MixedBody, AppError> {
    // Cancels the pipeline if this future is dropped (client went away).
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let outcome = ctx.pipeline.run(request, cancel).await?;
    Ok(respond(outcome))
}

fn respond(outcome: ProcessOutcome) -> MixedBody {
    let status = json!({
        "message": format!("{} applied, saved as {}", outcome.action, outcome.output_name),
        "status": "success",
    });
    MixedBody::new().json(&status).file(
        outcome.format.content_type(),
        &outcome.output_name,
        outcome.encoded,
    )
}

//! `/delete`: remove a stored image.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use serde::Deserialize;

use super::AppContext;

pub fn file_routes() -> Router<AppContext> {
    Router::new().route("/delete", get(delete_file))
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub file: Option<String>,
}

/// Delete `file` from the image directory. The reply is plain text.
async fn delete_file(
    State(ctx): State<AppContext>,
    Query(query): Query<DeleteQuery>,
) -> impl IntoResponse {
    let file = query.file.unwrap_or_default();

    match ctx.catalog.delete(&file).await {
        Ok(()) => (StatusCode::OK, format!("deleted {}", file)),
        Err(e) => {
            let status =
                StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                tracing::error!(file = %file, "Failed to delete image: {}", e);
            }
            (status, format!("could not delete {}: {}", file, e))
        }
    }
}

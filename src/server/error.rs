//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; both [`pixelforge_common::Error`]
//! and pipeline [`Failed`] values convert into it.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pixelforge_common::Error;
use serde_json::json;

use crate::pipeline::{Failed, Stage};

pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    stage: Option<Stage>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            stage: None,
        }
    }

    pub fn at_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, e.to_string(), e.code())
    }
}

impl From<Failed> for AppError {
    fn from(failed: Failed) -> Self {
        AppError::from(failed.error).at_stage(failed.stage)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(
                status = %self.status,
                stage = ?self.stage,
                error = %self.message,
                "Server error in handler"
            );
        }

        let body = json!({
            "message": self.message,
            "status": "failure",
            "code": self.code,
            "stage": self.stage,
        });

        (self.status, axum::Json(body)).into_response()
    }
}

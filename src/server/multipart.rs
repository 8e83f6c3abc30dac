//! `multipart/mixed` response bodies: a JSON status part followed by the
//! processed image.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

struct Part {
    headers: Vec<(&'static str, String)>,
    body: Bytes,
}

pub struct MixedBody {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for MixedBody {
    fn default() -> Self {
        Self::new()
    }
}

impl MixedBody {
    pub fn new() -> Self {
        Self::with_boundary(format!("pixelforge-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn json(mut self, value: &serde_json::Value) -> Self {
        self.parts.push(Part {
            headers: vec![("Content-Type", "application/json".to_string())],
            body: Bytes::from(value.to_string()),
        });
        self
    }

    /// Append a file part.
    pub fn file(mut self, content_type: &str, filename: &str, body: Bytes) -> Self {
        self.parts.push(Part {
            headers: vec![
                ("Content-Type", content_type.to_string()),
                (
                    "Content-Disposition",
                    format!("attachment; filename=\"{}\"", filename),
                ),
            ],
            body,
        });
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/mixed; boundary={}", self.boundary)
    }

    pub fn into_bytes(self) -> Bytes {
        let mut out = BytesMut::new();
        for part in &self.parts {
            out.put_slice(b"--");
            out.put_slice(self.boundary.as_bytes());
            out.put_slice(b"\r\n");
            for (name, value) in &part.headers {
                out.put_slice(name.as_bytes());
                out.put_slice(b": ");
                out.put_slice(value.as_bytes());
                out.put_slice(b"\r\n");
            }
            out.put_slice(b"\r\n");
            out.put_slice(&part.body);
            out.put_slice(b"\r\n");
        }
        out.put_slice(b"--");
        out.put_slice(self.boundary.as_bytes());
        out.put_slice(b"--\r\n");
        out.freeze()
    }
}

impl IntoResponse for MixedBody {
    fn into_response(self) -> Response {
        let content_type = self.content_type();
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, content_type)],
            self.into_bytes(),
        )
            .into_response()
    }
}

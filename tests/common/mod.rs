//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which lays out a fresh image directory, empty
//! catalog and activity log under a temp dir and builds a full
//! [`AppContext`]. The [`TestHarness::with_server`] constructor starts Axum on
//! a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use http_body_util::BodyExt;
use tempfile::TempDir;

use pixelforge::activity::LogSink;
use pixelforge::catalog::CatalogStore;
use pixelforge::config::Config;
use pixelforge::pipeline::codec;
use pixelforge::server::{create_router, AppContext};
use pixelforge_common::ImageFormat;
use pixelforge_filters::PixelBuffer;

pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Storage paths in `config` are replaced with temp dir locations.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage.image_dir = dir.path().join("images");
        config.storage.catalog_path = dir.path().join("server").join("imginfo.json");
        config.storage.log_path = dir.path().join("server").join("log.txt");

        std::fs::create_dir_all(&config.storage.image_dir).unwrap();
        CatalogStore::init_file(&config.storage.catalog_path).unwrap();

        let log = LogSink::new(&config.storage.log_path);
        let catalog = CatalogStore::load(
            &config.storage.catalog_path,
            &config.storage.image_dir,
            log.clone(),
        )
        .expect("failed to load empty catalog");

        let ctx = AppContext::new(config, catalog, log);
        Self { ctx, dir }
    }

    pub fn router(&self) -> Router {
        create_router(self.ctx.clone())
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.ctx.catalog.image_dir().join(name)
    }

    /// Names of every file in the image directory, sorted.
    pub fn stored_images(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.ctx.catalog.image_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        let harness = Self::new();
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, addr)
    }
}

pub fn png_bytes(buffer: &PixelBuffer) -> Vec<u8> {
    codec::encode(buffer, ImageFormat::Png, 80).unwrap()
}

/// 10x10 image: black left half, white right half.
pub fn half_black_half_white() -> PixelBuffer {
    let mut buffer = PixelBuffer::filled(10, 10, [255, 255, 255, 255]);
    for y in 0..10 {
        for x in 0..5 {
            buffer.set(x, y, [0, 0, 0, 255]);
        }
    }
    buffer
}

pub enum FormField<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        filename: &'a str,
        content_type: &'a str,
        data: &'a [u8],
    },
}

/// Build a `multipart/form-data` POST request.
pub fn multipart_request(uri: &str, fields: &[FormField<'_>]) -> Request<Body> {
    let boundary = "pixelforge-test-boundary";
    let mut body = Vec::new();

    for field in fields {
        body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
        match field {
            FormField::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            FormField::File {
                name,
                filename,
                content_type,
                data,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: {}\r\n\r\n",
                        name, filename, content_type
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    Request::post(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

/// One part of a `multipart/mixed` response.
#[derive(Debug)]
pub struct MixedPart {
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MixedPart {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// Split a `multipart/mixed` body into its parts.
pub fn parse_mixed(content_type: &str, body: &[u8]) -> Vec<MixedPart> {
    let boundary = content_type
        .split("boundary=")
        .nth(1)
        .expect("content type has no boundary");
    let delimiter = format!("--{}", boundary).into_bytes();

    let mut parts = Vec::new();
    let mut pos = find(body, &delimiter, 0).expect("no opening delimiter") + delimiter.len();
    while !body[pos..].starts_with(b"--") {
        let start = pos + 2; // CRLF after the delimiter
        let header_end = find(body, b"\r\n\r\n", start).expect("unterminated part headers");
        let next = find(body, &delimiter, header_end).expect("unterminated part");

        let headers = std::str::from_utf8(&body[start..header_end])
            .unwrap()
            .split("\r\n")
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let content = body[header_end + 4..next - 2].to_vec();

        parts.push(MixedPart {
            headers,
            body: content,
        });
        pos = next + delimiter.len();
    }
    parts
}

/// Collect a response into its content type and parsed parts.
pub async fn mixed_parts(response: axum::response::Response) -> Vec<MixedPart> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    parse_mixed(&content_type, &body)
}

pub async fn body_to_string(body: Body) -> String {
    let bytes = body.collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

//! Per-request processing: validate, decode, filter, save.
//!
//! A request moves through [`Stage`]s in order and either produces a
//! [`ProcessOutcome`] or stops with [`Failed`], naming the stage it could not
//! reach. CPU-bound work runs on the blocking pool. The filter polls the
//! request's cancellation token between rows; once the save stage starts it
//! runs to completion on its own, so a disconnecting client can never leave
//! an image on disk without its catalog entry.

pub mod codec;

use bytes::Bytes;
use pixelforge_common::{Action, Error, ImageFormat};
use pixelforge_filters::{Filter, PixelBuffer};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activity::LogSink;
use crate::catalog::{CatalogStore, ImageRecord};
use crate::config::ProcessingConfig;
use crate::naming::{check_file_name, output_name};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Received,
    Validated,
    Decoded,
    Filtered,
    Saved,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Validated => "validated",
            Stage::Decoded => "decoded",
            Stage::Filtered => "filtered",
            Stage::Saved => "saved",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request that stopped before `stage`.
#[derive(Debug, thiserror::Error)]
#[error("failed before {stage}: {error}")]
pub struct Failed {
    pub stage: Stage,
    #[source]
    pub error: Error,
}

impl Failed {
    pub fn new(stage: Stage, error: Error) -> Self {
        Self { stage, error }
    }

    fn at(stage: Stage) -> impl FnOnce(Error) -> Failed {
        move |error| Failed { stage, error }
    }
}

/// Where the source image comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Bytes uploaded with the request, with the client's filename if sent.
    Upload {
        filename: Option<String>,
        bytes: Bytes,
    },
    /// A file already in the image directory.
    Stored { filename: String },
}

#[derive(Debug, Clone)]
pub struct ProcessRequest {
    pub source: Source,
    pub action: Option<String>,
    /// Output stem; an extension for the encoded format is appended.
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub output_name: String,
    pub action: Action,
    pub format: ImageFormat,
    pub record: ImageRecord,
    pub encoded: Bytes,
}

/// A request that passed validation.
struct Validated {
    source: Source,
    action: Action,
    name: Option<String>,
}

impl Validated {
    fn source_name(&self) -> Option<&str> {
        match &self.source {
            Source::Upload { filename, .. } => filename.as_deref(),
            Source::Stored { filename } => Some(filename),
        }
    }
}

/// Filter the engine runs for `action`.
pub fn filter_for(action: Action, blur_radius: u32) -> Filter {
    match action {
        Action::Invert => Filter::Invert,
        Action::Gray => Filter::Grayscale,
        Action::Blur => Filter::Blur {
            radius: blur_radius,
        },
        Action::Sobel => Filter::Sobel,
    }
}

#[derive(Clone)]
pub struct Pipeline {
    catalog: Arc<CatalogStore>,
    log: LogSink,
    settings: ProcessingConfig,
}

impl Pipeline {
    pub fn new(catalog: Arc<CatalogStore>, log: LogSink, settings: ProcessingConfig) -> Self {
        Self {
            catalog,
            log,
            settings,
        }
    }

    pub fn catalog(&self) -> &Arc<CatalogStore> {
        &self.catalog
    }

    /// Run one request to completion or to its first failure.
    pub async fn run(
        &self,
        request: ProcessRequest,
        cancel: CancellationToken,
    ) -> Result<ProcessOutcome, Failed> {
        let result = self.run_stages(request, cancel).await;
        match &result {
            Ok(outcome) => self.log.log(format!(
                "processed image: {} with action {}",
                outcome.output_name, outcome.action
            )),
            Err(failed) => {
                tracing::debug!(stage = %failed.stage, "Request failed: {}", failed.error);
                self.log.log(format!(
                    "could not process image (before {}): {}",
                    failed.stage, failed.error
                ));
            }
        }
        result
    }

    async fn run_stages(
        &self,
        request: ProcessRequest,
        cancel: CancellationToken,
    ) -> Result<ProcessOutcome, Failed> {
        let request = validate(request).map_err(Failed::at(Stage::Validated))?;

        let source_bytes = self
            .read_source(&request.source)
            .await
            .map_err(Failed::at(Stage::Decoded))?;
        let decoded = blocking(move || codec::decode(&source_bytes))
            .await
            .map_err(Failed::at(Stage::Decoded))?;
        tracing::debug!(
            width = decoded.buffer.width(),
            height = decoded.buffer.height(),
            format = ?decoded.detected,
            "Decoded source image"
        );

        let format = decoded.output_format();
        let filter = filter_for(request.action, self.settings.blur_radius);
        let token = cancel.clone();
        let source = decoded.buffer;
        let filtered = blocking(move || {
            filter
                .apply_until(&source, &|| token.is_cancelled())
                .map_err(|_| Error::Cancelled)
        })
        .await
        .map_err(Failed::at(Stage::Filtered))?;

        if cancel.is_cancelled() {
            return Err(Failed::new(Stage::Saved, Error::Cancelled));
        }

        let format = format.map_err(Failed::at(Stage::Saved))?;
        let output = output_name(
            request.action,
            request.source_name(),
            request.name.as_deref(),
            format,
        )
        .map_err(Failed::at(Stage::Saved))?;
        check_file_name(&output).map_err(Failed::at(Stage::Saved))?;

        let (encoded, record) = self
            .spawn_save(output.clone(), filtered, format, filter)
            .await
            .map_err(|e| Error::internal(format!("save task failed: {}", e)))
            .and_then(|saved| saved)
            .map_err(Failed::at(Stage::Saved))?;

        Ok(ProcessOutcome {
            output_name: output,
            action: request.action,
            format,
            record,
            encoded: Bytes::from(encoded),
        })
    }

    /// Encode, write and record `output` on the blocking pool.
    ///
    /// The work starts immediately and runs to completion whether or not
    /// the returned handle is awaited.
    fn spawn_save(
        &self,
        output: String,
        filtered: PixelBuffer,
        format: ImageFormat,
        filter: Filter,
    ) -> JoinHandle<Result<(Vec<u8>, ImageRecord), Error>> {
        let catalog = Arc::clone(&self.catalog);
        let quality = self.settings.jpeg_quality;
        tokio::task::spawn_blocking(move || {
            let encoded = codec::encode(&filtered, format, quality)?;
            let dir = catalog.image_dir();
            std::fs::create_dir_all(dir)?;
            std::fs::write(dir.join(&output), &encoded)?;
            let record = catalog.upsert(&output, format, filter.name());
            Ok((encoded, record))
        })
    }

    async fn read_source(&self, source: &Source) -> Result<Bytes, Error> {
        match source {
            Source::Upload { bytes, .. } => Ok(bytes.clone()),
            Source::Stored { filename } => {
                let path: PathBuf = self.catalog.image_dir().join(filename);
                match tokio::fs::read(&path).await {
                    Ok(data) => Ok(Bytes::from(data)),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(Error::not_found(filename.clone()))
                    }
                    Err(e) => Err(Error::Io(e)),
                }
            }
        }
    }
}

fn validate(request: ProcessRequest) -> Result<Validated, Error> {
    match &request.source {
        Source::Upload { bytes, filename } => {
            if bytes.is_empty() {
                return Err(Error::validation("no image uploaded"));
            }
            if let Some(filename) = filename {
                check_file_name(filename)?;
            }
        }
        Source::Stored { filename } => check_file_name(filename)?,
    }

    let action = match request.action.as_deref() {
        None | Some("") => return Err(Error::validation("missing action")),
        Some(action) => action.parse::<Action>()?,
    };

    let name = request.name.filter(|n| !n.is_empty());
    if let Some(name) = &name {
        check_file_name(name)?;
    }

    Ok(Validated {
        source: request.source,
        action,
        name,
    })
}

async fn blocking<T, F>(work: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, Error> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::internal(format!("worker task failed: {}", e)))?
}

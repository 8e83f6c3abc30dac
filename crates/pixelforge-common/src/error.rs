//! Error taxonomy shared by the pipeline, the catalog and the HTTP layer.
//!
//! Filter failures are not represented: filters are total functions.

/// Common error type for pixelforge.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or invalid request parameters. No side effects happened.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A referenced source file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The source bytes are not a decodable image.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The image cannot be encoded as png or jpeg.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Writing the catalog failed.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// A file or directory operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request was abandoned before it finished.
    #[error("Request cancelled")]
    Cancelled,

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Decode error.
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a new UnsupportedFormat error.
    pub fn unsupported_format<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a new Persistence error.
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        Self::Persistence(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Map this error to an HTTP status code.
    ///
    /// `Cancelled` uses the non-standard 499 (client closed request); it is
    /// only ever observed in logs since nobody is left to receive it.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::NotFound(_) => 404,
            Error::Decode(_) => 500,
            Error::UnsupportedFormat(_) => 409,
            Error::Persistence(_) => 500,
            Error::Io(_) => 500,
            Error::Cancelled => 499,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation_error",
            Error::NotFound(_) => "not_found",
            Error::Decode(_) => "decode_error",
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::Persistence(_) => "persistence_error",
            Error::Io(_) => "io_error",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal_error",
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

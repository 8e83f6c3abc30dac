//! Pixelforge-Common: shared types and the error taxonomy.
//!
//! - **Error Handling**: [`Error`] covers every client-visible failure of the
//!   request pipeline and carries its HTTP status.
//! - **Value Types**: [`ImageFormat`] (the two supported encodings) and
//!   [`Action`] (the filter names accepted over HTTP).
//!
//! # Examples
//!
//! ```
//! use pixelforge_common::{Action, Error, ImageFormat};
//!
//! let action: Action = "sobel".parse().unwrap();
//! assert_eq!(action.as_str(), "sobel");
//!
//! assert_eq!(ImageFormat::from_extension("JPG"), Some(ImageFormat::Jpeg));
//!
//! let err = Error::validation("missing action");
//! assert_eq!(err.http_status(), 400);
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Action, ImageFormat};

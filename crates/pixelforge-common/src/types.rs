//! Value types shared between the HTTP layer, the pipeline and the catalog.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Encodings the service can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Name stored in catalog records and used in `image/<format>`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type for response parts.
    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Extension used when no source filename supplies one.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Recognise a file extension (case-insensitive, without the dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter names accepted in the `action` request parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Invert,
    Blur,
    Gray,
    Sobel,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Invert, Action::Blur, Action::Gray, Action::Sobel];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Invert => "invert",
            Action::Blur => "blur",
            Action::Gray => "gray",
            Action::Sobel => "sobel",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invert" => Ok(Action::Invert),
            "blur" => Ok(Action::Blur),
            "gray" => Ok(Action::Gray),
            "sobel" => Ok(Action::Sobel),
            other => Err(Error::validation(format!(
                "unknown action '{}' (expected one of: invert, blur, gray, sobel)",
                other
            ))),
        }
    }
}

use pixelforge_common::ImageFormat;
use serde::{Deserialize, Serialize};

/// Catalog entry for one processed image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub filename: String,
    pub format: ImageFormat,
    /// True only for images registered as untouched sources
    pub original: bool,
    /// Filter names in application order; repeats allowed
    pub filters: Vec<String>,
}

impl ImageRecord {
    pub fn derived(filename: &str, format: ImageFormat, filter: &str) -> Self {
        Self {
            filename: filename.to_string(),
            format,
            original: false,
            filters: vec![filter.to_string()],
        }
    }
}

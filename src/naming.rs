//! Filename rules for the image directory.
//!
//! Every name that reaches the filesystem (uploaded filenames, `name`
//! parameters, `file` query parameters) is a single path component. Derived
//! output names follow two patterns:
//! - explicit stem: `name=cat` + source `kitten.png` → `cat.png`
//! - derived: action `blur` + source `kitten.png` → `blur_kitten.png`
//!
//! The extension always matches the encoded format.

use pixelforge_common::{Action, Error, ImageFormat, Result};
use std::path::Path;

/// Reject anything that is not a plain, non-empty file name.
pub fn check_file_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::validation("file name is empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(Error::validation(format!(
            "'{}' is not a plain file name",
            name
        )));
    }
    Ok(())
}

/// Extension of `name` without the dot, if any.
pub fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

/// Name under which a processed image is stored.
///
/// `source` is the uploaded or referenced filename, when one is known.
/// The extension always names `format`, the format the bytes are encoded in:
/// a source extension for that format is kept as written, one for the other
/// supported format is swapped for `format`'s, and a missing one is added.
/// Any other source extension cannot be written and is `UnsupportedFormat`.
pub fn output_name(
    action: Action,
    source: Option<&str>,
    explicit: Option<&str>,
    format: ImageFormat,
) -> Result<String> {
    let ext = output_extension(source.and_then(extension_of), format)?;

    Ok(match (explicit, source) {
        (Some(stem), _) => format!("{}.{}", stem, ext),
        (None, Some(source)) => format!("{}_{}.{}", action, file_stem(source), ext),
        (None, None) => format!("{}_upload.{}", action, ext),
    })
}

fn output_extension(source_ext: Option<&str>, format: ImageFormat) -> Result<&str> {
    match source_ext {
        None => Ok(format.extension()),
        Some(ext) => match ImageFormat::from_extension(ext) {
            Some(named) if named == format => Ok(ext),
            Some(_) => Ok(format.extension()),
            None => Err(Error::unsupported_format(format!(
                "cannot save as .{}, only png and jpeg",
                ext
            ))),
        },
    }
}

fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

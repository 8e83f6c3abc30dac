//! Conversion between encoded image bytes and [`PixelBuffer`]s.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ImageEncoder, RgbaImage};
use pixelforge_common::{Error, ImageFormat, Result};
use pixelforge_filters::PixelBuffer;

/// A decoded source image.
#[derive(Debug)]
pub struct Decoded {
    pub buffer: PixelBuffer,
    /// Container format detected from the bytes, not from any filename.
    pub detected: image::ImageFormat,
}

impl Decoded {
    /// The format the result will be written in.
    pub fn output_format(&self) -> Result<ImageFormat> {
        match self.detected {
            image::ImageFormat::Png => Ok(ImageFormat::Png),
            image::ImageFormat::Jpeg => Ok(ImageFormat::Jpeg),
            other => Err(Error::unsupported_format(format!(
                "cannot encode {:?} images, only png and jpeg",
                other
            ))),
        }
    }
}

pub fn decode(bytes: &[u8]) -> Result<Decoded> {
    let detected = image::guess_format(bytes)
        .map_err(|_| Error::decode("unrecognized image encoding"))?;
    let image = image::load_from_memory_with_format(bytes, detected)
        .map_err(|e| Error::decode(format!("invalid {:?} data: {}", detected, e)))?;

    let rgba = image.into_rgba8();
    let (width, height) = rgba.dimensions();
    let buffer = PixelBuffer::from_raw(width, height, rgba.into_raw())
        .map_err(|e| Error::internal(e.to_string()))?;

    Ok(Decoded { buffer, detected })
}

/// Encode `buffer` as `format`. JPEG drops the alpha channel.
pub fn encode(buffer: &PixelBuffer, format: ImageFormat, jpeg_quality: u8) -> Result<Vec<u8>> {
    let (width, height) = (buffer.width(), buffer.height());
    let mut out = Vec::new();

    match format {
        ImageFormat::Png => PngEncoder::new(&mut out)
            .write_image(buffer.as_raw(), width, height, image::ExtendedColorType::Rgba8)
            .map_err(|e| Error::internal(format!("png encoding failed: {}", e)))?,
        ImageFormat::Jpeg => {
            let rgba = RgbaImage::from_raw(width, height, buffer.as_raw().to_vec())
                .ok_or_else(|| Error::internal("pixel buffer does not match its dimensions"))?;
            let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();
            JpegEncoder::new_with_quality(&mut out, jpeg_quality)
                .write_image(rgb.as_raw(), width, height, image::ExtendedColorType::Rgb8)
                .map_err(|e| Error::internal(format!("jpeg encoding failed: {}", e)))?
        }
    }

    Ok(out)
}

use crate::error::ProcessingError;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use pixfan_core::{EncodingConfig, OutputFormat};
use std::io::Cursor;

/// Encode `img` in the configured output format.
///
/// Output depends only on the pixels and the configuration, so re-deriving
/// the same source yields byte-identical objects.
pub fn encode(img: &DynamicImage, config: &EncodingConfig) -> Result<Bytes, ProcessingError> {
    match config.format {
        OutputFormat::Jpeg => encode_jpeg(img, config.quality),
        OutputFormat::Png => encode_png(img),
        OutputFormat::WebP => encode_webp(img, config.quality),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
    // JPEG has no alpha channel
    let rgb_img = img.to_rgb8();
    let (width, height) = rgb_img.dimensions();

    let mut buffer = Vec::with_capacity(width as usize * height as usize / 4);
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    rgb_img
        .write_with_encoder(encoder)
        .map_err(|e| ProcessingError::Encode {
            format: "jpeg",
            message: e.to_string(),
        })?;

    Ok(Bytes::from(buffer))
}

fn encode_png(img: &DynamicImage) -> Result<Bytes, ProcessingError> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);

    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ProcessingError::Encode {
            format: "png",
            message: e.to_string(),
        })?;

    Ok(Bytes::from(buffer))
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Bytes, ProcessingError> {
    let (width, height) = img.dimensions();
    let rgba_img = img.to_rgba8();

    let encoder = webp::Encoder::from_rgba(&rgba_img, width, height);
    let webp_data = encoder.encode(f32::from(quality.clamp(1, 100)));

    Ok(Bytes::copy_from_slice(&webp_data))
}

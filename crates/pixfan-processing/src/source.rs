use crate::encode::encode;
use crate::error::ProcessingError;
use crate::resize::resize_to_fit;
use bytes::Bytes;
use image::{DynamicImage, GenericImageView, ImageReader};
use pixfan_core::dimensions::target_height;
use pixfan_core::EncodingConfig;
use std::io::Cursor;

/// A decoded source image. Decoded once per event and shared by every
/// target width.
pub struct SourceImage {
    image: DynamicImage,
}

/// One encoded derivative.
#[derive(Debug, Clone)]
pub struct DerivedOutput {
    /// Target width `W`, as named in the derived key.
    pub width: u32,
    /// `round(W * oh / ow)`, as named in the derived key.
    pub height: u32,
    /// Pixel size of the encoded image. Equal to the target box unless the
    /// height was rounded down or the source is smaller than the box.
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub data: Bytes,
    pub content_type: &'static str,
    pub extension: &'static str,
}

impl SourceImage {
    pub fn decode(data: &[u8]) -> Result<Self, ProcessingError> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;
        let image = reader
            .decode()
            .map_err(|e| ProcessingError::Decode(e.to_string()))?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ProcessingError::EmptyImage);
        }

        Ok(Self { image })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Derive the `target_width` variant.
    pub fn derive(
        &self,
        target_width: u32,
        encoding: &EncodingConfig,
    ) -> Result<DerivedOutput, ProcessingError> {
        let (orig_width, orig_height) = self.dimensions();
        let height = target_height(target_width, orig_width, orig_height);

        let resized = resize_to_fit(&self.image, target_width, height);
        let (pixel_width, pixel_height) = resized.dimensions();
        let data = encode(&resized, encoding)?;

        Ok(DerivedOutput {
            width: target_width,
            height,
            pixel_width,
            pixel_height,
            data,
            content_type: encoding.format.to_mime_type(),
            extension: encoding.format.extension(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use pixfan_core::OutputFormat;

    fn create_test_image(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buffer
    }

    #[test]
    fn test_decode_reads_dimensions() {
        let source = SourceImage::decode(&create_test_image(800, 600)).unwrap();
        assert_eq!(source.dimensions(), (800, 600));
    }

    #[test]
    fn test_decode_invalid_image() {
        let result = SourceImage::decode(b"not an image");
        assert!(matches!(result, Err(ProcessingError::Decode(_))));
    }

    #[test]
    fn test_derive_reference_widths() {
        let source = SourceImage::decode(&create_test_image(800, 600)).unwrap();
        let encoding = EncodingConfig::default();

        let small = source.derive(150, &encoding).unwrap();
        assert_eq!((small.width, small.height), (150, 113));
        assert_eq!((small.pixel_width, small.pixel_height), (150, 113));
        assert_eq!(small.content_type, "image/jpeg");
        assert_eq!(small.extension, "jpg");

        let decoded = image::load_from_memory(&small.data).unwrap();
        assert_eq!(decoded.dimensions(), (150, 113));

        let medium = source.derive(320, &encoding).unwrap();
        assert_eq!((medium.width, medium.height), (320, 240));
    }

    #[test]
    fn test_derive_does_not_enlarge_small_sources() {
        let source = SourceImage::decode(&create_test_image(100, 50)).unwrap();
        let output = source.derive(200, &EncodingConfig::default()).unwrap();
        assert_eq!((output.width, output.height), (200, 100));
        assert_eq!((output.pixel_width, output.pixel_height), (100, 50));
    }

    #[test]
    fn test_derive_wide_source_stays_inside_box() {
        let source = SourceImage::decode(&create_test_image(1050, 20)).unwrap();
        let output = source.derive(1024, &EncodingConfig::default()).unwrap();
        assert_eq!((output.width, output.height), (1024, 20));
        assert_eq!((output.pixel_width, output.pixel_height), (1024, 20));

        let decoded = image::load_from_memory(&output.data).unwrap();
        assert_eq!(decoded.dimensions(), (1024, 20));
    }

    #[test]
    fn test_derive_uses_configured_format() {
        let source = SourceImage::decode(&create_test_image(64, 64)).unwrap();
        let encoding = EncodingConfig {
            format: OutputFormat::Png,
            quality: 85,
        };
        let output = source.derive(32, &encoding).unwrap();
        assert_eq!(output.content_type, "image/png");
        assert_eq!(output.extension, "png");
        assert_eq!(image::guess_format(&output.data).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_derive_is_byte_identical_across_runs() {
        let data = create_test_image(300, 200);
        let first = SourceImage::decode(&data)
            .unwrap()
            .derive(150, &EncodingConfig::default())
            .unwrap();
        let second = SourceImage::decode(&data)
            .unwrap()
            .derive(150, &EncodingConfig::default())
            .unwrap();
        assert_eq!(first.data, second.data);
    }
}

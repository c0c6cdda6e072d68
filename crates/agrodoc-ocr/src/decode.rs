//! Upload decoding.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};

use crate::OcrError;

/// An upload that decoded as an image, with its original bytes kept for
/// providers that want the file as sent.
pub struct DecodedImage {
    bytes: Vec<u8>,
    format: ImageFormat,
    image: DynamicImage,
}

impl DecodedImage {
    /// Detect the format from the leading bytes and decode.
    pub fn decode(bytes: &[u8]) -> Result<Self, OcrError> {
        let format = image::guess_format(bytes)?;
        let image = image::load_from_memory_with_format(bytes, format)?;
        Ok(Self {
            bytes: bytes.to_vec(),
            format,
            image,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.to_mime_type()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Grayscale re-encoding as PNG, the input the local engine reads.
    pub fn grayscale_png(&self) -> Result<Vec<u8>, OcrError> {
        let gray = DynamicImage::ImageLuma8(self.image.to_luma8());
        let mut out = Cursor::new(Vec::new());
        gray.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    /// A small white RGB PNG with a dark bar.
    pub fn png_bytes() -> Vec<u8> {
        let mut img = RgbImage::from_pixel(40, 20, Rgb([255, 255, 255]));
        for x in 5..35 {
            for y in 8..12 {
                img.put_pixel(x, y, Rgb([10, 10, 10]));
            }
        }
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_png_and_reports_mime() {
        let decoded = DecodedImage::decode(&fixtures::png_bytes()).unwrap();
        assert_eq!(decoded.mime_type(), "image/png");
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn rejects_non_image_bytes() {
        let err = DecodedImage::decode(b"definitely not an image").err().unwrap();
        assert!(matches!(err, OcrError::InvalidImage(_)));
    }

    #[test]
    fn rejects_truncated_png() {
        let bytes = fixtures::png_bytes();
        assert!(DecodedImage::decode(&bytes[..bytes.len() / 2]).is_err());
    }

    #[test]
    fn grayscale_reencoding_is_png() {
        let decoded = DecodedImage::decode(&fixtures::png_bytes()).unwrap();
        let gray = decoded.grayscale_png().unwrap();
        let back = image::load_from_memory(&gray).unwrap();
        assert_eq!(back.color(), image::ColorType::L8);
    }
}

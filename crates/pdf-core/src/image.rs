//! Image handling for PDF documents
//!
//! JPEG data passes straight through as a DCTDecode stream; PNG data is
//! decoded to raw samples and re-compressed with FlateDecode.

use crate::{PdfError, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{Dictionary, Object, Stream};
use std::io::Write;

impl From<image::ImageError> for PdfError {
    fn from(err: image::ImageError) -> Self {
        PdfError::ImageError(err.to_string())
    }
}

/// Detected image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

/// Detect image format from magic bytes
pub fn detect_format(data: &[u8]) -> Result<ImageFormat> {
    if data.len() < 8 {
        return Err(PdfError::ImageError("image data too short".to_string()));
    }

    if data[0] == 0xFF && data[1] == 0xD8 && data[2] == 0xFF {
        return Ok(ImageFormat::Jpeg);
    }

    if data[0..8] == [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A] {
        return Ok(ImageFormat::Png);
    }

    Err(PdfError::ImageError("unknown image format".to_string()))
}

/// Image XObject for PDF embedding
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
}

impl ImageXObject {
    /// Build an XObject from JPEG or PNG bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        match detect_format(data)? {
            ImageFormat::Jpeg => {
                let img = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)?;
                let color_space = match img.color() {
                    image::ColorType::L8 | image::ColorType::La8 => "DeviceGray",
                    _ => "DeviceRGB",
                };
                Ok(Self {
                    width: img.width(),
                    height: img.height(),
                    color_space,
                    filter: "DCTDecode",
                    data: data.to_vec(),
                })
            }
            ImageFormat::Png => {
                let img = image::load_from_memory_with_format(data, image::ImageFormat::Png)?;
                let (color_space, raw) = match img.color() {
                    image::ColorType::L8 | image::ColorType::La8 => {
                        ("DeviceGray", img.to_luma8().into_raw())
                    }
                    _ => ("DeviceRGB", img.to_rgb8().into_raw()),
                };

                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&raw)?;
                let compressed = encoder
                    .finish()
                    .map_err(|e| PdfError::ImageError(format!("deflate failed: {e}")))?;

                Ok(Self {
                    width: img.width(),
                    height: img.height(),
                    color_space,
                    filter: "FlateDecode",
                    data: compressed,
                })
            }
        }
    }

    /// Convert to a PDF image stream object.
    pub fn to_pdf_stream(&self) -> Stream {
        let dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(self.width as i64)),
            ("Height", Object::Integer(self.height as i64)),
            ("ColorSpace", Object::Name(self.color_space.as_bytes().to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
            ("Filter", Object::Name(self.filter.as_bytes().to_vec())),
        ]);

        // Data is already compressed; keep lopdf from touching it.
        let mut stream = Stream::new(dict, self.data.clone());
        stream.allows_compression = false;
        stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_test_png() -> Vec<u8> {
        use image::{ImageBuffer, Rgb};

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30]));
        let mut buffer = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .expect("failed to create PNG");
        buffer
    }

    #[test]
    fn test_detect_format_png() {
        let png = create_test_png();
        assert_eq!(detect_format(&png).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_detect_format_short_data() {
        assert!(detect_format(&[0xFF, 0xD8]).is_err());
    }

    #[test]
    fn test_detect_format_unknown() {
        assert!(detect_format(&[0u8; 16]).is_err());
    }

    #[test]
    fn test_png_xobject_dimensions() {
        let png = create_test_png();
        let xobj = ImageXObject::from_bytes(&png).unwrap();
        assert_eq!(xobj.width, 4);
        assert_eq!(xobj.height, 4);

        let stream = xobj.to_pdf_stream();
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name_str().unwrap(),
            "FlateDecode"
        );
    }
}

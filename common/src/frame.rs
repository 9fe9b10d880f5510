use image::{DynamicImage, ImageReader};
use std::io::Cursor;

/// A camera frame with capture metadata.
///
/// Frames are produced once per scan iteration and dropped at the end of it;
/// nothing downstream holds on to one.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    pub captured_at_ms: i64,
    pub seq: u64,
}

impl Frame {
    pub fn new(image: DynamicImage, captured_at_ms: i64, seq: u64) -> Self {
        Self {
            image,
            captured_at_ms,
            seq,
        }
    }

    /// Decode an encoded image (JPEG from an MJPEG stream, or any format the
    /// `image` crate can sniff) into a frame.
    pub fn from_encoded(data: &[u8], captured_at_ms: i64, seq: u64) -> Result<Self, FrameError> {
        if data.is_empty() {
            return Err(FrameError::Empty);
        }
        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(FrameError::UnknownFormat)?
            .decode()
            .map_err(FrameError::Decode)?;
        Ok(Self::new(image, captured_at_ms, seq))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame payload is empty")]
    Empty,
    #[error("could not determine image format: {0}")]
    UnknownFormat(std::io::Error),
    #[error("failed to decode frame: {0}")]
    Decode(image::ImageError),
}

/// A pixel position inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Map this point by independent horizontal and vertical factors, e.g.
    /// from a downsampled detector input back into the captured frame.
    pub fn scaled(self, sx: f64, sy: f64) -> Self {
        Self {
            x: (self.x as f64 * sx).round() as i32,
            y: (self.y as f64 * sy).round() as i32,
        }
    }
}

/// The text recovered from a QR code together with the corners locating it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub text: String,
    /// Corner points in detector order. Empty when the detector does not
    /// report a location.
    pub polygon: Vec<Point>,
}

impl DecodedPayload {
    pub fn new(text: impl Into<String>, polygon: Vec<Point>) -> Self {
        Self {
            text: text.into(),
            polygon,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Luma, RgbImage};

    #[test]
    fn decodes_png_bytes() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(12, 7));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let frame = Frame::from_encoded(&bytes, 1708300000000, 3).unwrap();
        assert_eq!(frame.width(), 12);
        assert_eq!(frame.height(), 7);
        assert_eq!(frame.seq, 3);
        assert_eq!(frame.captured_at_ms, 1708300000000);
    }

    #[test]
    fn decodes_jpeg_bytes() {
        let gray = image::GrayImage::from_pixel(16, 16, Luma([200]));
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .unwrap();

        let frame = Frame::from_encoded(&bytes, 0, 0).unwrap();
        assert_eq!((frame.width(), frame.height()), (16, 16));
    }

    #[test]
    fn empty_payload_rejected() {
        assert!(matches!(
            Frame::from_encoded(&[], 0, 0),
            Err(FrameError::Empty)
        ));
    }

    #[test]
    fn garbage_payload_rejected() {
        assert!(Frame::from_encoded(&[0x00, 0x01, 0x02, 0x03], 0, 0).is_err());
    }

    #[test]
    fn point_scaling_rounds() {
        let p = Point::new(10, 15).scaled(2.0, 1.5);
        assert_eq!(p, Point::new(20, 23));
    }

    #[test]
    fn empty_text_is_empty_payload() {
        assert!(DecodedPayload::new("", vec![]).is_empty());
        assert!(!DecodedPayload::new("HELLO", vec![]).is_empty());
    }
}

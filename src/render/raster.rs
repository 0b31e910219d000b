//! Grayscale raster buffers decoded from provider image bytes.

use image::imageops::FilterType;

/// Default raster width in samples (one sample per output glyph).
pub const DEFAULT_WIDTH: u32 = 160;

/// Default raster height in samples.
pub const DEFAULT_HEIGHT: u32 = 80;

/// Errors raised while decoding raster bytes.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("image decode failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },

    #[error("raster has {actual} samples, expected {expected}")]
    SampleCount { expected: usize, actual: usize },
}

/// W×H grid of 8-bit grayscale samples in row-major order.
///
/// The resolution is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl RasterBuffer {
    /// Wrap existing samples. The sample count must equal `width * height`.
    pub fn from_samples(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidSize { width, height });
        }
        let expected = (width as usize) * (height as usize);
        if samples.len() != expected {
            return Err(DecodeError::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Decode encoded image bytes (PNG, JPEG, WebP, ...) and resample them to
    /// the target resolution with a Lanczos filter, then convert to grayscale.
    pub fn decode(bytes: &[u8], width: u32, height: u32) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::InvalidSize { width, height });
        }
        let img = image::load_from_memory(bytes)?;
        let resized = image::imageops::resize(&img.to_rgb8(), width, height, FilterType::Lanczos3);
        let samples = to_grayscale(resized.as_raw());
        Self::from_samples(width, height, samples)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

/// Convert packed RGB triplets to grayscale using the ITU-R BT.601 luminance
/// formula: Y = 0.299*R + 0.587*G + 0.114*B.
///
/// Uses integer math with coefficients scaled by 1000.
pub fn to_grayscale(rgb: &[u8]) -> Vec<u8> {
    let mut gray = Vec::with_capacity(rgb.len() / 3);
    for px in rgb.chunks_exact(3) {
        let r = px[0] as u32;
        let g = px[1] as u32;
        let b = px[2] as u32;
        let luminance = (299 * r + 587 * g + 114 * b) / 1000;
        gray.push(luminance as u8);
    }
    gray
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_grayscale_pure_red() {
        // 299 * 255 / 1000 = 76
        assert_eq!(to_grayscale(&[255, 0, 0]), vec![76]);
    }

    #[test]
    fn test_grayscale_white_and_black() {
        assert_eq!(to_grayscale(&[255, 255, 255, 0, 0, 0]), vec![255, 0]);
    }

    #[test]
    fn test_from_samples_checks_length() {
        let result = RasterBuffer::from_samples(2, 2, vec![0; 3]);
        assert!(matches!(
            result,
            Err(DecodeError::SampleCount {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_from_samples_rejects_zero_size() {
        assert!(matches!(
            RasterBuffer::from_samples(0, 4, vec![]),
            Err(DecodeError::InvalidSize { .. })
        ));
    }

    #[test]
    fn test_decode_resizes_to_target() {
        let img = RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]));
        let raster = RasterBuffer::decode(&png_bytes(&img), 16, 8).unwrap();
        assert_eq!(raster.width(), 16);
        assert_eq!(raster.height(), 8);
        assert_eq!(raster.samples().len(), 128);
        assert!(raster.samples().iter().all(|&s| s == 255));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = RasterBuffer::decode(b"definitely not an image", 16, 8);
        assert!(matches!(result, Err(DecodeError::Image(_))));
    }
}

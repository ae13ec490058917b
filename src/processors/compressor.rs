// heic2jpg/src/processors/compressor.rs
use crate::core::{ConvertError, DecodedImage, Result};
use std::path::Path;
use turbojpeg::{Image, PixelFormat, Subsamp};

/// JPEG writer with optimised Huffman tables. Quality is used as given; bounds are checked upstream.
pub struct Compressor {
    quality: u8,
    optimize: bool,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            optimize: true,
        }
    }

    /// Writes `image` to `path` and returns the size on disk.
    pub fn save_jpeg(&self, image: &DecodedImage, path: &Path) -> Result<u64> {
        log::debug!(
            "Saving {}x{} JPEG to {} with quality {}",
            image.width(),
            image.height(),
            path.display(),
            self.quality
        );

        let jpeg = self.compress_to_bytes(image)?;
        std::fs::write(path, &jpeg).map_err(|e| ConvertError::EncodeError(e.to_string()))?;

        let file_size = jpeg.len() as u64;
        log::debug!("Saved image: {} ({} bytes)", path.display(), file_size);

        Ok(file_size)
    }

    pub fn compress_to_bytes(&self, image: &DecodedImage) -> Result<Vec<u8>> {
        let encode_error = |e: turbojpeg::Error| ConvertError::EncodeError(e.to_string());

        let mut compressor = turbojpeg::Compressor::new().map_err(encode_error)?;
        compressor.set_quality(self.quality as i32).map_err(encode_error)?;
        compressor.set_subsamp(Subsamp::Sub2x2).map_err(encode_error)?;
        compressor.set_optimize(self.optimize).map_err(encode_error)?;

        let width = image.width() as usize;
        let pixels = Image {
            pixels: image.pixels().as_raw().as_slice(),
            width,
            pitch: width * 3,
            height: image.height() as usize,
            format: PixelFormat::RGB,
        };

        compressor.compress_to_vec(pixels).map_err(encode_error)
    }

    pub fn calculate_savings(original_size: u64, compressed_size: u64) -> f64 {
        if original_size == 0 {
            return 0.0;
        }

        let savings = (original_size as f64 - compressed_size as f64) / original_size as f64 * 100.0;
        savings.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn sample() -> DecodedImage {
        DecodedImage::from_rgb(RgbImage::from_fn(32, 24, |x, y| Rgb([(x * 8) as u8, (y * 10) as u8, 90])))
    }

    #[test]
    fn output_is_a_decodable_jpeg() {
        let bytes = Compressor::new(80).compress_to_bytes(&sample()).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);

        let decoded = image::load_from_memory_with_format(&bytes, image::ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));
    }

    #[test]
    fn lower_quality_is_smaller() {
        let image = sample();
        let high = Compressor::new(100).compress_to_bytes(&image).unwrap();
        let low = Compressor::new(10).compress_to_bytes(&image).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn optimized_tables_never_grow_output() {
        let image = DecodedImage::from_rgb(RgbImage::from_fn(96, 64, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x * y) % 256) as u8])
        }));
        let baseline = Compressor {
            quality: 85,
            optimize: false,
        };

        let plain = baseline.compress_to_bytes(&image).unwrap();
        let optimized = Compressor::new(85).compress_to_bytes(&image).unwrap();
        assert!(optimized.len() <= plain.len(), "{} > {}", optimized.len(), plain.len());
    }

    #[test]
    fn save_reports_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");

        let size = Compressor::new(90).save_jpeg(&sample(), &path).unwrap();
        assert!(size > 0);
        assert_eq!(size, std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn unwritable_destination_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.jpg");

        let result = Compressor::new(90).save_jpeg(&sample(), &path);
        assert!(matches!(result, Err(ConvertError::EncodeError(_))));
    }

    #[test]
    fn savings_never_negative() {
        assert_eq!(Compressor::calculate_savings(0, 10), 0.0);
        assert_eq!(Compressor::calculate_savings(100, 150), 0.0);
        assert_eq!(Compressor::calculate_savings(200, 50), 75.0);
    }
}

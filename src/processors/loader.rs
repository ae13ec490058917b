// heic2jpg/src/processors/loader.rs
use crate::core::{ConvertError, DecodedImage, Result};
use image::{DynamicImage, ImageReader, RgbImage, RgbaImage};
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};
use std::io::Cursor;
use std::sync::{Arc, Once};

/// Boundary between the conversion pipeline and whatever actually understands the container.
pub trait ImageCodec: Send + Sync {
    /// Cheap structural check of the container, run before any pixel decode.
    fn probe(&self, data: &[u8]) -> Result<()>;

    fn decode(&self, data: &[u8]) -> Result<DecodedImage>;
}

/// One way of turning container bytes into pixels. Failures carry a reason, not an error type.
pub trait DecodeStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, data: &[u8]) -> std::result::Result<DecodedImage, String>;
}

/// Tries each strategy in order and keeps the first image produced.
pub fn decode_first_success(strategies: &[Arc<dyn DecodeStrategy>], data: &[u8]) -> Result<DecodedImage> {
    let mut failures = Vec::with_capacity(strategies.len());

    for strategy in strategies {
        match strategy.decode(data) {
            Ok(image) => {
                log::debug!(
                    "Decoded {}x{} image with '{}' ({:?} source)",
                    image.width(),
                    image.height(),
                    strategy.name(),
                    image.source_mode()
                );
                return Ok(image);
            }
            Err(reason) => {
                log::debug!("Decode strategy '{}' failed: {}", strategy.name(), reason);
                failures.push(format!("{}: {}", strategy.name(), reason));
            }
        }
    }

    if failures.is_empty() {
        return Err(ConvertError::DecodeError("no decode strategy configured".to_string()));
    }

    Err(ConvertError::DecodeError(failures.join("; ")))
}

static REGISTER_HOOKS: Once = Once::new();

/// High-level path: let the `image` crate open the bytes through libheif's decoding hooks.
pub struct ImageReaderStrategy;

impl DecodeStrategy for ImageReaderStrategy {
    fn name(&self) -> &'static str {
        "image-reader"
    }

    fn decode(&self, data: &[u8]) -> std::result::Result<DecodedImage, String> {
        REGISTER_HOOKS.call_once(|| {
            libheif_rs::integration::image::register_all_decoding_hooks();
        });

        let image = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| e.to_string())?
            .decode()
            .map_err(|e| e.to_string())?;

        Ok(DecodedImage::from_dynamic(image))
    }
}

/// Fallback path: decode the primary item to an interleaved plane and build the buffer by hand.
pub struct RawPlaneStrategy;

impl DecodeStrategy for RawPlaneStrategy {
    fn name(&self) -> &'static str {
        "raw-plane"
    }

    fn decode(&self, data: &[u8]) -> std::result::Result<DecodedImage, String> {
        let ctx = HeifContext::read_from_bytes(data).map_err(|e| e.to_string())?;
        let handle = ctx.primary_image_handle().map_err(|e| e.to_string())?;

        let width = handle.width();
        let height = handle.height();
        let has_alpha = handle.has_alpha_channel();
        let (chroma, channels) = if has_alpha {
            (RgbChroma::Rgba, 4usize)
        } else {
            (RgbChroma::Rgb, 3usize)
        };

        let lib_heif = LibHeif::new();
        let image = lib_heif
            .decode(&handle, ColorSpace::Rgb(chroma), None)
            .map_err(|e| e.to_string())?;

        let planes = image.planes();
        let interleaved = planes
            .interleaved
            .ok_or_else(|| "decoder returned no interleaved plane".to_string())?;

        let samples = copy_rows(interleaved.data, interleaved.stride, width, height, channels)?;

        let dynamic = if has_alpha {
            RgbaImage::from_raw(width, height, samples).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
        .ok_or_else(|| format!("plane does not fit a {}x{} buffer", width, height))?;

        Ok(DecodedImage::from_dynamic(dynamic))
    }
}

/// Packs a stride-padded plane into tightly packed rows.
fn copy_rows(
    data: &[u8],
    stride: usize,
    width: u32,
    height: u32,
    channels: usize,
) -> std::result::Result<Vec<u8>, String> {
    let row_len = width as usize * channels;
    if stride < row_len {
        return Err(format!("stride {} shorter than row length {}", stride, row_len));
    }

    let mut samples = Vec::with_capacity(row_len * height as usize);
    for y in 0..height as usize {
        let row_start = y * stride;
        let row = data
            .get(row_start..row_start + row_len)
            .ok_or_else(|| format!("plane truncated at row {}", y))?;
        samples.extend_from_slice(row);
    }

    Ok(samples)
}

/// HEIC/HEIF codec backed by libheif.
pub struct HeifCodec {
    strategies: Vec<Arc<dyn DecodeStrategy>>,
}

impl HeifCodec {
    pub fn new() -> Self {
        Self::with_strategies(vec![
            Arc::new(ImageReaderStrategy),
            Arc::new(RawPlaneStrategy),
        ])
    }

    pub fn with_strategies(strategies: Vec<Arc<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }
}

impl Default for HeifCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for HeifCodec {
    fn probe(&self, data: &[u8]) -> Result<()> {
        let ctx = HeifContext::read_from_bytes(data)
            .map_err(|e| ConvertError::InvalidImage(e.to_string()))?;
        let handle = ctx
            .primary_image_handle()
            .map_err(|e| ConvertError::InvalidImage(e.to_string()))?;

        if handle.width() == 0 || handle.height() == 0 {
            return Err(ConvertError::InvalidImage("primary image has no pixels".to_string()));
        }

        Ok(())
    }

    fn decode(&self, data: &[u8]) -> Result<DecodedImage> {
        decode_first_success(&self.strategies, data)
    }
}

// heic2jpg/src/core/mod.rs
pub mod processor;

use image::{DynamicImage, RgbImage};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_QUALITY: u8 = 95;

/// Largest side a baseline JPEG can describe.
pub const MAX_DIMENSION: u32 = 65_535;

/// Upper bound on output pixels (about 200 MB of RGB).
pub const MAX_OUTPUT_PIXELS: u64 = 64 * 1024 * 1024;

/// An upload as received from the client. Lives for one request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub filename: String,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
        }
    }

    /// Lowercased extension with its leading dot, e.g. `.heic`.
    pub fn extension(&self) -> Option<String> {
        crate::utils::get_file_extension(Path::new(&self.filename)).map(|ext| format!(".{}", ext))
    }

    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("image")
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Color layout the decoder reported before normalisation to RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Rgb,
    Rgba,
    Luma,
    LumaAlpha,
    Other,
}

impl From<&DynamicImage> for ColorMode {
    fn from(image: &DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgb16(_) | DynamicImage::ImageRgb32F(_) => {
                ColorMode::Rgb
            }
            DynamicImage::ImageRgba8(_)
            | DynamicImage::ImageRgba16(_)
            | DynamicImage::ImageRgba32F(_) => ColorMode::Rgba,
            DynamicImage::ImageLuma8(_) | DynamicImage::ImageLuma16(_) => ColorMode::Luma,
            DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => ColorMode::LumaAlpha,
            _ => ColorMode::Other,
        }
    }
}

/// Canonical pixel buffer: always 8-bit RGB, whatever the source layout was.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbImage,
    source_mode: ColorMode,
}

impl DecodedImage {
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let source_mode = ColorMode::from(&image);
        let pixels = match image {
            DynamicImage::ImageRgb8(rgb) => rgb,
            other => other.to_rgb8(),
        };

        Self { pixels, source_mode }
    }

    pub fn from_rgb(pixels: RgbImage) -> Self {
        Self {
            pixels,
            source_mode: ColorMode::Rgb,
        }
    }

    pub(crate) fn with_pixels(&self, pixels: RgbImage) -> Self {
        Self {
            pixels,
            source_mode: self.source_mode,
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn source_mode(&self) -> ColorMode {
        self.source_mode
    }

    pub fn pixels(&self) -> &RgbImage {
        &self.pixels
    }
}

/// Quarter-turn rotations. Anything else requested is treated as no rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    None,
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn from_degrees(degrees: Option<i32>) -> Self {
        match degrees {
            Some(90) => Rotation::Quarter,
            Some(180) => Rotation::Half,
            Some(270) => Rotation::ThreeQuarter,
            _ => Rotation::None,
        }
    }
}

/// A resize request that will actually change something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub keep_aspect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub quality: u8,
    pub resize: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub maintain_aspect_ratio: bool,
    pub rotate: Option<i32>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
            resize: false,
            width: None,
            height: None,
            maintain_aspect_ratio: true,
            rotate: None,
        }
    }
}

impl ConversionOptions {
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConvertError::InvalidParameter(
                "Quality must be between 1 and 100".to_string(),
            ));
        }

        if self.width == Some(0) || self.height == Some(0) {
            return Err(ConvertError::InvalidParameter(
                "Width and height must be positive integers".to_string(),
            ));
        }

        if self.width.unwrap_or(0) > MAX_DIMENSION || self.height.unwrap_or(0) > MAX_DIMENSION {
            return Err(ConvertError::InvalidParameter(format!(
                "Width and height must not exceed {} pixels",
                MAX_DIMENSION
            )));
        }

        Ok(())
    }

    pub fn rotation(&self) -> Rotation {
        Rotation::from_degrees(self.rotate)
    }

    /// `None` when resizing is off or no dimension was given.
    pub fn resize_target(&self) -> Option<ResizeTarget> {
        if !self.resize || (self.width.is_none() && self.height.is_none()) {
            return None;
        }

        Some(ResizeTarget {
            width: self.width,
            height: self.height,
            keep_aspect: self.maintain_aspect_ratio,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub original_size: u64,
    pub converted_size: u64,
    pub conversion_time: Duration,
    pub output_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("File too large. Maximum size is {}", size_label(.max))]
    TooLarge { size: u64, max: u64 },

    #[error("Unsupported file format. Allowed formats: {}", extension_list(.allowed))]
    UnsupportedFormat {
        extension: Option<String>,
        allowed: Vec<String>,
    },

    #[error("Invalid HEIC/HEIF file format")]
    InvalidImage(String),

    #[error("Failed to decode image: {0}")]
    DecodeError(String),

    #[error("Failed to encode JPEG: {0}")]
    EncodeError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] std::io::Error),

    #[error("File not found or has expired")]
    NotFound,

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ConvertError {
    /// Short message safe to hand to a client. Library diagnostics stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::DecodeError(_) => "Error during conversion: the image could not be decoded".to_string(),
            ConvertError::EncodeError(_) => "Error during conversion: the JPEG could not be written".to_string(),
            ConvertError::StorageError(_) => "Error during conversion: temporary storage failed".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

fn size_label(bytes: &u64) -> String {
    crate::utils::format_file_size(*bytes)
}

fn extension_list(allowed: &[String]) -> String {
    allowed.join(", ")
}

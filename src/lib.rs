pub mod cli;
pub mod config;
pub mod core;
pub mod processors;
pub mod server;
pub mod storage;
pub mod utils;

pub use crate::cli::{Cli, Commands, SettingsOverrides};
pub use crate::config::Settings;
pub use crate::core::processor::{Conversion, Converter};
pub use crate::core::{
    ColorMode, ConversionOptions, ConversionResult, ConvertError, DecodedImage, ResizeTarget, Result,
    Rotation, UploadedImage, DEFAULT_QUALITY, MAX_DIMENSION, MAX_OUTPUT_PIXELS,
};
pub use crate::processors::{
    Compressor, DecodeStrategy, HeifCodec, ImageCodec, Resizer, Transformer, Validator,
};
pub use crate::server::{create_router, AppState};
pub use crate::storage::{Janitor, JanitorHandle, TempStore};
pub use crate::utils::{format_file_size, sanitize_filename};

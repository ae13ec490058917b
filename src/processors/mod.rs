// heic2jpg/src/processors/mod.rs
mod compressor;
mod loader;
mod resizer;
mod transform;
mod validator;

pub use compressor::Compressor;
pub use loader::{
    decode_first_success, DecodeStrategy, HeifCodec, ImageCodec, ImageReaderStrategy, RawPlaneStrategy,
};
pub use resizer::Resizer;
pub use transform::Transformer;
pub use validator::Validator;

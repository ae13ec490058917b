// heic2jpg/src/core/processor.rs
use super::{ConversionOptions, ConversionResult, ConvertError, Result, UploadedImage};
use crate::config::Settings;
use crate::processors::{Compressor, HeifCodec, ImageCodec, Transformer, Validator};
use crate::storage::TempStore;
use std::sync::Arc;
use std::time::Instant;

/// Outcome of one conversion: the result for the caller and the input file still to be removed.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub result: ConversionResult,
    pub input_name: String,
}

/// validate → save input → decode → rotate/resize → encode → save output.
pub struct Converter {
    validator: Validator,
    codec: Arc<dyn ImageCodec>,
    transformer: Transformer,
    store: TempStore,
}

impl Converter {
    pub fn new(settings: &Settings, store: TempStore) -> Self {
        Self::with_codec(settings, store, Arc::new(HeifCodec::new()))
    }

    pub fn with_codec(settings: &Settings, store: TempStore, codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            validator: Validator::new(settings.max_file_size, &settings.allowed_extensions),
            codec,
            transformer: Transformer::new(),
            store,
        }
    }

    pub fn store(&self) -> &TempStore {
        &self.store
    }

    /// Runs the whole pipeline. On failure nothing is left behind in the scratch directory.
    pub fn convert(&self, upload: &UploadedImage, options: &ConversionOptions) -> Result<Conversion> {
        let started = Instant::now();

        options.validate()?;
        self.validator.validate(upload, self.codec.as_ref())?;

        let extension = upload.extension().ok_or_else(|| ConvertError::UnsupportedFormat {
            extension: None,
            allowed: self.validator.allowed_extensions().to_vec(),
        })?;
        let input_name = TempStore::generate_name(&extension);
        self.store.save(&upload.bytes, &input_name)?;

        match self.convert_saved(upload, options) {
            Ok((output_name, converted_size, (width, height))) => {
                let result = ConversionResult {
                    original_size: upload.size(),
                    converted_size,
                    conversion_time: started.elapsed(),
                    output_name,
                    width,
                    height,
                };

                log::info!(
                    "Converted {} ({} bytes) -> {} ({} bytes, {}x{}) in {:.3}s",
                    upload.filename,
                    result.original_size,
                    result.output_name,
                    result.converted_size,
                    width,
                    height,
                    result.conversion_time.as_secs_f64()
                );

                Ok(Conversion { result, input_name })
            }
            Err(e) => {
                self.discard(&input_name);
                Err(e)
            }
        }
    }

    fn convert_saved(
        &self,
        upload: &UploadedImage,
        options: &ConversionOptions,
    ) -> Result<(String, u64, (u32, u32))> {
        let decoded = self.codec.decode(&upload.bytes)?;
        let image = self.transformer.apply(decoded, options)?;

        let output_name = TempStore::generate_name(".jpg");
        let output_path = self.store.path_for(&output_name);

        match Compressor::new(options.quality).save_jpeg(&image, &output_path) {
            Ok(size) => Ok((output_name, size, image.dimensions())),
            Err(e) => {
                self.discard(&output_name);
                Err(e)
            }
        }
    }

    fn discard(&self, name: &str) {
        if let Err(e) = self.store.delete(name) {
            log::warn!("Failed to remove {} after a failed conversion: {}", name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DecodedImage;
    use image::{Rgb, RgbImage};

    /// Treats any bytes as a solid 40x30 image.
    struct SolidCodec;

    impl ImageCodec for SolidCodec {
        fn probe(&self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn decode(&self, _data: &[u8]) -> Result<DecodedImage> {
            Ok(DecodedImage::from_rgb(RgbImage::from_pixel(40, 30, Rgb([10, 120, 200]))))
        }
    }

    struct BrokenCodec;

    impl ImageCodec for BrokenCodec {
        fn probe(&self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        fn decode(&self, _data: &[u8]) -> Result<DecodedImage> {
            Err(ConvertError::DecodeError("truncated hvcC".to_string()))
        }
    }

    fn converter(dir: &std::path::Path, codec: Arc<dyn ImageCodec>) -> Converter {
        let settings = Settings {
            max_file_size: 1024,
            ..Default::default()
        };
        Converter::with_codec(&settings, TempStore::open(dir).unwrap(), codec)
    }

    fn entries(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn successful_conversion_keeps_input_for_scheduled_delete() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path(), Arc::new(SolidCodec));
        let upload = UploadedImage::new(vec![7; 64], "beach.HEIC");

        let conversion = converter.convert(&upload, &ConversionOptions::default()).unwrap();

        assert!(conversion.input_name.ends_with(".heic"));
        assert!(conversion.result.output_name.ends_with(".jpg"));
        assert_eq!(conversion.result.original_size, 64);
        assert!(conversion.result.converted_size > 0);
        assert_eq!((conversion.result.width, conversion.result.height), (40, 30));
        assert!(dir.path().join(&conversion.input_name).exists());
        assert!(dir.path().join(&conversion.result.output_name).exists());
    }

    #[test]
    fn too_large_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path(), Arc::new(SolidCodec));
        let upload = UploadedImage::new(vec![0; 2048], "big.heic");

        let result = converter.convert(&upload, &ConversionOptions::default());
        assert!(matches!(result, Err(ConvertError::TooLarge { .. })));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn decode_failure_cleans_up_input() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path(), Arc::new(BrokenCodec));
        let upload = UploadedImage::new(vec![1; 16], "x.heif");

        let result = converter.convert(&upload, &ConversionOptions::default());
        assert!(matches!(result, Err(ConvertError::DecodeError(_))));
        assert_eq!(entries(dir.path()), 0);
    }

    #[test]
    fn invalid_options_fail_before_validation() {
        let dir = tempfile::tempdir().unwrap();
        let converter = converter(dir.path(), Arc::new(SolidCodec));
        let upload = UploadedImage::new(vec![1; 16], "x.heic");
        let options = ConversionOptions {
            quality: 0,
            ..Default::default()
        };

        assert!(matches!(
            converter.convert(&upload, &options),
            Err(ConvertError::InvalidParameter(_))
        ));
        assert_eq!(entries(dir.path()), 0);
    }
}

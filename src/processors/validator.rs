// heic2jpg/src/processors/validator.rs
use super::loader::ImageCodec;
use crate::core::{ConvertError, Result, UploadedImage};
use crate::utils::normalize_extension;

/// Upfront checks on an upload. Runs before anything is written or decoded.
#[derive(Debug, Clone)]
pub struct Validator {
    max_file_size: u64,
    allowed_extensions: Vec<String>,
}

impl Validator {
    pub fn new(max_file_size: u64, allowed_extensions: &[String]) -> Self {
        Self {
            max_file_size,
            allowed_extensions: allowed_extensions.iter().map(|ext| normalize_extension(ext)).collect(),
        }
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.allowed_extensions
    }

    /// Size, then extension, then a structural probe through `codec`.
    pub fn validate(&self, upload: &UploadedImage, codec: &dyn ImageCodec) -> Result<()> {
        self.check_size(upload.size())?;
        self.check_extension(upload)?;

        if upload.bytes.is_empty() {
            return Err(ConvertError::InvalidImage("empty upload".to_string()));
        }

        codec.probe(&upload.bytes).map_err(|e| match e {
            ConvertError::InvalidImage(reason) => {
                log::debug!("Rejected {}: {}", upload.filename, reason);
                ConvertError::InvalidImage(reason)
            }
            other => ConvertError::InvalidImage(other.to_string()),
        })
    }

    pub fn check_size(&self, size: u64) -> Result<()> {
        if size > self.max_file_size {
            return Err(ConvertError::TooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    pub fn check_extension(&self, upload: &UploadedImage) -> Result<()> {
        let extension = upload.extension();
        let allowed = extension
            .as_ref()
            .map(|ext| self.allowed_extensions.contains(ext))
            .unwrap_or(false);

        if !allowed {
            return Err(ConvertError::UnsupportedFormat {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DecodedImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingCodec {
        probes: AtomicUsize,
        decodes: AtomicUsize,
        accept: bool,
    }

    impl ImageCodec for CountingCodec {
        fn probe(&self, _data: &[u8]) -> Result<()> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            if self.accept {
                Ok(())
            } else {
                Err(ConvertError::InvalidImage("no ftyp box".to_string()))
            }
        }

        fn decode(&self, _data: &[u8]) -> Result<DecodedImage> {
            self.decodes.fetch_add(1, Ordering::SeqCst);
            Ok(DecodedImage::from_rgb(image::RgbImage::new(1, 1)))
        }
    }

    fn validator() -> Validator {
        Validator::new(16, &[".heic".to_string(), "HEIF".to_string()])
    }

    #[test]
    fn oversized_upload_is_rejected_first() {
        let codec = CountingCodec::default();
        let upload = UploadedImage::new(vec![0; 17], "photo.txt");

        let result = validator().validate(&upload, &codec);
        assert!(matches!(result, Err(ConvertError::TooLarge { size: 17, max: 16 })));
        assert_eq!(codec.probes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn wrong_extension_never_reaches_the_codec() {
        let codec = CountingCodec {
            accept: true,
            ..Default::default()
        };

        for name in ["photo.jpg", "photo", "photo.heic.png", "heic"] {
            let upload = UploadedImage::new(vec![1; 8], name);
            let result = validator().validate(&upload, &codec);
            assert!(matches!(result, Err(ConvertError::UnsupportedFormat { .. })), "{}", name);
        }

        assert_eq!(codec.probes.load(Ordering::SeqCst), 0);
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let codec = CountingCodec {
            accept: true,
            ..Default::default()
        };
        let upload = UploadedImage::new(vec![1; 8], "IMG_1234.HeIf");

        assert!(validator().validate(&upload, &codec).is_ok());
        assert_eq!(codec.probes.load(Ordering::SeqCst), 1);
        assert_eq!(codec.decodes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn failed_probe_is_invalid_image() {
        let codec = CountingCodec::default();
        let upload = UploadedImage::new(vec![1; 8], "photo.heic");

        let result = validator().validate(&upload, &codec);
        assert!(matches!(result, Err(ConvertError::InvalidImage(_))));
    }

    #[test]
    fn empty_upload_is_invalid_image() {
        let codec = CountingCodec {
            accept: true,
            ..Default::default()
        };
        let upload = UploadedImage::new(Vec::new(), "photo.heic");

        assert!(matches!(
            validator().validate(&upload, &codec),
            Err(ConvertError::InvalidImage(_))
        ));
        assert_eq!(codec.probes.load(Ordering::SeqCst), 0);
    }
}

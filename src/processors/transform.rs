// heic2jpg/src/processors/transform.rs
use super::resizer::Resizer;
use crate::core::{ConversionOptions, DecodedImage, Result, Rotation};
use image::imageops;

/// Rotation, then resize, so requested dimensions apply to the rotated orientation.
pub struct Transformer {
    resizer: Resizer,
}

impl Transformer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    pub fn apply(&self, image: DecodedImage, options: &ConversionOptions) -> Result<DecodedImage> {
        let rotated = Self::rotate(image, options.rotation());

        match options.resize_target() {
            Some(target) => self.resizer.resize(&rotated, target),
            None => Ok(rotated),
        }
    }

    /// Counter-clockwise quarter turns with the canvas expanded to fit.
    pub fn rotate(image: DecodedImage, rotation: Rotation) -> DecodedImage {
        let pixels = match rotation {
            Rotation::None => return image,
            Rotation::Quarter => imageops::rotate270(image.pixels()),
            Rotation::Half => imageops::rotate180(image.pixels()),
            Rotation::ThreeQuarter => imageops::rotate90(image.pixels()),
        };

        log::debug!(
            "Rotated {:?}: {}x{} -> {}x{}",
            rotation,
            image.width(),
            image.height(),
            pixels.width(),
            pixels.height()
        );

        image.with_pixels(pixels)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn gradient(width: u32, height: u32) -> DecodedImage {
        DecodedImage::from_rgb(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    #[test]
    fn zero_or_missing_rotation_is_identity() {
        let original = gradient(6, 4);
        for rotate in [None, Some(0), Some(45), Some(-90)] {
            let options = ConversionOptions {
                rotate,
                ..Default::default()
            };
            let out = Transformer::new().apply(original.clone(), &options).unwrap();
            assert_eq!(out.pixels(), original.pixels(), "rotate={:?}", rotate);
        }
    }

    #[test]
    fn quarter_turns_swap_dimensions() {
        let original = gradient(6, 4);
        assert_eq!(Transformer::rotate(original.clone(), Rotation::Quarter).dimensions(), (4, 6));
        assert_eq!(Transformer::rotate(original.clone(), Rotation::Half).dimensions(), (6, 4));
        assert_eq!(Transformer::rotate(original, Rotation::ThreeQuarter).dimensions(), (4, 6));
    }

    #[test]
    fn four_quarter_turns_restore_the_image() {
        let original = gradient(5, 3);
        let mut image = original.clone();
        for _ in 0..4 {
            image = Transformer::rotate(image, Rotation::Quarter);
        }
        assert_eq!(image.pixels(), original.pixels());
    }

    #[test]
    fn quarter_turn_is_counter_clockwise() {
        // top-right corner ends up top-left
        let mut pixels = RgbImage::new(3, 2);
        pixels.put_pixel(2, 0, Rgb([255, 0, 0]));
        let rotated = Transformer::rotate(DecodedImage::from_rgb(pixels), Rotation::Quarter);
        assert_eq!(rotated.pixels().get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn rotation_happens_before_resize() {
        let options = ConversionOptions {
            resize: true,
            width: Some(60),
            maintain_aspect_ratio: true,
            rotate: Some(90),
            ..Default::default()
        };
        let out = Transformer::new().apply(gradient(120, 160), &options).unwrap();
        assert_eq!(out.dimensions(), (60, 45));
    }

    #[test]
    fn resize_flag_off_ignores_dimensions() {
        let options = ConversionOptions {
            resize: false,
            width: Some(10),
            height: Some(10),
            ..Default::default()
        };
        let out = Transformer::new().apply(gradient(30, 20), &options).unwrap();
        assert_eq!(out.dimensions(), (30, 20));
    }

    #[test]
    fn unbounded_width_is_an_error_not_an_abort() {
        let options = ConversionOptions {
            resize: true,
            width: Some(u32::MAX),
            ..Default::default()
        };
        let result = Transformer::new().apply(gradient(4, 2), &options);
        assert!(matches!(result, Err(crate::core::ConvertError::InvalidParameter(_))));
    }
}

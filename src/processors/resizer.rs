// heic2jpg/src/processors/resizer.rs
use crate::core::{ConvertError, DecodedImage, ResizeTarget, Result, MAX_DIMENSION, MAX_OUTPUT_PIXELS};
use image::imageops::{self, FilterType};

pub struct Resizer {
    filter: FilterType,
}

impl Resizer {
    /// Lanczos3; nearest-neighbour aliasing is not acceptable for photos.
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Refuses targets that could not be encoded or would need an oversized buffer.
    pub fn resize(&self, image: &DecodedImage, target: ResizeTarget) -> Result<DecodedImage> {
        let (width, height) = Self::calculate_dimensions(image.dimensions(), target);

        if (width, height) == image.dimensions() {
            log::debug!("Image dimensions unchanged, skipping resize");
            return Ok(image.clone());
        }

        check_output_size(width, height)?;

        log::debug!(
            "Resizing image from {}x{} to {}x{}",
            image.width(),
            image.height(),
            width,
            height
        );

        Ok(image.with_pixels(imageops::resize(image.pixels(), width, height, self.filter)))
    }

    /// Output size for `target`. Fractions are truncated; no side drops below one pixel.
    pub fn calculate_dimensions(original: (u32, u32), target: ResizeTarget) -> (u32, u32) {
        let (orig_w, orig_h) = original;
        if orig_w == 0 || orig_h == 0 {
            return original;
        }

        if !target.keep_aspect {
            return (
                target.width.unwrap_or(orig_w).max(1),
                target.height.unwrap_or(orig_h).max(1),
            );
        }

        match (target.width, target.height) {
            (None, None) => original,
            (Some(w), None) => (w.max(1), scale_side(orig_h, w, orig_w)),
            (None, Some(h)) => (scale_side(orig_w, h, orig_h), h.max(1)),
            (Some(w), Some(h)) => Self::fit_within(orig_w, orig_h, w, h),
        }
    }

    // scale = min(w / orig_w, h / orig_h), compared exactly in integers
    fn fit_within(orig_w: u32, orig_h: u32, box_w: u32, box_h: u32) -> (u32, u32) {
        let width_bound = box_w as u64 * orig_h as u64 <= box_h as u64 * orig_w as u64;

        if width_bound {
            (box_w.max(1), scale_side(orig_h, box_w, orig_w))
        } else {
            (scale_side(orig_w, box_h, orig_h), box_h.max(1))
        }
    }
}

impl Default for Resizer {
    fn default() -> Self {
        Self::new()
    }
}

fn check_output_size(width: u32, height: u32) -> Result<()> {
    if width > MAX_DIMENSION
        || height > MAX_DIMENSION
        || width as u64 * height as u64 > MAX_OUTPUT_PIXELS
    {
        return Err(ConvertError::InvalidParameter(format!(
            "Requested output size {}x{} is too large",
            width, height
        )));
    }

    Ok(())
}

/// floor(side * numerator / denominator), at least 1.
fn scale_side(side: u32, numerator: u32, denominator: u32) -> u32 {
    let scaled = side as u64 * numerator as u64 / denominator as u64;
    scaled.clamp(1, u32::MAX as u64) as u32
}

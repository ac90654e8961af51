//! Normalizer: raw image bytes to a canonical working image.
//!
//! Decodes any format the `image` crate was built with, converts to 8-bit
//! RGB, resizes to a fixed width with the aspect ratio preserved, and
//! derives the luminance plane the edge detectors run on.

use image::imageops::{self, FilterType};
use ndarray::{Array2, Array3};
use tracing::debug;

use crate::error::{EdgeError, Result};
use crate::filters::grayscale::rgb_to_gray;
use crate::grid::{rgb_array, PixelGrid};

/// Width every input is resized to.
pub const DEFAULT_TARGET_WIDTH: u32 = 400;

/// Largest output height accepted (an aspect ratio of 1:10 at 400 px).
pub const DEFAULT_MAX_HEIGHT: u32 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeConfig {
    pub target_width: u32,
    pub max_height: u32,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            target_width: DEFAULT_TARGET_WIDTH,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

impl NormalizeConfig {
    /// Output height for a source of `width` x `height`, rounded, at least 1.
    ///
    /// # Errors
    /// [`EdgeError::TooLarge`] when the height would exceed `max_height`.
    pub fn target_height(&self, width: u32, height: u32) -> Result<u32> {
        let h = (self.target_width.max(1) as f64 * height as f64 / width.max(1) as f64).round();
        let target = (h as u64).max(1);
        if target > self.max_height as u64 {
            return Err(EdgeError::TooLarge {
                width,
                height,
                target,
                limit: self.max_height,
            });
        }
        Ok(target as u32)
    }
}

/// A decoded, resized image and its luminance plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// (height, width, 3)
    pub rgb: Array3<u8>,
    /// (height, width)
    pub gray: Array2<u8>,
}

impl Normalized {
    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        self.gray.dim()
    }

    pub fn rgb_grid(&self) -> PixelGrid {
        PixelGrid::Rgb(self.rgb.clone())
    }

}

/// Normalize with the default 400 px target width.
pub fn normalize(bytes: &[u8]) -> Result<Normalized> {
    normalize_with(bytes, &NormalizeConfig::default())
}

/// Decode, resize and derive grayscale.
///
/// # Errors
/// [`EdgeError::EmptyInput`] for an empty buffer, [`EdgeError::Decode`]
/// when the bytes are not a supported image, [`EdgeError::TooLarge`] when
/// the resized height would pass `config.max_height`.
pub fn normalize_with(bytes: &[u8], config: &NormalizeConfig) -> Result<Normalized> {
    if bytes.is_empty() {
        return Err(EdgeError::EmptyInput);
    }

    let decoded = image::load_from_memory(bytes)?.to_rgb8();
    let (src_w, src_h) = decoded.dimensions();

    let width = config.target_width.max(1);
    let height = config.target_height(src_w, src_h)?;
    let resized = if (src_w, src_h) == (width, height) {
        decoded
    } else {
        imageops::resize(&decoded, width, height, FilterType::Triangle)
    };

    debug!(src_w, src_h, width, height, "normalized input image");

    let rgb = rgb_array(resized)?;
    let gray = rgb_to_gray(rgb.view());

    Ok(Normalized { rgb, gray })
}

//! Pixel grids passed between pipeline stages.
//!
//! ## Layout
//!
//! | Variant | Shape | Description |
//! |---------|-------|-------------|
//! | `Gray` | (H, W) | Single luminance channel, 0-255 |
//! | `Rgb` | (H, W, 3) | Red, green, blue, 0-255 |
//!
//! Grayscale grids carry no channel axis. Each stage receives a grid by
//! value or by view and hands back a new one; nothing is shared mutably
//! between stages.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use ndarray::{Array2, Array3};

use crate::error::{EdgeError, Result};
use crate::filters::grayscale::{gray_to_rgb, rgb_to_gray};
use crate::filters::histogram::histogram_u8;

/// Move an `image` RGB buffer into an (H, W, 3) array.
pub fn rgb_array(img: RgbImage) -> Result<Array3<u8>> {
    let (w, h) = img.dimensions();
    Array3::from_shape_vec((h as usize, w as usize, 3), img.into_raw())
        .map_err(|e| EdgeError::Encode(e.to_string()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PixelGrid {
    Gray(Array2<u8>),
    Rgb(Array3<u8>),
}

impl PixelGrid {
    /// (height, width)
    pub fn dims(&self) -> (usize, usize) {
        match self {
            PixelGrid::Gray(g) => g.dim(),
            PixelGrid::Rgb(c) => {
                let (h, w, _) = c.dim();
                (h, w)
            }
        }
    }

    pub fn width(&self) -> usize {
        self.dims().1
    }

    pub fn height(&self) -> usize {
        self.dims().0
    }

    pub fn channels(&self) -> usize {
        match self {
            PixelGrid::Gray(_) => 1,
            PixelGrid::Rgb(_) => 3,
        }
    }

    pub fn is_gray(&self) -> bool {
        matches!(self, PixelGrid::Gray(_))
    }

    /// Number of non-zero samples (every channel counts separately).
    pub fn count_nonzero(&self) -> u64 {
        match self {
            PixelGrid::Gray(g) => g.iter().filter(|&&v| v != 0).count() as u64,
            PixelGrid::Rgb(c) => c.iter().filter(|&&v| v != 0).count() as u64,
        }
    }

    /// 256-bin intensity histogram over all samples of the grid.
    pub fn histogram(&self) -> [u32; 256] {
        match self {
            PixelGrid::Gray(g) => histogram_u8(g.view()),
            PixelGrid::Rgb(c) => {
                let mut hist = [0u32; 256];
                c.iter().for_each(|&v| hist[v as usize] += 1);
                hist
            }
        }
    }

    /// Single-channel view of the grid, converting RGB through luminance.
    pub fn to_gray(&self) -> Array2<u8> {
        match self {
            PixelGrid::Gray(g) => g.clone(),
            PixelGrid::Rgb(c) => rgb_to_gray(c.view()),
        }
    }

    /// Three-channel view of the grid, replicating gray into R=G=B.
    pub fn to_rgb(&self) -> Array3<u8> {
        match self {
            PixelGrid::Gray(g) => gray_to_rgb(g.view()),
            PixelGrid::Rgb(c) => c.clone(),
        }
    }

    pub fn from_rgb_image(img: RgbImage) -> Result<Self> {
        rgb_array(img).map(PixelGrid::Rgb)
    }

    pub fn to_dynamic_image(&self) -> Result<DynamicImage> {
        let (h, w) = self.dims();
        let raw: Vec<u8> = match self {
            PixelGrid::Gray(g) => g.iter().copied().collect(),
            PixelGrid::Rgb(c) => c.iter().copied().collect(),
        };
        let image = match self {
            PixelGrid::Gray(_) => GrayImage::from_raw(w as u32, h as u32, raw).map(DynamicImage::ImageLuma8),
            PixelGrid::Rgb(_) => RgbImage::from_raw(w as u32, h as u32, raw).map(DynamicImage::ImageRgb8),
        };
        image.ok_or_else(|| EdgeError::Encode(format!("buffer does not match {w}x{h} grid")))
    }

    /// Encode as PNG (8-bit gray or 8-bit RGB depending on the variant).
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let image = self.to_dynamic_image()?;
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| EdgeError::Encode(e.to_string()))?;
        Ok(buf)
    }
}

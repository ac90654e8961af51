//! Operator registry: primary methods and secondary effects.
//!
//! Operators are selected by display name (as shown in the UI and accepted
//! by the HTTP API) and dispatched with an exhaustive `match`, so adding a
//! variant without wiring its behaviour is a compile error.
//!
//! ## Primary methods
//!
//! | Method | Input | Output |
//! |--------|-------|--------|
//! | Equalization | gray | gray |
//! | Canny | gray + thresholds | gray, 0/255 |
//! | Sobel, Sobel X, Sobel Y | gray | gray |
//! | Laplacian, Prewitt, Roberts | gray | gray |
//! | None | RGB | RGB |
//!
//! ## Secondary effects
//!
//! Effects accept either grid kind. Color Correction always returns RGB,
//! Thresholding always returns gray, the rest keep the input kind.

use std::fmt;
use std::str::FromStr;

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EdgeError, Result};
use crate::filters::color_science::{clahe_rgb_u8, color_correct_u8};
use crate::filters::edge::{canny_u8, laplacian_u8, prewitt_u8, roberts_u8, sobel_u8, SobelDirection};
use crate::filters::histogram::{
    clahe_u8, contrast_stretch_u8, equalize_u8, CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID,
};
use crate::filters::noise::{gaussian_blur_5x5_u8, median_u8, MEDIAN_RADIUS};
use crate::filters::sharpen::sharpen_u8;
use crate::filters::stylize::{invert_rgb_u8, invert_u8, threshold_u8, THRESHOLD};
use crate::filters::{map_channels, try_map_channels};
use crate::grid::PixelGrid;
use crate::normalize::Normalized;
use crate::pipeline::CannyThresholds;

/// Lowercase, and treat `_` and `-` as spaces.
fn fold_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => ' ',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

// ============================================================================
// Primary methods
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    Equalization,
    Canny,
    Sobel,
    SobelX,
    SobelY,
    Laplacian,
    Prewitt,
    Roberts,
    None,
}

impl Method {
    /// Every method in display order.
    pub const ALL: [Method; 9] = [
        Method::Equalization,
        Method::Canny,
        Method::Sobel,
        Method::SobelX,
        Method::SobelY,
        Method::Laplacian,
        Method::Prewitt,
        Method::Roberts,
        Method::None,
    ];

    /// Methods the scorer compares.
    pub const EDGE_DETECTORS: [Method; 7] = [
        Method::Canny,
        Method::Sobel,
        Method::SobelX,
        Method::SobelY,
        Method::Laplacian,
        Method::Prewitt,
        Method::Roberts,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Equalization => "Equalization",
            Method::Canny => "Canny",
            Method::Sobel => "Sobel",
            Method::SobelX => "Sobel X",
            Method::SobelY => "Sobel Y",
            Method::Laplacian => "Laplacian",
            Method::Prewitt => "Prewitt",
            Method::Roberts => "Roberts",
            Method::None => "None",
        }
    }

    pub fn is_edge_detector(self) -> bool {
        !matches!(self, Method::Equalization | Method::None)
    }

    /// Apply the method to a normalized image.
    ///
    /// Every method except `None` reads the gray plane; `None` passes the
    /// RGB image through unchanged.
    pub fn apply(self, input: &Normalized, thresholds: CannyThresholds) -> PixelGrid {
        if self == Method::None {
            return input.rgb_grid();
        }
        PixelGrid::Gray(self.apply_gray(input.gray.view(), thresholds))
    }

    /// Apply the method to a luminance plane. `None` returns a copy.
    pub fn apply_gray(self, gray: ArrayView2<u8>, thresholds: CannyThresholds) -> Array2<u8> {
        match self {
            Method::Equalization => equalize_u8(gray),
            Method::Canny => canny_u8(gray, thresholds.low, thresholds.high),
            Method::Sobel => sobel_u8(gray, SobelDirection::Magnitude),
            Method::SobelX => sobel_u8(gray, SobelDirection::Horizontal),
            Method::SobelY => sobel_u8(gray, SobelDirection::Vertical),
            Method::Laplacian => laplacian_u8(gray),
            Method::Prewitt => prewitt_u8(gray),
            Method::Roberts => roberts_u8(gray),
            Method::None => gray.to_owned(),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Method {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold_name(s);
        if folded == "equalize" {
            return Ok(Method::Equalization);
        }
        Method::ALL
            .into_iter()
            .find(|m| fold_name(m.name()) == folded)
            .ok_or_else(|| EdgeError::UnknownMethod(s.to_string()))
    }
}

// ============================================================================
// Secondary effects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Effect {
    None,
    GaussianBlur,
    MedianDenoising,
    Sharpening,
    Clahe,
    ColorCorrection,
    ContrastStretch,
    Thresholding,
    Invert,
}

impl Effect {
    /// Every effect in display order.
    pub const ALL: [Effect; 9] = [
        Effect::None,
        Effect::GaussianBlur,
        Effect::MedianDenoising,
        Effect::Sharpening,
        Effect::Clahe,
        Effect::ColorCorrection,
        Effect::ContrastStretch,
        Effect::Thresholding,
        Effect::Invert,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Effect::None => "None",
            Effect::GaussianBlur => "Gaussian Blur",
            Effect::MedianDenoising => "Median Denoising",
            Effect::Sharpening => "Sharpening",
            Effect::Clahe => "CLAHE Equalization",
            Effect::ColorCorrection => "Color Correction",
            Effect::ContrastStretch => "Contrast Stretch",
            Effect::Thresholding => "Thresholding",
            Effect::Invert => "Invert",
        }
    }

    fn alias(folded: &str) -> Option<Effect> {
        match folded {
            "denoising" | "gaussian" => Some(Effect::GaussianBlur),
            "median" => Some(Effect::MedianDenoising),
            "sharpen" => Some(Effect::Sharpening),
            "clahe" => Some(Effect::Clahe),
            "threshold" => Some(Effect::Thresholding),
            _ => None,
        }
    }

    /// Apply the effect to the output of a primary method.
    ///
    /// # Errors
    /// [`EdgeError::DegenerateRange`] from Contrast Stretch on a channel
    /// whose 2nd and 98th percentiles coincide.
    pub fn apply(self, input: PixelGrid) -> Result<PixelGrid> {
        let output = match (self, input) {
            (Effect::None, grid) => grid,

            (Effect::GaussianBlur, PixelGrid::Gray(g)) => PixelGrid::Gray(gaussian_blur_5x5_u8(g.view())),
            (Effect::GaussianBlur, PixelGrid::Rgb(c)) => {
                PixelGrid::Rgb(map_channels(c.view(), gaussian_blur_5x5_u8))
            }

            (Effect::MedianDenoising, PixelGrid::Gray(g)) => PixelGrid::Gray(median_u8(g.view(), MEDIAN_RADIUS)),
            (Effect::MedianDenoising, PixelGrid::Rgb(c)) => {
                PixelGrid::Rgb(map_channels(c.view(), |p| median_u8(p, MEDIAN_RADIUS)))
            }

            (Effect::Sharpening, PixelGrid::Gray(g)) => PixelGrid::Gray(sharpen_u8(g.view())),
            (Effect::Sharpening, PixelGrid::Rgb(c)) => PixelGrid::Rgb(map_channels(c.view(), sharpen_u8)),

            (Effect::Clahe, PixelGrid::Gray(g)) => {
                PixelGrid::Gray(clahe_u8(g.view(), CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID))
            }
            (Effect::Clahe, PixelGrid::Rgb(c)) => {
                PixelGrid::Rgb(clahe_rgb_u8(c.view(), CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID))
            }

            (Effect::ColorCorrection, grid) => PixelGrid::Rgb(color_correct_u8(grid.to_rgb().view())),

            (Effect::ContrastStretch, PixelGrid::Gray(g)) => PixelGrid::Gray(contrast_stretch_u8(g.view(), 0)?),
            (Effect::ContrastStretch, PixelGrid::Rgb(c)) => {
                PixelGrid::Rgb(try_map_channels(c.view(), |ch, p| contrast_stretch_u8(p, ch))?)
            }

            (Effect::Thresholding, grid) => PixelGrid::Gray(threshold_u8(grid.to_gray().view(), THRESHOLD)),

            (Effect::Invert, PixelGrid::Gray(g)) => PixelGrid::Gray(invert_u8(g.view())),
            (Effect::Invert, PixelGrid::Rgb(c)) => PixelGrid::Rgb(invert_rgb_u8(c.view())),
        };
        Ok(output)
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Effect {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self> {
        let folded = fold_name(s);
        Effect::ALL
            .into_iter()
            .find(|e| fold_name(e.name()) == folded)
            .or_else(|| Effect::alias(&folded))
            .ok_or_else(|| EdgeError::UnknownEffect(s.to_string()))
    }
}

// ============================================================================
// serde: by display name
// ============================================================================

macro_rules! serde_by_name {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                name.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_by_name!(Method);
serde_by_name!(Effect);

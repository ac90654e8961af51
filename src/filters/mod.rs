//! Image operators used by the pipeline.
//!
//! ## Supported Formats
//!
//! | Format | Shape | Type | Description |
//! |--------|-------|------|-------------|
//! | Grayscale8 | (H, W) | u8 | Single luminance channel, 0-255 |
//! | RGB8 | (H, W, 3) | u8 | Red, green, blue, 0-255 |
//!
//! Filters are written against a single `ArrayView2<u8>` plane. Colour
//! inputs are processed plane by plane through [`map_channels`], unless the
//! operator is defined on colour directly (Lab conversion, colour
//! correction).
//!
//! ## Architecture
//!
//! - **Pure** - every filter borrows its input and allocates its output
//! - **Reflect-101 borders** - convolutions mirror around the edge pixel
//! - **Saturating** - responses are clamped into 0..=255 before storage
//! - **Thread-safe** - planes and rows are processed with rayon
//!
//! ## Filter Categories
//!
//! - **Edge detection**: sobel, laplacian, prewitt, roberts, canny
//! - **Tonal**: equalize, clahe, contrast_stretch
//! - **Noise**: gaussian_blur_5x5, median
//! - **Sharpen**: fixed 3x3 kernel
//! - **Color science**: Lab conversion, colour correction
//! - **Stylize**: threshold, invert

pub mod border;
pub mod grayscale;
pub mod edge;
pub mod histogram;
pub mod noise;
pub mod sharpen;
pub mod color_science;
pub mod stylize;

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};
use rayon::prelude::*;

use crate::error::Result;

/// Apply a single-plane filter to every channel of a colour image.
pub fn map_channels<F>(input: ArrayView3<u8>, filter: F) -> Array3<u8>
where
    F: Fn(ArrayView2<u8>) -> Array2<u8> + Sync,
{
    let (height, width, channels) = input.dim();
    let planes: Vec<Array2<u8>> = (0..channels)
        .into_par_iter()
        .map(|c| filter(input.index_axis(Axis(2), c)))
        .collect();

    let mut output = Array3::<u8>::zeros((height, width, channels));
    for (c, plane) in planes.iter().enumerate() {
        output.index_axis_mut(Axis(2), c).assign(plane);
    }
    output
}

/// Fallible variant of [`map_channels`]; the filter receives the channel index.
pub fn try_map_channels<F>(input: ArrayView3<u8>, filter: F) -> Result<Array3<u8>>
where
    F: Fn(usize, ArrayView2<u8>) -> Result<Array2<u8>>,
{
    let (height, width, channels) = input.dim();
    let mut output = Array3::<u8>::zeros((height, width, channels));
    for c in 0..channels {
        let plane = filter(c, input.index_axis(Axis(2), c))?;
        output.index_axis_mut(Axis(2), c).assign(&plane);
    }
    Ok(output)
}

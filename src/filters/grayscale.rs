//! Grayscale conversion.
//!
//! Uses ITU-R BT.601 luma weights in 14-bit fixed point, as OpenCV's
//! RGB to gray conversion does:
//! `Y = 0.299 R + 0.587 G + 0.114 B`, rounded half up.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Zip};

/// BT.601 weights scaled by 2^14 (they sum to exactly 16384).
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// Luminance of a single RGB triple.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * r as u32 + LUMA_G * g as u32 + LUMA_B * b as u32;
    ((y + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

/// Convert an RGB image to a single luminance plane.
///
/// # Arguments
/// * `input` - 3D array view of shape (height, width, 3)
///
/// # Returns
/// 2D array of shape (height, width)
pub fn rgb_to_gray(input: ArrayView3<u8>) -> Array2<u8> {
    let (height, width, _) = input.dim();
    let mut output = Array2::<u8>::zeros((height, width));

    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        *out = luma(input[[y, x, 0]], input[[y, x, 1]], input[[y, x, 2]]);
    });

    output
}

/// Replicate a luminance plane into R=G=B.
pub fn gray_to_rgb(input: ArrayView2<u8>) -> Array3<u8> {
    let (height, width) = input.dim();
    Array3::from_shape_fn((height, width, 3), |(y, x, _)| input[[y, x]])
}

//! Noise reduction: Gaussian Blur, Median.
//!
//! Both filters work on one 8-bit plane; colour images go through
//! [`super::map_channels`].

use ndarray::{Array2, ArrayView2, Zip};

use super::border::{correlate, replicate};

/// Binomial 5-tap weights; the outer product sums to 256.
const GAUSS_TAPS: [i32; 5] = [1, 4, 6, 4, 1];

/// Default median window radius (5x5 window).
pub const MEDIAN_RADIUS: usize = 2;

// ============================================================================
// Gaussian Blur
// ============================================================================

fn gaussian_kernel_5x5() -> [[i32; 5]; 5] {
    let mut kernel = [[0i32; 5]; 5];
    for (ky, row) in kernel.iter_mut().enumerate() {
        for (kx, k) in row.iter_mut().enumerate() {
            *k = GAUSS_TAPS[ky] * GAUSS_TAPS[kx];
        }
    }
    kernel
}

/// Apply a 5x5 Gaussian blur.
///
/// Kernel is `[1 4 6 4 1] / 16` in both directions, reflect-101 border,
/// result rounded half up.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
///
/// # Returns
/// Blurred plane with the same shape
pub fn gaussian_blur_5x5_u8(input: ArrayView2<u8>) -> Array2<u8> {
    let sums = correlate(input, &gaussian_kernel_5x5(), (2, 2));
    sums.mapv(|s| ((s + 128) >> 8) as u8)
}

// ============================================================================
// Median
// ============================================================================

/// Apply a median filter.
///
/// Removes salt-and-pepper noise while preserving edges. Out-of-range
/// taps take the nearest edge pixel.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
/// * `radius` - Window radius; the window is `(2r+1) x (2r+1)`
///
/// # Returns
/// Median-filtered plane with the same shape
pub fn median_u8(input: ArrayView2<u8>, radius: usize) -> Array2<u8> {
    let (height, width) = input.dim();
    let mut output = Array2::<u8>::zeros((height, width));
    if height == 0 || width == 0 {
        return output;
    }

    let side = radius * 2 + 1;

    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let mut values: Vec<u8> = Vec::with_capacity(side * side);
        for dy in 0..side {
            let sy = replicate(y as isize + dy as isize - radius as isize, height);
            for dx in 0..side {
                let sx = replicate(x as isize + dx as isize - radius as isize, width);
                values.push(input[[sy, sx]]);
            }
        }

        let mid = values.len() / 2;
        let (_, median, _) = values.select_nth_unstable(mid);
        *out = *median;
    });

    output
}

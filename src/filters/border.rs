//! Border indexing and small-kernel correlation.
//!
//! Kernels are applied as correlation (no flip), as OpenCV's `filter2D`
//! does. Out-of-range taps are resolved with reflect-101
//! (`gfedcb|abcdefgh|gfedcba`) unless a [`Border`] says otherwise.

use ndarray::{Array2, ArrayView2, Zip};

/// Reflect-101 index: mirror around the edge pixel without repeating it.
#[inline]
pub fn reflect101(i: isize, size: usize) -> usize {
    if size <= 1 {
        return 0;
    }
    let n = size as isize;
    let period = 2 * (n - 1);
    let i = i.rem_euclid(period);
    if i >= n {
        (period - i) as usize
    } else {
        i as usize
    }
}

/// Replicate index: clamp to the nearest edge pixel.
#[inline]
pub fn replicate(i: isize, size: usize) -> usize {
    i.clamp(0, size as isize - 1) as usize
}

/// Out-of-range tap policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Border {
    /// `gfedcb|abcdefgh|gfedcba`
    #[default]
    Reflect101,
    /// `aaaaaa|abcdefgh|hhhhhhh`
    Replicate,
}

impl Border {
    #[inline]
    pub fn index(self, i: isize, size: usize) -> usize {
        match self {
            Border::Reflect101 => reflect101(i, size),
            Border::Replicate => replicate(i, size),
        }
    }
}

/// Clamp an integer response into the 8-bit range.
#[inline]
pub fn saturate_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Correlate a plane with a small integer kernel, reflect-101 borders.
pub fn correlate<const KH: usize, const KW: usize>(
    input: ArrayView2<u8>,
    kernel: &[[i32; KW]; KH],
    anchor: (usize, usize),
) -> Array2<i32> {
    correlate_with(input, kernel, anchor, Border::Reflect101)
}

/// Correlate a plane with a small integer kernel.
///
/// # Arguments
/// * `input` - Single-channel plane (height, width)
/// * `kernel` - Kernel rows, `KH` x `KW`
/// * `anchor` - (row, col) of the kernel tap that lands on the output pixel
/// * `border` - How taps outside the plane are resolved
///
/// # Returns
/// Raw (unsaturated) responses with the same shape as `input`
pub fn correlate_with<const KH: usize, const KW: usize>(
    input: ArrayView2<u8>,
    kernel: &[[i32; KW]; KH],
    anchor: (usize, usize),
    border: Border,
) -> Array2<i32> {
    let (height, width) = input.dim();
    let mut output = Array2::<i32>::zeros((height, width));
    if height == 0 || width == 0 {
        return output;
    }

    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let mut sum = 0i32;
        for (ky, row) in kernel.iter().enumerate() {
            let py = border.index(y as isize + ky as isize - anchor.0 as isize, height);
            for (kx, &k) in row.iter().enumerate() {
                if k == 0 {
                    continue;
                }
                let px = border.index(x as isize + kx as isize - anchor.1 as isize, width);
                sum += k * input[[py, px]] as i32;
            }
        }
        *out = sum;
    });

    output
}

/// Correlate with a 3x3 kernel centred on the output pixel.
pub fn correlate3(input: ArrayView2<u8>, kernel: &[[i32; 3]; 3]) -> Array2<i32> {
    correlate(input, kernel, (1, 1))
}

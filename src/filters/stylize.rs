//! Stylize filters: Threshold, Invert.

use ndarray::{Array2, Array3, ArrayView2, ArrayView3};

/// Default binary threshold.
pub const THRESHOLD: u8 = 127;

/// Apply a binary threshold to a plane.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
/// * `threshold` - Pixels strictly above become 255, the rest 0
///
/// # Returns
/// Plane containing only 0 and 255
pub fn threshold_u8(input: ArrayView2<u8>, threshold: u8) -> Array2<u8> {
    input.mapv(|v| if v > threshold { 255 } else { 0 })
}

/// Invert a plane.
pub fn invert_u8(input: ArrayView2<u8>) -> Array2<u8> {
    input.mapv(|v| !v)
}

/// Invert every channel of a colour image.
pub fn invert_rgb_u8(input: ArrayView3<u8>) -> Array3<u8> {
    input.mapv(|v| !v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_strictly_greater() {
        let img = Array2::from_shape_fn((1, 4), |(_, x)| [0u8, 127, 128, 255][x]);

        let result = threshold_u8(img.view(), THRESHOLD);

        assert_eq!(result.as_slice().unwrap(), &[0, 0, 255, 255]);
    }

    #[test]
    fn test_threshold_output_is_binary() {
        let img = Array2::from_shape_fn((16, 16), |(y, x)| (y * 16 + x) as u8);
        let result = threshold_u8(img.view(), THRESHOLD);
        assert!(result.iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn test_invert_is_involution() {
        let img = Array3::from_shape_fn((3, 3, 3), |(y, x, c)| (y * 31 + x * 17 + c * 5) as u8);

        let once = invert_rgb_u8(img.view());
        assert_eq!(once[[0, 0, 0]], 255);
        assert_eq!(invert_rgb_u8(once.view()), img);
    }

    #[test]
    fn test_invert_plane() {
        let img = Array2::from_elem((2, 2), 200u8);
        assert!(invert_u8(img.view()).iter().all(|&v| v == 55));
    }
}

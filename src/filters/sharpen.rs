//! Fixed-kernel sharpening.

use ndarray::{Array2, ArrayView2};

use super::border::{correlate3, saturate_u8};

/// Centre weight 5, direct neighbours -1.
pub const SHARPEN: [[i32; 3]; 3] = [[0, -1, 0], [-1, 5, -1], [0, -1, 0]];

/// Sharpen a single plane.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
///
/// # Returns
/// Sharpened plane, responses clamped to 0-255
pub fn sharpen_u8(input: ArrayView2<u8>) -> Array2<u8> {
    correlate3(input, &SHARPEN).mapv(saturate_u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_plane_is_unchanged() {
        let img = Array2::<u8>::from_elem((4, 4), 90);
        assert_eq!(sharpen_u8(img.view()), img);
    }

    #[test]
    fn test_step_overshoots_and_clips() {
        let img = Array2::from_shape_fn((5, 6), |(_, x)| if x < 3 { 100u8 } else { 200 });

        let result = sharpen_u8(img.view());

        // Dark side of the edge: 5*100 - 3*100 - 200 = 0
        assert_eq!(result[[2, 2]], 0);
        // Bright side: 5*200 - 3*200 - 100 = 300 -> 255
        assert_eq!(result[[2, 3]], 255);
        assert_eq!(result[[2, 0]], 100);
    }
}

//! Color science filters: CIE L*a*b* conversion, Color Correction, CLAHE on
//! colour images.
//!
//! Lab values are stored in 8 bits with OpenCV's scaling: `L * 255 / 100`,
//! `a + 128`, `b + 128`. The white point is D65 and the RGB primaries are
//! sRGB with the sRGB transfer curve.
//!
//! ## Supported Formats
//!
//! - **RGB (3 channels)**: full colour processing
//! - Gray planes are upconverted by the caller (see [`crate::ops::Effect`])

use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis, Zip};

use super::histogram::{clahe_u8, equalize_u8};

// ============================================================================
// Color Space Conversion Utilities
// ============================================================================

const XN: f32 = 0.950456;
const ZN: f32 = 1.088754;

const LAB_EPSILON: f32 = 0.008856;
const LAB_KAPPA: f32 = 903.3;

/// sRGB -> XYZ (D65), rows are X, Y, Z.
const RGB_TO_XYZ: [[f32; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

/// XYZ (D65) -> sRGB, rows are R, G, B.
const XYZ_TO_RGB: [[f32; 3]; 3] = [
    [3.240479, -1.537150, -0.498535],
    [-0.969256, 1.875991, 0.041556],
    [0.055648, -0.204043, 1.057311],
];

#[inline]
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.0031308 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

#[inline]
fn lab_f_inv(f: f32) -> f32 {
    let t = f * f * f;
    if t > LAB_EPSILON {
        t
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Convert one sRGB pixel to 8-bit Lab.
#[inline]
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> [u8; 3] {
    let lin = [
        srgb_to_linear(r as f32 / 255.0),
        srgb_to_linear(g as f32 / 255.0),
        srgb_to_linear(b as f32 / 255.0),
    ];
    let dot = |row: &[f32; 3]| row[0] * lin[0] + row[1] * lin[1] + row[2] * lin[2];

    let x = dot(&RGB_TO_XYZ[0]) / XN;
    let y = dot(&RGB_TO_XYZ[1]);
    let z = dot(&RGB_TO_XYZ[2]) / ZN;

    let fx = lab_f(x);
    let fy = lab_f(y);
    let fz = lab_f(z);

    let l = if y > LAB_EPSILON { 116.0 * fy - 16.0 } else { LAB_KAPPA * y };
    let a = 500.0 * (fx - fy);
    let bb = 200.0 * (fy - fz);

    [to_u8(l * 255.0 / 100.0), to_u8(a + 128.0), to_u8(bb + 128.0)]
}

/// Convert one 8-bit Lab pixel back to sRGB.
#[inline]
pub fn lab_to_rgb(l: u8, a: u8, b: u8) -> [u8; 3] {
    let l = l as f32 * 100.0 / 255.0;
    let a = a as f32 - 128.0;
    let b = b as f32 - 128.0;

    let (y, fy) = if l <= LAB_KAPPA * LAB_EPSILON {
        let y = l / LAB_KAPPA;
        (y, 7.787 * y + 16.0 / 116.0)
    } else {
        let fy = (l + 16.0) / 116.0;
        (fy * fy * fy, fy)
    };
    let x = lab_f_inv(fy + a / 500.0) * XN;
    let z = lab_f_inv(fy - b / 200.0) * ZN;

    let xyz = [x, y, z];
    let dot = |row: &[f32; 3]| row[0] * xyz[0] + row[1] * xyz[1] + row[2] * xyz[2];

    let mut out = [0u8; 3];
    for (o, row) in out.iter_mut().zip(XYZ_TO_RGB.iter()) {
        let lin = dot(row).clamp(0.0, 1.0);
        *o = to_u8(linear_to_srgb(lin) * 255.0);
    }
    out
}

/// Convert an RGB image to 8-bit Lab.
///
/// # Arguments
/// * `input` - RGB image (height, width, 3)
///
/// # Returns
/// Lab image (height, width, 3) with L, a, b in the three channels
pub fn rgb_to_lab_u8(input: ArrayView3<u8>) -> Array3<u8> {
    let mut output = Array3::<u8>::zeros(input.dim());
    Zip::from(output.lanes_mut(Axis(2)))
        .and(input.lanes(Axis(2)))
        .par_for_each(|mut out, px| {
            let lab = rgb_to_lab(px[0], px[1], px[2]);
            out[0] = lab[0];
            out[1] = lab[1];
            out[2] = lab[2];
        });
    output
}

/// Convert an 8-bit Lab image back to RGB.
pub fn lab_to_rgb_u8(input: ArrayView3<u8>) -> Array3<u8> {
    let mut output = Array3::<u8>::zeros(input.dim());
    Zip::from(output.lanes_mut(Axis(2)))
        .and(input.lanes(Axis(2)))
        .par_for_each(|mut out, px| {
            let rgb = lab_to_rgb(px[0], px[1], px[2]);
            out[0] = rgb[0];
            out[1] = rgb[1];
            out[2] = rgb[2];
        });
    output
}

// ============================================================================
// Luminance-channel filters
// ============================================================================

/// Run a plane filter on the L channel of an RGB image, leaving a and b alone.
fn map_lightness<F>(input: ArrayView3<u8>, filter: F) -> Array3<u8>
where
    F: Fn(ArrayView2<u8>) -> Array2<u8>,
{
    let mut lab = rgb_to_lab_u8(input);
    let lightness = filter(lab.index_axis(Axis(2), 0));
    lab.index_axis_mut(Axis(2), 0).assign(&lightness);
    lab_to_rgb_u8(lab.view())
}

/// Colour correction: histogram-equalize the L channel in Lab space.
///
/// # Arguments
/// * `input` - RGB image (height, width, 3)
///
/// # Returns
/// RGB image with equalized lightness and unchanged chroma
pub fn color_correct_u8(input: ArrayView3<u8>) -> Array3<u8> {
    map_lightness(input, equalize_u8)
}

/// CLAHE on the L channel of an RGB image.
///
/// # Arguments
/// * `input` - RGB image (height, width, 3)
/// * `clip_limit` - Relative clip limit
/// * `grid` - Tile grid as (columns, rows)
pub fn clahe_rgb_u8(input: ArrayView3<u8>, clip_limit: f32, grid: (usize, usize)) -> Array3<u8> {
    map_lightness(input, |l| clahe_u8(l, clip_limit, grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lab_reference_values() {
        assert_eq!(rgb_to_lab(0, 0, 0), [0, 128, 128]);
        assert_eq!(rgb_to_lab(255, 255, 255), [255, 128, 128]);

        // Pure red: L=53.2, a=80.1, b=67.2
        let red = rgb_to_lab(255, 0, 0);
        assert!((red[0] as i32 - 136).abs() <= 1);
        assert!((red[1] as i32 - 208).abs() <= 1);
        assert!((red[2] as i32 - 195).abs() <= 1);
    }

    fn max_channel_error(rgb: (u8, u8, u8)) -> i32 {
        let (r, g, b) = rgb;
        let lab = rgb_to_lab(r, g, b);
        let back = lab_to_rgb(lab[0], lab[1], lab[2]);
        [r, g, b].iter().zip(back.iter()).map(|(o, n)| (*o as i32 - *n as i32).abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_lab_roundtrip_within_quantisation() {
        for &rgb in &[(200u8, 30u8, 90u8), (128, 128, 128), (100, 100, 100)] {
            let err = max_channel_error(rgb);
            assert!(err <= 3, "{:?} off by {}", rgb, err);
        }
    }

    #[test]
    fn test_lab_roundtrip_saturated_is_stable_in_lab() {
        // Near zero the sRGB curve is steep, so one a/b code step moves a
        // channel by several levels. Compare in Lab instead.
        for &(r, g, b) in &[(12u8, 180u8, 250u8), (255, 255, 0)] {
            let lab = rgb_to_lab(r, g, b);
            let back = lab_to_rgb(lab[0], lab[1], lab[2]);
            let again = rgb_to_lab(back[0], back[1], back[2]);
            for (x, y) in lab.iter().zip(again.iter()) {
                assert!(x.abs_diff(*y) <= 1, "{:?}: {:?} vs {:?}", (r, g, b), lab, again);
            }
        }
    }

    #[test]
    fn test_gray_stays_neutral() {
        let lab = rgb_to_lab(100, 100, 100);
        assert_eq!(lab[1], 128);
        assert_eq!(lab[2], 128);
    }

    #[test]
    fn test_color_correct_stretches_lightness() {
        let img = Array3::from_shape_fn((4, 4, 3), |(y, x, _)| 100 + (y * 4 + x) as u8 * 2);

        let result = color_correct_u8(img.view());

        assert_eq!(result.dim(), (4, 4, 3));
        let min = *result.iter().min().unwrap();
        let max = *result.iter().max().unwrap();
        assert!(min < 20, "min {}", min);
        assert!(max > 235, "max {}", max);
    }

    #[test]
    fn test_clahe_rgb_keeps_shape() {
        let img = Array3::from_shape_fn((10, 12, 3), |(y, x, c)| (x * 20 + y * 3 + c * 7) as u8);
        let result = clahe_rgb_u8(img.view(), 2.0, (8, 8));
        assert_eq!(result.dim(), (10, 12, 3));
    }
}

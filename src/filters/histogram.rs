//! Histogram-based tonal filters: Equalize, CLAHE, Contrast Stretch.
//!
//! All filters operate on one 8-bit plane and build a 256-bin lookup
//! table from its histogram.

use ndarray::{Array2, ArrayView2, Zip};

use super::border::reflect101;
use crate::error::{EdgeError, Result};

/// Default CLAHE clip limit.
pub const CLAHE_CLIP_LIMIT: f32 = 2.0;
/// Default CLAHE tile grid (columns, rows).
pub const CLAHE_TILE_GRID: (usize, usize) = (8, 8);

/// Contrast stretch clip percentiles.
pub const STRETCH_LOW_PERCENTILE: f32 = 2.0;
pub const STRETCH_HIGH_PERCENTILE: f32 = 98.0;

/// Compute the 256-bin histogram of a plane.
pub fn histogram_u8(input: ArrayView2<u8>) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &v in input.iter() {
        hist[v as usize] += 1;
    }
    hist
}

// ============================================================================
// Equalize Histogram
// ============================================================================

/// Build the equalization lookup table for a histogram.
///
/// The first occupied bin maps to 0 and the CDF above it is spread over
/// 0-255. A histogram with a single occupied bin maps to itself.
fn equalize_lut(hist: &[u32; 256]) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let total: u64 = hist.iter().map(|&c| c as u64).sum();

    let Some(first) = hist.iter().position(|&c| c > 0) else {
        return lut;
    };
    let first_count = hist[first] as u64;

    if first_count == total {
        lut.iter_mut().for_each(|v| *v = first as u8);
        return lut;
    }

    let scale = 255.0f32 / (total - first_count) as f32;
    let mut sum = 0u64;
    for i in (first + 1)..256 {
        sum += hist[i] as u64;
        lut[i] = (sum as f32 * scale).round_ties_even().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Equalize the histogram of a single plane.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
///
/// # Returns
/// Plane whose intensity CDF is approximately linear over 0-255
pub fn equalize_u8(input: ArrayView2<u8>) -> Array2<u8> {
    let lut = equalize_lut(&histogram_u8(input));
    input.mapv(|v| lut[v as usize])
}

// ============================================================================
// CLAHE
// ============================================================================

/// Contrast-limited adaptive histogram equalization.
///
/// The plane is split into `grid.0` x `grid.1` tiles (extended with
/// reflect-101 padding when the size does not divide evenly). Each tile's
/// histogram is clipped at `clip_limit * tile_area / 256`, the excess is
/// redistributed over all bins, and the resulting lookup tables are
/// bilinearly interpolated between tile centres.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
/// * `clip_limit` - Relative clip limit; values <= 0 disable clipping
/// * `grid` - Tile grid as (columns, rows)
pub fn clahe_u8(input: ArrayView2<u8>, clip_limit: f32, grid: (usize, usize)) -> Array2<u8> {
    let (height, width) = input.dim();
    if height == 0 || width == 0 {
        return input.to_owned();
    }

    let tiles_x = grid.0.max(1);
    let tiles_y = grid.1.max(1);
    let tile_w = width.div_ceil(tiles_x);
    let tile_h = height.div_ceil(tiles_y);
    let tile_area = (tile_w * tile_h) as u32;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / 256.0) as u32).max(1)
    } else {
        u32::MAX
    };
    let lut_scale = 255.0f32 / tile_area as f32;

    // luts[ty * tiles_x + tx][v]
    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let mut hist = [0u32; 256];
            for y in 0..tile_h {
                let sy = reflect101((ty * tile_h + y) as isize, height);
                for x in 0..tile_w {
                    let sx = reflect101((tx * tile_w + x) as isize, width);
                    hist[input[[sy, sx]] as usize] += 1;
                }
            }

            clip_histogram(&mut hist, clip);

            let lut = &mut luts[ty * tiles_x + tx];
            let mut sum = 0u32;
            for (i, &count) in hist.iter().enumerate() {
                sum += count;
                lut[i] = (sum as f32 * lut_scale).round_ties_even().clamp(0.0, 255.0) as u8;
            }
        }
    }

    let inv_tw = 1.0f32 / tile_w as f32;
    let inv_th = 1.0f32 / tile_h as f32;

    let mut output = Array2::<u8>::zeros((height, width));
    Zip::indexed(&mut output).par_for_each(|(y, x), out| {
        let v = input[[y, x]] as usize;

        let tyf = y as f32 * inv_th - 0.5;
        let ty1 = tyf.floor() as isize;
        let ya = tyf - ty1 as f32;
        let ty2 = ((ty1 + 1) as usize).min(tiles_y - 1);
        let ty1 = ty1.max(0) as usize;

        let txf = x as f32 * inv_tw - 0.5;
        let tx1 = txf.floor() as isize;
        let xa = txf - tx1 as f32;
        let tx2 = ((tx1 + 1) as usize).min(tiles_x - 1);
        let tx1 = tx1.max(0) as usize;

        let at = |ty: usize, tx: usize| luts[ty * tiles_x + tx][v] as f32;
        let top = at(ty1, tx1) * (1.0 - xa) + at(ty1, tx2) * xa;
        let bottom = at(ty2, tx1) * (1.0 - xa) + at(ty2, tx2) * xa;
        let res = top * (1.0 - ya) + bottom * ya;

        *out = res.round_ties_even().clamp(0.0, 255.0) as u8;
    });

    output
}

/// Clip bins at `clip` and spread the excess back over the histogram.
fn clip_histogram(hist: &mut [u32; 256], clip: u32) {
    let mut clipped = 0u32;
    for count in hist.iter_mut() {
        if *count > clip {
            clipped += *count - clip;
            *count = clip;
        }
    }

    let batch = clipped / 256;
    let mut residual = clipped - batch * 256;
    for count in hist.iter_mut() {
        *count += batch;
    }

    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        let mut i = 0;
        while i < 256 && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

// ============================================================================
// Contrast Stretch
// ============================================================================

/// Value of the `k`-th smallest sample (0-based) described by a histogram.
fn order_statistic(hist: &[u32; 256], k: u64) -> u8 {
    let mut seen = 0u64;
    for (v, &count) in hist.iter().enumerate() {
        seen += count as u64;
        if seen > k {
            return v as u8;
        }
    }
    255
}

/// Percentile of a histogram with linear interpolation between the two
/// nearest order statistics.
///
/// # Arguments
/// * `hist` - 256-bin histogram
/// * `p` - Percentile, 0.0-100.0
pub fn percentile(hist: &[u32; 256], p: f32) -> f32 {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0.0;
    }

    let rank = (p.clamp(0.0, 100.0) as f64 / 100.0) * (total - 1) as f64;
    let lo = rank.floor() as u64;
    let hi = (lo + 1).min(total - 1);
    let frac = (rank - lo as f64) as f32;

    let a = order_statistic(hist, lo) as f32;
    let b = order_statistic(hist, hi) as f32;
    a + (b - a) * frac
}

/// Percentile contrast stretch of one plane.
///
/// Maps the 2nd percentile to 0 and the 98th to 255, clipping outside.
///
/// # Arguments
/// * `input` - 8-bit plane (height, width)
/// * `channel` - Channel index, reported in the error
///
/// # Errors
/// [`EdgeError::DegenerateRange`] when both percentiles are equal (for
/// example a solid-colour plane).
pub fn contrast_stretch_u8(input: ArrayView2<u8>, channel: usize) -> Result<Array2<u8>> {
    let hist = histogram_u8(input);
    let low = percentile(&hist, STRETCH_LOW_PERCENTILE);
    let high = percentile(&hist, STRETCH_HIGH_PERCENTILE);

    let range = high - low;
    if range <= 0.0 {
        return Err(EdgeError::DegenerateRange { channel, low, high });
    }

    let scale = 255.0 / range;
    let mut lut = [0u8; 256];
    for (v, out) in lut.iter_mut().enumerate() {
        *out = ((v as f32 - low) * scale).clamp(0.0, 255.0).round() as u8;
    }
    Ok(input.mapv(|v| lut[v as usize]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(height: usize, width: usize) -> Array2<u8> {
        Array2::from_shape_fn((height, width), |(y, x)| ((x + y * width) * 255 / (height * width - 1)) as u8)
    }

    #[test]
    fn test_equalize_spreads_low_contrast() {
        let img = Array2::from_shape_fn((2, 2), |(y, x)| [[64u8, 128], [160, 192]][y][x]);

        let result = equalize_u8(img.view());

        assert_eq!(result[[0, 0]], 0);
        assert_eq!(result[[0, 1]], 85);
        assert_eq!(result[[1, 0]], 170);
        assert_eq!(result[[1, 1]], 255);
    }

    #[test]
    fn test_equalize_uniform_plane_is_unchanged() {
        let img = Array2::<u8>::from_elem((4, 4), 77);
        assert_eq!(equalize_u8(img.view()), img);
    }

    #[test]
    fn test_equalize_is_monotonic() {
        let img = gradient(8, 8);
        let result = equalize_u8(img.view());
        let flat: Vec<u8> = result.iter().copied().collect();
        assert!(flat.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_clahe_keeps_shape_and_is_deterministic() {
        let img = gradient(16, 16);
        let result = clahe_u8(img.view(), CLAHE_CLIP_LIMIT, (2, 2));

        assert_eq!(result.dim(), (16, 16));
        let again = clahe_u8(img.view(), CLAHE_CLIP_LIMIT, (2, 2));
        assert_eq!(result, again);
    }

    #[test]
    fn test_clahe_handles_planes_smaller_than_grid() {
        let img = Array2::from_shape_fn((3, 5), |(y, x)| (x * 40 + y * 10) as u8);
        let result = clahe_u8(img.view(), CLAHE_CLIP_LIMIT, CLAHE_TILE_GRID);
        assert_eq!(result.dim(), (3, 5));
    }

    #[test]
    fn test_clahe_limits_contrast_gain() {
        // Two-level plane: unclipped equalization pushes the dark level to
        // the middle of the range; clipping keeps it lower.
        let img = Array2::from_shape_fn((16, 16), |(_, x)| if x < 8 { 100u8 } else { 110 });

        let clipped = clahe_u8(img.view(), 1.0, (1, 1));
        let unclipped = clahe_u8(img.view(), 0.0, (1, 1));

        assert!(clipped[[0, 0]] < unclipped[[0, 0]]);
    }

    #[test]
    fn test_clip_histogram_conserves_mass() {
        let mut hist = [0u32; 256];
        hist[10] = 1000;
        hist[200] = 24;
        clip_histogram(&mut hist, 16);
        assert_eq!(hist.iter().sum::<u32>(), 1024);
        assert!(hist.iter().all(|&c| c <= 16 + 4));
    }

    #[test]
    fn test_percentile_interpolates() {
        let mut hist = [0u32; 256];
        hist[0] = 1;
        hist[100] = 1;
        assert_eq!(percentile(&hist, 0.0), 0.0);
        assert_eq!(percentile(&hist, 100.0), 100.0);
        assert!((percentile(&hist, 50.0) - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_contrast_stretch_fills_range() {
        let img = Array2::from_shape_fn((10, 10), |(y, x)| (50 + (y * 10 + x)) as u8);

        let result = contrast_stretch_u8(img.view(), 0).unwrap();

        assert_eq!(*result.iter().min().unwrap(), 0);
        assert_eq!(*result.iter().max().unwrap(), 255);
    }

    #[test]
    fn test_contrast_stretch_solid_plane_is_degenerate() {
        let img = Array2::<u8>::from_elem((5, 5), 30);
        let err = contrast_stretch_u8(img.view(), 2).unwrap_err();
        assert!(matches!(err, EdgeError::DegenerateRange { channel: 2, .. }));
    }
}

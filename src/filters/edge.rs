//! Edge detection filters: Sobel, Laplacian, Prewitt, Roberts, Canny.
//!
//! All filters take a single luminance plane and return a plane of the
//! same shape. Derivative responses are computed in `i32`, then the
//! absolute value (or magnitude) is saturated into 0-255.
//!
//! Borders use reflect-101 padding (see [`super::border`]), so border
//! pixels get a response like any other pixel. Canny is the exception: its
//! gradients use replicate borders, as OpenCV's `Canny` does.

use ndarray::{Array2, ArrayView2, Zip};

use super::border::{correlate, correlate3, correlate_with, saturate_u8, Border};

const SOBEL_X: [[i32; 3]; 3] = [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]];
const SOBEL_Y: [[i32; 3]; 3] = [[-1, -2, -1], [0, 0, 0], [1, 2, 1]];

const LAPLACIAN: [[i32; 3]; 3] = [[0, 1, 0], [1, -4, 1], [0, 1, 0]];

const PREWITT_X: [[i32; 3]; 3] = [[1, 0, -1], [1, 0, -1], [1, 0, -1]];
const PREWITT_Y: [[i32; 3]; 3] = [[1, 1, 1], [0, 0, 0], [-1, -1, -1]];

const ROBERTS_X: [[i32; 2]; 2] = [[1, 0], [0, -1]];
const ROBERTS_Y: [[i32; 2]; 2] = [[0, 1], [-1, 0]];

/// tan(22.5 deg) in 15-bit fixed point.
const TG22: i64 = 13573;

// ============================================================================
// Sobel Edge Detection
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SobelDirection {
    /// |d/dx|
    Horizontal,
    /// |d/dy|
    Vertical,
    /// sqrt(dx^2 + dy^2)
    Magnitude,
}

/// First-derivative responses (gx, gy) from the 3x3 Sobel kernels.
pub fn sobel_gradients(input: ArrayView2<u8>) -> (Array2<i32>, Array2<i32>) {
    sobel_gradients_with(input, Border::Reflect101)
}

pub fn sobel_gradients_with(input: ArrayView2<u8>, border: Border) -> (Array2<i32>, Array2<i32>) {
    let gx = correlate_with(input, &SOBEL_X, (1, 1), border);
    let gy = correlate_with(input, &SOBEL_Y, (1, 1), border);
    (gx, gy)
}

/// Apply Sobel edge detection.
///
/// # Arguments
/// * `input` - Luminance plane (height, width)
/// * `direction` - Which derivative to report
///
/// # Returns
/// Edge strength plane, saturated to 0-255
pub fn sobel_u8(input: ArrayView2<u8>, direction: SobelDirection) -> Array2<u8> {
    match direction {
        SobelDirection::Horizontal => correlate3(input, &SOBEL_X).mapv(|v| saturate_u8(v.abs())),
        SobelDirection::Vertical => correlate3(input, &SOBEL_Y).mapv(|v| saturate_u8(v.abs())),
        SobelDirection::Magnitude => {
            let (gx, gy) = sobel_gradients(input);
            Zip::from(&gx).and(&gy).par_map_collect(|&a, &b| {
                let mag = ((a * a + b * b) as f64).sqrt();
                mag.min(255.0) as u8
            })
        }
    }
}

// ============================================================================
// Laplacian Edge Detection
// ============================================================================

/// Apply the 4-neighbour Laplacian and take the absolute response.
pub fn laplacian_u8(input: ArrayView2<u8>) -> Array2<u8> {
    correlate3(input, &LAPLACIAN).mapv(|v| saturate_u8(v.abs()))
}

// ============================================================================
// Prewitt / Roberts
// ============================================================================

/// Average two kernel responses after saturating each into 0-255.
///
/// Negative responses clip to zero before averaging, so only one polarity
/// of each kernel contributes. Halves round to even.
fn average_saturated(a: &Array2<i32>, b: &Array2<i32>) -> Array2<u8> {
    Zip::from(a).and(b).par_map_collect(|&a, &b| {
        let sum = saturate_u8(a) as f32 + saturate_u8(b) as f32;
        (sum * 0.5).round_ties_even() as u8
    })
}

/// Apply Prewitt edge detection (mean of horizontal and vertical responses).
pub fn prewitt_u8(input: ArrayView2<u8>) -> Array2<u8> {
    let a = correlate3(input, &PREWITT_X);
    let b = correlate3(input, &PREWITT_Y);
    average_saturated(&a, &b)
}

/// Apply Roberts cross edge detection (mean of both diagonal responses).
///
/// The 2x2 kernels are anchored on their bottom-right tap:
/// `a = p(y-1, x-1) - p(y, x)` and `b = p(y-1, x) - p(y, x-1)`.
pub fn roberts_u8(input: ArrayView2<u8>) -> Array2<u8> {
    let a = correlate(input, &ROBERTS_X, (1, 1));
    let b = correlate(input, &ROBERTS_Y, (1, 1));
    average_saturated(&a, &b)
}

// ============================================================================
// Canny
// ============================================================================

/// Find edges using Canny edge detection.
///
/// Algorithm:
/// - 3x3 Sobel gradients with replicate borders, L1 magnitude `|gx| + |gy|`
/// - Non-maximum suppression along the gradient direction quantised to
///   0/45/90/135 degrees (magnitude outside the image counts as zero)
/// - Magnitude above `high` seeds an edge; magnitude above `low` joins an
///   edge when 8-connected to one
///
/// No pre-blur is applied. If `low > high` the thresholds are swapped.
///
/// # Returns
/// Binary plane: 255 on edges, 0 elsewhere
pub fn canny_u8(input: ArrayView2<u8>, low: u8, high: u8) -> Array2<u8> {
    let (height, width) = input.dim();
    let (low, high) = if low > high { (high, low) } else { (low, high) };
    let (low, high) = (low as i32, high as i32);

    let (gx, gy) = sobel_gradients_with(input, Border::Replicate);
    let mag = Zip::from(&gx).and(&gy).par_map_collect(|&a, &b| a.abs() + b.abs());

    let mag_at = |y: isize, x: isize| -> i32 {
        if y < 0 || x < 0 || y >= height as isize || x >= width as isize {
            0
        } else {
            mag[[y as usize, x as usize]]
        }
    };

    // 0 = not an edge, 1 = weak candidate, 2 = edge
    let mut state = Array2::<u8>::zeros((height, width));
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let m = mag[[y, x]];
            if m <= low {
                continue;
            }

            let dx = gx[[y, x]];
            let dy = gy[[y, x]];
            let (yi, xi) = (y as isize, x as isize);

            let ax = dx.abs() as i64;
            let ay = (dy.abs() as i64) << 15;
            let tg22x = ax * TG22;

            let is_max = if ay < tg22x {
                m > mag_at(yi, xi - 1) && m >= mag_at(yi, xi + 1)
            } else {
                let tg67x = tg22x + (ax << 16);
                if ay > tg67x {
                    m > mag_at(yi - 1, xi) && m >= mag_at(yi + 1, xi)
                } else {
                    let s: isize = if (dx ^ dy) < 0 { -1 } else { 1 };
                    m > mag_at(yi - 1, xi - s) && m > mag_at(yi + 1, xi + s)
                }
            };

            if !is_max {
                continue;
            }
            if m > high {
                state[[y, x]] = 2;
                stack.push((y, x));
            } else {
                state[[y, x]] = 1;
            }
        }
    }

    // Hysteresis: grow edges into 8-connected weak candidates
    while let Some((y, x)) = stack.pop() {
        for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
            for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                if state[[ny, nx]] == 1 {
                    state[[ny, nx]] = 2;
                    stack.push((ny, nx));
                }
            }
        }
    }

    state.mapv(|s| if s == 2 { 255 } else { 0 })
}

//! edgescope
//!
//! Edge detection and enhancement over a canonical working image, with a
//! scorer that ranks the edge detectors on a given picture.
//!
//! ## Pipeline
//! ```text
//! bytes -> normalize -> Method::apply -> Effect::apply -> PixelGrid
//!                  \-> score (every edge detector) -> ScoreTable
//! ```
//!
//! - **Normalize**: decode, convert to RGB, resize to 400 px wide with the
//!   aspect ratio kept, derive the BT.601 luminance plane.
//! - **Method**: Equalization, Canny, Sobel (magnitude, X, Y), Laplacian,
//!   Prewitt, Roberts, or None (the RGB image itself).
//! - **Effect**: blur, median, sharpen, CLAHE, colour correction, contrast
//!   stretch, threshold, invert, or None.
//!
//! ## Image Format
//! - **Grayscale**: (height, width) - no channel axis
//! - **RGB**: (height, width, 3)
//!
//! All samples are `u8`. Operators borrow their input and return new arrays.
//!
//! ## Bindings
//! - `python`: PyO3 module `edgescope`
//! - `wasm`: wasm-bindgen exports returning PNG bytes or RGBA buffers
//! - `server`: axum HTTP API and a single-page UI

pub mod error;
pub mod filters;
pub mod grid;
pub mod normalize;
pub mod ops;
pub mod pipeline;
pub mod scorer;
pub mod session;

#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "server")]
pub mod server;

pub use error::{EdgeError, Result};
pub use grid::PixelGrid;
pub use normalize::{normalize, normalize_with, NormalizeConfig, Normalized};
pub use ops::{Effect, Method};
pub use pipeline::{process_bytes, run, run_named, CannyThresholds, PipelineRequest, Processed};
pub use scorer::{score, score_with, ScoreEntry, ScoreTable};
pub use session::ComparisonSession;

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::IntoPyArray;
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::error::EdgeError;
    use crate::grid::PixelGrid;
    use crate::ops::{Effect, Method};
    use crate::pipeline::{process_bytes, CannyThresholds, PipelineRequest};
    use crate::scorer::score;
    use crate::normalize::normalize;

    fn value_error(err: EdgeError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Decode, normalize and process an image.
    ///
    /// Returns a (H, W) array for gray results and (H, W, 3) for RGB.
    /// Thresholds outside 0..=255 raise `ValueError`.
    #[pyfunction]
    #[pyo3(signature = (data, method="Canny", low=100, high=200, effect="None"))]
    pub fn process_image<'py>(
        py: Python<'py>,
        data: &[u8],
        method: &str,
        low: i64,
        high: i64,
        effect: &str,
    ) -> PyResult<Bound<'py, PyAny>> {
        let thresholds = CannyThresholds::from_ints(low, high).map_err(value_error)?;
        let request =
            PipelineRequest::parse(method, thresholds.low, thresholds.high, Some(effect)).map_err(value_error)?;
        let processed = py
            .allow_threads(|| process_bytes(data, &request))
            .map_err(value_error)?;

        Ok(match processed.result {
            PixelGrid::Gray(g) => g.into_pyarray(py).into_any(),
            PixelGrid::Rgb(c) => c.into_pyarray(py).into_any(),
        })
    }

    /// Rank every edge detector by non-zero pixel count, best first.
    #[pyfunction]
    #[pyo3(signature = (data, low=100, high=200))]
    pub fn score_methods(py: Python<'_>, data: &[u8], low: i64, high: i64) -> PyResult<Vec<(String, u64)>> {
        let thresholds = CannyThresholds::from_ints(low, high).map_err(value_error)?;
        let table = py
            .allow_threads(|| normalize(data).map(|n| score(n.gray.view(), thresholds)))
            .map_err(value_error)?;

        Ok(table
            .ranked()
            .into_iter()
            .map(|e| (e.method.name().to_string(), e.count))
            .collect())
    }

    /// Primary method names in display order.
    #[pyfunction]
    pub fn methods() -> Vec<&'static str> {
        Method::ALL.iter().map(|m| m.name()).collect()
    }

    /// Secondary effect names in display order.
    #[pyfunction]
    pub fn effects() -> Vec<&'static str> {
        Effect::ALL.iter().map(|e| e.name()).collect()
    }

    // ========================================================================
    // Module Registration
    // ========================================================================

    #[pymodule]
    pub fn edgescope(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(process_image, m)?)?;
        m.add_function(wrap_pyfunction!(score_methods, m)?)?;
        m.add_function(wrap_pyfunction!(methods, m)?)?;
        m.add_function(wrap_pyfunction!(effects, m)?)?;
        Ok(())
    }
}

//! WebAssembly exports.
//!
//! These functions are exposed to JavaScript via wasm-bindgen. Errors are
//! raised as JavaScript `Error` objects carrying the [`EdgeError`] message.
//!
//! Two input shapes are supported:
//! - **Encoded bytes** (PNG, JPEG, ...): normalized to 400 px wide, result
//!   returned as PNG
//! - **Raw RGBA** from a canvas `ImageData`: processed at its own size,
//!   result returned as RGBA of the same size

use ndarray::{s, Array3};
use wasm_bindgen::prelude::*;

use crate::error::EdgeError;
use crate::filters::grayscale::rgb_to_gray;
use crate::normalize::{normalize, Normalized};
use crate::pipeline::{process_bytes, run, CannyThresholds, PipelineRequest};
use crate::scorer::score;

fn js_error(err: EdgeError) -> JsError {
    JsError::new(&err.to_string())
}

fn request(method: &str, low: u8, high: u8, effect: &str) -> Result<PipelineRequest, JsError> {
    PipelineRequest::parse(method, low, high, Some(effect)).map_err(js_error)
}

// ============================================================================
// Encoded images
// ============================================================================

/// Process an encoded image and return the result as PNG.
///
/// # Arguments
/// * `data` - Encoded image bytes
/// * `method` - Primary method name, e.g. "Canny"
/// * `low`, `high` - Canny thresholds
/// * `effect` - Secondary effect name, e.g. "None"
#[wasm_bindgen]
pub fn process_image_png(data: &[u8], method: &str, low: u8, high: u8, effect: &str) -> Result<Vec<u8>, JsError> {
    let request = request(method, low, high, effect)?;
    let processed = process_bytes(data, &request).map_err(js_error)?;
    processed.result.encode_png().map_err(js_error)
}

/// Score every edge detector on an encoded image.
///
/// # Returns
/// JSON `{"scores": [{"method": .., "count": ..}, ...], "best": ..}`, ranked
#[wasm_bindgen]
pub fn score_methods_json(data: &[u8], low: u8, high: u8) -> Result<String, JsError> {
    let normalized = normalize(data).map_err(js_error)?;
    let table = score(normalized.gray.view(), CannyThresholds::new(low, high));
    let best = table.best().map_err(js_error)?;

    let body = serde_json::json!({
        "scores": table.ranked(),
        "best": best.method,
    });
    Ok(body.to_string())
}

// ============================================================================
// Raw RGBA
// ============================================================================

/// Process a raw RGBA buffer at its own size.
///
/// # Arguments
/// * `data` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
///
/// # Returns
/// Flat array of RGBA bytes, alpha 255; gray results are replicated to RGB
#[wasm_bindgen]
pub fn process_rgba_wasm(
    data: &[u8],
    width: usize,
    height: usize,
    method: &str,
    low: u8,
    high: u8,
    effect: &str,
) -> Result<Vec<u8>, JsError> {
    let request = request(method, low, high, effect)?;

    let rgba = Array3::from_shape_vec((height, width, 4), data.to_vec())
        .map_err(|e| JsError::new(&format!("invalid dimensions: {e}")))?;
    let rgb = rgba.slice(s![.., .., 0..3]).to_owned();
    let gray = rgb_to_gray(rgb.view());

    let result = run(&Normalized { rgb, gray }, &request).map_err(js_error)?.to_rgb();

    let mut out = Array3::<u8>::from_elem((height, width, 4), 255);
    out.slice_mut(s![.., .., 0..3]).assign(&result);
    Ok(out.into_raw_vec_and_offset().0)
}

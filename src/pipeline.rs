//! Pipeline runner: primary method followed by a secondary effect.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EdgeError, Result};
use crate::grid::PixelGrid;
use crate::normalize::{normalize_with, NormalizeConfig, Normalized};
use crate::ops::{Effect, Method};

/// Canny hysteresis thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CannyThresholds {
    pub low: u8,
    pub high: u8,
}

impl Default for CannyThresholds {
    fn default() -> Self {
        Self { low: 100, high: 200 }
    }
}

impl CannyThresholds {
    pub fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    /// Checked construction from wide integers, as received from bindings.
    ///
    /// # Errors
    /// [`EdgeError::InvalidThreshold`] naming the first value outside 0..=255.
    pub fn from_ints(low: i64, high: i64) -> Result<Self> {
        let narrow = |name: &'static str, value: i64| {
            u8::try_from(value).map_err(|_| EdgeError::InvalidThreshold { name, value })
        };
        Ok(Self::new(narrow("low", low)?, narrow("high", high)?))
    }
}

/// One user selection: method, thresholds and effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub method: Method,
    #[serde(default)]
    pub thresholds: CannyThresholds,
    #[serde(default = "default_effect")]
    pub effect: Effect,
}

fn default_effect() -> Effect {
    Effect::None
}

impl Default for PipelineRequest {
    fn default() -> Self {
        Self {
            method: Method::Canny,
            thresholds: CannyThresholds::default(),
            effect: Effect::None,
        }
    }
}

impl PipelineRequest {
    pub fn new(method: Method, thresholds: CannyThresholds, effect: Effect) -> Self {
        Self { method, thresholds, effect }
    }

    /// Build a request from display names. A missing effect means `None`.
    ///
    /// # Errors
    /// [`crate::EdgeError::UnknownMethod`] or [`crate::EdgeError::UnknownEffect`].
    pub fn parse(method: &str, low: u8, high: u8, effect: Option<&str>) -> Result<Self> {
        let method = method.parse::<Method>()?;
        let effect = match effect {
            Some(name) => name.parse::<Effect>()?,
            None => Effect::None,
        };
        Ok(Self::new(method, CannyThresholds::new(low, high), effect))
    }
}

/// Run a request against a normalized image.
pub fn run(input: &Normalized, request: &PipelineRequest) -> Result<PixelGrid> {
    let primary = request.method.apply(input, request.thresholds);
    let result = request.effect.apply(primary)?;

    let (height, width) = result.dims();
    debug!(
        method = %request.method,
        effect = %request.effect,
        low = request.thresholds.low,
        high = request.thresholds.high,
        height,
        width,
        channels = result.channels(),
        "pipeline run"
    );

    Ok(result)
}

/// String-keyed entry point. Names are validated before any pixel work.
pub fn run_named(
    input: &Normalized,
    method: &str,
    thresholds: CannyThresholds,
    effect: Option<&str>,
) -> Result<PixelGrid> {
    let request = PipelineRequest::parse(method, thresholds.low, thresholds.high, effect)?;
    run(input, &request)
}

/// Normalized input and the pipeline result for one upload.
#[derive(Debug, Clone)]
pub struct Processed {
    pub normalized: Normalized,
    pub result: PixelGrid,
}

/// Decode, normalize and run in one step.
pub fn process_bytes(bytes: &[u8], request: &PipelineRequest) -> Result<Processed> {
    process_bytes_with(bytes, request, &NormalizeConfig::default())
}

pub fn process_bytes_with(
    bytes: &[u8],
    request: &PipelineRequest,
    config: &NormalizeConfig,
) -> Result<Processed> {
    let normalized = normalize_with(bytes, config)?;
    let result = run(&normalized, request)?;
    Ok(Processed { normalized, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn png_of(rgb: Array3<u8>) -> Vec<u8> {
        PixelGrid::Rgb(rgb).encode_png().unwrap()
    }

    fn textured() -> Normalized {
        let rgb = Array3::from_shape_fn((20, 30, 3), |(y, x, c)| {
            if (x / 5 + y / 5) % 2 == 0 { 30 + c as u8 * 10 } else { 220 - c as u8 * 10 }
        });
        let gray = crate::filters::grayscale::rgb_to_gray(rgb.view());
        Normalized { rgb, gray }
    }

    #[test]
    fn test_black_image_canny_is_all_zero() {
        let bytes = png_of(Array3::zeros((50, 100, 3)));
        let request = PipelineRequest::parse("Canny", 100, 200, None).unwrap();

        let processed = process_bytes(&bytes, &request).unwrap();

        let PixelGrid::Gray(edges) = processed.result else {
            panic!("canny should produce a gray grid");
        };
        assert_eq!(edges.dim(), (200, 400));
        assert!(edges.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_invert_cancels_on_identity_method() {
        let input = textured();
        let request = PipelineRequest::parse("None", 100, 200, Some("Invert")).unwrap();

        let once = run(&input, &request).unwrap();
        let twice = Effect::Invert.apply(once).unwrap();

        assert_eq!(twice, PixelGrid::Rgb(input.rgb.clone()));
    }

    #[test]
    fn test_unknown_method_fails_before_work() {
        let input = textured();
        let err = run_named(&input, "Foo", CannyThresholds::default(), None).unwrap_err();
        assert!(matches!(err, EdgeError::UnknownMethod(ref n) if n == "Foo"));
    }

    #[test]
    fn test_unknown_effect() {
        let err = PipelineRequest::parse("Canny", 1, 2, Some("Glitter")).unwrap_err();
        assert!(matches!(err, EdgeError::UnknownEffect(_)));
    }

    #[test]
    fn test_run_is_deterministic() {
        let input = textured();
        let request = PipelineRequest::new(Method::Sobel, CannyThresholds::default(), Effect::Sharpening);
        assert_eq!(run(&input, &request).unwrap(), run(&input, &request).unwrap());
    }

    #[test]
    fn test_effect_sees_primary_output() {
        let input = textured();
        let request = PipelineRequest::new(Method::Canny, CannyThresholds::new(50, 150), Effect::Invert);

        let result = run(&input, &request).unwrap();
        let canny = Method::Canny.apply(&input, request.thresholds);

        assert_eq!(Effect::Invert.apply(result).unwrap(), canny);
    }

    #[test]
    fn test_thresholds_from_ints_checks_range() {
        assert_eq!(CannyThresholds::from_ints(0, 255).unwrap(), CannyThresholds::new(0, 255));

        let err = CannyThresholds::from_ints(100, 300).unwrap_err();
        assert!(matches!(err, EdgeError::InvalidThreshold { name: "high", value: 300 }));
        assert_eq!(err.to_string(), "high must be an integer in 0..=255, got 300");

        let err = CannyThresholds::from_ints(-1, 300).unwrap_err();
        assert!(matches!(err, EdgeError::InvalidThreshold { name: "low", value: -1 }));
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let request: PipelineRequest = serde_json::from_str(r#"{"method": "Sobel Y"}"#).unwrap();
        assert_eq!(request.method, Method::SobelY);
        assert_eq!(request.thresholds, CannyThresholds::default());
        assert_eq!(request.effect, Effect::None);
    }

    #[test]
    fn test_decode_failure_propagates() {
        let err = process_bytes(b"\x89PNG broken", &PipelineRequest::default()).unwrap_err();
        assert!(matches!(err, EdgeError::Decode(_)));
    }
}

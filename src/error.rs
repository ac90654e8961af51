//! Error type shared by every stage of the pipeline.
//!
//! All failures are local and recoverable: adapters catch an [`EdgeError`]
//! and turn it into a user-facing message. No stage produces a partial
//! result on failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EdgeError {
    /// The input bytes are not a supported image format.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// The input byte buffer was empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// The resized image would exceed the configured height cap.
    #[error("image too tall: {width}x{height} source resizes to height {target}, limit is {limit}")]
    TooLarge { width: u32, height: u32, target: u64, limit: u32 },

    /// A Canny threshold outside 0..=255.
    #[error("{name} must be an integer in 0..=255, got {value}")]
    InvalidThreshold { name: &'static str, value: i64 },

    /// No primary method is registered under this name.
    #[error("unknown method: {0:?}")]
    UnknownMethod(String),

    /// No secondary effect is registered under this name.
    #[error("unknown effect: {0:?}")]
    UnknownEffect(String),

    /// Contrast stretch found the 2nd and 98th percentiles equal.
    #[error("degenerate intensity range on channel {channel}: low percentile {low} equals high percentile {high}")]
    DegenerateRange { channel: usize, low: f32, high: f32 },

    /// Best-method lookup on a score table with no entries.
    #[error("no edge-detection methods were scored")]
    EmptyScore,

    /// The result grid could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, EdgeError>;
